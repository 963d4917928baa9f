//! Interface de terminal do seaside — spinners e saída colorida.
//!
//! Usa as crates `indicatif` para spinners de progresso e `console` para
//! estilização com cores. O [`JobProgress`] acompanha um job consultando o
//! registro periodicamente, como faria o navegador do console.

use std::time::Duration;

use console::Style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::jobs::{JobRegistry, JobSnapshot, LogEntry, PollStatus};

/// Intervalo entre consultas ao registro.
const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Indicador visual de progresso para a execução de um job no terminal.
///
/// Exibe um spinner animado durante o processamento, as novas linhas do log
/// à medida que aparecem e mensagens coloridas para sucesso (verde) e
/// falha (vermelho).
pub struct JobProgress {
    // Barra de progresso/spinner do indicatif.
    pb: ProgressBar,
    // Estilo verde para mensagens de sucesso.
    green: Style,
    // Estilo vermelho para mensagens de falha.
    red: Style,
    // Estilo esmaecido para o horário das linhas do log.
    dim: Style,
}

impl JobProgress {
    /// Inicia o spinner para o job indicado.
    pub fn start(job_id: &str) -> Self {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            pb.set_style(style);
        }
        pb.set_message(format!("job {job_id}: starting"));
        pb.enable_steady_tick(Duration::from_millis(100));

        Self {
            pb,
            green: Style::new().green().bold(),
            red: Style::new().red().bold(),
            dim: Style::new().dim(),
        }
    }

    /// Imprime uma linha do log acima do spinner.
    pub fn entry(&self, entry: &LogEntry) {
        self.pb.println(format!(
            "  {} {}",
            self.dim.apply_to(entry.at.format("%H:%M:%S")),
            entry.message
        ));
    }

    /// Consulta o registro até o job terminar, imprimindo cada linha nova
    /// do log uma única vez. Retorna o snapshot final.
    pub async fn watch(&self, registry: &JobRegistry, job_id: &str) -> JobSnapshot {
        let mut printed = 0;
        loop {
            let snapshot = registry.poll(job_id);
            for entry in snapshot.logs.iter().skip(printed) {
                self.entry(entry);
            }
            printed = snapshot.logs.len();
            self.pb.set_message(format!("job {job_id}: {}", snapshot.message));

            if snapshot.is_terminal() || snapshot.status == PollStatus::Unknown {
                return snapshot;
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    /// Finaliza o spinner e exibe o resultado final do job.
    pub fn complete(&self, snapshot: &JobSnapshot) {
        self.pb.finish_and_clear();
        match snapshot.status {
            PollStatus::Done => {
                println!("  {} {}", self.green.apply_to("✓"), snapshot.message);
                for (role, path) in &snapshot.files {
                    println!("    {role}: {}", path.display());
                }
            }
            PollStatus::Error => {
                println!("  {} {}", self.red.apply_to("✗"), snapshot.message);
            }
            PollStatus::Running | PollStatus::Unknown => {
                println!("  {} job status: {}", self.red.apply_to("?"), snapshot.status);
            }
        }
    }
}
