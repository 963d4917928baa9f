//! Interface de linha de comando do seaside baseada em clap.
//!
//! Define a struct [`Cli`] com subcomandos [`Command`] (translate, split)
//! e flags globais (--config, --verbose).

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// seaside — console de jobs de tradução de legendas.
#[derive(Debug, Parser)]
#[command(name = "seaside", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Caminho do arquivo de configuração (padrão: ./seaside.toml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Habilita saída detalhada (verbose).
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Traduz um arquivo de legenda ou texto e acompanha o progresso.
    Translate {
        /// Arquivo de origem (.srt ou texto simples).
        file: PathBuf,

        /// Identificador do job; gerado quando omitido.
        #[arg(long)]
        job_id: Option<String>,

        /// Chave da API usada somente neste job.
        #[arg(long)]
        api_key: Option<String>,

        /// Blocos por lote enviado ao serviço remoto.
        #[arg(long)]
        batch_size: Option<usize>,

        /// Número de workers paralelos.
        #[arg(long)]
        workers: Option<usize>,
    },

    /// Mostra como o arquivo seria dividido, sem chamar a API.
    Split {
        /// Arquivo de origem (.srt ou texto simples).
        file: PathBuf,

        /// Blocos por lote.
        #[arg(long)]
        batch_size: Option<usize>,
    },
}
