use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use tokio::runtime::Handle;
use tracing::debug;

use crate::config::SeasideConfig;
use crate::deepseek::DeepSeekClient;
use crate::error::SeasideError;
use crate::jobs::{JobHandle, JobKind, JobRegistry};
use crate::pipeline::{
    ContentKind, DispatchOptions, Dispatcher, Document, batches, decode_source, output_path,
    reassemble, write_artifact,
};
use crate::translator::{DeepSeekTranslator, Translator};

/// Builds a translator from the effective API key.
pub type Connector<T> = Arc<dyn Fn(&str) -> Result<T, SeasideError> + Send + Sync>;

/// A request to translate one file.
#[derive(Debug, Clone)]
pub struct TranslationRequest {
    /// Caller-chosen id; generated when absent.
    pub job_id: Option<String>,
    /// Already-validated path of the source document.
    pub source: PathBuf,
    /// Overrides the configured API key for this job only.
    pub api_key: Option<String>,
}

impl TranslationRequest {
    pub fn new(source: impl Into<PathBuf>) -> Self {
        Self {
            job_id: None,
            source: source.into(),
            api_key: None,
        }
    }
}

/// Submits translation jobs and drives each one from `running` to a
/// terminal state on its own background task.
pub struct JobOrchestrator<T> {
    registry: Arc<JobRegistry>,
    config: SeasideConfig,
    connect: Connector<T>,
}

impl JobOrchestrator<DeepSeekTranslator> {
    /// Orchestrator talking to the configured DeepSeek endpoint.
    pub fn deepseek(registry: Arc<JobRegistry>, config: SeasideConfig) -> Self {
        let base_url = config.base_url.clone();
        let model = config.model.clone();
        let temperature = config.temperature;
        Self::new(registry, config, move |api_key| {
            let client = DeepSeekClient::with_base_url(api_key.to_string(), base_url.clone())?;
            Ok(DeepSeekTranslator::new(client, model.clone(), temperature))
        })
    }
}

impl<T: Translator> JobOrchestrator<T> {
    pub fn new(
        registry: Arc<JobRegistry>,
        config: SeasideConfig,
        connect: impl Fn(&str) -> Result<T, SeasideError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            registry,
            config,
            connect: Arc::new(connect),
        }
    }

    pub fn registry(&self) -> &Arc<JobRegistry> {
        &self.registry
    }

    /// Register the job and start it in the background. Returns the job id
    /// right away; progress is observed through [`JobRegistry::poll`].
    ///
    /// Outside a tokio runtime nothing is registered and
    /// [`SeasideError::Runtime`] is returned.
    pub fn submit(&self, request: TranslationRequest) -> Result<String, SeasideError> {
        let runtime =
            Handle::try_current().map_err(|err| SeasideError::Runtime(err.to_string()))?;
        let handle = self.registry.create(
            request.job_id,
            JobKind::Translation,
            "queued for translation",
        )?;
        let id = handle.id().to_string();

        let job = TranslationJob {
            handle: handle.clone(),
            source: request.source,
            api_key: self.config.resolve_api_key(request.api_key.as_deref()),
            config: self.config.clone(),
            connect: Arc::clone(&self.connect),
        };
        debug!(job_id = %id, jobs = self.registry.len(), "job submitted");
        runtime.spawn(async move {
            match tokio::spawn(job.execute()).await {
                Ok(Ok(summary)) => handle.complete(summary),
                Ok(Err(err)) => handle.fail(format!("fatal error: {err:#}")),
                Err(err) => handle.fail(format!("fatal error: job task crashed: {err}")),
            }
        });
        Ok(id)
    }
}

struct TranslationJob<T> {
    handle: JobHandle,
    source: PathBuf,
    api_key: Option<String>,
    config: SeasideConfig,
    connect: Connector<T>,
}

impl<T: Translator> TranslationJob<T> {
    /// Runs every stage; the returned string is the final status message.
    async fn execute(self) -> Result<String> {
        let api_key = self
            .api_key
            .clone()
            .ok_or_else(|| anyhow!("DeepSeek API key is not configured"))?;

        let bytes = tokio::fs::read(&self.source)
            .await
            .with_context(|| format!("cannot read source file {}", self.source.display()))?;
        let text = decode_source(&bytes);

        let kind = ContentKind::from_path(&self.source);
        let document = Document::split(&text, kind);
        if document.is_empty() {
            return Ok("source file is empty, nothing to translate".to_string());
        }

        self.handle
            .log(format!("processing file: {}", file_name(&self.source)));
        match kind {
            ContentKind::Subtitle => self
                .handle
                .log(format!("subtitle file, split into {} cues", document.len())),
            ContentKind::PlainText => self
                .handle
                .log(format!("plain text, split into {} lines", document.len())),
        }

        let translator = Arc::new((self.connect)(&api_key)?);
        let work = batches(document.into_blocks(), self.config.batch_size()?);
        let options = DispatchOptions {
            workers: std::num::NonZeroUsize::new(self.config.max_workers)
                .ok_or_else(|| anyhow!("max_workers must be at least 1"))?,
            max_attempts: self.config.max_attempts,
            call_timeout: self.config.call_timeout(),
        };
        let results = Dispatcher::new(translator, options)
            .run(&work, &self.handle)
            .await;

        let fallbacks = results.iter().filter(|r| r.is_fallback()).count();
        if fallbacks > 0 {
            self.handle.log(format!(
                "{fallbacks} of {} batches kept their source text",
                results.len()
            ));
        }

        let target = output_path(&self.source, &self.config.output_marker);
        self.handle.log("translation finished, writing output");
        write_artifact(&target, &reassemble(&results))
            .await
            .with_context(|| format!("writing {}", target.display()))?;
        self.handle.add_file("translation", target.clone());

        Ok(format!("all done, saved as {}", file_name(&target)))
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
