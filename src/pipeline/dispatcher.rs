//! Bounded fan-out of batches to the remote translator.
//!
//! A feeder pushes batches into a bounded work channel; a fixed pool of
//! workers pulls from it, runs each batch through the retry loop and sends
//! the outcome to a result channel. The caller's task is the only consumer
//! of that channel, so it alone owns the result slots, the completed
//! counter and the progress log writes.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, mpsc};
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error, warn};

use super::batcher::Batch;
use crate::error::FallbackReason;
use crate::jobs::JobHandle;
use crate::translator::Translator;

/// Progress is logged every this many completed batches, and at the end.
const PROGRESS_EVERY: usize = 5;

#[derive(Debug, Clone)]
pub struct DispatchOptions {
    pub workers: NonZeroUsize,
    /// Total calls per batch, first try included.
    pub max_attempts: u32,
    /// Deadline for a single remote call.
    pub call_timeout: Duration,
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self {
            workers: NonZeroUsize::new(8).unwrap_or(NonZeroUsize::MIN),
            max_attempts: 3,
            call_timeout: Duration::from_secs(120),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOutcome {
    Translated { attempts: u32 },
    Fallback(FallbackReason),
}

/// Final text for one batch, translated or not. Never empty for a
/// non-empty batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchResult {
    pub index: usize,
    pub text: String,
    pub outcome: BatchOutcome,
}

impl BatchResult {
    fn fallback(batch: &Batch, reason: FallbackReason) -> Self {
        Self {
            index: batch.index,
            text: batch.text(),
            outcome: BatchOutcome::Fallback(reason),
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self.outcome, BatchOutcome::Fallback(_))
    }
}

pub struct Dispatcher<T> {
    translator: Arc<T>,
    options: DispatchOptions,
}

impl<T: Translator> Dispatcher<T> {
    pub fn new(translator: Arc<T>, options: DispatchOptions) -> Self {
        Self {
            translator,
            options,
        }
    }

    /// Translate every batch and return one result per batch, ordered by
    /// batch index regardless of completion order.
    pub async fn run(&self, batches: &[Batch], progress: &JobHandle) -> Vec<BatchResult> {
        let total = batches.len();
        if total == 0 {
            return Vec::new();
        }
        let workers = self.options.workers.get().min(total);
        progress.log(format!(
            "starting concurrent translation: {workers} workers, {total} batches"
        ));

        let (work_tx, work_rx) = mpsc::channel::<Batch>(workers);
        let work_rx = Arc::new(Mutex::new(work_rx));
        let (result_tx, mut result_rx) = mpsc::channel::<BatchResult>(workers);

        let mut pool = JoinSet::new();
        let queue = batches.to_vec();
        pool.spawn(async move {
            for batch in queue {
                if work_tx.send(batch).await.is_err() {
                    break;
                }
            }
        });
        for worker in 0..workers {
            let work_rx = Arc::clone(&work_rx);
            let result_tx = result_tx.clone();
            let translator = Arc::clone(&self.translator);
            let options = self.options.clone();
            pool.spawn(async move {
                loop {
                    let next = work_rx.lock().await.recv().await;
                    let Some(batch) = next else { break };
                    debug!(worker, batch = batch.index, "picked up batch");
                    let result = run_batch(Arc::clone(&translator), batch, &options).await;
                    if result_tx.send(result).await.is_err() {
                        break;
                    }
                }
            });
        }
        drop(result_tx);

        let mut slots: Vec<Option<BatchResult>> = (0..total).map(|_| None).collect();
        let mut completed = 0usize;
        while let Some(result) = result_rx.recv().await {
            let index = result.index;
            let Some(slot) = slots.get_mut(index) else {
                error!(batch = index, total, "result for a batch that was never queued");
                continue;
            };
            if slot.is_some() {
                error!(batch = index, "duplicate result for batch, keeping the first");
                continue;
            }
            match &result.outcome {
                BatchOutcome::Fallback(FallbackReason::Crashed(msg)) => {
                    progress.log(format!(
                        "batch {index} raised an unexpected error, keeping source text: {msg}"
                    ));
                }
                BatchOutcome::Fallback(reason) => {
                    warn!(job_id = %progress.id(), batch = index, %reason, "keeping source text");
                }
                BatchOutcome::Translated { attempts } => {
                    debug!(job_id = %progress.id(), batch = index, attempts, "batch translated");
                }
            }
            *slot = Some(result);

            completed += 1;
            if completed % PROGRESS_EVERY == 0 || completed == total {
                let percent = completed as f64 / total as f64 * 100.0;
                progress.log(format!("progress: {percent:.1}% ({completed}/{total})"));
            }
        }

        while let Some(joined) = pool.join_next().await {
            if let Err(err) = joined {
                error!(job_id = %progress.id(), %err, "dispatch task ended abnormally");
            }
        }

        backfill_missing(slots, batches, progress)
    }
}

/// Runs the retry loop on its own task so that a panic inside the
/// translator surfaces here as a `JoinError` instead of killing the worker.
async fn run_batch<T: Translator>(
    translator: Arc<T>,
    batch: Batch,
    options: &DispatchOptions,
) -> BatchResult {
    let text = batch.text();
    let attempt = {
        let text = text.clone();
        let max_attempts = options.max_attempts;
        let call_timeout = options.call_timeout;
        tokio::spawn(async move {
            translate_with_retry(translator.as_ref(), &text, max_attempts, call_timeout).await
        })
    };

    match attempt.await {
        Ok(Ok((translated, attempts))) => BatchResult {
            index: batch.index,
            text: translated,
            outcome: BatchOutcome::Translated { attempts },
        },
        Ok(Err(reason)) => BatchResult {
            index: batch.index,
            text,
            outcome: BatchOutcome::Fallback(reason),
        },
        Err(err) => BatchResult::fallback(&batch, FallbackReason::Crashed(describe_join_error(err))),
    }
}

/// Call the translator up to `max_attempts` times, immediately one after
/// another. Errors, timeouts and blank replies all count as failed attempts.
/// Returns the translation with the number of calls it took.
pub async fn translate_with_retry<T: Translator>(
    translator: &T,
    text: &str,
    max_attempts: u32,
    call_timeout: Duration,
) -> Result<(String, u32), FallbackReason> {
    let mut last_error = String::from("no attempt made");
    for attempt in 1..=max_attempts {
        match tokio::time::timeout(call_timeout, translator.translate(text)).await {
            Ok(Ok(translated)) if !translated.trim().is_empty() => return Ok((translated, attempt)),
            Ok(Ok(_)) => last_error = "empty response".to_string(),
            Ok(Err(err)) => last_error = err.to_string(),
            Err(_) => last_error = format!("timed out after {}ms", call_timeout.as_millis()),
        }
        debug!(attempt, max_attempts, error = %last_error, "translation attempt failed");
    }
    Err(FallbackReason::Exhausted {
        attempts: max_attempts,
        last_error,
    })
}

fn describe_join_error(err: JoinError) -> String {
    if err.is_panic() {
        let payload = err.into_panic();
        if let Some(msg) = payload.downcast_ref::<&str>() {
            return (*msg).to_string();
        }
        if let Some(msg) = payload.downcast_ref::<String>() {
            return msg.clone();
        }
        return "panic with non-string payload".to_string();
    }
    err.to_string()
}

/// Every slot is filled by the time the pool drains; a gap here means the
/// dispatcher itself is broken. Debug builds panic, release builds restore
/// the source text so the artifact stays complete.
fn backfill_missing(
    slots: Vec<Option<BatchResult>>,
    batches: &[Batch],
    progress: &JobHandle,
) -> Vec<BatchResult> {
    let missing: Vec<usize> = slots
        .iter()
        .enumerate()
        .filter(|(_, slot)| slot.is_none())
        .map(|(index, _)| index)
        .collect();
    debug_assert!(missing.is_empty(), "no result for batches {missing:?}");
    if !missing.is_empty() {
        error!(job_id = %progress.id(), ?missing, "batches without a result");
        progress.log(format!(
            "warning: {} batch result(s) missing, restoring source text",
            missing.len()
        ));
    }

    slots
        .into_iter()
        .zip(batches)
        .map(|(slot, batch)| slot.unwrap_or_else(|| BatchResult::fallback(batch, FallbackReason::Lost)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deepseek::DeepSeekError;
    use crate::jobs::{JobKind, JobRegistry};
    use crate::pipeline::batcher::batches;
    use crate::pipeline::splitter::Block;
    use std::collections::HashMap;
    use std::sync::Mutex as StdMutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FnTranslator<F>(F);

    impl<F> Translator for FnTranslator<F>
    where
        F: Fn(&str) -> Result<String, DeepSeekError> + Send + Sync + 'static,
    {
        async fn translate(&self, text: &str) -> Result<String, DeepSeekError> {
            (self.0)(text)
        }
    }

    fn mock<F>(f: F) -> Arc<FnTranslator<F>>
    where
        F: Fn(&str) -> Result<String, DeepSeekError> + Send + Sync + 'static,
    {
        Arc::new(FnTranslator(f))
    }

    fn mock_error() -> DeepSeekError {
        DeepSeekError::ApiError {
            status: 500,
            message: "mock error".into(),
        }
    }

    fn make_batches(blocks: usize, size: usize) -> Vec<Batch> {
        let blocks = (0..blocks)
            .map(|position| Block {
                position,
                text: format!("cue {position}"),
            })
            .collect();
        batches(blocks, NonZeroUsize::new(size).unwrap())
    }

    fn options(workers: usize) -> DispatchOptions {
        DispatchOptions {
            workers: NonZeroUsize::new(workers).unwrap(),
            max_attempts: 3,
            call_timeout: Duration::from_secs(5),
        }
    }

    fn job() -> (JobRegistry, JobHandle) {
        let registry = JobRegistry::new();
        let handle = registry.create(None, JobKind::Translation, "queued").unwrap();
        (registry, handle)
    }

    #[tokio::test]
    async fn results_come_back_in_batch_order() {
        let (_registry, handle) = job();
        let input = make_batches(100, 7);
        let translator = mock(|text| Ok(text.to_uppercase()));
        let results = Dispatcher::new(translator, options(8)).run(&input, &handle).await;

        assert_eq!(results.len(), input.len());
        for (result, batch) in results.iter().zip(&input) {
            assert_eq!(result.index, batch.index);
            assert_eq!(result.text, batch.text().to_uppercase());
            assert_eq!(result.outcome, BatchOutcome::Translated { attempts: 1 });
        }
    }

    #[tokio::test]
    async fn failing_batch_is_called_exactly_max_attempts_times() {
        let calls = Arc::new(StdMutex::new(HashMap::<String, usize>::new()));
        let seen = Arc::clone(&calls);
        let translator = mock(move |text| {
            *seen.lock().unwrap().entry(text.to_string()).or_default() += 1;
            Err(mock_error())
        });
        let (_registry, handle) = job();
        let input = make_batches(9, 2);

        let results = Dispatcher::new(translator, options(3)).run(&input, &handle).await;

        let calls = calls.lock().unwrap();
        for (result, batch) in results.iter().zip(&input) {
            assert_eq!(calls[&batch.text()], 3);
            assert_eq!(result.text, batch.text());
            assert_eq!(
                result.outcome,
                BatchOutcome::Fallback(FallbackReason::Exhausted {
                    attempts: 3,
                    last_error: "API error (status 500): mock error".into(),
                })
            );
        }
    }

    #[tokio::test]
    async fn retry_succeeds_on_third_attempt() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let translator = mock(move |_| {
            if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(mock_error())
            } else {
                Ok("translated".to_string())
            }
        });
        let out = translate_with_retry(translator.as_ref(), "src", 3, Duration::from_secs(1)).await;
        assert_eq!(out, Ok(("translated".to_string(), 3)));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn blank_reply_counts_as_failure() {
        let translator = mock(|_| Ok("   \n".to_string()));
        let out = translate_with_retry(translator.as_ref(), "src", 3, Duration::from_secs(1)).await;
        assert_eq!(
            out,
            Err(FallbackReason::Exhausted {
                attempts: 3,
                last_error: "empty response".into()
            })
        );
    }

    struct SlowTranslator;

    impl Translator for SlowTranslator {
        async fn translate(&self, _text: &str) -> Result<String, DeepSeekError> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok("too late".into())
        }
    }

    #[tokio::test]
    async fn hung_call_is_cut_off_by_deadline() {
        let started = std::time::Instant::now();
        let out = translate_with_retry(&SlowTranslator, "src", 3, Duration::from_millis(20)).await;
        assert_eq!(
            out,
            Err(FallbackReason::Exhausted {
                attempts: 3,
                last_error: "timed out after 20ms".into()
            })
        );
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    struct GaugeTranslator {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    impl Translator for GaugeTranslator {
        async fn translate(&self, text: &str) -> Result<String, DeepSeekError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(10)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(text.to_string())
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn no_more_than_worker_count_calls_in_flight() {
        let translator = Arc::new(GaugeTranslator {
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        });
        let (_registry, handle) = job();
        let input = make_batches(60, 1);

        Dispatcher::new(Arc::clone(&translator), options(8))
            .run(&input, &handle)
            .await;

        let peak = translator.peak.load(Ordering::SeqCst);
        assert!(peak <= 8, "peak in-flight calls was {peak}");
        assert!(peak >= 1);
    }

    struct JitterTranslator;

    impl Translator for JitterTranslator {
        async fn translate(&self, text: &str) -> Result<String, DeepSeekError> {
            let delay = (text.len() * 7919) % 13;
            tokio::time::sleep(Duration::from_millis(delay as u64)).await;
            Ok(text.chars().rev().collect())
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn output_does_not_depend_on_worker_count() {
        let input = make_batches(95, 4);
        let total = input.len();
        let mut outputs = Vec::new();
        for workers in [1, 8, total] {
            let (_registry, handle) = job();
            let results = Dispatcher::new(Arc::new(JitterTranslator), options(workers))
                .run(&input, &handle)
                .await;
            outputs.push(results.into_iter().map(|r| r.text).collect::<Vec<_>>());
        }
        assert_eq!(outputs[0], outputs[1]);
        assert_eq!(outputs[1], outputs[2]);
    }

    #[tokio::test]
    async fn panicking_batch_falls_back_without_hurting_siblings() {
        let (registry, handle) = job();
        let input = make_batches(6, 2);
        let translator = mock(|text| {
            if text.contains("cue 2") {
                panic!("translator exploded");
            }
            Ok(format!("ok: {text}"))
        });

        let results = Dispatcher::new(translator, options(2)).run(&input, &handle).await;

        assert_eq!(results[0].text, "ok: cue 0\n\ncue 1");
        assert_eq!(results[1].text, "cue 2\n\ncue 3");
        assert_eq!(
            results[1].outcome,
            BatchOutcome::Fallback(FallbackReason::Crashed("translator exploded".into()))
        );
        assert_eq!(results[2].text, "ok: cue 4\n\ncue 5");

        let logs = registry.poll(handle.id()).logs;
        assert!(
            logs.iter()
                .any(|e| e.message.starts_with("batch 1 raised an unexpected error"))
        );
    }

    #[tokio::test]
    async fn progress_is_logged_every_five_batches_and_at_the_end() {
        let (registry, handle) = job();
        let input = make_batches(12, 1);
        let translator = mock(|text| Ok(text.to_string()));

        Dispatcher::new(translator, options(4)).run(&input, &handle).await;

        let progress: Vec<String> = registry
            .poll(handle.id())
            .logs
            .into_iter()
            .map(|e| e.message)
            .filter(|m| m.starts_with("progress:"))
            .collect();
        assert_eq!(
            progress,
            vec![
                "progress: 41.7% (5/12)",
                "progress: 83.3% (10/12)",
                "progress: 100.0% (12/12)",
            ]
        );
    }

    #[tokio::test]
    async fn no_batches_means_no_calls() {
        let (registry, handle) = job();
        let translator = mock(|_| panic!("must not be called"));
        let results = Dispatcher::new(translator, options(8)).run(&[], &handle).await;
        assert!(results.is_empty());
        assert!(registry.poll(handle.id()).logs.is_empty());
    }

    #[test]
    fn backfill_passes_complete_slots_through() {
        let (_registry, handle) = job();
        let input = make_batches(4, 2);
        let slots = input
            .iter()
            .map(|b| {
                Some(BatchResult {
                    index: b.index,
                    text: "done".into(),
                    outcome: BatchOutcome::Translated { attempts: 1 },
                })
            })
            .collect();
        let results = backfill_missing(slots, &input, &handle);
        assert!(results.iter().all(|r| r.text == "done" && !r.is_fallback()));
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "no result for batches")]
    fn backfill_fails_loudly_in_debug_builds() {
        let (_registry, handle) = job();
        let input = make_batches(4, 2);
        backfill_missing(vec![None, None], &input, &handle);
    }
}
