use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::extract::SnippetExtractor;
use crate::{BatchError, FetchFailure, Report};

/// Batch coordinator: owns the URL list, launches one task per URL in
/// bounded waves, and drains the per-URL outcomes into a [`Report`].
pub struct SnippetHarvester {
    urls: Vec<String>,
    extractor: Arc<SnippetExtractor>,
}

impl SnippetHarvester {
    /// Configuration is passed in here; the harvester keeps no global
    /// state and can be shared freely behind an `Arc`.
    pub fn new(urls: Vec<String>, extractor: Arc<SnippetExtractor>) -> Self {
        Self { urls, extractor }
    }

    pub fn url_count(&self) -> usize {
        self.urls.len()
    }

    /// Fetch every configured URL, at most `wave_size` concurrently.
    ///
    /// Tasks are launched in waves: once `wave_size` tasks are in flight
    /// the coordinator waits for all of them before launching more. Each
    /// task deposits exactly one outcome on exactly one channel, so after
    /// the final barrier the drained counts always add up to the number of
    /// launched URLs.
    ///
    /// Cancelling `cancel` aborts in-flight fetches and stops further
    /// launches; the report then holds whatever outcomes completed first.
    pub async fn fetch_all(
        &self,
        wave_size: usize,
        cancel: CancellationToken,
    ) -> Result<Report, BatchError> {
        if wave_size == 0 {
            return Err(BatchError::InvalidWorkerCount(wave_size));
        }

        log::info!(
            "starting batch fetch of {} urls with wave size {}",
            self.urls.len(),
            wave_size
        );

        // Sized to the full URL count so no task ever blocks on send.
        let capacity = self.urls.len().max(1);
        let (success_tx, mut success_rx) = mpsc::channel::<String>(capacity);
        let (failure_tx, mut failure_rx) = mpsc::channel::<FetchFailure>(capacity);

        let mut units: Vec<JoinHandle<()>> = Vec::new();
        for (i, url) in self.urls.iter().enumerate() {
            if i % wave_size == 0 && i != 0 {
                log::debug!("wave boundary at url index {i}, waiting");
                for unit in units.drain(..) {
                    let _ = unit.await;
                }
            }

            if cancel.is_cancelled() {
                log::warn!("batch cancelled before url index {i}, stopping launches");
                break;
            }

            let extractor = self.extractor.clone();
            let url = url.clone();
            let success_tx = success_tx.clone();
            let failure_tx = failure_tx.clone();
            let cancel = cancel.clone();
            units.push(tokio::spawn(async move {
                tokio::select! {
                    // Dropping the extract future here aborts the
                    // underlying request; a cancelled task reports nothing.
                    _ = cancel.cancelled() => {}
                    outcome = extractor.extract(&url) => match outcome {
                        Ok(text) => {
                            let _ = success_tx.send(text).await;
                        }
                        Err(failure) => {
                            let _ = failure_tx.send(failure).await;
                        }
                    },
                }
            }));
        }

        // Final barrier: every outstanding task, not just the last wave,
        // must have reported before the channels are closed.
        for unit in units.drain(..) {
            let _ = unit.await;
        }
        drop(success_tx);
        drop(failure_tx);

        let mut report = Report::default();
        while let Some(text) = success_rx.recv().await {
            report.success_items.push(text);
            report.success_count += 1;
        }
        while let Some(failure) = failure_rx.recv().await {
            log::error!("error fetching: {failure}");
            report.error_items.push(failure);
            report.error_count += 1;
        }

        log::info!(
            "batch finished: {} ok, {} failed",
            report.success_count,
            report.error_count
        );
        Ok(report)
    }
}
