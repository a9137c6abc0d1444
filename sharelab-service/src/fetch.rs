//! Provider fetch bounded by an optional deadline.
//!
//! With a deadline the fetch runs on a worker thread and the caller waits on a
//! channel. A late answer is dropped with the channel, so nothing a timed-out
//! fetch returns can reach the cache.

use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use sharelab_core::data::{PriceProvider, ProviderError};
use sharelab_core::domain::{PriceRecord, Query};
use tracing::warn;

pub(crate) fn fetch_with_deadline(
    provider: &Arc<dyn PriceProvider>,
    query: &Query,
    deadline: Option<Duration>,
) -> Result<Vec<PriceRecord>, ProviderError> {
    let Some(limit) = deadline else {
        return provider.fetch_prices(query);
    };

    let (tx, rx) = mpsc::channel();
    let worker_provider = Arc::clone(provider);
    let worker_query = query.clone();
    thread::Builder::new()
        .name(format!("fetch-{}", query.symbol()))
        .spawn(move || {
            // Receiver is gone once the caller timed out.
            let _ = tx.send(worker_provider.fetch_prices(&worker_query));
        })
        .map_err(|e| ProviderError::transport_caused_by("spawn fetch worker", e))?;

    match rx.recv_timeout(limit) {
        Ok(result) => result,
        Err(RecvTimeoutError::Timeout) => {
            warn!(
                symbol = query.symbol(),
                provider = provider.name(),
                timeout_ms = limit.as_millis() as u64,
                "provider fetch timed out"
            );
            provider.record_timeout(limit);
            Err(ProviderError::Timeout(limit))
        }
        Err(RecvTimeoutError::Disconnected) => Err(ProviderError::Other(format!(
            "fetch worker for {query} exited without a result"
        ))),
    }
}
