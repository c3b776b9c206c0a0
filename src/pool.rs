// ABOUTME: Bounded render pool for the html2pptx application
// ABOUTME: Renders documents cooperatively while capping how many are in flight at once

use crate::locate::DocumentRef;
use crate::render::{PageRenderer, RenderResult};
use futures::stream::{FuturesUnordered, StreamExt};
use log::{info, warn};
use std::future::Future;
use std::time::Instant;

/// Set of in-flight futures, completed in whatever order they finish.
///
/// Futures only make progress while [`TaskQueue::next_completion`] is being
/// awaited, so everything runs on the caller's task.
pub struct TaskQueue<F: Future> {
    in_flight: FuturesUnordered<F>,
    peak: usize,
}

impl<F: Future> Default for TaskQueue<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: Future> TaskQueue<F> {
    pub fn new() -> Self {
        Self {
            in_flight: FuturesUnordered::new(),
            peak: 0,
        }
    }

    /// Add a future to the in-flight set
    pub fn submit(&mut self, task: F) {
        self.in_flight.push(task);
        self.peak = self.peak.max(self.in_flight.len());
    }

    /// Wait for any in-flight future to finish; `None` once the set is empty
    pub async fn next_completion(&mut self) -> Option<F::Output> {
        self.in_flight.next().await
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Largest in-flight count seen so far
    pub fn peak(&self) -> usize {
        self.peak
    }
}

/// Render every document with at most `concurrency` renders in flight.
///
/// Results come back in completion order, one per document; each carries
/// its [`DocumentRef`] so callers can restore document order.
pub async fn render_all<R: PageRenderer>(
    renderer: &R,
    documents: &[DocumentRef],
    concurrency: usize,
) -> Vec<RenderResult> {
    let limit = concurrency.max(1);
    let total = documents.len();
    let start_time = Instant::now();
    info!(
        "Rendering {} documents with up to {} at a time",
        total, limit
    );

    let mut queue = TaskQueue::new();
    let mut results = Vec::with_capacity(total);

    for document in documents {
        if queue.in_flight() >= limit {
            if let Some(result) = queue.next_completion().await {
                record(&result, results.len() + 1, total);
                results.push(result);
            }
        }
        queue.submit(renderer.render(document));
    }

    while let Some(result) = queue.next_completion().await {
        record(&result, results.len() + 1, total);
        results.push(result);
    }

    let failed = results.iter().filter(|r| r.error().is_some()).count();
    info!(
        "Rendered {}/{} documents in {:.2} seconds ({} failed, peak concurrency {})",
        total - failed,
        total,
        start_time.elapsed().as_secs_f64(),
        failed,
        queue.peak()
    );
    results
}

fn record(result: &RenderResult, done: usize, total: usize) {
    match result.error() {
        None => info!("[{}/{}] Rendered {}", done, total, result.document.name()),
        Some(e) => warn!(
            "[{}/{}] Failed to render {}: {}",
            done,
            total,
            result.document.name(),
            e
        ),
    }
}
