//! Progress-callback trait for footnote title-resolution events.
//!
//! Inject an [`Arc<dyn ConversionProgressCallback>`] via
//! [`crate::config::ConversionConfigBuilder::progress_callback`] to receive
//! events as the pipeline looks up each footnote URL. Callers can forward
//! them to a channel, a log, or a terminal progress bar; the library does not
//! care. The trait is `Send + Sync` because lookups run concurrently.
//!
//! # Example
//!
//! ```rust
//! use edgequake_html2md::{ConversionProgressCallback, ConversionConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     resolved: Arc<AtomicUsize>,
//! }
//!
//! impl ConversionProgressCallback for CountingCallback {
//!     fn on_footnote_complete(&self, number: u32, total: usize, title: &str) {
//!         let done = self.resolved.fetch_add(1, Ordering::SeqCst) + 1;
//!         eprintln!("[^{}] {} ({}/{})", number, title, done, total);
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback {
//!     resolved: Arc::new(AtomicUsize::new(0)),
//! });
//!
//! let config = ConversionConfig::builder()
//!     .resolve_titles(true)
//!     .progress_callback(counter as Arc<dyn ConversionProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the conversion pipeline while it resolves footnote titles.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
///
/// # Thread safety
///
/// `on_footnote_start`, `on_footnote_complete` and `on_footnote_error` may be
/// called concurrently from different tasks. Implementations must protect
/// shared mutable state (e.g. `Mutex`, `AtomicUsize`).
pub trait ConversionProgressCallback: Send + Sync {
    /// Called once before the first lookup.
    ///
    /// # Arguments
    /// * `total`: number of distinct footnote URLs that will be fetched
    fn on_resolution_start(&self, total: usize) {
        let _ = total;
    }

    /// Called just before the request for a footnote URL is sent.
    fn on_footnote_start(&self, number: u32, total: usize) {
        let _ = (number, total);
    }

    /// Called when a title was found (or a placeholder title was chosen for a
    /// document without one).
    fn on_footnote_complete(&self, number: u32, total: usize, title: &str) {
        let _ = (number, total, title);
    }

    /// Called when a lookup failed after all retries.
    ///
    /// # Arguments
    /// * `error`: human-readable error description
    fn on_footnote_error(&self, number: u32, total: usize, error: &str) {
        let _ = (number, total, error);
    }

    /// Called once after every URL has been attempted.
    ///
    /// # Arguments
    /// * `success_count`: lookups that finished without error
    fn on_resolution_complete(&self, total: usize, success_count: usize) {
        let _ = (total, success_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ConversionConfig`].
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct TrackingCallback {
        starts: AtomicUsize,
        completes: AtomicUsize,
        errors: AtomicUsize,
        total: AtomicUsize,
        successes: AtomicUsize,
        titles: Mutex<Vec<String>>,
    }

    impl ConversionProgressCallback for TrackingCallback {
        fn on_resolution_start(&self, total: usize) {
            self.total.store(total, Ordering::SeqCst);
        }

        fn on_footnote_start(&self, _number: u32, _total: usize) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_footnote_complete(&self, _number: u32, _total: usize, title: &str) {
            self.completes.fetch_add(1, Ordering::SeqCst);
            self.titles.lock().unwrap().push(title.to_string());
        }

        fn on_footnote_error(&self, _number: u32, _total: usize, _error: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }

        fn on_resolution_complete(&self, _total: usize, success_count: usize) {
            self.successes.store(success_count, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_resolution_start(2);
        cb.on_footnote_start(1, 2);
        cb.on_footnote_complete(1, 2, "Title");
        cb.on_footnote_error(2, 2, "timeout");
        cb.on_resolution_complete(2, 1);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();

        tracker.on_resolution_start(3);
        tracker.on_footnote_start(1, 3);
        tracker.on_footnote_complete(1, 3, "Rust");
        tracker.on_footnote_start(2, 3);
        tracker.on_footnote_complete(2, 3, "Untitled PDF");
        tracker.on_footnote_start(3, 3);
        tracker.on_footnote_error(3, 3, "HTTP 404");
        tracker.on_resolution_complete(3, 2);

        assert_eq!(tracker.total.load(Ordering::SeqCst), 3);
        assert_eq!(tracker.starts.load(Ordering::SeqCst), 3);
        assert_eq!(tracker.completes.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.errors.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.successes.load(Ordering::SeqCst), 2);
        assert_eq!(*tracker.titles.lock().unwrap(), vec!["Rust", "Untitled PDF"]);
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_resolution_start(10);
        cb.on_footnote_start(1, 10);
    }
}
