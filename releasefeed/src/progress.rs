//! Percentage progress reporting for single-artifact downloads.
//!
//! The backend reports transferred byte counts; callers want a percentage.
//! [`ProgressReporter`] converts one into the other against the size declared
//! in the feed and guarantees the callback's final value is exactly 100 on
//! success.

/// Progress callback receiving a percentage in `0..=100`.
///
/// Invoked inline on the transfer loop, so it must not block.
pub type ProgressCallback = Box<dyn Fn(u8) + Send + Sync>;

/// Percentage reported on completion.
pub const COMPLETE_PERCENT: u8 = 100;

/// Convert transferred bytes to a percentage of the declared size.
///
/// Returns `None` when the size is unknown (0). Values are floored and
/// clamped to 100, so a backend that delivers more than it declared never
/// produces an out-of-range percentage.
pub fn percent_of(bytes_transferred: u64, size_bytes: u64) -> Option<u8> {
    if size_bytes == 0 {
        return None;
    }
    let percent = u128::from(bytes_transferred) * 100 / u128::from(size_bytes);
    Some(percent.min(u128::from(COMPLETE_PERCENT)) as u8)
}

/// Feeds transfer progress into a percentage callback.
///
/// Every notification with a known size is forwarded, repeats included.
pub struct ProgressReporter<'a> {
    size_bytes: u64,
    callback: &'a (dyn Fn(u8) + Send + Sync),
    last_reported: Option<u8>,
}

impl<'a> ProgressReporter<'a> {
    /// Create a reporter for an artifact of `size_bytes` declared bytes.
    pub fn new(size_bytes: u64, callback: &'a (dyn Fn(u8) + Send + Sync)) -> Self {
        Self {
            size_bytes,
            callback,
            last_reported: None,
        }
    }

    /// Report an in-progress byte count.
    pub fn transferred(&mut self, bytes_transferred: u64) {
        let Some(percent) = percent_of(bytes_transferred, self.size_bytes) else {
            return;
        };
        self.last_reported = Some(percent);
        (self.callback)(percent);
    }

    /// Report completion. Always invokes the callback with 100.
    pub fn completed(&mut self) {
        self.last_reported = Some(COMPLETE_PERCENT);
        (self.callback)(COMPLETE_PERCENT);
    }

    /// Last percentage delivered to the callback.
    pub fn last_reported(&self) -> Option<u8> {
        self.last_reported
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_percent_of() {
        assert_eq!(percent_of(0, 1000), Some(0));
        assert_eq!(percent_of(999, 1000), Some(99));
        assert_eq!(percent_of(1000, 1000), Some(100));
        assert_eq!(percent_of(5, 0), None);
    }

    #[test]
    fn test_percent_of_clamps_overrun() {
        assert_eq!(percent_of(5000, 1000), Some(100));
    }

    #[test]
    fn test_percent_of_large_sizes_do_not_overflow() {
        assert_eq!(percent_of(u64::MAX / 2, u64::MAX), Some(49));
        assert_eq!(percent_of(u64::MAX, u64::MAX), Some(100));
    }

    #[test]
    fn test_reporter_forwards_each_notification_and_completes() {
        let seen = Mutex::new(Vec::new());
        let callback = |p: u8| seen.lock().unwrap().push(p);
        let mut reporter = ProgressReporter::new(1000, &callback);

        reporter.transferred(100);
        reporter.transferred(105);
        reporter.transferred(500);
        reporter.transferred(1000);
        reporter.completed();

        assert_eq!(*seen.lock().unwrap(), vec![10, 10, 50, 100, 100]);
        assert_eq!(reporter.last_reported(), Some(100));
    }

    #[test]
    fn test_reporter_unknown_size_only_completion() {
        let seen = Mutex::new(Vec::new());
        let callback = |p: u8| seen.lock().unwrap().push(p);
        let mut reporter = ProgressReporter::new(0, &callback);

        reporter.transferred(100);
        reporter.transferred(200);
        reporter.completed();

        assert_eq!(*seen.lock().unwrap(), vec![100]);
    }
}
