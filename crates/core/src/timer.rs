//! Wall-clock profiling for track generation and the transport solve.
//!
//! [`ProfilerScope`] measures one stage; [`Timer`] accumulates named splits and
//! renders them as a fixed-width report.
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::time::Instant;
use tracing::{info, trace};

/// Width of one report line
const REPORT_WIDTH: usize = 64;

/// A profiling scope measuring elapsed time from its creation.
///
/// Call [`ProfilerScope::record`] to add the time to a [`Timer`]; a scope dropped
/// without recording only emits a trace event.
pub struct ProfilerScope {
    start: Instant,
    name: &'static str,
    recorded: bool,
}

impl ProfilerScope {
    /// Creates a new profiling scope.
    pub fn new(name: &'static str) -> Self {
        Self {
            start: Instant::now(),
            name,
            recorded: false,
        }
    }

    /// Gets elapsed time in seconds.
    pub fn elapsed_secs(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }

    /// Adds the elapsed time to `timer` under the scope name.
    pub fn record(mut self, timer: &mut Timer) -> f64 {
        let elapsed = self.elapsed_secs();
        timer.record_split(self.name, elapsed);
        self.recorded = true;
        elapsed
    }
}

impl Drop for ProfilerScope {
    fn drop(&mut self) {
        if !self.recorded {
            trace!("{} took {:.3} ms", self.name, self.elapsed_secs() * 1000.0);
        }
    }
}

/// Accumulated named time splits, in seconds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Timer {
    splits: BTreeMap<String, f64>,
}

impl Timer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `seconds` to the split `name`, creating it if needed.
    pub fn record_split(&mut self, name: &str, seconds: f64) {
        *self.splits.entry(name.to_string()).or_insert(0.0) += seconds;
    }

    /// Time recorded for `name`, zero when absent.
    pub fn split(&self, name: &str) -> f64 {
        self.splits.get(name).copied().unwrap_or(0.0)
    }

    pub fn splits(&self) -> impl Iterator<Item = (&str, f64)> {
        self.splits.iter().map(|(k, &v)| (k.as_str(), v))
    }

    pub fn is_empty(&self) -> bool {
        self.splits.is_empty()
    }

    /// Adds every split of `other` into this timer.
    pub fn merge(&mut self, other: &Timer) {
        for (name, seconds) in other.splits() {
            self.record_split(name, seconds);
        }
    }

    pub fn clear(&mut self) {
        self.splits.clear();
    }

    /// One dotted line per split: `Transport sweep.............. 1.2345E-01 sec`
    pub fn report(&self) -> String {
        let mut out = String::new();
        for (name, seconds) in self.splits() {
            let time = format!("{seconds:.4E} sec");
            let dots = REPORT_WIDTH.saturating_sub(name.len() + time.len() + 1).max(3);
            let _ = writeln!(out, "{name}{} {time}", ".".repeat(dots));
        }
        out
    }

    /// Logs the report line by line at info level.
    pub fn log_report(&self) {
        for line in self.report().lines() {
            info!("{line}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_profiler_scope_measures_time() {
        let scope = ProfilerScope::new("test");
        thread::sleep(Duration::from_millis(10));
        let mut timer = Timer::new();
        let elapsed = scope.record(&mut timer);
        assert!(elapsed >= 0.010, "Expected at least 10ms, got {elapsed}");
        assert_eq!(timer.split("test"), elapsed);
    }

    #[test]
    fn test_splits_accumulate() {
        let mut timer = Timer::new();
        assert_eq!(timer.split("sweep"), 0.0);

        timer.record_split("sweep", 1.5);
        timer.record_split("sweep", 0.5);
        timer.record_split("source", 0.25);
        assert_eq!(timer.split("sweep"), 2.0);

        let mut total = Timer::new();
        total.merge(&timer);
        total.merge(&timer);
        assert_eq!(total.split("source"), 0.5);
    }

    #[test]
    fn test_report_has_one_aligned_line_per_split() {
        let mut timer = Timer::new();
        timer.record_split("Ray tracing", 0.125);
        timer.record_split("Transport sweep", 2.0);
        let report = timer.report();
        let lines: Vec<&str> = report.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("Ray tracing..."));
        assert!(lines[1].ends_with("sec"));
        assert_eq!(lines[0].len(), lines[1].len());
    }
}
