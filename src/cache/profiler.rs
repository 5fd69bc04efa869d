//! Per-group timing and cache counters.

use std::fmt;
use std::time::{Duration, Instant};

/// Counters for one resource group's scripting pass.
#[derive(Debug, Clone)]
pub struct GroupProfile {
    pub group: String,
    /// Script count announced when the group started.
    pub script_count: usize,
    /// Scripts served from the cache.
    pub hits: usize,
    /// Eligible scripts with no cache file.
    pub misses: usize,
    /// Scripts re-parsed because the source changed.
    pub stale: usize,
    /// Cache files written.
    pub stored: usize,
    /// Compiled trees not cached because compilation reported errors.
    pub skipped_invalid: usize,
    /// Cache files that failed to decode.
    pub corrupt: usize,
    started: Instant,
    elapsed: Option<Duration>,
}

impl GroupProfile {
    pub fn start(group: impl Into<String>, script_count: usize) -> Self {
        Self {
            group: group.into(),
            script_count,
            hits: 0,
            misses: 0,
            stale: 0,
            stored: 0,
            skipped_invalid: 0,
            corrupt: 0,
            started: Instant::now(),
            elapsed: None,
        }
    }

    /// Stop the clock. Later calls keep the first measurement.
    pub fn finish(&mut self) {
        if self.elapsed.is_none() {
            self.elapsed = Some(self.started.elapsed());
        }
    }

    /// Time spent so far, or the total once finished.
    pub fn elapsed(&self) -> Duration {
        self.elapsed.unwrap_or_else(|| self.started.elapsed())
    }

    pub fn is_finished(&self) -> bool {
        self.elapsed.is_some()
    }
}

impl fmt::Display for GroupProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} scripts parsed in {:.3} seconds (hits: {}, misses: {}, stale: {}, stored: {}, skipped invalid: {}, corrupt: {})",
            self.group,
            self.script_count,
            self.elapsed().as_secs_f64(),
            self.hits,
            self.misses,
            self.stale,
            self.stored,
            self.skipped_invalid,
            self.corrupt
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_line() {
        let mut profile = GroupProfile::start("General", 4);
        profile.hits = 3;
        profile.misses = 1;
        profile.finish();
        let line = profile.to_string();
        assert!(line.starts_with("[General] 4 scripts parsed in "));
        assert!(line.contains("hits: 3"));
        assert!(line.contains("misses: 1"));
    }

    #[test]
    fn test_finish_freezes_elapsed() {
        let mut profile = GroupProfile::start("g", 0);
        assert!(!profile.is_finished());
        profile.finish();
        let first = profile.elapsed();
        std::thread::sleep(Duration::from_millis(5));
        profile.finish();
        assert_eq!(profile.elapsed(), first);
    }
}
