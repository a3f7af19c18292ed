//! Per-run counters reported when a raster finishes.

use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, Default)]
pub struct RunStats {
    /// Tiles the planner produced
    pub tiles_planned: usize,

    /// Tiles composed and written this run
    pub tiles_written: usize,

    /// Tiles already on disk from an earlier run
    pub tiles_skipped: usize,

    /// Tiles dropped by the compositor's consistency check
    pub tiles_dropped: usize,

    /// Chunk buffers decoded (each chunk at most once)
    pub chunks_decoded: usize,

    pub elapsed: Duration,
}

impl RunStats {
    /// Fold another raster's counters into a batch total.
    pub fn merge(&mut self, other: &RunStats) {
        self.tiles_planned += other.tiles_planned;
        self.tiles_written += other.tiles_written;
        self.tiles_skipped += other.tiles_skipped;
        self.tiles_dropped += other.tiles_dropped;
        self.chunks_decoded += other.chunks_decoded;
        self.elapsed += other.elapsed;
    }
}

impl fmt::Display for RunStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} tiles planned, {} written, {} skipped, {} dropped, {} chunks decoded in {:.1}s",
            self.tiles_planned,
            self.tiles_written,
            self.tiles_skipped,
            self.tiles_dropped,
            self.chunks_decoded,
            self.elapsed.as_secs_f64()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_accumulates() {
        let mut total = RunStats::default();
        total.merge(&RunStats {
            tiles_planned: 4,
            tiles_written: 3,
            tiles_skipped: 1,
            tiles_dropped: 0,
            chunks_decoded: 2,
            elapsed: Duration::from_secs(1),
        });
        total.merge(&RunStats {
            tiles_planned: 2,
            tiles_written: 2,
            ..Default::default()
        });
        assert_eq!(total.tiles_planned, 6);
        assert_eq!(total.tiles_written, 5);
        assert_eq!(total.tiles_skipped, 1);
    }

    #[test]
    fn test_display_mentions_counts() {
        let stats = RunStats {
            tiles_planned: 9,
            tiles_written: 8,
            tiles_skipped: 1,
            ..Default::default()
        };
        let text = stats.to_string();
        assert!(text.contains("9 tiles planned"));
        assert!(text.contains("8 written"));
    }
}
