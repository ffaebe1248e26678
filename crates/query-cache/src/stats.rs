//! Cache statistics tracking

use std::sync::atomic::{AtomicU64, Ordering};

/// Read counters kept by the logging decorator
#[derive(Debug, Default)]
pub struct CacheStats {
    /// Number of reads
    requests: AtomicU64,
    /// Number of reads answered with an entry
    hits: AtomicU64,
}

impl CacheStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one read, and a hit if it found an entry
    pub fn record_read(&self, hit: bool) {
        self.requests.fetch_add(1, Ordering::Relaxed);
        if hit {
            self.hits.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn requests(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.requests().saturating_sub(self.hits())
    }

    /// Fraction of reads that hit (0.0 to 1.0)
    pub fn hit_ratio(&self) -> f64 {
        match self.requests() {
            0 => 0.0,
            requests => self.hits() as f64 / requests as f64,
        }
    }

    pub fn reset(&self) {
        self.requests.store(0, Ordering::Relaxed);
        self.hits.store(0, Ordering::Relaxed);
    }
}

impl Clone for CacheStats {
    fn clone(&self) -> Self {
        Self {
            requests: AtomicU64::new(self.requests()),
            hits: AtomicU64::new(self.hits()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_recording() {
        let stats = CacheStats::new();
        stats.record_read(true);
        stats.record_read(true);
        stats.record_read(false);

        assert_eq!(stats.requests(), 3);
        assert_eq!(stats.hits(), 2);
        assert_eq!(stats.misses(), 1);
    }

    #[test]
    fn test_hit_ratio() {
        let stats = CacheStats::new();
        assert_eq!(stats.hit_ratio(), 0.0);

        stats.record_read(true);
        stats.record_read(false);
        assert!((stats.hit_ratio() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_reset_and_clone() {
        let stats = CacheStats::new();
        stats.record_read(true);
        let snapshot = stats.clone();

        stats.reset();
        assert_eq!(stats.requests(), 0);
        assert_eq!(snapshot.hits(), 1);
    }
}
