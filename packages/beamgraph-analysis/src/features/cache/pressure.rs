/*
 * Memory pressure handling
 *
 * Four escalating levels, each strictly more aggressive than the last and
 * idempotent (safe to invoke repeatedly):
 * 1. clear the cheapest cache (query results)
 * 2. additionally compress rarely-accessed analysis data
 * 3. additionally evict stale analysis entries past the age threshold
 * 4. clear all caches and release everything still held
 */

use tracing::{info, warn};

use super::store::AnalysisCaches;
use super::types::CacheKind;

/// Escalating memory pressure levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MemoryPressureLevel {
    Low = 1,
    Medium = 2,
    High = 3,
    Critical = 4,
}

impl MemoryPressureLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemoryPressureLevel::Low => "low",
            MemoryPressureLevel::Medium => "medium",
            MemoryPressureLevel::High => "high",
            MemoryPressureLevel::Critical => "critical",
        }
    }
}

impl AnalysisCaches {
    /// Apply the eviction policy for a pressure level. Higher levels
    /// include everything the lower levels do.
    pub fn handle_memory_pressure(&self, level: MemoryPressureLevel) {
        info!(level = level.as_str(), "memory pressure");

        // Level 1+: the query-result cache is pure derived data, drop it
        self.clear(CacheKind::QueryResult);

        if level >= MemoryPressureLevel::Medium {
            let compressed = self.compress_rare(CacheKind::Analysis)
                + self.compress_rare(CacheKind::Cpg);
            if compressed > 0 {
                info!(compressed, "compressed rarely-accessed entries");
            }
        }

        if level >= MemoryPressureLevel::High {
            let evicted =
                self.evict_stale(CacheKind::Analysis) + self.evict_stale(CacheKind::Cpg);
            if evicted > 0 {
                info!(evicted, "evicted stale analysis entries");
            }
        }

        if level >= MemoryPressureLevel::Critical {
            warn!("critical memory pressure, clearing all caches");
            self.clear_all();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_low_pressure_clears_query_cache_only() {
        let caches = AnalysisCaches::default();
        caches.put(CacheKind::QueryResult, "q", json!(1));
        caches.put(CacheKind::Analysis, "a", json!(2));

        caches.handle_memory_pressure(MemoryPressureLevel::Low);

        assert_eq!(caches.get(CacheKind::QueryResult, "q"), None);
        assert_eq!(caches.get(CacheKind::Analysis, "a"), Some(json!(2)));
    }

    #[test]
    fn test_critical_pressure_clears_everything() {
        let caches = AnalysisCaches::default();
        caches.put(CacheKind::QueryResult, "q", json!(1));
        caches.put(CacheKind::Analysis, "a", json!(2));
        caches.put(CacheKind::Cpg, "c", json!(3));

        caches.handle_memory_pressure(MemoryPressureLevel::Critical);

        for kind in CacheKind::all() {
            assert_eq!(caches.stats(kind).len, 0);
        }
    }

    #[test]
    fn test_pressure_is_idempotent() {
        let caches = AnalysisCaches::default();
        caches.put(CacheKind::Analysis, "a", json!({"x": 1}));

        caches.handle_memory_pressure(MemoryPressureLevel::Medium);
        caches.handle_memory_pressure(MemoryPressureLevel::Medium);

        // Compressed data remains readable after repeated invocations
        assert_eq!(caches.get(CacheKind::Analysis, "a"), Some(json!({"x": 1})));
    }

    #[test]
    fn test_levels_are_ordered() {
        assert!(MemoryPressureLevel::Low < MemoryPressureLevel::Medium);
        assert!(MemoryPressureLevel::High < MemoryPressureLevel::Critical);
    }
}
