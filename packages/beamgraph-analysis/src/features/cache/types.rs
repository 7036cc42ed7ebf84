//! Core cache types

use serde_json::Value;
use std::time::{Duration, Instant};

/// The three named caches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheKind {
    QueryResult,
    Analysis,
    Cpg,
}

impl CacheKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheKind::QueryResult => "query_result",
            CacheKind::Analysis => "analysis",
            CacheKind::Cpg => "cpg",
        }
    }

    pub fn all() -> [CacheKind; 3] {
        [CacheKind::QueryResult, CacheKind::Analysis, CacheKind::Cpg]
    }
}

/// Per-cache capacity and TTL configuration
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub query_capacity: usize,
    pub query_ttl: Duration,
    pub analysis_capacity: usize,
    pub analysis_ttl: Duration,
    pub cpg_capacity: usize,
    pub cpg_ttl: Duration,
    /// Pressure level 3: evict analysis entries older than this
    pub stale_age: Duration,
    /// Pressure level 2: compress entries accessed fewer times than this
    pub rare_access_threshold: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            query_capacity: 500,
            query_ttl: Duration::from_secs(60),
            analysis_capacity: 200,
            analysis_ttl: Duration::from_secs(300),
            cpg_capacity: 100,
            cpg_ttl: Duration::from_secs(600),
            stale_age: Duration::from_secs(600),
            rare_access_threshold: 2,
        }
    }
}

/// Cached value: live JSON, or its compact serialized form after the
/// compression pressure level ran over it
#[derive(Debug, Clone)]
pub enum CachedArtifact {
    Json(Value),
    Compressed(Vec<u8>),
}

/// One cache slot with its bookkeeping
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub value: CachedArtifact,
    pub inserted: Instant,
    pub last_access: Instant,
    pub access_count: u64,
}

impl CacheEntry {
    pub fn new(value: Value) -> Self {
        let now = Instant::now();
        Self {
            value: CachedArtifact::Json(value),
            inserted: now,
            last_access: now,
            access_count: 0,
        }
    }
}

/// Hit/miss/eviction counters for one cache
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub expirations: u64,
    pub len: usize,
}
