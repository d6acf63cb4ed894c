//! Compiled permission pattern cache
//!
//! Permission specifiers are compiled to [`Regex`] once per distinct text and
//! shared between every role that uses them. Specifiers that fail to compile
//! are remembered too, so they are never recompiled.

use dashmap::DashMap;
use regex::Regex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Thread-safe cache of compiled permission patterns
#[derive(Debug, Default)]
pub struct PatternCache {
    /// Specifier text -> compiled pattern (`None` when compilation failed)
    patterns: DashMap<String, Option<Arc<Regex>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl PatternCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile `spec`, reusing a cached program when one exists.
    ///
    /// Returns `None` when `spec` is not valid pattern syntax; such a
    /// specifier can only ever match by literal comparison.
    pub fn compile(&self, spec: &str) -> Option<Arc<Regex>> {
        if let Some(entry) = self.patterns.get(spec) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return entry.value().clone();
        }

        self.misses.fetch_add(1, Ordering::Relaxed);

        let compiled = match Regex::new(spec) {
            Ok(re) => Some(Arc::new(re)),
            Err(e) => {
                debug!("Permission '{}' is literal-only: {}", spec, e);
                None
            }
        };

        self.patterns
            .entry(spec.to_string())
            .or_insert(compiled)
            .value()
            .clone()
    }

    /// Drop every cached pattern and reset the counters
    pub fn clear(&self) {
        self.patterns.clear();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        let entries = self.patterns.len();
        let literal_only = self.patterns.iter().filter(|e| e.value().is_none()).count();

        CacheStats {
            entries,
            literal_only,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

/// Cache statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of distinct specifiers seen
    pub entries: usize,
    /// Specifiers that did not compile
    pub literal_only: usize,
    pub hits: u64,
    pub misses: u64,
}

impl CacheStats {
    /// Calculates the cache hit rate
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
