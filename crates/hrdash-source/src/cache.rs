use hrdash_facts::{FactTable, SchemaSpec};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::{load_fact_table, SourceError, SourceLoader};

pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

struct Entry {
    loaded_at: Instant,
    facts: Arc<FactTable>,
}

/// Memoizes the fact table of a loader for `ttl`.
///
/// Every caller within the TTL gets the same snapshot. A failed reload keeps
/// nothing, so the next call tries again.
pub struct CachedSource {
    loader: Box<dyn SourceLoader>,
    spec: SchemaSpec,
    ttl: Duration,
    entry: Mutex<Option<Entry>>,
}

impl CachedSource {
    pub fn new(loader: Box<dyn SourceLoader>, spec: SchemaSpec, ttl: Duration) -> Self {
        Self {
            loader,
            spec,
            ttl,
            entry: Mutex::new(None),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// The cached snapshot, reloading when it is missing or expired.
    pub fn get(&self) -> Result<Arc<FactTable>, SourceError> {
        let mut entry = self.entry.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(cached) = entry.as_ref() {
            if cached.loaded_at.elapsed() < self.ttl {
                return Ok(Arc::clone(&cached.facts));
            }
            tracing::debug!(source = %self.loader.describe(), "Cached fact table expired");
        }

        *entry = None;
        let facts = Arc::new(load_fact_table(self.loader.as_ref(), &self.spec)?);
        *entry = Some(Entry {
            loaded_at: Instant::now(),
            facts: Arc::clone(&facts),
        });
        Ok(facts)
    }

    /// Drop the cached snapshot and load a fresh one.
    pub fn refresh(&self) -> Result<Arc<FactTable>, SourceError> {
        tracing::info!(source = %self.loader.describe(), "Refreshing fact table");
        self.invalidate();
        self.get()
    }

    pub fn invalidate(&self) {
        *self.entry.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }
}
