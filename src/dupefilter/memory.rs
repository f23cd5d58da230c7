use crate::dupefilter::{DupeFilter, FilterResult};
use crate::request::Request;
use std::collections::HashSet;

/// Duplicate filter keeping request fingerprints in memory
#[derive(Debug, Default)]
pub struct MemoryDupeFilter {
    fingerprints: HashSet<String>,
}

impl MemoryDupeFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct requests seen
    pub fn len(&self) -> usize {
        self.fingerprints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fingerprints.is_empty()
    }
}

impl DupeFilter for MemoryDupeFilter {
    fn open(&mut self) -> FilterResult<()> {
        Ok(())
    }

    fn request_seen(&mut self, request: &Request) -> FilterResult<bool> {
        Ok(!self.fingerprints.insert(request.fingerprint()))
    }

    fn close(&mut self, reason: &str) -> FilterResult<()> {
        tracing::debug!(
            "Closing memory dupefilter ({} fingerprints, reason: {})",
            self.fingerprints.len(),
            reason
        );
        self.fingerprints.clear();
        Ok(())
    }
}
