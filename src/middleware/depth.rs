//! Depth tracking for follow-up requests
//!
//! Each request produced for a response is one level deeper than the
//! response's own request. Depth feeds back into priority and can cap how far
//! a crawl wanders from its seeds.

use crate::config::DepthConfig;
use crate::middleware::{Response, SpiderOutput};
use crate::request::Request;
use crate::stats::{self, StatsCollector};
use std::sync::Arc;

/// Stamps, reprioritizes and filters follow-up requests by depth
pub struct DepthMiddleware {
    max_depth: u32,
    priority_weight: i32,
    stats: Option<Arc<dyn StatsCollector>>,
    verbose_stats: bool,
}

impl std::fmt::Debug for DepthMiddleware {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DepthMiddleware")
            .field("max_depth", &self.max_depth)
            .field("priority_weight", &self.priority_weight)
            .field("stats", &self.stats.is_some())
            .field("verbose_stats", &self.verbose_stats)
            .finish()
    }
}

impl DepthMiddleware {
    /// Creates the middleware
    ///
    /// # Arguments
    ///
    /// * `config` - Depth limit, priority weight and stats switches
    /// * `stats` - Sink for depth statistics, used only when `config.stats` is set
    pub fn new(config: &DepthConfig, stats: Option<Arc<dyn StatsCollector>>) -> Self {
        Self {
            max_depth: config.limit,
            priority_weight: config.priority,
            stats: if config.stats { stats } else { None },
            verbose_stats: config.stats_verbose,
        }
    }

    /// Filters the output a spider produced for `response`
    ///
    /// Requests are stamped with `depth = parent depth + 1`, get
    /// `depth * weight` added to their priority, and are dropped when they
    /// exceed the depth limit. Items pass through untouched and the relative
    /// order of the survivors is kept.
    ///
    /// A response whose request has no depth yet is a crawl root: it is
    /// treated as depth 0 (and stamped so when stats are collected). An
    /// existing depth entry is never overwritten, even when unreadable.
    ///
    /// The returned iterator is lazy; each candidate is examined once, as it
    /// is pulled.
    pub fn process_spider_output<'a, I>(
        &'a self,
        response: &mut Response,
        result: I,
    ) -> impl Iterator<Item = SpiderOutput> + 'a
    where
        I: IntoIterator<Item = SpiderOutput>,
        I::IntoIter: 'a,
    {
        if let Some(stats) = &self.stats {
            if !response.request.has_depth() {
                response.request.set_depth(0);
                if self.verbose_stats {
                    stats.inc_value(&stats::depth_count_key(0), 1);
                }
            }
        }

        let parent_depth = response.request.depth().unwrap_or(0);
        tracing::trace!(
            "Processing spider output of {} (depth {})",
            response.url,
            parent_depth
        );

        result.into_iter().filter_map(move |output| match output {
            SpiderOutput::Request(request) => {
                self.admit(request, parent_depth).map(SpiderOutput::Request)
            }
            item => Some(item),
        })
    }

    fn admit(&self, mut request: Request, parent_depth: u32) -> Option<Request> {
        let depth = parent_depth.saturating_add(1);
        request.set_depth(depth);

        if self.priority_weight != 0 {
            let adjusted =
                i64::from(request.priority) + i64::from(depth) * i64::from(self.priority_weight);
            request.priority = adjusted.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32;
        }

        if self.max_depth != 0 && depth > self.max_depth {
            tracing::debug!("Ignoring link (depth > {}): {}", self.max_depth, request.url);
            return None;
        }

        if let Some(stats) = &self.stats {
            if self.verbose_stats {
                stats.inc_value(&stats::depth_count_key(depth), 1);
            }
            stats.max_value(stats::DEPTH_MAX, i64::from(depth));
        }

        Some(request)
    }
}
