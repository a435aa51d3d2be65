//! Mirror selection for sites with several live domains

use super::Fetcher;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Picks the first mirror that answers
#[derive(Debug, Clone)]
pub struct MirrorSelector {
    fetcher: Fetcher,
    timeout: Duration,
}

impl MirrorSelector {
    pub fn new(fetcher: Fetcher, timeout: Duration) -> Self {
        Self { fetcher, timeout }
    }

    /// Probe `candidates` in order and return the first one answering 200.
    ///
    /// Later candidates are not tried once one succeeds. Falls back to
    /// `default` when none answer.
    pub async fn select(&self, candidates: &[String], default: &str) -> String {
        for candidate in candidates {
            if self.fetcher.probe(candidate, self.timeout).await {
                info!(mirror = %candidate, "using mirror");
                return candidate.clone();
            }
            debug!(mirror = %candidate, "mirror did not answer");
        }

        warn!(default, "no mirror answered, using default");
        default.to_string()
    }
}
