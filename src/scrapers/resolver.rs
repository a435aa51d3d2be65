//! Detail page resolution

use super::Entry;
use futures::future::join_all;
use std::collections::HashSet;
use std::future::Future;
use tokio::sync::Semaphore;
use tracing::debug;

/// Detail fetches allowed in flight per listing
pub const DEFAULT_CONCURRENCY: usize = 3;

/// Resolves partial entries by visiting their detail pages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetailResolver {
    concurrency: usize,
}

impl Default for DetailResolver {
    fn default() -> Self {
        Self::new(DEFAULT_CONCURRENCY)
    }
}

impl DetailResolver {
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency: concurrency.max(1),
        }
    }

    /// Run `resolve` once per distinct follow-up URL and write the hashes
    /// back into the entries carrying that URL.
    ///
    /// Every task runs to completion; a task yielding `None` leaves its
    /// entries unresolved. Entry order is untouched. Returns the number of
    /// entries resolved.
    pub async fn resolve_all<F, Fut>(
        &self,
        entries: &mut [Entry],
        follow_urls: &[String],
        site: &str,
        resolve: F,
    ) -> usize
    where
        F: Fn(String) -> Fut,
        Fut: Future<Output = Option<String>>,
    {
        let mut seen = HashSet::new();
        let distinct: Vec<&str> = follow_urls
            .iter()
            .map(String::as_str)
            .filter(|url| seen.insert(*url))
            .collect();

        let gate = Semaphore::new(self.concurrency);
        let tasks = distinct.iter().map(|url| {
            let gate = &gate;
            let resolve = &resolve;
            async move {
                let _permit = gate.acquire().await.ok()?;
                let hash = resolve(url.to_string()).await?;
                Some((*url, hash))
            }
        });
        let outcomes = join_all(tasks).await;

        let mut resolved = 0;
        for (url, hash) in outcomes.into_iter().flatten() {
            for entry in entries
                .iter_mut()
                .filter(|e| e.detail_url.as_deref() == Some(url))
            {
                entry.resolve(hash.clone(), site);
                resolved += 1;
            }
        }

        debug!(
            site,
            requested = distinct.len(),
            resolved,
            "detail resolution finished"
        );
        resolved
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn partial_entries(n: usize) -> (Vec<Entry>, Vec<String>) {
        let entries: Vec<Entry> = (0..n)
            .map(|i| Entry::partial(format!("torrent {i}"), format!("https://site.test/t/{i}")))
            .collect();
        let urls = entries.iter().filter_map(|e| e.detail_url.clone()).collect();
        (entries, urls)
    }

    fn hash_for(url: &str) -> String {
        format!("{:040x}", url.len())
    }

    #[tokio::test]
    async fn never_exceeds_concurrency_limit() {
        let (mut entries, urls) = partial_entries(12);
        let in_flight = AtomicUsize::new(0);
        let peak = AtomicUsize::new(0);

        let resolver = DetailResolver::new(3);
        let resolved = resolver
            .resolve_all(&mut entries, &urls, "https://site.test", |url| {
                let in_flight = &in_flight;
                let peak = &peak;
                async move {
                    let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    in_flight.fetch_sub(1, Ordering::SeqCst);
                    Some(hash_for(&url))
                }
            })
            .await;

        assert_eq!(resolved, 12);
        assert_eq!(peak.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn failed_resolutions_keep_their_entries() {
        let (mut entries, urls) = partial_entries(5);

        let resolved = DetailResolver::default()
            .resolve_all(&mut entries, &urls, "https://site.test", |url| async move {
                if url.ends_with("/3") {
                    None
                } else {
                    Some(hash_for(&url))
                }
            })
            .await;

        assert_eq!(resolved, 4);
        assert_eq!(entries.len(), 5);
        assert_eq!(entries[3].name, "torrent 3");
        assert_eq!(entries[3].infohash, None);
        assert_eq!(entries[3].detail_url.as_deref(), Some("https://site.test/t/3"));
        for i in [0, 1, 2, 4] {
            assert!(entries[i].is_resolved());
            assert_eq!(entries[i].detail_url, None);
            assert_eq!(entries[i].site.as_deref(), Some("https://site.test"));
        }
    }

    #[tokio::test]
    async fn order_follows_the_listing_not_completion() {
        let (mut entries, urls) = partial_entries(4);

        DetailResolver::new(4)
            .resolve_all(&mut entries, &urls, "s", |url| async move {
                // later entries finish first
                let index: u64 = url.rsplit('/').next()?.parse().ok()?;
                tokio::time::sleep(Duration::from_millis(40 - index * 10)).await;
                Some(format!("{index:040}"))
            })
            .await;

        let hashes: Vec<_> = entries.iter().map(|e| e.infohash.clone().unwrap()).collect();
        assert_eq!(hashes, vec![format!("{:040}", 0), format!("{:040}", 1), format!("{:040}", 2), format!("{:040}", 3)]);
    }

    #[tokio::test]
    async fn shared_urls_are_fetched_once() {
        let mut entries = vec![
            Entry::partial("a", "https://site.test/same"),
            Entry::partial("b", "https://site.test/same"),
        ];
        let urls: Vec<String> = entries.iter().filter_map(|e| e.detail_url.clone()).collect();
        let calls = AtomicUsize::new(0);

        let resolved = DetailResolver::default()
            .resolve_all(&mut entries, &urls, "s", |url| {
                let calls = &calls;
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Some(hash_for(&url))
                }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(resolved, 2);
        assert!(entries.iter().all(Entry::is_resolved));
    }
}
