use super::LOG_TARGET;
use super::client::{Client, HostingApiResult};
use serde::de::IgnoredAny;

const RELEASES_PAGE_SIZE: u32 = 100;

/// Upper bound on pages requested for one repository.
const MAX_RELEASE_PAGES: u32 = 100;

/// Counts a repository's releases by paging through the releases endpoint.
#[derive(Debug, Clone)]
pub struct ReleasesCounter {
    client: Client,
}

impl ReleasesCounter {
    #[must_use]
    pub const fn new(client: Client) -> Self {
        Self { client }
    }

    /// Count the releases of `full_name` (`owner/name`).
    ///
    /// Paging stops at the first empty page or the first response that is not a
    /// success; whatever was counted up to that point is returned.
    pub async fn count_releases(&self, full_name: &str) -> u64 {
        let mut total = 0u64;

        for page in 1..=MAX_RELEASE_PAGES {
            let url = format!(
                "{}/repos/{full_name}/releases?per_page={RELEASES_PAGE_SIZE}&page={page}",
                self.client.base_url()
            );

            let resp = match self.client.api_call(&url).await {
                HostingApiResult::Success(resp, _) => resp,
                HostingApiResult::RateLimited(_) => {
                    log::warn!(target: LOG_TARGET, "Rate limited counting releases for '{full_name}', stopping at {total}");
                    return total;
                }
                HostingApiResult::NotFound(_) => {
                    log::warn!(target: LOG_TARGET, "Releases for '{full_name}' not found");
                    return total;
                }
                HostingApiResult::Failed(e, _) => {
                    log::warn!(target: LOG_TARGET, "Could not fetch releases for '{full_name}': {e:#}");
                    return total;
                }
            };

            let items = match resp.json::<Vec<IgnoredAny>>().await {
                Ok(items) => items,
                Err(e) => {
                    log::warn!(target: LOG_TARGET, "Could not parse releases page {page} for '{full_name}': {e}");
                    return total;
                }
            };

            if items.is_empty() {
                break;
            }

            total += items.len() as u64;
        }

        log::debug!(target: LOG_TARGET, "'{full_name}' has {total} release(s)");
        total
    }
}
