use super::client::{Client, HostingApiResult};
use super::{LOG_TARGET, RepositoryDescriptor};
use serde::Deserialize;
use url::Url;

/// The largest page the search endpoint will serve.
pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Deserialize)]
struct SearchPage {
    items: Vec<serde_json::Value>,
}

/// Pages through the repository search endpoint, most-starred first.
#[derive(Debug, Clone)]
pub struct CatalogFetcher {
    client: Client,
    language: String,
    page_size: u32,
}

impl CatalogFetcher {
    #[must_use]
    pub fn new(client: Client, language: impl Into<String>, page_size: u32) -> Self {
        Self {
            client,
            language: language.into(),
            page_size: page_size.clamp(1, MAX_PAGE_SIZE),
        }
    }

    /// Fetch the first `page_count` pages and concatenate them in API order.
    ///
    /// Pages that fail are skipped, so the result is best-effort up to
    /// `page_count * page_size` descriptors.
    pub async fn fetch_catalog(&self, page_count: u32) -> Vec<RepositoryDescriptor> {
        let mut catalog = Vec::new();
        for page in 1..=page_count {
            catalog.extend(self.fetch_page(page).await);
        }

        log::info!(target: LOG_TARGET, "Catalog holds {} {} repositories", catalog.len(), self.language);
        catalog
    }

    /// Fetch one 1-based page of the catalog.
    ///
    /// Any failure is logged and yields an empty page; there is no retry.
    pub async fn fetch_page(&self, page: u32) -> Vec<RepositoryDescriptor> {
        let url = match self.page_url(page) {
            Ok(url) => url,
            Err(e) => {
                log::error!(target: LOG_TARGET, "Could not build catalog URL for page {page}: {e}");
                return Vec::new();
            }
        };

        log::debug!(target: LOG_TARGET, "Fetching catalog page {page}");

        let resp = match self.client.api_call(url.as_str()).await {
            HostingApiResult::Success(resp, rate_limit) => {
                if let Some(rl) = rate_limit {
                    log::debug!(target: LOG_TARGET, "{} search requests left before {}", rl.remaining, rl.reset_at.format("%T"));
                }
                resp
            }
            HostingApiResult::RateLimited(rl) => {
                log::warn!(
                    target: LOG_TARGET,
                    "Rate limited fetching catalog page {page}, quota resets at {}",
                    rl.reset_at.with_timezone(&chrono::Local).format("%T")
                );
                return Vec::new();
            }
            HostingApiResult::NotFound(_) => {
                log::warn!(target: LOG_TARGET, "Catalog page {page} not found");
                return Vec::new();
            }
            HostingApiResult::Failed(e, _) => {
                log::warn!(target: LOG_TARGET, "Could not fetch catalog page {page}: {e:#}");
                return Vec::new();
            }
        };

        let body = match resp.bytes().await {
            Ok(body) => body,
            Err(e) => {
                log::warn!(target: LOG_TARGET, "Could not read catalog page {page}: {e}");
                return Vec::new();
            }
        };

        let search = match serde_json::from_slice::<SearchPage>(&body) {
            Ok(search) => search,
            Err(e) => {
                log::warn!(target: LOG_TARGET, "Could not parse catalog page {page}: {e}");
                return Vec::new();
            }
        };

        search
            .items
            .into_iter()
            .enumerate()
            .filter_map(|(index, item)| match serde_json::from_value::<RepositoryDescriptor>(item) {
                Ok(descriptor) => Some(descriptor),
                Err(e) => {
                    log::warn!(target: LOG_TARGET, "Skipping unreadable item {index} of catalog page {page}: {e}");
                    None
                }
            })
            .collect()
    }

    fn page_url(&self, page: u32) -> Result<Url, url::ParseError> {
        let mut url = Url::parse(&format!("{}/search/repositories", self.client.base_url()))?;
        let _ = url
            .query_pairs_mut()
            .append_pair("q", &format!("language:{}", self.language))
            .append_pair("sort", "stars")
            .append_pair("order", "desc")
            .append_pair("page", &page.to_string())
            .append_pair("per_page", &self.page_size.to_string());
        Ok(url)
    }
}
