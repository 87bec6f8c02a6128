use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

/// One catalog entry as returned by the repository search endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RepositoryDescriptor {
    /// Short repository name, also the ledger key and working copy directory name.
    pub name: String,

    /// Owner-qualified name (`owner/name`).
    pub full_name: String,

    pub clone_url: Url,
    pub stargazers_count: u64,
    pub forks_count: u64,
    pub created_at: DateTime<Utc>,
    pub default_branch: String,
}

#[cfg(test)]
pub(crate) fn test_descriptor(name: &str, created_at: &str) -> RepositoryDescriptor {
    RepositoryDescriptor {
        name: name.to_string(),
        full_name: format!("owner/{name}"),
        clone_url: Url::parse(&format!("https://github.com/owner/{name}.git")).unwrap(),
        stargazers_count: 100,
        forks_count: 10,
        created_at: created_at.parse().unwrap(),
        default_branch: "main".to_string(),
    }
}
