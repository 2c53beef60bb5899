//! REST client for the remote upvote row store.
//!
//! Speaks the PostgREST-style dialect of a generic row store: one logical
//! `upvotes` table with `prompt_slug` as the primary key and an integer
//! `count`. The upvote operation is a read-modify-write and is not atomic
//! across concurrent clients; lost updates are accepted.

use async_trait::async_trait;
use log::{debug, info};
use promptdeck_config::StoreConfig;
use promptdeck_core::{StoreError, UpvoteStore};
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;

/// Row shape returned by the store.
#[derive(Debug, Deserialize)]
struct UpvoteRow {
    prompt_slug: String,
    count: u64,
}

/// Reqwest-backed upvote store client.
pub struct RestUpvoteClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl RestUpvoteClient {
    /// Build a client from store settings. Returns `None` when no base URL
    /// is configured (upvoting disabled).
    pub fn from_config(config: &StoreConfig) -> Option<Self> {
        let base_url = config.base_url.clone()?;
        if base_url.trim().is_empty() {
            return None;
        }
        Some(Self {
            http: reqwest::Client::new(),
            base_url,
            api_key: config.api_key.clone(),
        })
    }

    /// URL selecting every row.
    fn collection_url(&self) -> String {
        format!(
            "{}/upvotes?select=prompt_slug,count",
            self.base_url.trim_end_matches('/')
        )
    }

    /// URL selecting a single slug's row.
    fn row_url(&self, slug: &str) -> String {
        format!(
            "{}/upvotes?prompt_slug=eq.{slug}",
            self.base_url.trim_end_matches('/')
        )
    }

    /// Attach auth headers when an API key is configured.
    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.header("apikey", key).bearer_auth(key),
            None => request,
        }
    }

    /// Fetch the rows matching a single slug.
    async fn fetch_rows(&self, slug: &str) -> Result<Vec<UpvoteRow>, StoreError> {
        let url = format!("{}&select=prompt_slug,count", self.row_url(slug));
        let response = self
            .authorize(self.http.get(url))
            .send()
            .await
            .map_err(|err| StoreError::Request(err.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(StoreError::Status(status.as_u16()));
        }
        response
            .json()
            .await
            .map_err(|err| StoreError::Decode(err.to_string()))
    }
}

#[async_trait]
impl UpvoteStore for RestUpvoteClient {
    /// Fetch the full slug-to-count mapping.
    async fn load_all(&self) -> Result<HashMap<String, u64>, StoreError> {
        debug!("loading upvote counts");
        let response = self
            .authorize(self.http.get(self.collection_url()))
            .send()
            .await
            .map_err(|err| StoreError::Request(err.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(StoreError::Status(status.as_u16()));
        }
        let rows: Vec<UpvoteRow> = response
            .json()
            .await
            .map_err(|err| StoreError::Decode(err.to_string()))?;
        debug!("upvote counts loaded (rows={})", rows.len());
        Ok(rows
            .into_iter()
            .map(|row| (row.prompt_slug, row.count))
            .collect())
    }

    /// Create the slug's row with count 1 or increment the existing row.
    async fn upvote(&self, slug: &str) -> Result<(), StoreError> {
        let rows = self.fetch_rows(slug).await?;
        let request = match rows.first() {
            Some(row) => {
                info!("incrementing upvote (slug={slug}, count={})", row.count);
                self.authorize(self.http.patch(self.row_url(slug)))
                    .json(&json!({ "count": row.count + 1 }))
            }
            None => {
                info!("creating upvote record (slug={slug})");
                self.authorize(
                    self.http
                        .post(format!("{}/upvotes", self.base_url.trim_end_matches('/'))),
                )
                .json(&json!({ "prompt_slug": slug, "count": 1 }))
            }
        };
        let response = request
            .send()
            .await
            .map_err(|err| StoreError::Request(err.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(StoreError::Status(status.as_u16()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::RestUpvoteClient;
    use pretty_assertions::assert_eq;
    use promptdeck_config::StoreConfig;

    fn client(base_url: &str) -> RestUpvoteClient {
        RestUpvoteClient::from_config(&StoreConfig {
            base_url: Some(base_url.to_string()),
            api_key: Some("anon-key".to_string()),
        })
        .expect("client")
    }

    #[test]
    fn unconfigured_store_yields_no_client() {
        assert!(RestUpvoteClient::from_config(&StoreConfig::default()).is_none());
        let blank = StoreConfig {
            base_url: Some(String::new()),
            api_key: None,
        };
        assert!(RestUpvoteClient::from_config(&blank).is_none());
    }

    #[test]
    fn urls_target_the_upvotes_table() {
        let client = client("https://store.example/rest/v1/");
        assert_eq!(
            client.collection_url(),
            "https://store.example/rest/v1/upvotes?select=prompt_slug,count"
        );
        assert_eq!(
            client.row_url("email-draft"),
            "https://store.example/rest/v1/upvotes?prompt_slug=eq.email-draft"
        );
    }
}
