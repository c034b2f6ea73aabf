//! reqwest-backed implementation of the platform services.

use std::time::Duration;

use reqwest::Client;
use serde::Serialize;
use serde::de::DeserializeOwned;
use sitelinks_shared::{
    AppConfig, CampaignFeed, Credentials, Feed, FeedItem, FeedMapping, NewFeed, NewFeedItem,
    NewFeedMapping, Result, SitelinksError,
};
use tracing::{debug, instrument};
use url::Url;

use crate::{CampaignFeedService, FeedItemService, FeedMappingService, FeedService};

/// User-Agent string for platform requests.
const USER_AGENT: &str = concat!("sitelinks/", env!("CARGO_PKG_VERSION"));

/// Error bodies longer than this are cut before landing in an error message.
const MAX_ERROR_BODY: usize = 512;

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Connection settings for [`HttpPlatform`].
#[derive(Debug, Clone)]
pub struct PlatformOptions {
    /// Base URL the service paths are appended to.
    pub endpoint: Url,
    /// API version path segment, e.g. `v201702`.
    pub version: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Already-established session credentials.
    pub credentials: Credentials,
}

impl PlatformOptions {
    /// Build options from the `[api]` config section.
    pub fn from_config(config: &AppConfig, credentials: Credentials) -> Result<Self> {
        let endpoint = Url::parse(&config.api.endpoint).map_err(|e| {
            SitelinksError::config(format!("invalid api.endpoint '{}': {e}", config.api.endpoint))
        })?;

        Ok(Self {
            endpoint,
            version: config.api.version.clone(),
            timeout_secs: config.api.timeout_secs,
            credentials,
        })
    }
}

// ---------------------------------------------------------------------------
// Wire envelopes
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct MutateRequest<'a, T> {
    operations: Vec<Operation<'a, T>>,
}

#[derive(Debug, Serialize)]
struct Operation<'a, T> {
    operator: &'static str,
    operand: &'a T,
}

#[derive(Debug, serde::Deserialize)]
struct MutateResponse<R> {
    #[serde(default = "Vec::new")]
    value: Vec<R>,
}

// ---------------------------------------------------------------------------
// HttpPlatform
// ---------------------------------------------------------------------------

/// Ads platform client speaking JSON to the per-service mutate endpoints.
#[derive(Debug, Clone)]
pub struct HttpPlatform {
    client: Client,
    base_url: String,
    credentials: Credentials,
}

impl HttpPlatform {
    /// Create a new client with the given options.
    pub fn new(opts: PlatformOptions) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(opts.timeout_secs))
            .build()
            .map_err(|e| SitelinksError::Network(format!("failed to build HTTP client: {e}")))?;

        let base_url = format!(
            "{}/{}",
            opts.endpoint.as_str().trim_end_matches('/'),
            opts.version
        );

        Ok(Self {
            client,
            base_url,
            credentials: opts.credentials,
        })
    }

    fn service_url(&self, service: &str) -> String {
        format!("{}/{service}/mutate", self.base_url)
    }

    /// Send one `ADD` operation per operand to `service` and return the
    /// created values in response order.
    #[instrument(skip_all, fields(service = %service, operations = operands.len()))]
    async fn mutate<T, R>(&self, service: &str, operands: &[T]) -> Result<Vec<R>>
    where
        T: Serialize + Sync,
        R: DeserializeOwned,
    {
        let url = self.service_url(service);
        let body = MutateRequest {
            operations: operands
                .iter()
                .map(|operand| Operation {
                    operator: "ADD",
                    operand,
                })
                .collect(),
        };

        debug!(%url, "sending mutate request");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.credentials.access_token)
            .header("developerToken", &self.credentials.developer_token)
            .header("clientCustomerId", &self.credentials.client_customer_id)
            .json(&body)
            .send()
            .await
            .map_err(|e| SitelinksError::Network(format!("{service}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(SitelinksError::Api {
                status: status.as_u16(),
                message: format!("{service}: {}", truncate(&text, MAX_ERROR_BODY)),
            });
        }

        let parsed: MutateResponse<R> = response.json().await.map_err(|e| {
            SitelinksError::Network(format!("{service}: failed to decode response: {e}"))
        })?;

        debug!(values = parsed.value.len(), "mutate succeeded");
        Ok(parsed.value)
    }
}

/// Take the single value a one-operation mutate must return.
fn single<R>(service: &str, mut values: Vec<R>) -> Result<R> {
    if values.len() != 1 {
        return Err(SitelinksError::Network(format!(
            "{service}: expected 1 value in response, got {}",
            values.len()
        )));
    }
    values
        .pop()
        .ok_or_else(|| SitelinksError::Network(format!("{service}: empty response")))
}

fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

impl FeedService for HttpPlatform {
    async fn register_feed(&self, feed: &NewFeed) -> Result<Feed> {
        let values = self
            .mutate("FeedService", std::slice::from_ref(feed))
            .await?;
        single("FeedService", values)
    }
}

impl FeedItemService for HttpPlatform {
    async fn register_feed_items(&self, items: &[NewFeedItem]) -> Result<Vec<FeedItem>> {
        self.mutate("FeedItemService", items).await
    }
}

impl FeedMappingService for HttpPlatform {
    async fn register_feed_mapping(&self, mapping: &NewFeedMapping) -> Result<FeedMapping> {
        let values = self
            .mutate("FeedMappingService", std::slice::from_ref(mapping))
            .await?;
        single("FeedMappingService", values)
    }
}

impl CampaignFeedService for HttpPlatform {
    async fn register_campaign_feed(&self, campaign_feed: &CampaignFeed) -> Result<CampaignFeed> {
        let values = self
            .mutate("CampaignFeedService", std::slice::from_ref(campaign_feed))
            .await?;
        single("CampaignFeedService", values)
    }
}
