//! Ads platform client: the collaborator the sitelinks workflow registers
//! entities with.
//!
//! The platform is split into four capability traits, one per mutate
//! service, so each workflow stage can only reach the service it needs.
//! [`HttpPlatform`] implements all four against the JSON mutate endpoints.
//!
//! Every call is one request carrying one `ADD` operation per entity. Retry,
//! pagination and credential refresh are not handled here.

mod http;

use std::future::Future;

use sitelinks_shared::{
    CampaignFeed, Feed, FeedItem, FeedMapping, NewFeed, NewFeedItem, NewFeedMapping, Result,
};

pub use http::{HttpPlatform, PlatformOptions};

/// Registers feed schemas.
pub trait FeedService {
    /// Create a feed. The returned feed lists its attributes with ids, in
    /// the order they were submitted.
    fn register_feed(&self, feed: &NewFeed) -> impl Future<Output = Result<Feed>> + Send;
}

/// Registers feed items.
pub trait FeedItemService {
    /// Create all `items` in a single batch. One item comes back per
    /// submitted item, in submission order.
    fn register_feed_items(
        &self,
        items: &[NewFeedItem],
    ) -> impl Future<Output = Result<Vec<FeedItem>>> + Send;
}

/// Registers feed-to-placeholder mappings.
pub trait FeedMappingService {
    fn register_feed_mapping(
        &self,
        mapping: &NewFeedMapping,
    ) -> impl Future<Output = Result<FeedMapping>> + Send;
}

/// Registers campaign feed associations.
pub trait CampaignFeedService {
    fn register_campaign_feed(
        &self,
        campaign_feed: &CampaignFeed,
    ) -> impl Future<Output = Result<CampaignFeed>> + Send;
}

/// A client exposing every capability the workflow needs.
pub trait AdsPlatform: FeedService + FeedItemService + FeedMappingService + CampaignFeedService {}

impl<T> AdsPlatform for T where
    T: FeedService + FeedItemService + FeedMappingService + CampaignFeedService
{
}
