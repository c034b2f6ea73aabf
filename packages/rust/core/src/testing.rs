//! In-memory platform that records every request, for stage and pipeline tests.

use std::sync::Mutex;

use sitelinks_platform::{CampaignFeedService, FeedItemService, FeedMappingService, FeedService};
use sitelinks_shared::{
    CampaignFeed, Feed, FeedAttribute, FeedAttributeId, FeedId, FeedItem, FeedItemId, FeedMapping,
    FeedMappingId, NewFeed, NewFeedItem, NewFeedMapping, Result, SitelinksError, WorkflowStage,
};

/// How the fake answers a feed item batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) enum ItemResponse {
    /// One item per request item, same order, values echoed.
    #[default]
    InOrder,
    /// Same as `InOrder` but reversed.
    Reversed,
    /// Ids only, last item missing.
    DropLast,
    /// Items claim a different feed.
    WrongFeed,
}

#[derive(Debug, Default)]
pub(crate) struct Recorded {
    pub feeds: Vec<NewFeed>,
    pub item_batches: Vec<Vec<NewFeedItem>>,
    pub mappings: Vec<NewFeedMapping>,
    pub campaign_feeds: Vec<CampaignFeed>,
}

#[derive(Debug, Default)]
pub(crate) struct FakePlatform {
    pub fail_at: Option<WorkflowStage>,
    pub item_response: ItemResponse,
    /// Return the feed's attributes with the last one missing.
    pub truncate_attributes: bool,
    pub recorded: Mutex<Recorded>,
}

pub(crate) const FEED_ID: FeedId = FeedId(42);
const FIRST_ATTRIBUTE_ID: i64 = 10;
const FIRST_ITEM_ID: i64 = 100;
const MAPPING_ID: FeedMappingId = FeedMappingId(500);

impl FakePlatform {
    pub fn failing_at(stage: WorkflowStage) -> Self {
        Self {
            fail_at: Some(stage),
            ..Self::default()
        }
    }

    pub fn with_items(item_response: ItemResponse) -> Self {
        Self {
            item_response,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> [usize; 4] {
        let rec = self.recorded.lock().unwrap();
        [
            rec.feeds.len(),
            rec.item_batches.len(),
            rec.mappings.len(),
            rec.campaign_feeds.len(),
        ]
    }

    fn check(&self, stage: WorkflowStage) -> Result<()> {
        if self.fail_at == Some(stage) {
            return Err(SitelinksError::Api {
                status: 400,
                message: format!("injected {stage} failure"),
            });
        }
        Ok(())
    }
}

impl FeedService for FakePlatform {
    async fn register_feed(&self, feed: &NewFeed) -> Result<Feed> {
        self.recorded.lock().unwrap().feeds.push(feed.clone());
        self.check(WorkflowStage::Definition)?;

        let mut attributes: Vec<FeedAttribute> = feed
            .attributes
            .iter()
            .enumerate()
            .map(|(i, spec)| FeedAttribute {
                id: FeedAttributeId(FIRST_ATTRIBUTE_ID + i as i64),
                name: spec.name.clone(),
                attribute_type: spec.attribute_type,
            })
            .collect();
        if self.truncate_attributes {
            attributes.pop();
        }

        Ok(Feed {
            id: FEED_ID,
            name: feed.name.clone(),
            attributes,
            origin: feed.origin,
        })
    }
}

impl FeedItemService for FakePlatform {
    async fn register_feed_items(&self, items: &[NewFeedItem]) -> Result<Vec<FeedItem>> {
        self.recorded.lock().unwrap().item_batches.push(items.to_vec());
        self.check(WorkflowStage::Population)?;

        let mut saved: Vec<FeedItem> = items
            .iter()
            .enumerate()
            .map(|(i, item)| FeedItem {
                feed_item_id: FeedItemId(FIRST_ITEM_ID + i as i64),
                feed_id: item.feed_id,
                attribute_values: item.attribute_values.clone(),
                geo_target: item.geo_target,
            })
            .collect();

        match self.item_response {
            ItemResponse::InOrder => {}
            ItemResponse::Reversed => saved.reverse(),
            ItemResponse::DropLast => {
                saved.pop();
                for item in &mut saved {
                    item.attribute_values.clear();
                }
            }
            ItemResponse::WrongFeed => {
                for item in &mut saved {
                    item.feed_id = FeedId(FEED_ID.0 + 1);
                }
            }
        }
        Ok(saved)
    }
}

impl FeedMappingService for FakePlatform {
    async fn register_feed_mapping(&self, mapping: &NewFeedMapping) -> Result<FeedMapping> {
        self.recorded.lock().unwrap().mappings.push(mapping.clone());
        self.check(WorkflowStage::Mapping)?;

        Ok(FeedMapping {
            feed_mapping_id: MAPPING_ID,
            feed_id: mapping.feed_id,
            placeholder_type: mapping.placeholder_type,
            attribute_field_mappings: mapping.attribute_field_mappings.clone(),
        })
    }
}

impl CampaignFeedService for FakePlatform {
    async fn register_campaign_feed(&self, campaign_feed: &CampaignFeed) -> Result<CampaignFeed> {
        self.recorded
            .lock()
            .unwrap()
            .campaign_feeds
            .push(campaign_feed.clone());
        self.check(WorkflowStage::Association)?;

        Ok(campaign_feed.clone())
    }
}
