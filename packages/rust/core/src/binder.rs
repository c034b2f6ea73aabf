//! Stage 4: associate the feed with a campaign through a matching function.

use sitelinks_platform::CampaignFeedService;
use sitelinks_shared::{
    CampaignFeed, CampaignId, FeedFunction, FeedId, FeedItemId, PlaceholderType, Result,
    SitelinksError,
};
use tracing::{debug, info, instrument};

use crate::context::MappedFeed;
use crate::matching::{ContextPredicate, MatchingFunction};

/// Registers campaign feeds through a [`CampaignFeedService`].
pub struct CampaignBinder<'a, S> {
    service: &'a S,
}

impl<'a, S: CampaignFeedService> CampaignBinder<'a, S> {
    pub fn new(service: &'a S) -> Self {
        Self { service }
    }

    /// Associate `feed_id` with `campaign_id`, serving only `item_ids`
    /// (and only where `extra` holds, when given).
    ///
    /// Calling this twice for the same pair creates two associations.
    #[instrument(skip_all, fields(feed_id = %feed_id, campaign_id = %campaign_id, items = item_ids.len()))]
    pub async fn bind(
        &self,
        feed_id: FeedId,
        campaign_id: CampaignId,
        item_ids: &[FeedItemId],
        placeholder_types: &[PlaceholderType],
        extra: Option<ContextPredicate>,
    ) -> Result<CampaignFeed> {
        if placeholder_types.is_empty() {
            return Err(SitelinksError::association(format!(
                "campaign feed for campaign {campaign_id} names no placeholder types"
            )));
        }

        let function = MatchingFunction::for_items(item_ids, extra)?;
        let function_string = function.to_string();
        debug!(%function_string, "matching function built");

        let mut types: Vec<PlaceholderType> = Vec::with_capacity(placeholder_types.len());
        for placeholder_type in placeholder_types {
            if !types.contains(placeholder_type) {
                types.push(*placeholder_type);
            }
        }

        let campaign_feed = CampaignFeed {
            feed_id,
            campaign_id,
            matching_function: FeedFunction {
                function_string: function_string.clone(),
            },
            placeholder_types: types,
        };

        let saved = self
            .service
            .register_campaign_feed(&campaign_feed)
            .await
            .map_err(|e| {
                SitelinksError::association(format!(
                    "associating feed {feed_id} with campaign {campaign_id} using '{function_string}': {e}"
                ))
            })?;

        if saved.feed_id != feed_id || saved.campaign_id != campaign_id {
            return Err(SitelinksError::association(format!(
                "association came back for feed {} / campaign {}, expected feed {feed_id} / campaign {campaign_id}",
                saved.feed_id, saved.campaign_id
            )));
        }

        info!(
            campaign_id = %saved.campaign_id,
            feed_id = %saved.feed_id,
            "campaign associated with feed"
        );

        Ok(saved)
    }

    /// Associate a mapped sitelinks feed with `campaign_id`, serving all of
    /// its items.
    pub async fn bind_sitelinks(
        &self,
        mapped: &MappedFeed,
        campaign_id: CampaignId,
        extra: Option<ContextPredicate>,
    ) -> Result<CampaignFeed> {
        self.bind(
            mapped.feed_id(),
            campaign_id,
            &mapped.populated().item_ids(),
            &[mapped.mapping().placeholder_type],
            extra,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FEED_ID, FakePlatform};
    use sitelinks_shared::{Device, WorkflowStage};

    fn ids(raw: &[i64]) -> Vec<FeedItemId> {
        raw.iter().copied().map(FeedItemId).collect()
    }

    #[tokio::test]
    async fn bind_sends_rendered_function() {
        let platform = FakePlatform::default();
        let saved = CampaignBinder::new(&platform)
            .bind(
                FEED_ID,
                CampaignId(5),
                &ids(&[10, 11, 12]),
                &[PlaceholderType::Sitelinks],
                Some(ContextPredicate::DeviceEquals(Device::Mobile)),
            )
            .await
            .unwrap();

        assert_eq!(saved.campaign_id, CampaignId(5));
        assert_eq!(
            saved.matching_function.function_string,
            "AND( IN(FEED_ITEM_ID, {10,11,12}), EQUALS(CONTEXT.DEVICE, \"Mobile\") )"
        );
        assert_eq!(saved.placeholder_types, vec![PlaceholderType::Sitelinks]);
    }

    #[tokio::test]
    async fn bind_without_predicate_is_membership_only() {
        let platform = FakePlatform::default();
        let saved = CampaignBinder::new(&platform)
            .bind(FEED_ID, CampaignId(5), &ids(&[10]), &[PlaceholderType::Sitelinks], None)
            .await
            .unwrap();

        assert_eq!(saved.matching_function.function_string, "IN(FEED_ITEM_ID, {10})");
    }

    #[tokio::test]
    async fn empty_items_are_rejected_before_sending() {
        let platform = FakePlatform::default();
        let err = CampaignBinder::new(&platform)
            .bind(FEED_ID, CampaignId(5), &[], &[PlaceholderType::Sitelinks], None)
            .await
            .unwrap_err();

        assert_eq!(err.stage(), Some(WorkflowStage::Association));
        assert_eq!(platform.calls(), [0, 0, 0, 0]);
    }

    #[tokio::test]
    async fn missing_placeholder_types_are_rejected() {
        let platform = FakePlatform::default();
        let err = CampaignBinder::new(&platform)
            .bind(FEED_ID, CampaignId(5), &ids(&[1]), &[], None)
            .await
            .unwrap_err();

        assert!(err.to_string().contains("no placeholder types"));
    }

    #[tokio::test]
    async fn registration_failure_names_the_function() {
        let platform = FakePlatform::failing_at(WorkflowStage::Association);
        let err = CampaignBinder::new(&platform)
            .bind(FEED_ID, CampaignId(5), &ids(&[1, 2]), &[PlaceholderType::Sitelinks], None)
            .await
            .unwrap_err();

        assert_eq!(err.stage(), Some(WorkflowStage::Association));
        assert!(err.to_string().contains("IN(FEED_ITEM_ID, {1,2})"));
    }

    #[tokio::test]
    async fn repeated_bind_creates_duplicate_association() {
        let platform = FakePlatform::default();
        let binder = CampaignBinder::new(&platform);
        for _ in 0..2 {
            binder
                .bind(FEED_ID, CampaignId(5), &ids(&[1]), &[PlaceholderType::Sitelinks], None)
                .await
                .unwrap();
        }
        assert_eq!(platform.calls(), [0, 0, 0, 2]);
    }
}
