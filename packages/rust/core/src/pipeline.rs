//! End-to-end sitelinks workflow: define → populate → map → bind.
//!
//! Stages run strictly in order. The first failing stage aborts the rest;
//! entities created by earlier stages are left in place and logged so they
//! can be cleaned up by hand.

use std::time::{Duration, Instant};

use sitelinks_platform::AdsPlatform;
use sitelinks_shared::{
    AppConfig, CampaignFeed, CampaignId, Device, FeedId, FeedItemId, Result, SitelinkSpec,
    SitelinksError, WorkflowStage,
};
use tracing::{info, instrument, warn};

use crate::binder::CampaignBinder;
use crate::context::MappedFeed;
use crate::definer::FeedDefiner;
use crate::mapper::PlaceholderMapper;
use crate::matching::ContextPredicate;
use crate::populator::{self, FeedPopulator};

/// Feed name prefix used when none is configured.
pub const DEFAULT_FEED_NAME_PREFIX: &str = "Feed For Sitelinks";

/// Inputs of one workflow run.
#[derive(Debug, Clone)]
pub struct WorkflowConfig {
    /// Campaign the sitelinks are attached to.
    pub campaign_id: CampaignId,
    /// Sitelinks to create, in order.
    pub sitelinks: Vec<SitelinkSpec>,
    /// Prefix of the generated feed name.
    pub feed_name_prefix: String,
    /// Serve only on this device class.
    pub device: Option<Device>,
}

impl WorkflowConfig {
    pub fn new(campaign_id: CampaignId, sitelinks: Vec<SitelinkSpec>) -> Self {
        Self {
            campaign_id,
            sitelinks,
            feed_name_prefix: DEFAULT_FEED_NAME_PREFIX.to_string(),
            device: None,
        }
    }

    /// Take sitelinks, prefix and device filter from the loaded config.
    pub fn from_app_config(config: &AppConfig, campaign_id: CampaignId) -> Self {
        Self {
            campaign_id,
            sitelinks: config.sitelinks.clone(),
            feed_name_prefix: config.workflow.feed_name_prefix.clone(),
            device: config.workflow.device.device(),
        }
    }
}

/// Result of a completed workflow.
#[derive(Debug)]
pub struct WorkflowOutcome {
    /// Feed, items and mapping created by stages 1–3.
    pub mapped: MappedFeed,
    /// Association created by stage 4.
    pub campaign_feed: CampaignFeed,
    /// Total elapsed time.
    pub elapsed: Duration,
}

impl WorkflowOutcome {
    pub fn feed_id(&self) -> FeedId {
        self.mapped.feed_id()
    }

    pub fn item_ids(&self) -> Vec<FeedItemId> {
        self.mapped.populated().item_ids()
    }
}

/// Progress callback for reporting workflow status.
pub trait ProgressReporter: Send + Sync {
    /// Called when a stage starts.
    fn stage(&self, stage: WorkflowStage);
    /// Called when the workflow completes.
    fn done(&self, outcome: &WorkflowOutcome);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn stage(&self, _stage: WorkflowStage) {}
    fn done(&self, _outcome: &WorkflowOutcome) {}
}

/// Run the full workflow against `platform`.
///
/// 1. Define the sitelinks feed
/// 2. Populate it with one item per sitelink
/// 3. Map it to the sitelinks placeholder
/// 4. Associate it with the campaign
#[instrument(skip_all, fields(campaign_id = %config.campaign_id, sitelinks = config.sitelinks.len()))]
pub async fn run_workflow<P: AdsPlatform>(
    platform: &P,
    config: &WorkflowConfig,
    progress: &dyn ProgressReporter,
) -> Result<WorkflowOutcome> {
    let start = Instant::now();

    // Reject bad rows before anything is created
    populator::validate_rows(&config.sitelinks)?;

    info!("starting sitelinks workflow");

    // --- Stage 1: Definition ---
    progress.stage(WorkflowStage::Definition);
    let defined = FeedDefiner::new(platform)
        .define_sitelinks(&config.feed_name_prefix)
        .await?;
    let feed_id = defined.feed_id();

    // --- Stage 2: Population ---
    progress.stage(WorkflowStage::Population);
    let populated = FeedPopulator::new(platform)
        .populate(defined, &config.sitelinks)
        .await
        .inspect_err(|e| report_leftovers(e, feed_id, &[]))?;
    let item_ids = populated.item_ids();

    // --- Stage 3: Mapping ---
    progress.stage(WorkflowStage::Mapping);
    let mapped = PlaceholderMapper::new(platform)
        .map_sitelinks(populated)
        .await
        .inspect_err(|e| report_leftovers(e, feed_id, &item_ids))?;

    // --- Stage 4: Association ---
    progress.stage(WorkflowStage::Association);
    let extra = config.device.map(ContextPredicate::DeviceEquals);
    let campaign_feed = CampaignBinder::new(platform)
        .bind_sitelinks(&mapped, config.campaign_id, extra)
        .await
        .inspect_err(|e| report_leftovers(e, feed_id, &item_ids))?;

    let outcome = WorkflowOutcome {
        mapped,
        campaign_feed,
        elapsed: start.elapsed(),
    };

    info!(
        %feed_id,
        items = outcome.item_ids().len(),
        elapsed_ms = outcome.elapsed.as_millis() as u64,
        "sitelinks workflow complete"
    );
    progress.done(&outcome);

    Ok(outcome)
}

/// Nothing is rolled back; name what was left behind.
fn report_leftovers(err: &SitelinksError, feed_id: FeedId, item_ids: &[FeedItemId]) {
    warn!(
        stage = %err.stage().map(|s| s.to_string()).unwrap_or_else(|| "unknown".into()),
        %feed_id,
        item_ids = ?item_ids.iter().map(|id| id.0).collect::<Vec<_>>(),
        "workflow aborted; feed and items already created were not removed"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use crate::testing::{FEED_ID, FakePlatform};
    use sitelinks_shared::{AttributeValue, GeoRestriction, LocationId, PlaceholderType};

    #[derive(Default)]
    struct RecordingProgress {
        stages: Mutex<Vec<WorkflowStage>>,
        finished: Mutex<bool>,
    }

    impl ProgressReporter for RecordingProgress {
        fn stage(&self, stage: WorkflowStage) {
            self.stages.lock().unwrap().push(stage);
        }
        fn done(&self, _outcome: &WorkflowOutcome) {
            *self.finished.lock().unwrap() = true;
        }
    }

    fn home_row() -> SitelinkSpec {
        SitelinkSpec::new("Home", "http://x/", "a", "b")
    }

    #[tokio::test]
    async fn single_sitelink_end_to_end() {
        let platform = FakePlatform::default();
        let config = WorkflowConfig::new(CampaignId(5), vec![home_row()]);

        let outcome = run_workflow(&platform, &config, &SilentProgress)
            .await
            .unwrap();

        // Stage 1: four slots, STRING / URL_LIST / STRING / STRING
        let feed = outcome.mapped.populated().defined().feed();
        assert_eq!(feed.attributes.len(), 4);

        // Stage 2: one item with aligned values
        let rec = platform.recorded.lock().unwrap();
        let values: Vec<_> = rec.item_batches[0][0]
            .attribute_values
            .iter()
            .map(|v| v.value.clone())
            .collect();
        assert_eq!(
            values,
            vec![
                AttributeValue::Text("Home".into()),
                AttributeValue::TextList(vec!["http://x/".into()]),
                AttributeValue::Text("a".into()),
                AttributeValue::Text("b".into()),
            ]
        );

        // Stage 3: all four sitelink fields mapped
        assert_eq!(outcome.mapped.mapping().placeholder_type, PlaceholderType::Sitelinks);
        assert_eq!(rec.mappings[0].attribute_field_mappings.len(), 4);

        // Stage 4: exactly that one item, campaign 5
        let item_id = outcome.item_ids()[0];
        assert_eq!(outcome.campaign_feed.campaign_id, CampaignId(5));
        assert_eq!(outcome.campaign_feed.feed_id, FEED_ID);
        assert_eq!(
            outcome.campaign_feed.matching_function.function_string,
            format!("IN(FEED_ITEM_ID, {{{item_id}}})")
        );
    }

    #[tokio::test]
    async fn default_sitelinks_with_mobile_filter() {
        let platform = FakePlatform::default();
        let mut app = AppConfig::default();
        app.workflow.feed_name_prefix = "Spring".into();
        let config = WorkflowConfig::from_app_config(&app, CampaignId(77));
        let progress = RecordingProgress::default();

        let outcome = run_workflow(&platform, &config, &progress).await.unwrap();

        assert_eq!(outcome.item_ids().len(), 6);
        assert_eq!(
            outcome.campaign_feed.matching_function.function_string,
            "AND( IN(FEED_ITEM_ID, {100,101,102,103,104,105}), EQUALS(CONTEXT.DEVICE, \"Mobile\") )"
        );

        let rec = platform.recorded.lock().unwrap();
        assert!(rec.feeds[0].name.starts_with("Spring #"));
        let geo: Vec<_> = rec.item_batches[0]
            .iter()
            .filter_map(|item| item.geo_target)
            .collect();
        assert_eq!(geo.len(), 1);
        assert_eq!(geo[0].location_id, LocationId(21137));
        assert_eq!(geo[0].restriction, GeoRestriction::LocationOfPresence);

        assert_eq!(
            *progress.stages.lock().unwrap(),
            vec![
                WorkflowStage::Definition,
                WorkflowStage::Population,
                WorkflowStage::Mapping,
                WorkflowStage::Association,
            ]
        );
        assert!(*progress.finished.lock().unwrap());
    }

    #[tokio::test]
    async fn population_failure_skips_mapping_and_binding() {
        let platform = FakePlatform::failing_at(WorkflowStage::Population);
        let config = WorkflowConfig::new(CampaignId(5), vec![home_row()]);

        let err = run_workflow(&platform, &config, &SilentProgress)
            .await
            .unwrap_err();

        assert_eq!(err.stage(), Some(WorkflowStage::Population));
        assert_eq!(platform.calls(), [1, 1, 0, 0]);
    }

    #[tokio::test]
    async fn definition_failure_stops_everything() {
        let platform = FakePlatform::failing_at(WorkflowStage::Definition);
        let config = WorkflowConfig::new(CampaignId(5), vec![home_row()]);

        let err = run_workflow(&platform, &config, &SilentProgress)
            .await
            .unwrap_err();

        assert_eq!(err.stage(), Some(WorkflowStage::Definition));
        assert_eq!(platform.calls(), [1, 0, 0, 0]);
    }

    #[tokio::test]
    async fn mapping_failure_skips_binding() {
        let platform = FakePlatform::failing_at(WorkflowStage::Mapping);
        let config = WorkflowConfig::new(CampaignId(5), vec![home_row()]);

        let err = run_workflow(&platform, &config, &SilentProgress)
            .await
            .unwrap_err();

        assert_eq!(err.stage(), Some(WorkflowStage::Mapping));
        assert_eq!(platform.calls(), [1, 1, 1, 0]);
    }

    #[tokio::test]
    async fn association_failure_reports_stage() {
        let platform = FakePlatform::failing_at(WorkflowStage::Association);
        let config = WorkflowConfig::new(CampaignId(5), vec![home_row()]);

        let err = run_workflow(&platform, &config, &SilentProgress)
            .await
            .unwrap_err();

        assert_eq!(err.stage(), Some(WorkflowStage::Association));
        assert_eq!(platform.calls(), [1, 1, 1, 1]);
    }

    #[tokio::test]
    async fn any_device_filter_binds_membership_only() {
        let platform = FakePlatform::default();
        let mut app = AppConfig::default();
        app.workflow.device = sitelinks_shared::DeviceFilter::Any;
        let config = WorkflowConfig::from_app_config(&app, CampaignId(77));
        assert_eq!(config.device, None);

        let outcome = run_workflow(&platform, &config, &SilentProgress)
            .await
            .unwrap();

        assert_eq!(
            outcome.campaign_feed.matching_function.function_string,
            "IN(FEED_ITEM_ID, {100,101,102,103,104,105})"
        );
    }

    #[tokio::test]
    async fn invalid_rows_create_nothing() {
        let platform = FakePlatform::default();
        let config = WorkflowConfig::new(
            CampaignId(5),
            vec![SitelinkSpec::new("Home", "not a url", "a", "b")],
        );

        let err = run_workflow(&platform, &config, &SilentProgress)
            .await
            .unwrap_err();

        assert_eq!(err.stage(), Some(WorkflowStage::Population));
        assert_eq!(platform.calls(), [0, 0, 0, 0]);
    }

    #[tokio::test]
    async fn workflow_over_http() {
        use serde_json::json;
        use sitelinks_platform::{HttpPlatform, PlatformOptions};
        use sitelinks_shared::Credentials;
        use wiremock::matchers::{body_partial_json, method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v201702/FeedService/mutate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "value": [{
                    "id": 42,
                    "name": "Feed For Sitelinks #x",
                    "origin": "USER",
                    "attributes": [
                        { "id": 1, "name": "Link Text", "type": "STRING" },
                        { "id": 2, "name": "Link URL", "type": "URL_LIST" },
                        { "id": 3, "name": "Line 1 Description", "type": "STRING" },
                        { "id": 4, "name": "Line 2 Description", "type": "STRING" }
                    ]
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/v201702/FeedItemService/mutate"))
            .and(body_partial_json(json!({
                "operations": [{
                    "operator": "ADD",
                    "operand": {
                        "feedId": 42,
                        "attributeValues": [
                            { "feedAttributeId": 1, "stringValue": "Home" },
                            { "feedAttributeId": 2, "stringValues": ["http://x/"] }
                        ]
                    }
                }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "value": [{ "feedItemId": 900, "feedId": 42 }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/v201702/FeedMappingService/mutate"))
            .and(body_partial_json(json!({
                "operations": [{ "operand": { "feedId": 42, "placeholderType": 1 } }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "value": [{
                    "feedMappingId": 7,
                    "feedId": 42,
                    "placeholderType": 1
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/v201702/CampaignFeedService/mutate"))
            .and(body_partial_json(json!({
                "operations": [{
                    "operand": {
                        "campaignId": 5,
                        "matchingFunction": { "functionString": "IN(FEED_ITEM_ID, {900})" },
                        "placeholderTypes": [1]
                    }
                }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "value": [{
                    "feedId": 42,
                    "campaignId": 5,
                    "matchingFunction": { "functionString": "IN(FEED_ITEM_ID, {900})" },
                    "placeholderTypes": [1]
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let platform = HttpPlatform::new(PlatformOptions {
            endpoint: url::Url::parse(&server.uri()).unwrap(),
            version: "v201702".into(),
            timeout_secs: 5,
            credentials: Credentials {
                developer_token: "dev".into(),
                access_token: "token".into(),
                client_customer_id: "123".into(),
            },
        })
        .unwrap();

        let config = WorkflowConfig::new(CampaignId(5), vec![home_row()]);
        let outcome = run_workflow(&platform, &config, &SilentProgress)
            .await
            .unwrap();

        assert_eq!(outcome.item_ids(), vec![FeedItemId(900)]);
        assert_eq!(outcome.campaign_feed.campaign_id, CampaignId(5));
    }
}
