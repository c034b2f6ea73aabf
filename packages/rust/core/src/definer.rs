//! Stage 1: declare a typed feed schema and register it.

use sitelinks_platform::FeedService;
use sitelinks_shared::{Feed, FeedAttributeSpec, FeedOrigin, NewFeed, Result, SitelinksError};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::context::{DefinedFeed, SitelinkAttributes, sitelink_schema};

/// Registers feeds through a [`FeedService`].
pub struct FeedDefiner<'a, S> {
    service: &'a S,
}

impl<'a, S: FeedService> FeedDefiner<'a, S> {
    pub fn new(service: &'a S) -> Self {
        Self { service }
    }

    /// Register a feed named `name` with the given slots, in order.
    ///
    /// The registered feed must come back with the same slots in the same
    /// order; anything else is a [`SitelinksError::Definition`].
    #[instrument(skip_all, fields(feed_name = %name, attributes = specs.len()))]
    pub async fn define(&self, name: &str, specs: &[FeedAttributeSpec]) -> Result<Feed> {
        if name.trim().is_empty() {
            return Err(SitelinksError::definition("feed name is empty"));
        }
        if specs.is_empty() {
            return Err(SitelinksError::definition(format!(
                "feed '{name}' declares no attributes"
            )));
        }

        let new_feed = NewFeed {
            name: name.to_string(),
            attributes: specs.to_vec(),
            origin: FeedOrigin::User,
        };

        let feed = self
            .service
            .register_feed(&new_feed)
            .await
            .map_err(|e| SitelinksError::definition(format!("registering feed '{name}': {e}")))?;

        verify_schema(&feed, specs)?;

        info!(
            feed_id = %feed.id,
            feed_name = %feed.name,
            attribute_ids = ?feed.attributes.iter().map(|a| a.id.0).collect::<Vec<_>>(),
            "feed created"
        );

        Ok(feed)
    }

    /// Register a uniquely named sitelinks feed and resolve its attribute roles.
    pub async fn define_sitelinks(&self, name_prefix: &str) -> Result<DefinedFeed> {
        let name = unique_feed_name(name_prefix);
        let feed = self.define(&name, &sitelink_schema()).await?;
        let attributes = SitelinkAttributes::resolve(&feed)?;
        Ok(DefinedFeed::new(feed, attributes))
    }
}

/// `"<prefix> #<uuid>"`, unique per call.
pub fn unique_feed_name(prefix: &str) -> String {
    format!("{prefix} #{}", Uuid::now_v7().simple())
}

/// The registered attributes must match the declared ones one-to-one, in order.
fn verify_schema(feed: &Feed, specs: &[FeedAttributeSpec]) -> Result<()> {
    if feed.attributes.len() != specs.len() {
        return Err(SitelinksError::definition(format!(
            "feed {} came back with {} attributes, {} were declared",
            feed.id,
            feed.attributes.len(),
            specs.len()
        )));
    }

    for (i, (attr, spec)) in feed.attributes.iter().zip(specs).enumerate() {
        if attr.name != spec.name || attr.attribute_type != spec.attribute_type {
            return Err(SitelinksError::definition(format!(
                "feed {} attribute {i} is '{}' ({}), declared '{}' ({})",
                feed.id, attr.name, attr.attribute_type, spec.name, spec.attribute_type
            )));
        }
    }

    Ok(())
}
