//! Stage 2: build one feed item per sitelink and register them as a batch.
//!
//! Values are laid out in the feed's declared attribute order, but each
//! value is chosen by the attribute's [`SitelinkRole`], never by its index.

use std::collections::HashSet;

use sitelinks_platform::FeedItemService;
use sitelinks_shared::{
    AttributeValue, FeedItem, FeedItemAttributeValue, GeoTarget, NewFeedItem, Result,
    SitelinkSpec, SitelinksError,
};
use tracing::{debug, info, instrument};
use url::Url;

use crate::context::{DefinedFeed, PopulatedFeed, SitelinkRole};

/// Registers sitelink feed items through a [`FeedItemService`].
pub struct FeedPopulator<'a, S> {
    service: &'a S,
}

impl<'a, S: FeedItemService> FeedPopulator<'a, S> {
    pub fn new(service: &'a S) -> Self {
        Self { service }
    }

    /// Add one item per row to the feed, in a single batch.
    ///
    /// The returned [`PopulatedFeed`] lists one item per row, in row order.
    #[instrument(skip_all, fields(feed_id = %defined.feed_id(), rows = rows.len()))]
    pub async fn populate(&self, defined: DefinedFeed, rows: &[SitelinkSpec]) -> Result<PopulatedFeed> {
        validate_rows(rows)?;

        let items = rows
            .iter()
            .map(|row| build_item(&defined, row))
            .collect::<Result<Vec<_>>>()?;

        debug!(items = items.len(), "submitting feed item batch");

        let saved = self
            .service
            .register_feed_items(&items)
            .await
            .map_err(|e| {
                SitelinksError::population(format!(
                    "adding {} items to feed {}: {e}",
                    items.len(),
                    defined.feed_id()
                ))
            })?;

        let saved = correlate(&items, saved)?;

        let mut seen = HashSet::new();
        for (row, item) in rows.iter().zip(&saved) {
            if item.feed_id != defined.feed_id() {
                return Err(SitelinksError::population(format!(
                    "item {} for '{}' belongs to feed {}, expected {}",
                    item.feed_item_id,
                    row.text,
                    item.feed_id,
                    defined.feed_id()
                )));
            }
            if !seen.insert(item.feed_item_id) {
                return Err(SitelinksError::population(format!(
                    "feed item id {} returned twice",
                    item.feed_item_id
                )));
            }
            info!(feed_item_id = %item.feed_item_id, text = %row.text, "feed item added");
        }

        Ok(PopulatedFeed::new(defined, saved))
    }
}

/// Check rows before anything is sent.
pub fn validate_rows(rows: &[SitelinkSpec]) -> Result<()> {
    if rows.is_empty() {
        return Err(SitelinksError::population("no sitelinks to add"));
    }

    for (i, row) in rows.iter().enumerate() {
        if row.text.trim().is_empty() {
            return Err(SitelinksError::population(format!("row {i} has empty link text")));
        }
        let url = Url::parse(&row.final_url).map_err(|e| {
            SitelinksError::population(format!(
                "row {i} ('{}') final URL '{}' is invalid: {e}",
                row.text, row.final_url
            ))
        })?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(SitelinksError::population(format!(
                "row {i} ('{}') final URL must be http or https, got '{}'",
                row.text,
                url.scheme()
            )));
        }
    }

    Ok(())
}

/// Build the item for one row, one value per feed attribute in declared order.
pub fn build_item(defined: &DefinedFeed, row: &SitelinkSpec) -> Result<NewFeedItem> {
    let roles = defined.attributes();

    let attribute_values = defined
        .feed()
        .attributes
        .iter()
        .map(|attr| -> Result<FeedItemAttributeValue> {
            let role = roles.role_of(attr.id).ok_or_else(|| {
                SitelinksError::population(format!(
                    "feed {} attribute '{}' has no sitelink role",
                    defined.feed_id(),
                    attr.name
                ))
            })?;

            let value = match role {
                SitelinkRole::LinkText => AttributeValue::Text(row.text.clone()),
                // URL_LIST slots always take a list, even for a single URL
                SitelinkRole::FinalUrl => AttributeValue::TextList(vec![row.final_url.clone()]),
                SitelinkRole::Line1 => AttributeValue::Text(row.line1.clone()),
                SitelinkRole::Line2 => AttributeValue::Text(row.line2.clone()),
            };

            if !value.fits(attr.attribute_type) {
                return Err(SitelinksError::population(format!(
                    "value for '{}' does not fit attribute type {}",
                    attr.name, attr.attribute_type
                )));
            }

            Ok(FeedItemAttributeValue {
                feed_attribute_id: attr.id,
                value,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(NewFeedItem {
        feed_id: defined.feed_id(),
        attribute_values,
        geo_target: row.location_id.map(GeoTarget::location_of_presence),
    })
}

/// Line `saved` up with `submitted`.
///
/// When the platform echoes attribute values, items are matched by content so
/// a reordered response still lines up. Bare id responses are taken in
/// response order.
fn correlate(submitted: &[NewFeedItem], mut saved: Vec<FeedItem>) -> Result<Vec<FeedItem>> {
    if saved.len() != submitted.len() {
        return Err(SitelinksError::population(format!(
            "submitted {} items, platform returned {}",
            submitted.len(),
            saved.len()
        )));
    }

    if saved.iter().any(|item| item.attribute_values.is_empty()) {
        return Ok(saved);
    }

    let mut ordered = Vec::with_capacity(saved.len());
    for (i, item) in submitted.iter().enumerate() {
        let pos = saved
            .iter()
            .position(|s| s.attribute_values == item.attribute_values && s.geo_target == item.geo_target)
            .ok_or_else(|| {
                SitelinksError::population(format!("no returned item matches submitted row {i}"))
            })?;
        ordered.push(saved.swap_remove(pos));
    }
    Ok(ordered)
}
