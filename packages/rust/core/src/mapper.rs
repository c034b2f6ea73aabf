//! Stage 3: bind feed attributes to a placeholder type's fields.

use std::collections::HashSet;

use sitelinks_platform::FeedMappingService;
use sitelinks_shared::{
    AttributeFieldMapping, Feed, FeedAttributeId, FeedMapping, NewFeedMapping, PlaceholderField,
    PlaceholderType, Result, SitelinksError,
};
use tracing::{info, instrument};

use crate::context::{MappedFeed, PopulatedFeed, SitelinkAttributes, SitelinkRole};

/// One attribute bound to one placeholder field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldBinding {
    pub attribute_id: FeedAttributeId,
    pub field: PlaceholderField,
}

/// The bindings for a sitelinks feed: every role to its sitelink field.
pub fn sitelink_bindings(attributes: &SitelinkAttributes) -> Vec<FieldBinding> {
    SitelinkRole::ALL
        .iter()
        .map(|role| FieldBinding {
            attribute_id: attributes.get(*role),
            field: role.placeholder_field(),
        })
        .collect()
}

/// Registers feed mappings through a [`FeedMappingService`].
pub struct PlaceholderMapper<'a, S> {
    service: &'a S,
}

impl<'a, S: FeedMappingService> PlaceholderMapper<'a, S> {
    pub fn new(service: &'a S) -> Self {
        Self { service }
    }

    /// Map `feed` to `placeholder_type` using `bindings`.
    ///
    /// Nothing is registered unless every required field is bound and every
    /// binding belongs to `placeholder_type` and to an attribute of `feed`.
    #[instrument(skip_all, fields(feed_id = %feed.id, placeholder_type = %placeholder_type))]
    pub async fn map_to_placeholder(
        &self,
        feed: &Feed,
        placeholder_type: PlaceholderType,
        bindings: &[FieldBinding],
    ) -> Result<FeedMapping> {
        let attribute_field_mappings = validate_bindings(feed, placeholder_type, bindings)?;

        let new_mapping = NewFeedMapping {
            feed_id: feed.id,
            placeholder_type,
            attribute_field_mappings,
        };

        let mapping = self
            .service
            .register_feed_mapping(&new_mapping)
            .await
            .map_err(|e| {
                SitelinksError::mapping(format!(
                    "mapping feed {} to {placeholder_type}: {e}",
                    feed.id
                ))
            })?;

        if mapping.feed_id != feed.id || mapping.placeholder_type != placeholder_type {
            return Err(SitelinksError::mapping(format!(
                "mapping {} came back for feed {} / {}, expected feed {} / {placeholder_type}",
                mapping.feed_mapping_id, mapping.feed_id, mapping.placeholder_type, feed.id
            )));
        }

        info!(
            feed_mapping_id = %mapping.feed_mapping_id,
            placeholder_type = mapping.placeholder_type.code(),
            feed_id = %mapping.feed_id,
            "feed mapping saved"
        );

        Ok(mapping)
    }

    /// Map a populated sitelinks feed to the sitelinks placeholder.
    pub async fn map_sitelinks(&self, populated: PopulatedFeed) -> Result<MappedFeed> {
        let defined = populated.defined();
        let bindings = sitelink_bindings(defined.attributes());
        let mapping = self
            .map_to_placeholder(defined.feed(), PlaceholderType::Sitelinks, &bindings)
            .await?;
        Ok(MappedFeed::new(populated, mapping))
    }
}

/// Check `bindings` against the feed and placeholder schema and lower them
/// to wire mappings.
pub fn validate_bindings(
    feed: &Feed,
    placeholder_type: PlaceholderType,
    bindings: &[FieldBinding],
) -> Result<Vec<AttributeFieldMapping>> {
    let mut bound = HashSet::new();

    for binding in bindings {
        if binding.field.placeholder_type() != placeholder_type {
            return Err(SitelinksError::mapping(format!(
                "field {} belongs to {}, not {placeholder_type}",
                binding.field,
                binding.field.placeholder_type()
            )));
        }
        if !feed.attributes.iter().any(|a| a.id == binding.attribute_id) {
            return Err(SitelinksError::mapping(format!(
                "attribute {} bound to {} is not on feed {}",
                binding.attribute_id, binding.field, feed.id
            )));
        }
        if !bound.insert(binding.field) {
            return Err(SitelinksError::mapping(format!(
                "field {} is bound more than once",
                binding.field
            )));
        }
    }

    let missing: Vec<&str> = placeholder_type
        .required_fields()
        .iter()
        .filter(|field| !bound.contains(*field))
        .map(PlaceholderField::name)
        .collect();
    if !missing.is_empty() {
        return Err(SitelinksError::mapping(format!(
            "{placeholder_type} mapping for feed {} leaves required fields unbound: {}",
            feed.id,
            missing.join(", ")
        )));
    }

    Ok(bindings
        .iter()
        .map(|binding| AttributeFieldMapping {
            feed_attribute_id: binding.attribute_id,
            field_id: binding.field.field_id(),
        })
        .collect())
}
