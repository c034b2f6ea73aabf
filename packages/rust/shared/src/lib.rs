//! Shared types, error model, and configuration for the sitelinks workflow.
//!
//! This crate is the foundation depended on by all other sitelinks crates.
//! It provides:
//! - [`SitelinksError`] — the unified error type
//! - Domain and wire types ([`Feed`], [`FeedItem`], [`FeedMapping`], [`CampaignFeed`])
//! - Configuration ([`AppConfig`], config loading, credential resolution)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    ApiConfig, AppConfig, Credentials, WorkflowDefaults, config_dir, config_file_path,
    default_sitelinks, init_config, load_config, load_config_from, validate_credentials,
};
pub use error::{Result, SitelinksError};
pub use types::{
    AttributeFieldMapping, AttributeValue, CampaignFeed, CampaignId, Device, DeviceFilter, Feed, FeedAttribute,
    FeedAttributeId, FeedAttributeSpec, FeedAttributeType, FeedFunction, FeedId, FeedItem,
    FeedItemAttributeValue, FeedItemId, FeedMapping, FeedMappingId, FeedOrigin, GeoRestriction,
    GeoTarget, LocationId, NewFeed, NewFeedItem, NewFeedMapping, PlaceholderField,
    PlaceholderType, SitelinkSpec, WorkflowStage,
};
