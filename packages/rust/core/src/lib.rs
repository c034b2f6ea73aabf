//! Sitelinks-over-feeds orchestration.
//!
//! The workflow runs four stages, each feeding ids into the next:
//! - [`definer`] — register the feed schema
//! - [`populator`] — add one feed item per sitelink
//! - [`mapper`] — map feed attributes to the sitelinks placeholder
//! - [`binder`] — attach the feed to a campaign via a [`matching`] function
//!
//! [`pipeline::run_workflow`] ties them together.

pub mod binder;
pub mod context;
pub mod definer;
pub mod mapper;
pub mod matching;
pub mod pipeline;
pub mod populator;

#[cfg(test)]
mod testing;

pub use binder::CampaignBinder;
pub use context::{DefinedFeed, MappedFeed, PopulatedFeed, SitelinkAttributes, SitelinkRole};
pub use definer::FeedDefiner;
pub use mapper::{FieldBinding, PlaceholderMapper};
pub use matching::{ContextPredicate, MatchingFunction};
pub use pipeline::{
    ProgressReporter, SilentProgress, WorkflowConfig, WorkflowOutcome, run_workflow,
};
pub use populator::FeedPopulator;
