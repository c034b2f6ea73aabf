//! Workflow context threaded through the four stages.
//!
//! Each stage consumes the previous stage's value and returns a larger one:
//! [`DefinedFeed`] → [`PopulatedFeed`] → [`MappedFeed`]. Fields are only
//! readable from outside this crate, so an earlier stage's ids can never be
//! overwritten by a later one.

use std::collections::HashSet;

use sitelinks_shared::{
    Feed, FeedAttributeId, FeedAttributeSpec, FeedAttributeType, FeedId, FeedItem, FeedItemId,
    FeedMapping, PlaceholderField, Result, SitelinksError,
};

// ---------------------------------------------------------------------------
// Sitelink roles
// ---------------------------------------------------------------------------

/// Semantic role of one sitelink feed attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SitelinkRole {
    LinkText,
    FinalUrl,
    Line1,
    Line2,
}

impl SitelinkRole {
    /// Declaration order of the sitelink feed schema.
    pub const ALL: [SitelinkRole; 4] = [Self::LinkText, Self::FinalUrl, Self::Line1, Self::Line2];

    /// Attribute name registered on the feed.
    pub fn attribute_name(&self) -> &'static str {
        match self {
            Self::LinkText => "Link Text",
            Self::FinalUrl => "Link URL",
            Self::Line1 => "Line 1 Description",
            Self::Line2 => "Line 2 Description",
        }
    }

    pub fn attribute_type(&self) -> FeedAttributeType {
        match self {
            Self::FinalUrl => FeedAttributeType::UrlList,
            _ => FeedAttributeType::String,
        }
    }

    /// Sitelink placeholder field this role is mapped to.
    pub fn placeholder_field(&self) -> PlaceholderField {
        match self {
            Self::LinkText => PlaceholderField::SitelinkLinkText,
            Self::FinalUrl => PlaceholderField::SitelinkFinalUrls,
            Self::Line1 => PlaceholderField::SitelinkLine1,
            Self::Line2 => PlaceholderField::SitelinkLine2,
        }
    }

    pub fn spec(&self) -> FeedAttributeSpec {
        FeedAttributeSpec::new(self.attribute_name(), self.attribute_type())
    }
}

/// The sitelink feed schema, in declaration order.
pub fn sitelink_schema() -> Vec<FeedAttributeSpec> {
    SitelinkRole::ALL.iter().map(SitelinkRole::spec).collect()
}

// ---------------------------------------------------------------------------
// SitelinkAttributes
// ---------------------------------------------------------------------------

/// Attribute ids of a registered sitelink feed, keyed by role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SitelinkAttributes {
    pub link_text: FeedAttributeId,
    pub final_url: FeedAttributeId,
    pub line1: FeedAttributeId,
    pub line2: FeedAttributeId,
}

impl SitelinkAttributes {
    /// Resolve every role on `feed` by attribute name and type.
    pub fn resolve(feed: &Feed) -> Result<Self> {
        let find = |role: SitelinkRole| -> Result<FeedAttributeId> {
            let mut matches = feed
                .attributes
                .iter()
                .filter(|attr| attr.name == role.attribute_name());

            let attr = matches.next().ok_or_else(|| {
                SitelinksError::definition(format!(
                    "feed {} has no '{}' attribute",
                    feed.id,
                    role.attribute_name()
                ))
            })?;
            if matches.next().is_some() {
                return Err(SitelinksError::definition(format!(
                    "feed {} declares '{}' more than once",
                    feed.id,
                    role.attribute_name()
                )));
            }
            if attr.attribute_type != role.attribute_type() {
                return Err(SitelinksError::definition(format!(
                    "feed {} attribute '{}' is {}, expected {}",
                    feed.id,
                    attr.name,
                    attr.attribute_type,
                    role.attribute_type()
                )));
            }
            Ok(attr.id)
        };

        let attributes = Self {
            link_text: find(SitelinkRole::LinkText)?,
            final_url: find(SitelinkRole::FinalUrl)?,
            line1: find(SitelinkRole::Line1)?,
            line2: find(SitelinkRole::Line2)?,
        };

        let distinct: HashSet<_> = SitelinkRole::ALL
            .iter()
            .map(|role| attributes.get(*role))
            .collect();
        if distinct.len() != SitelinkRole::ALL.len() {
            return Err(SitelinksError::definition(format!(
                "feed {} reused an attribute id across sitelink roles",
                feed.id
            )));
        }

        Ok(attributes)
    }

    pub fn get(&self, role: SitelinkRole) -> FeedAttributeId {
        match role {
            SitelinkRole::LinkText => self.link_text,
            SitelinkRole::FinalUrl => self.final_url,
            SitelinkRole::Line1 => self.line1,
            SitelinkRole::Line2 => self.line2,
        }
    }

    pub fn role_of(&self, id: FeedAttributeId) -> Option<SitelinkRole> {
        SitelinkRole::ALL
            .into_iter()
            .find(|role| self.get(*role) == id)
    }
}

// ---------------------------------------------------------------------------
// Stage values
// ---------------------------------------------------------------------------

/// Output of stage 1: a registered feed and its role-keyed attribute ids.
#[derive(Debug, Clone)]
pub struct DefinedFeed {
    feed: Feed,
    attributes: SitelinkAttributes,
}

impl DefinedFeed {
    pub(crate) fn new(feed: Feed, attributes: SitelinkAttributes) -> Self {
        Self { feed, attributes }
    }

    pub fn feed(&self) -> &Feed {
        &self.feed
    }

    pub fn feed_id(&self) -> FeedId {
        self.feed.id
    }

    pub fn attributes(&self) -> &SitelinkAttributes {
        &self.attributes
    }
}

/// Output of stage 2: the defined feed plus its items, in submission order.
#[derive(Debug, Clone)]
pub struct PopulatedFeed {
    defined: DefinedFeed,
    items: Vec<FeedItem>,
}

impl PopulatedFeed {
    pub(crate) fn new(defined: DefinedFeed, items: Vec<FeedItem>) -> Self {
        Self { defined, items }
    }

    pub fn defined(&self) -> &DefinedFeed {
        &self.defined
    }

    pub fn feed_id(&self) -> FeedId {
        self.defined.feed_id()
    }

    pub fn items(&self) -> &[FeedItem] {
        &self.items
    }

    pub fn item_ids(&self) -> Vec<FeedItemId> {
        self.items.iter().map(|item| item.feed_item_id).collect()
    }
}

/// Output of stage 3: the populated feed plus its placeholder mapping.
#[derive(Debug, Clone)]
pub struct MappedFeed {
    populated: PopulatedFeed,
    mapping: FeedMapping,
}

impl MappedFeed {
    pub(crate) fn new(populated: PopulatedFeed, mapping: FeedMapping) -> Self {
        Self { populated, mapping }
    }

    pub fn populated(&self) -> &PopulatedFeed {
        &self.populated
    }

    pub fn feed_id(&self) -> FeedId {
        self.populated.feed_id()
    }

    pub fn mapping(&self) -> &FeedMapping {
        &self.mapping
    }
}
