//! Matching functions selecting which feed items serve for a campaign.
//!
//! Built as a small expression tree and rendered to the platform's function
//! syntax only when the campaign feed is sent, e.g.
//! `AND( IN(FEED_ITEM_ID, {1,2,3}), EQUALS(CONTEXT.DEVICE, "Mobile") )`.

use std::collections::HashSet;
use std::fmt;

use sitelinks_shared::{Device, FeedItemId, Result, SitelinksError};

/// A contextual condition evaluated at serving time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextPredicate {
    /// `EQUALS(CONTEXT.DEVICE, "<device>")`
    DeviceEquals(Device),
}

/// Boolean matching function over feed items and serving context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchingFunction {
    /// `IN(FEED_ITEM_ID, {ids})`
    FeedItemIn(Vec<FeedItemId>),
    Context(ContextPredicate),
    /// Conjunction of two or more operands.
    And(Vec<MatchingFunction>),
}

impl MatchingFunction {
    /// Membership test over `ids`. Duplicates collapse; order is kept.
    pub fn feed_items(ids: &[FeedItemId]) -> Result<Self> {
        if ids.is_empty() {
            return Err(SitelinksError::association(
                "matching function needs at least one feed item id",
            ));
        }

        let mut seen = HashSet::new();
        let unique = ids.iter().copied().filter(|id| seen.insert(*id)).collect();
        Ok(Self::FeedItemIn(unique))
    }

    /// Items in `ids`, further restricted by `extra` when given.
    pub fn for_items(ids: &[FeedItemId], extra: Option<ContextPredicate>) -> Result<Self> {
        let membership = Self::feed_items(ids)?;
        Ok(match extra {
            Some(predicate) => membership.and(Self::Context(predicate)),
            None => membership,
        })
    }

    /// Conjoin two functions, flattening nested `AND`s.
    pub fn and(self, other: MatchingFunction) -> Self {
        let mut operands = match self {
            Self::And(operands) => operands,
            single => vec![single],
        };
        match other {
            Self::And(more) => operands.extend(more),
            single => operands.push(single),
        }
        Self::And(operands)
    }

    /// Every feed item id referenced by a membership clause.
    pub fn item_ids(&self) -> Vec<FeedItemId> {
        match self {
            Self::FeedItemIn(ids) => ids.clone(),
            Self::Context(_) => Vec::new(),
            Self::And(operands) => operands.iter().flat_map(Self::item_ids).collect(),
        }
    }
}

impl fmt::Display for ContextPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DeviceEquals(device) => write!(f, "EQUALS(CONTEXT.DEVICE, \"{device}\")"),
        }
    }
}

impl fmt::Display for MatchingFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FeedItemIn(ids) => {
                f.write_str("IN(FEED_ITEM_ID, {")?;
                for (i, id) in ids.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{id}")?;
                }
                f.write_str("})")
            }
            Self::Context(predicate) => write!(f, "{predicate}"),
            Self::And(operands) => {
                f.write_str("AND( ")?;
                for (i, operand) in operands.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{operand}")?;
                }
                f.write_str(" )")
            }
        }
    }
}
