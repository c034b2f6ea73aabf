//! Domain and wire types for feeds, feed items, placeholder mappings and
//! campaign feeds.
//!
//! Field names serialize in the platform's camelCase so most types travel
//! over the wire unchanged. Feed items go through a private wire struct that
//! splits the geo target into its two platform fields.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }
    };
}

id_type!(
    /// Server-assigned feed identifier.
    FeedId
);
id_type!(
    /// Server-assigned identifier of one attribute slot within a feed.
    FeedAttributeId
);
id_type!(
    /// Server-assigned feed item (row) identifier.
    FeedItemId
);
id_type!(
    /// Server-assigned feed mapping identifier.
    FeedMappingId
);
id_type!(CampaignId);
id_type!(
    /// Geo criterion id, e.g. `21137` for California.
    LocationId
);

// ---------------------------------------------------------------------------
// Feeds
// ---------------------------------------------------------------------------

/// Value type of a feed attribute slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FeedAttributeType {
    String,
    Url,
    StringList,
    UrlList,
}

impl FeedAttributeType {
    /// Whether values for this slot are lists of text.
    pub fn is_list(&self) -> bool {
        matches!(self, Self::StringList | Self::UrlList)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "STRING",
            Self::Url => "URL",
            Self::StringList => "STRING_LIST",
            Self::UrlList => "URL_LIST",
        }
    }
}

impl std::fmt::Display for FeedAttributeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who owns the feed's contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FeedOrigin {
    #[default]
    User,
    Google,
}

/// A slot declaration submitted with a new feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedAttributeSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub attribute_type: FeedAttributeType,
}

impl FeedAttributeSpec {
    pub fn new(name: impl Into<String>, attribute_type: FeedAttributeType) -> Self {
        Self {
            name: name.into(),
            attribute_type,
        }
    }
}

/// A registered attribute slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedAttribute {
    pub id: FeedAttributeId,
    pub name: String,
    #[serde(rename = "type")]
    pub attribute_type: FeedAttributeType,
}

/// Feed registration payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewFeed {
    pub name: String,
    pub attributes: Vec<FeedAttributeSpec>,
    pub origin: FeedOrigin,
}

/// A registered feed, attributes in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feed {
    pub id: FeedId,
    pub name: String,
    pub attributes: Vec<FeedAttribute>,
    #[serde(default)]
    pub origin: FeedOrigin,
}

// ---------------------------------------------------------------------------
// Feed items
// ---------------------------------------------------------------------------

/// One cell of a feed item.
///
/// List-typed slots always carry [`AttributeValue::TextList`], even for a
/// single element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttributeValue {
    #[serde(rename = "stringValue")]
    Text(String),
    #[serde(rename = "stringValues")]
    TextList(Vec<String>),
}

impl AttributeValue {
    /// Whether this value can be stored in a slot of type `ty`.
    pub fn fits(&self, ty: FeedAttributeType) -> bool {
        match self {
            Self::Text(_) => !ty.is_list(),
            Self::TextList(_) => ty.is_list(),
        }
    }
}

/// A value keyed by the slot it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedItemAttributeValue {
    pub feed_attribute_id: FeedAttributeId,
    #[serde(flatten)]
    pub value: AttributeValue,
}

/// Geo restriction mode for a targeted feed item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GeoRestriction {
    /// Eligible only when the user is physically in the targeted location.
    LocationOfPresence,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoTarget {
    pub location_id: LocationId,
    pub restriction: GeoRestriction,
}

impl GeoTarget {
    pub fn location_of_presence(location_id: LocationId) -> Self {
        Self {
            location_id,
            restriction: GeoRestriction::LocationOfPresence,
        }
    }
}

/// Feed item registration payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "FeedItemWire", into = "FeedItemWire")]
pub struct NewFeedItem {
    pub feed_id: FeedId,
    pub attribute_values: Vec<FeedItemAttributeValue>,
    pub geo_target: Option<GeoTarget>,
}

/// A registered feed item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "FeedItemWire", into = "FeedItemWire")]
pub struct FeedItem {
    pub feed_item_id: FeedItemId,
    pub feed_id: FeedId,
    pub attribute_values: Vec<FeedItemAttributeValue>,
    pub geo_target: Option<GeoTarget>,
}

// The platform carries the location and its restriction as two sibling
// fields: `geoTargeting: {id}` and `geoTargetingRestriction: {geoRestriction}`.

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct LocationWire {
    id: LocationId,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeoRestrictionWire {
    geo_restriction: GeoRestriction,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FeedItemWire {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    feed_item_id: Option<FeedItemId>,
    feed_id: FeedId,
    #[serde(default)]
    attribute_values: Vec<FeedItemAttributeValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    geo_targeting: Option<LocationWire>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    geo_targeting_restriction: Option<GeoRestrictionWire>,
}

impl FeedItemWire {
    fn new(
        feed_item_id: Option<FeedItemId>,
        feed_id: FeedId,
        attribute_values: Vec<FeedItemAttributeValue>,
        geo_target: Option<GeoTarget>,
    ) -> Self {
        Self {
            feed_item_id,
            feed_id,
            attribute_values,
            geo_targeting: geo_target.map(|g| LocationWire { id: g.location_id }),
            geo_targeting_restriction: geo_target.map(|g| GeoRestrictionWire {
                geo_restriction: g.restriction,
            }),
        }
    }

    /// A location without an explicit restriction is location-of-presence,
    /// the only mode this tool creates.
    fn geo_target(&self) -> Option<GeoTarget> {
        self.geo_targeting.map(|location| GeoTarget {
            location_id: location.id,
            restriction: self
                .geo_targeting_restriction
                .map_or(GeoRestriction::LocationOfPresence, |r| r.geo_restriction),
        })
    }
}

impl From<FeedItemWire> for NewFeedItem {
    fn from(wire: FeedItemWire) -> Self {
        let geo_target = wire.geo_target();
        Self {
            feed_id: wire.feed_id,
            attribute_values: wire.attribute_values,
            geo_target,
        }
    }
}

impl From<NewFeedItem> for FeedItemWire {
    fn from(item: NewFeedItem) -> Self {
        Self::new(None, item.feed_id, item.attribute_values, item.geo_target)
    }
}

impl TryFrom<FeedItemWire> for FeedItem {
    type Error = String;

    fn try_from(wire: FeedItemWire) -> std::result::Result<Self, Self::Error> {
        let geo_target = wire.geo_target();
        let feed_item_id = wire
            .feed_item_id
            .ok_or_else(|| format!("feed item for feed {} has no feedItemId", wire.feed_id))?;
        Ok(Self {
            feed_item_id,
            feed_id: wire.feed_id,
            attribute_values: wire.attribute_values,
            geo_target,
        })
    }
}

impl From<FeedItem> for FeedItemWire {
    fn from(item: FeedItem) -> Self {
        Self::new(
            Some(item.feed_item_id),
            item.feed_id,
            item.attribute_values,
            item.geo_target,
        )
    }
}

// ---------------------------------------------------------------------------
// Placeholders
// ---------------------------------------------------------------------------

/// Extension type a feed can be mapped to. Serialized as the platform's
/// numeric placeholder type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum PlaceholderType {
    Sitelinks,
    Callouts,
}

impl PlaceholderType {
    pub fn code(&self) -> u32 {
        match self {
            Self::Sitelinks => 1,
            Self::Callouts => 17,
        }
    }

    /// Fields that every mapping for this placeholder type must bind.
    pub fn required_fields(&self) -> &'static [PlaceholderField] {
        match self {
            Self::Sitelinks => &[
                PlaceholderField::SitelinkLinkText,
                PlaceholderField::SitelinkFinalUrls,
                PlaceholderField::SitelinkLine1,
                PlaceholderField::SitelinkLine2,
            ],
            Self::Callouts => &[PlaceholderField::CalloutText],
        }
    }
}

impl From<PlaceholderType> for u32 {
    fn from(value: PlaceholderType) -> Self {
        value.code()
    }
}

impl TryFrom<u32> for PlaceholderType {
    type Error = String;

    fn try_from(value: u32) -> std::result::Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Sitelinks),
            17 => Ok(Self::Callouts),
            other => Err(format!("unsupported placeholder type {other}")),
        }
    }
}

impl std::fmt::Display for PlaceholderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sitelinks => f.write_str("SITELINKS"),
            Self::Callouts => f.write_str("CALLOUTS"),
        }
    }
}

/// A semantically typed field of one placeholder type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PlaceholderField {
    SitelinkLinkText,
    SitelinkLine1,
    SitelinkLine2,
    SitelinkFinalUrls,
    SitelinkFinalMobileUrls,
    SitelinkTrackingUrlTemplate,
    CalloutText,
}

impl PlaceholderField {
    /// The placeholder type this field belongs to.
    pub fn placeholder_type(&self) -> PlaceholderType {
        match self {
            Self::CalloutText => PlaceholderType::Callouts,
            _ => PlaceholderType::Sitelinks,
        }
    }

    /// Platform field id, unique only within the owning placeholder type.
    pub fn field_id(&self) -> u32 {
        match self {
            Self::SitelinkLinkText => 1,
            Self::SitelinkLine1 => 3,
            Self::SitelinkLine2 => 4,
            Self::SitelinkFinalUrls => 5,
            Self::SitelinkFinalMobileUrls => 6,
            Self::SitelinkTrackingUrlTemplate => 7,
            Self::CalloutText => 1,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::SitelinkLinkText => "SITELINK_LINK_TEXT",
            Self::SitelinkLine1 => "SITELINK_LINE_1",
            Self::SitelinkLine2 => "SITELINK_LINE_2",
            Self::SitelinkFinalUrls => "SITELINK_FINAL_URLS",
            Self::SitelinkFinalMobileUrls => "SITELINK_FINAL_MOBILE_URLS",
            Self::SitelinkTrackingUrlTemplate => "SITELINK_TRACKING_URL_TEMPLATE",
            Self::CalloutText => "CALLOUT_TEXT",
        }
    }
}

impl std::fmt::Display for PlaceholderField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// One `(attribute → field id)` pair as sent to the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeFieldMapping {
    pub feed_attribute_id: FeedAttributeId,
    pub field_id: u32,
}

/// Feed mapping registration payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFeedMapping {
    pub feed_id: FeedId,
    pub placeholder_type: PlaceholderType,
    pub attribute_field_mappings: Vec<AttributeFieldMapping>,
}

/// A registered feed mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedMapping {
    pub feed_mapping_id: FeedMappingId,
    pub feed_id: FeedId,
    pub placeholder_type: PlaceholderType,
    #[serde(default)]
    pub attribute_field_mappings: Vec<AttributeFieldMapping>,
}

// ---------------------------------------------------------------------------
// Campaign feeds
// ---------------------------------------------------------------------------

/// Rendered matching function, consumed verbatim by the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedFunction {
    pub function_string: String,
}

/// Association of a feed with a campaign. Identified by `(feed_id,
/// campaign_id)`; the platform assigns no separate id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignFeed {
    pub feed_id: FeedId,
    pub campaign_id: CampaignId,
    pub matching_function: FeedFunction,
    pub placeholder_types: Vec<PlaceholderType>,
}

/// Device classes understood by `CONTEXT.DEVICE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Device {
    Mobile,
    Desktop,
}

impl Device {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mobile => "Mobile",
            Self::Desktop => "Desktop",
        }
    }
}

impl std::fmt::Display for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configured device filter. `Any` attaches no device predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DeviceFilter {
    Any,
    #[default]
    Mobile,
    Desktop,
}

impl DeviceFilter {
    pub fn device(self) -> Option<Device> {
        match self {
            Self::Any => None,
            Self::Mobile => Some(Device::Mobile),
            Self::Desktop => Some(Device::Desktop),
        }
    }
}

// ---------------------------------------------------------------------------
// Workflow inputs
// ---------------------------------------------------------------------------

/// One sitelink to create as a feed item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SitelinkSpec {
    pub text: String,
    pub final_url: String,
    pub line1: String,
    pub line2: String,
    /// Restrict the sitelink to users located here.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_id: Option<LocationId>,
}

impl SitelinkSpec {
    pub fn new(
        text: impl Into<String>,
        final_url: impl Into<String>,
        line1: impl Into<String>,
        line2: impl Into<String>,
    ) -> Self {
        Self {
            text: text.into(),
            final_url: final_url.into(),
            line1: line1.into(),
            line2: line2.into(),
            location_id: None,
        }
    }

    pub fn with_location(mut self, location_id: LocationId) -> Self {
        self.location_id = Some(location_id);
        self
    }
}

/// The four workflow stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum WorkflowStage {
    Definition,
    Population,
    Mapping,
    Association,
}

impl std::fmt::Display for WorkflowStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Definition => "feed definition",
            Self::Population => "feed population",
            Self::Mapping => "placeholder mapping",
            Self::Association => "campaign association",
        };
        f.write_str(name)
    }
}
