#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Overlap record and measurement types.
//!
//! Areas (square metres, EPSG:3577) and percentages are exact decimals
//! rounded to [`SCALE`] fractional digits whenever they are stored, so
//! that re-aggregating percentages never accumulates floating-point
//! drift. They serialize as decimal strings, not JSON numbers.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Fractional digits kept on every stored quantity.
pub const SCALE: u32 = 8;

/// Marker rendered for a value that could not be determined.
pub const UNKNOWN_MARKER: &str = "nan";

/// Rounds to [`SCALE`] fractional digits (banker's rounding).
#[must_use]
pub fn quantize(value: Decimal) -> Decimal {
    value.round_dp(SCALE)
}

/// `part / whole × 100`, quantized. `None` when `whole` is zero.
#[must_use]
pub fn percentage(part: Decimal, whole: Decimal) -> Option<Decimal> {
    if whole.is_zero() {
        return None;
    }
    part.checked_mul(Decimal::ONE_HUNDRED)?
        .checked_div(whole)
        .map(quantize)
}

/// A measured quantity that is either known exactly or unknown.
///
/// Unknown arises when an upstream area or percentage was missing and a
/// derived value could not be computed. It absorbs arithmetic: anything
/// combined with an unknown value is unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Numeric {
    /// An exact value, already quantized.
    Known(Decimal),
    /// Not determinable from the available data.
    Unknown,
}

impl Numeric {
    /// Wraps and quantizes a known value.
    #[must_use]
    pub fn known(value: Decimal) -> Self {
        Self::Known(quantize(value))
    }

    /// Wraps an optional value, mapping `None` to [`Numeric::Unknown`].
    #[must_use]
    pub fn from_option(value: Option<Decimal>) -> Self {
        value.map_or(Self::Unknown, Self::known)
    }

    /// The known value, if any.
    #[must_use]
    pub const fn value(self) -> Option<Decimal> {
        match self {
            Self::Known(v) => Some(v),
            Self::Unknown => None,
        }
    }

    /// Whether the value is known.
    #[must_use]
    pub const fn is_known(self) -> bool {
        matches!(self, Self::Known(_))
    }

    /// Sum of two quantities.
    #[must_use]
    pub fn plus(self, other: Self) -> Self {
        match (self, other) {
            (Self::Known(a), Self::Known(b)) => {
                a.checked_add(b).map_or(Self::Unknown, Self::known)
            }
            _ => Self::Unknown,
        }
    }

    /// The share of `self` given by `percent` (`self × percent / 100`).
    #[must_use]
    pub fn portion(self, percent: Self) -> Self {
        match (self, percent) {
            (Self::Known(total), Self::Known(pct)) => total
                .checked_mul(pct)
                .and_then(|v| v.checked_div(Decimal::ONE_HUNDRED))
                .map_or(Self::Unknown, Self::known),
            _ => Self::Unknown,
        }
    }

    /// `self` as a percentage of `whole`; unknown when either side is
    /// unknown or `whole` is zero.
    #[must_use]
    pub fn percentage_of(self, whole: Self) -> Self {
        match (self, whole) {
            (Self::Known(part), Self::Known(whole)) => {
                percentage(part, whole).map_or(Self::Unknown, Self::Known)
            }
            _ => Self::Unknown,
        }
    }

    /// Caps a known percentage at 100.
    #[must_use]
    pub fn capped_at_full(self) -> Self {
        match self {
            Self::Known(v) => Self::Known(v.min(Decimal::ONE_HUNDRED)),
            Self::Unknown => Self::Unknown,
        }
    }
}

impl From<Decimal> for Numeric {
    fn from(value: Decimal) -> Self {
        Self::known(value)
    }
}

impl fmt::Display for Numeric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Known(v) => write!(f, "{:.prec$}", v, prec = SCALE as usize),
            Self::Unknown => f.write_str(UNKNOWN_MARKER),
        }
    }
}

impl Serialize for Numeric {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Numeric {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        if text.eq_ignore_ascii_case(UNKNOWN_MARKER) {
            return Ok(Self::Unknown);
        }
        Decimal::from_str(&text)
            .map(Self::known)
            .map_err(serde::de::Error::custom)
    }
}

/// Which measurements and relations an overlap query should include.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OverlapOptions {
    /// Include feature and intersection areas.
    pub include_areas: bool,
    /// Include forward/reverse percentages.
    pub include_proportion: bool,
    /// Include features the target is wholly within.
    pub include_within: bool,
    /// Include features wholly contained by the target.
    pub include_contains: bool,
}

impl OverlapOptions {
    /// Options requesting every relation and every measurement.
    #[must_use]
    pub const fn all() -> Self {
        Self {
            include_areas: true,
            include_proportion: true,
            include_within: true,
            include_contains: true,
        }
    }

    /// Whether any area or percentage was requested. Without measurements
    /// results are a flat URI list.
    #[must_use]
    pub const fn wants_measures(&self) -> bool {
        self.include_areas || self.include_proportion
    }
}

/// One related feature together with its overlap measurements.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlapRecord {
    /// Related feature URI.
    pub uri: String,
    /// The target lies wholly within this feature.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_within: Option<bool>,
    /// The target wholly contains this feature.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contains: Option<bool>,
    /// Area of this feature.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_area: Option<Numeric>,
    /// Area shared with the target.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intersection_area: Option<Numeric>,
    /// Intersection as a percentage of the target's area.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forward_percentage: Option<Numeric>,
    /// Intersection as a percentage of this feature's area.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reverse_percentage: Option<Numeric>,
}

impl OverlapRecord {
    /// A record carrying only a URI.
    #[must_use]
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            ..Self::default()
        }
    }

    /// Drops fields the caller did not ask for.
    pub fn retain_measures(&mut self, options: &OverlapOptions) {
        if !options.include_areas {
            self.feature_area = None;
            self.intersection_area = None;
        }
        if !options.include_proportion {
            self.forward_percentage = None;
            self.reverse_percentage = None;
        }
    }
}

/// Metadata returned alongside an overlap listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverlapMeta {
    /// Number of records returned.
    pub count: usize,
    /// Offset the listing was requested at.
    pub offset: u64,
    /// Area of the target feature, when areas were requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_area: Option<Numeric>,
}

/// An overlap listing: bare URIs when no measurements were requested,
/// full records otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Overlaps {
    /// Related feature URIs.
    Uris(Vec<String>),
    /// Related features with measurements.
    Records(Vec<OverlapRecord>),
}

impl Overlaps {
    /// Shapes records for output.
    #[must_use]
    pub fn from_records(records: Vec<OverlapRecord>, options: &OverlapOptions) -> Self {
        if options.wants_measures() {
            Self::Records(records)
        } else {
            Self::Uris(records.into_iter().map(|r| r.uri).collect())
        }
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Uris(uris) => uris.len(),
            Self::Records(records) => records.len(),
        }
    }

    /// Whether there are no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
