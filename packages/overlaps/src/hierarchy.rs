//! Compile-time registry of spatial hierarchies.
//!
//! Each hierarchy is defined in a TOML file under `hierarchies/` and
//! names the URI prefix of all its features, the prefix of its
//! finest-granularity "base unit" dataset, and the linksets that bridge
//! it to other hierarchies. Classification is a pure prefix lookup; the
//! graph is never consulted.

use serde::Deserialize;

/// One spatial hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Hierarchy {
    /// Unique identifier (e.g., `"asgs2016"`).
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Prefix shared by every feature URI in the hierarchy.
    pub parent_prefix: String,
    /// Prefix of the finest-granularity dataset.
    pub base_prefix: String,
    /// Feature type IRI of the base units.
    pub base_type: String,
    /// Substring identifying this hierarchy's feature type IRIs.
    pub type_pattern: String,
    /// Linksets relating this hierarchy to others.
    #[serde(default)]
    pub linksets: Vec<String>,
}

/// How a URI sits within its hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitKind {
    /// A finest-granularity feature.
    Base,
    /// Any coarser feature built from base units.
    Parent,
}

impl Hierarchy {
    /// Whether `uri` is one of this hierarchy's base units.
    #[must_use]
    pub fn is_base(&self, uri: &str) -> bool {
        uri.starts_with(&self.base_prefix)
    }

    /// Whether `uri` belongs to this hierarchy at all.
    #[must_use]
    pub fn contains_uri(&self, uri: &str) -> bool {
        uri.starts_with(&self.parent_prefix)
    }

    /// Whether `uri` is a coarser (non-base) feature of this hierarchy.
    #[must_use]
    pub fn is_parent(&self, uri: &str) -> bool {
        self.contains_uri(uri) && !self.is_base(uri)
    }
}

// ── Compile-time embedded TOML files ────────────────────────────────

const HIERARCHY_TOMLS: &[(&str, &str)] = &[
    ("asgs2016", include_str!("../hierarchies/asgs2016.toml")),
    ("geofabric", include_str!("../hierarchies/geofabric.toml")),
    ("gnaf", include_str!("../hierarchies/gnaf.toml")),
];

#[cfg(test)]
const EXPECTED_HIERARCHY_COUNT: usize = 3;

/// The set of known hierarchies and the lookups over them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HierarchyRegistry {
    hierarchies: Vec<Hierarchy>,
}

impl HierarchyRegistry {
    /// Builds a registry from explicit definitions.
    #[must_use]
    pub const fn new(hierarchies: Vec<Hierarchy>) -> Self {
        Self { hierarchies }
    }

    /// Loads the hierarchies embedded at compile time.
    ///
    /// # Panics
    ///
    /// Panics if any embedded TOML file fails to parse. These are
    /// compile-time constants, so a failure is a development error caught
    /// by the tests below.
    #[must_use]
    pub fn embedded() -> Self {
        let hierarchies = HIERARCHY_TOMLS
            .iter()
            .map(|(name, toml_str)| {
                toml::de::from_str(toml_str)
                    .unwrap_or_else(|e| panic!("Failed to parse hierarchy '{name}': {e}"))
            })
            .collect();
        Self::new(hierarchies)
    }

    /// All hierarchies.
    #[must_use]
    pub fn all(&self) -> &[Hierarchy] {
        &self.hierarchies
    }

    /// The hierarchy `uri` belongs to, preferring the longest matching
    /// prefix.
    #[must_use]
    pub fn hierarchy_of(&self, uri: &str) -> Option<&Hierarchy> {
        self.hierarchies
            .iter()
            .filter(|h| h.contains_uri(uri))
            .max_by_key(|h| h.parent_prefix.len())
    }

    /// Classifies `uri` as a base or parent unit of its hierarchy.
    #[must_use]
    pub fn classify(&self, uri: &str) -> Option<(&Hierarchy, UnitKind)> {
        let hierarchy = self.hierarchy_of(uri)?;
        let kind = if hierarchy.is_base(uri) {
            UnitKind::Base
        } else {
            UnitKind::Parent
        };
        Some((hierarchy, kind))
    }

    /// The hierarchy whose feature types `type_uri` names.
    #[must_use]
    pub fn hierarchy_for_type(&self, type_uri: &str) -> Option<&Hierarchy> {
        self.hierarchies
            .iter()
            .find(|h| type_uri.contains(&h.type_pattern))
    }

    /// When `other_uri` is a base unit of a hierarchy different from the
    /// one `from_uri` belongs to, returns that other hierarchy.
    #[must_use]
    pub fn foreign_base_hierarchy(&self, from_uri: &str, other_uri: &str) -> Option<&Hierarchy> {
        let from = self.hierarchy_of(from_uri)?;
        let other = self.hierarchy_of(other_uri)?;
        (other.id != from.id && other.is_base(other_uri)).then_some(other)
    }

    /// Picks the linkset bridging `source_uri`'s hierarchy to the
    /// hierarchy of `output_type`: the first linkset both declare.
    #[must_use]
    pub fn find_linkset(&self, source_uri: &str, output_type: Option<&str>) -> Option<&str> {
        let source = self.hierarchy_of(source_uri)?;
        let target = self.hierarchy_for_type(output_type?)?;
        source
            .linksets
            .iter()
            .find(|l| target.linksets.contains(l))
            .map(String::as_str)
    }
}
