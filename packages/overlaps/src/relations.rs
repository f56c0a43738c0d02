//! Relationship queries against the spatial graph.
//!
//! A relation lookup finds every feature a target overlaps, contains, or
//! is within. Both provenance encodings in the cache are followed: reified
//! statements (`rdf:subject`/`rdf:predicate`/`rdf:object`) and direct
//! triples. A linkset filter restricts matches to reified statements that
//! are part of that linkset.

use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use loci_graph::query::{Expr, Iri, Node, Path, Pattern, Query};
use loci_graph::vocab::{
    DATA_VALUE, DCT_IS_PART_OF, EPSG_3577, GEO_SF_CONTAINS, GEO_SF_OVERLAPS, GEO_SF_WITHIN,
    GEOX_HAS_AREA_M2, GEOX_IN_CRS, GEOX_IS_INTERSECTION_OF, RDF_OBJECT, RDF_PREDICATE,
    RDF_SUBJECT,
};
use loci_graph::{GraphStore, ask, select};
use loci_graph_models::{Row, Term};
use loci_overlaps_models::OverlapOptions;
use rust_decimal::Decimal;
use strum_macros::{AsRefStr, Display};

use crate::OverlapError;

/// A topological relation between two features.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, AsRefStr, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Relation {
    /// The features share some area.
    Overlaps,
    /// The target wholly contains the other feature.
    Contains,
    /// The target lies wholly within the other feature.
    Within,
}

impl Relation {
    const fn predicate(self) -> &'static str {
        match self {
            Self::Overlaps => GEO_SF_OVERLAPS,
            Self::Contains => GEO_SF_CONTAINS,
            Self::Within => GEO_SF_WITHIN,
        }
    }

    /// Containment is transitive, overlap is not.
    const fn direct_path(self) -> Path {
        match self {
            Self::Overlaps => Path::Name(self.predicate()),
            Self::Contains | Self::Within => Path::OneOrMore(self.predicate()),
        }
    }

    const fn flag(self) -> Option<&'static str> {
        match self {
            Self::Overlaps => None,
            Self::Contains => Some("c"),
            Self::Within => Some("w"),
        }
    }
}

/// One page of one relation lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelationRequest<'a> {
    /// Feature whose relations are wanted.
    pub target: &'a str,
    /// Which relation to follow.
    pub relation: Relation,
    /// Also fetch destination and intersection areas.
    pub with_areas: bool,
    /// Only follow statements that are part of this linkset.
    pub linkset: Option<&'a str>,
    /// Page size.
    pub limit: u64,
    /// Page offset.
    pub offset: u64,
}

/// A related feature, with whatever measurements the graph holds for it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelationRow {
    /// Related feature URI.
    pub uri: String,
    /// Area of the related feature.
    pub feature_area: Option<Decimal>,
    /// Area of the intersection with the target (overlaps only).
    pub intersection_area: Option<Decimal>,
    /// Set when the row came from the within lookup.
    pub is_within: Option<bool>,
    /// Set when the row came from the contains lookup.
    pub contains: Option<bool>,
}

impl RelationRow {
    /// A row carrying only a URI.
    #[must_use]
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            ..Self::default()
        }
    }

    /// Merges another row about the same feature into this one. A relation
    /// flag set by either row stays set; areas keep the first known value.
    fn absorb(&mut self, other: Self) {
        self.feature_area = self.feature_area.or(other.feature_area);
        self.intersection_area = self.intersection_area.or(other.intersection_area);
        self.is_within = either_flag(self.is_within, other.is_within);
        self.contains = either_flag(self.contains, other.contains);
    }
}

fn either_flag(a: Option<bool>, b: Option<bool>) -> Option<bool> {
    if a == Some(true) || b == Some(true) {
        Some(true)
    } else {
        a.or(b)
    }
}

/// Collapses rows naming the same feature into one row each, keeping the
/// order in which features were first seen.
///
/// The overlaps, contains and within lookups can each report the same
/// pair; folded, such a feature is measured once, with within taking
/// precedence over contains and contains over a plain intersection.
#[must_use]
pub fn fold_by_uri(rows: Vec<RelationRow>) -> Vec<RelationRow> {
    let mut folded: Vec<RelationRow> = Vec::with_capacity(rows.len());
    let mut positions: BTreeMap<String, usize> = BTreeMap::new();
    for row in rows {
        if let Some(existing) = positions.get(&row.uri).and_then(|&i| folded.get_mut(i)) {
            existing.absorb(row);
        } else {
            positions.insert(row.uri.clone(), folded.len());
            folded.push(row);
        }
    }
    folded
}

/// The read operations the overlap engine needs from the graph.
#[async_trait]
pub trait SpatialGraph: Send + Sync {
    /// Returns one page of features related to the request's target.
    ///
    /// # Errors
    ///
    /// Returns [`OverlapError`] if the graph cannot be queried.
    async fn related(&self, request: &RelationRequest<'_>) -> Result<Vec<RelationRow>, OverlapError>;

    /// The EPSG:3577 area of `uri`, if recorded.
    ///
    /// # Errors
    ///
    /// Returns [`OverlapError`] if the graph cannot be queried.
    async fn feature_area(&self, uri: &str) -> Result<Option<Decimal>, OverlapError>;

    /// Whether `uri` is an instance of `type_uri`.
    ///
    /// # Errors
    ///
    /// Returns [`OverlapError`] if the graph cannot be queried.
    async fn has_type(&self, uri: &str, type_uri: &str) -> Result<bool, OverlapError>;
}

/// [`SpatialGraph`] over a SPARQL [`GraphStore`].
#[derive(Clone)]
pub struct GraphBackend {
    store: Arc<dyn GraphStore>,
}

impl GraphBackend {
    /// Wraps a shared store.
    #[must_use]
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self { store }
    }

    /// The underlying store.
    #[must_use]
    pub fn store(&self) -> &dyn GraphStore {
        self.store.as_ref()
    }
}

impl std::fmt::Debug for GraphBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphBackend").finish_non_exhaustive()
    }
}

/// `?area_node` in EPSG:3577 with its value bound to `value`.
fn area_of(feature: Node, area_node: &'static str, value: &'static str) -> Vec<Pattern> {
    vec![
        Pattern::triple(feature, Path::Name(GEOX_HAS_AREA_M2), Node::Var(area_node)),
        Pattern::triple(Node::Var(area_node), Path::Name(GEOX_IN_CRS), Node::Name(EPSG_3577)),
        Pattern::triple(Node::Var(area_node), Path::Name(DATA_VALUE), Node::Var(value)),
    ]
}

/// Builds the relation query for one target.
///
/// # Errors
///
/// Returns [`OverlapError`] if the target or linkset is not a valid IRI.
pub fn relation_query(request: &RelationRequest<'_>) -> Result<Query, OverlapError> {
    let target = Iri::parse(request.target)?;
    let relation = request.relation;

    let mut reified = vec![
        Pattern::triple(Node::Var("s"), Path::Name(RDF_SUBJECT), Node::Iri(target.clone())),
        Pattern::triple(
            Node::Var("s"),
            Path::Name(RDF_PREDICATE),
            Node::Name(relation.predicate()),
        ),
        Pattern::triple(Node::Var("s"), Path::Name(RDF_OBJECT), Node::Var("o")),
    ];

    let mut query = Query::select(["o", "oarea", "iarea", "w", "c"]).distinct();
    if let Some(linkset) = request.linkset {
        reified.push(Pattern::triple(
            Node::Var("s"),
            Path::Name(DCT_IS_PART_OF),
            Node::Iri(Iri::parse(linkset)?),
        ));
        query = query.patterns(reified);
    } else {
        let direct = vec![Pattern::triple(
            Node::Iri(target.clone()),
            relation.direct_path(),
            Node::Var("o"),
        )];
        query = query.pattern(Pattern::union([reified, direct]));
    }

    if request.with_areas {
        query = query.pattern(Pattern::Optional(area_of(Node::Var("o"), "oa", "oarea")));
        if relation == Relation::Overlaps {
            let mut intersection = vec![
                Pattern::triple(
                    Node::Var("i"),
                    Path::Name(GEOX_IS_INTERSECTION_OF),
                    Node::Iri(target),
                ),
                Pattern::triple(Node::Var("i"), Path::Name(GEOX_IS_INTERSECTION_OF), Node::Var("o")),
            ];
            intersection.extend(area_of(Node::Var("i"), "ia", "iarea"));
            query = query.pattern(Pattern::Optional(intersection));
        }
    }

    if let Some(flag) = relation.flag() {
        query = query.pattern(Pattern::Bind(Expr::Bool(true), flag));
    }
    Ok(query)
}

/// Parses a bound `xsd:decimal`/`xsd:double` literal.
fn decimal(term: Option<&Term>) -> Option<Decimal> {
    let text = term?.value.trim();
    Decimal::from_str(text)
        .or_else(|_| Decimal::from_scientific(text))
        .map_err(|e| log::warn!("Ignoring unparseable area {text:?}: {e}"))
        .ok()
}

fn relation_row(row: &Row) -> Option<RelationRow> {
    Some(RelationRow {
        uri: row.get("o")?.value.clone(),
        feature_area: decimal(row.get("oarea")),
        intersection_area: decimal(row.get("iarea")),
        is_within: row.get("w").and_then(Term::as_bool),
        contains: row.get("c").and_then(Term::as_bool),
    })
}

#[async_trait]
impl SpatialGraph for GraphBackend {
    async fn related(&self, request: &RelationRequest<'_>) -> Result<Vec<RelationRow>, OverlapError> {
        let query = relation_query(request)?;
        let results = select(self.store(), &query, request.limit, request.offset).await?;
        let rows: Vec<RelationRow> = results.rows().iter().filter_map(relation_row).collect();
        log::debug!(
            "{} {}: {} rows at offset {}",
            request.relation,
            request.target,
            rows.len(),
            request.offset
        );
        Ok(rows)
    }

    async fn feature_area(&self, uri: &str) -> Result<Option<Decimal>, OverlapError> {
        let query = Query::select(["area"]).patterns(area_of(
            Node::Iri(Iri::parse(uri)?),
            "a",
            "area",
        ));
        let results = select(self.store(), &query, 1, 0).await?;
        Ok(results
            .rows()
            .first()
            .and_then(|row| decimal(row.get("area"))))
    }

    async fn has_type(&self, uri: &str, type_uri: &str) -> Result<bool, OverlapError> {
        let query = Query::ask().pattern(Pattern::triple(
            Node::Iri(Iri::parse(uri)?),
            Path::Type,
            Node::Iri(Iri::parse(type_uri)?),
        ));
        Ok(ask(self.store(), &query).await?)
    }
}

/// Fetches one page of every requested relation of `target`.
///
/// Overlaps are always queried; contains and within follow when the
/// options ask for them. Rows are concatenated in that order.
///
/// # Errors
///
/// Returns [`OverlapError`] if any lookup fails.
pub async fn relations_page(
    graph: &dyn SpatialGraph,
    target: &str,
    options: &OverlapOptions,
    linkset: Option<&str>,
    limit: u64,
    offset: u64,
) -> Result<Vec<RelationRow>, OverlapError> {
    let mut relations = vec![Relation::Overlaps];
    if options.include_contains {
        relations.push(Relation::Contains);
    }
    if options.include_within {
        relations.push(Relation::Within);
    }

    let mut rows = Vec::new();
    for relation in relations {
        let request = RelationRequest {
            target,
            relation,
            with_areas: options.wants_measures(),
            linkset,
            limit,
            offset,
        };
        rows.extend(graph.related(&request).await?);
    }
    Ok(rows)
}
