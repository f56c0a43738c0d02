//! Simple entity listings.
//!
//! Each listing runs one paged `SELECT`, keeps a single projected column,
//! and echoes the page window back in a [`PageMeta`]. A store response
//! without a `results` wrapper yields an empty page.

use loci_graph_models::{DatasetType, PageMeta, SparqlResults};

use crate::query::{Iri, Node, Path, Pattern, Query};
use crate::vocab::{
    DCAT_DATASET, GEO_FEATURE, GEO_SF_CONTAINS, GEO_SF_WITHIN, LOCI_HAS_BASE_FEATURE_TYPE,
    LOCI_HAS_FEATURE_TYPE, LOCI_LINKSET, PROV_LOCATION, RDF_OBJECT, RDF_PREDICATE, RDF_SUBJECT,
    RDF_TYPE, RDFS_SUB_CLASS_OF,
};
use crate::{GraphError, GraphStore, select};

/// Union branches matching instances of `class`, directly or through any
/// transitive subclass bound to `via`.
fn instance_branches(var: &'static str, class: &'static str, via: &'static str) -> [Vec<Pattern>; 2] {
    [
        vec![Pattern::triple(Node::Var(var), Path::Type, Node::Name(class))],
        vec![
            Pattern::triple(
                Node::Var(via),
                Path::OneOrMore(RDFS_SUB_CLASS_OF),
                Node::Name(class),
            ),
            Pattern::triple(Node::Var(var), Path::Type, Node::Var(via)),
        ],
    ]
}

fn instances_of(var: &'static str, class: &'static str, via: &'static str) -> Pattern {
    Pattern::union(instance_branches(var, class, via))
}

/// Reified `s rdf:predicate p ; rdf:object o` statement about `subject`.
fn reified(stmt: &'static str, subject: Node, predicate: &'static str, object: Node) -> Vec<Pattern> {
    vec![
        Pattern::triple(Node::Var(stmt), Path::Name(RDF_SUBJECT), subject),
        Pattern::triple(Node::Var(stmt), Path::Name(RDF_PREDICATE), Node::Name(predicate)),
        Pattern::triple(Node::Var(stmt), Path::Name(RDF_OBJECT), object),
    ]
}

fn column(results: &SparqlResults, var: &str) -> Vec<String> {
    results
        .rows()
        .iter()
        .filter_map(|row| row.get(var).map(|term| term.value.clone()))
        .collect()
}

async fn list_column(
    store: &dyn GraphStore,
    query: &Query,
    var: &str,
    count: u64,
    offset: u64,
) -> Result<(PageMeta, Vec<String>), GraphError> {
    let results = select(store, query, count, offset).await?;
    let items = column(&results, var);
    let meta = PageMeta {
        count: items.len(),
        offset,
    };
    Ok((meta, items))
}

/// Lists all linksets.
///
/// # Errors
///
/// Returns [`GraphError`] if the store call fails.
pub async fn get_linksets(
    store: &dyn GraphStore,
    count: u64,
    offset: u64,
) -> Result<(PageMeta, Vec<String>), GraphError> {
    let query = Query::select(["l"])
        .distinct()
        .pattern(instances_of("l", LOCI_LINKSET, "c"));
    list_column(store, &query, "l", count, offset).await
}

/// Lists all datasets.
///
/// # Errors
///
/// Returns [`GraphError`] if the store call fails.
pub async fn get_datasets(
    store: &dyn GraphStore,
    count: u64,
    offset: u64,
) -> Result<(PageMeta, Vec<String>), GraphError> {
    let query = Query::select(["d"])
        .distinct()
        .pattern(instances_of("d", DCAT_DATASET, "c"));
    list_column(store, &query, "d", count, offset).await
}

/// Lists all locations: features and provenance locations, whether typed
/// directly, through a subclass, or through a reified `rdf:type`.
///
/// # Errors
///
/// Returns [`GraphError`] if the store call fails.
pub async fn get_locations(
    store: &dyn GraphStore,
    count: u64,
    offset: u64,
) -> Result<(PageMeta, Vec<String>), GraphError> {
    let mut branches = Vec::new();
    for (class, via, stmt) in [(GEO_FEATURE, "c1", "s1"), (PROV_LOCATION, "c2", "s2")] {
        branches.extend(instance_branches("l", class, via));
        branches.push(reified(stmt, Node::Var("l"), RDF_TYPE, Node::Name(class)));
    }
    let query = Query::select(["l"])
        .distinct()
        .pattern(Pattern::Union(branches));
    list_column(store, &query, "l", count, offset).await
}

fn related_query(target: &Iri, predicate: &'static str) -> Query {
    Query::select(["l"]).distinct().pattern(Pattern::union([
        reified("s", Node::Iri(target.clone()), predicate, Node::Var("l")),
        vec![Pattern::triple(
            Node::Iri(target.clone()),
            Path::OneOrMore(predicate),
            Node::Var("l"),
        )],
    ]))
}

/// Lists the locations `target_uri` is within.
///
/// # Errors
///
/// Returns [`GraphError`] if the URI is not a valid IRI or the store call
/// fails.
pub async fn get_location_is_within(
    store: &dyn GraphStore,
    target_uri: &str,
    count: u64,
    offset: u64,
) -> Result<(PageMeta, Vec<String>), GraphError> {
    let query = related_query(&Iri::parse(target_uri)?, GEO_SF_WITHIN);
    list_column(store, &query, "l", count, offset).await
}

/// Lists the locations `target_uri` contains.
///
/// # Errors
///
/// Returns [`GraphError`] if the URI is not a valid IRI or the store call
/// fails.
pub async fn get_location_contains(
    store: &dyn GraphStore,
    target_uri: &str,
    count: u64,
    offset: u64,
) -> Result<(PageMeta, Vec<String>), GraphError> {
    let query = related_query(&Iri::parse(target_uri)?, GEO_SF_CONTAINS);
    list_column(store, &query, "l", count, offset).await
}

/// Lists `(dataset, feature type)` pairs.
///
/// `dataset_uri` and `type_uri` narrow the listing; `base_type_only`
/// restricts each dataset to its finest-granularity feature type.
///
/// # Errors
///
/// Returns [`GraphError`] if a filter URI is not a valid IRI or the store
/// call fails.
pub async fn get_dataset_types(
    store: &dyn GraphStore,
    dataset_uri: Option<&str>,
    type_uri: Option<&str>,
    base_type_only: bool,
    count: u64,
    offset: u64,
) -> Result<(PageMeta, Vec<DatasetType>), GraphError> {
    let predicate = if base_type_only {
        LOCI_HAS_BASE_FEATURE_TYPE
    } else {
        LOCI_HAS_FEATURE_TYPE
    };

    let mut query = Query::select(["d", "t"]).distinct();
    if let Some(uri) = dataset_uri {
        query = query.pattern(Pattern::Values("d", vec![Iri::parse(uri)?]));
    }
    if let Some(uri) = type_uri {
        query = query.pattern(Pattern::Values("t", vec![Iri::parse(uri)?]));
    }
    query = query.pattern(instances_of("d", DCAT_DATASET, "c")).pattern(
        Pattern::triple(Node::Var("d"), Path::Name(predicate), Node::Var("t")),
    );

    let results = select(store, &query, count, offset).await?;
    let items: Vec<DatasetType> = results
        .rows()
        .iter()
        .filter_map(|row| {
            Some(DatasetType {
                dataset: row.get("d")?.value.clone(),
                feature_type: row.get("t")?.value.clone(),
            })
        })
        .collect();
    let meta = PageMeta {
        count: items.len(),
        offset,
    };
    Ok((meta, items))
}
