//! Deep description of a single resource.
//!
//! Collects every predicate/object pair asserted about a resource, either
//! directly or through reified statements, and follows blank-node objects
//! two levels deep. Typed bindings are flattened: IRIs and literals become
//! plain strings, blank nodes become nested maps.

use std::collections::BTreeMap;

use loci_graph_models::{Resource, ResourceValue, Row};

use crate::query::{Expr, Iri, Node, Path, Pattern, Query};
use crate::vocab::{RDF_OBJECT, RDF_PREDICATE, RDF_SUBJECT};
use crate::{GraphError, GraphStore, select};

/// Upper bound on description rows fetched for one resource.
const DESCRIBE_LIMIT: u64 = 10_000;

/// `?stmt rdf:subject <subject> ; rdf:predicate ?p ; rdf:object ?object`
fn reified_about(stmt: &'static str, subject: Node, object: &'static str) -> Vec<Pattern> {
    vec![
        Pattern::triple(Node::Var(stmt), Path::Name(RDF_SUBJECT), subject),
        Pattern::triple(Node::Var(stmt), Path::Name(RDF_PREDICATE), Node::Var("p")),
        Pattern::triple(Node::Var(stmt), Path::Name(RDF_OBJECT), Node::Var(object)),
    ]
}

/// Optional expansion of blank node `?o` into `?p1 ?o1`, and of a blank
/// `?o1` into `?p2 ?o2`.
fn blank_expansion(stmt: &'static str) -> Pattern {
    Pattern::Optional(vec![
        Pattern::Filter(Expr::IsBlank("o")),
        Pattern::union([
            reified_about(stmt, Node::Var("o"), "o1"),
            vec![Pattern::triple(Node::Var("o"), Path::Var("p1"), Node::Var("o1"))],
        ]),
        Pattern::Optional(vec![
            Pattern::Filter(Expr::IsBlank("o1")),
            Pattern::triple(Node::Var("o1"), Path::Var("p2"), Node::Var("o2")),
        ]),
    ])
}

fn describe_query(resource: &Iri) -> Query {
    let subject = || Node::Iri(resource.clone());
    let mut reified_branch = reified_about("s", subject(), "o");
    reified_branch.push(blank_expansion("s2"));
    let direct_branch = vec![
        Pattern::triple(subject(), Path::Var("p"), Node::Var("o")),
        blank_expansion("s3"),
    ];
    Query::select(["p", "o", "p1", "o1", "p2", "o2"])
        .distinct()
        .pattern(Pattern::union([reified_branch, direct_branch]))
}

/// Returns the nested map stored under `key`, replacing a plain value if
/// one was there.
fn node_entry<'a>(
    map: &'a mut BTreeMap<String, ResourceValue>,
    key: &str,
) -> Option<&'a mut BTreeMap<String, ResourceValue>> {
    let slot = map
        .entry(key.to_string())
        .or_insert_with(|| ResourceValue::Node(BTreeMap::new()));
    if let ResourceValue::Value(_) = slot {
        *slot = ResourceValue::Node(BTreeMap::new());
    }
    if let ResourceValue::Node(node) = slot {
        Some(node)
    } else {
        None
    }
}

/// Folds description rows into a nested [`Resource`].
///
/// Later rows for the same predicate overwrite earlier plain values.
#[must_use]
pub fn normalize_description(rows: &[Row]) -> Resource {
    let mut resource = Resource::new();
    for row in rows {
        let (Some(p), Some(o)) = (row.get("p"), row.get("o")) else {
            continue;
        };
        if !o.is_blank() {
            resource.insert(p.value.clone(), ResourceValue::Value(o.value.clone()));
            continue;
        }

        let Some(node) = node_entry(&mut resource, &p.value) else {
            continue;
        };
        let (Some(p1), Some(o1)) = (row.get("p1"), row.get("o1")) else {
            continue;
        };
        if !o1.is_blank() {
            node.insert(p1.value.clone(), ResourceValue::Value(o1.value.clone()));
            continue;
        }

        let Some(inner) = node_entry(node, &p1.value) else {
            continue;
        };
        if let (Some(p2), Some(o2)) = (row.get("p2"), row.get("o2")) {
            inner.insert(p2.value.clone(), ResourceValue::Value(o2.value.clone()));
        }
    }
    resource
}

/// Describes `resource_uri`.
///
/// # Errors
///
/// Returns [`GraphError`] if the URI is not a valid IRI or the store call
/// fails.
pub async fn get_resource(
    store: &dyn GraphStore,
    resource_uri: &str,
) -> Result<Resource, GraphError> {
    let query = describe_query(&Iri::parse(resource_uri)?);
    let results = select(store, &query, DESCRIBE_LIMIT, 0).await?;
    log::debug!(
        "Described {resource_uri} from {} rows",
        results.rows().len()
    );
    Ok(normalize_description(results.rows()))
}

#[cfg(test)]
mod tests {
    use loci_graph_models::{SparqlResults, Term};

    use super::*;
    use crate::testing::CannedStore;

    fn row(pairs: &[(&str, Term)]) -> Row {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn flattens_plain_values() {
        let rows = vec![
            row(&[("p", Term::uri("http://p/label")), ("o", Term::literal("Mesh block 1"))]),
            row(&[("p", Term::uri("http://p/type")), ("o", Term::uri("http://c/MeshBlock"))]),
        ];
        let resource = normalize_description(&rows);
        assert_eq!(
            resource["http://p/label"],
            ResourceValue::Value("Mesh block 1".to_string())
        );
        assert_eq!(resource.len(), 2);
    }

    #[test]
    fn nests_blank_nodes_two_levels() {
        let rows = vec![
            row(&[
                ("p", Term::uri("http://p/area")),
                ("o", Term::bnode("b0")),
                ("p1", Term::uri("http://p/value")),
                ("o1", Term::literal("1000000")),
            ]),
            row(&[
                ("p", Term::uri("http://p/area")),
                ("o", Term::bnode("b0")),
                ("p1", Term::uri("http://p/crs")),
                ("o1", Term::bnode("b1")),
                ("p2", Term::uri("http://p/code")),
                ("o2", Term::literal("3577")),
            ]),
        ];
        let resource = normalize_description(&rows);
        let json = serde_json::to_value(&resource).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "http://p/area": {
                    "http://p/value": "1000000",
                    "http://p/crs": { "http://p/code": "3577" }
                }
            })
        );
    }

    #[test]
    fn blank_node_replaces_earlier_plain_value() {
        let rows = vec![
            row(&[("p", Term::uri("http://p/x")), ("o", Term::literal("plain"))]),
            row(&[
                ("p", Term::uri("http://p/x")),
                ("o", Term::bnode("b")),
                ("p1", Term::uri("http://p/y")),
                ("o1", Term::literal("v")),
            ]),
        ];
        let resource = normalize_description(&rows);
        assert!(matches!(resource["http://p/x"], ResourceValue::Node(_)));
    }

    #[test]
    fn inner_blank_node_replaces_plain_value() {
        let rows = vec![
            row(&[
                ("p", Term::uri("http://p/x")),
                ("o", Term::bnode("b")),
                ("p1", Term::uri("http://p/y")),
                ("o1", Term::literal("plain")),
            ]),
            row(&[
                ("p", Term::uri("http://p/x")),
                ("o", Term::bnode("b")),
                ("p1", Term::uri("http://p/y")),
                ("o1", Term::bnode("c")),
                ("p2", Term::uri("http://p/z")),
                ("o2", Term::literal("deep")),
            ]),
        ];
        let json = serde_json::to_value(normalize_description(&rows)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "http://p/x": { "http://p/y": { "http://p/z": "deep" } } })
        );
    }

    #[tokio::test]
    async fn describes_through_store() {
        let store = CannedStore::new(SparqlResults::from_rows(vec![row(&[
            ("p", Term::uri("http://p/label")),
            ("o", Term::literal("A")),
        ])]));
        let resource = get_resource(&store, "http://example.org/a").await.unwrap();
        assert_eq!(resource.len(), 1);
        let query = store.last_query();
        assert!(query.contains("<http://example.org/a> ?p ?o ."));
        assert!(query.contains("FILTER (isBlank(?o))"));
        assert!(query.contains("?s rdf:subject <http://example.org/a> ."));
    }
}
