#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! SPARQL result and resource description types.
//!
//! These mirror the W3C `application/sparql-results+json` format returned
//! by the LOCI cache triplestore, plus the plain nested shapes that the
//! API hands back to clients once typed bindings have been normalized.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// The kind of RDF term bound to a variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TermType {
    /// An IRI.
    Uri,
    /// A plain or language-tagged literal.
    Literal,
    /// A datatyped literal (SPARQL 1.0 servers emit this separately).
    #[serde(rename = "typed-literal")]
    TypedLiteral,
    /// A blank node.
    Bnode,
}

/// A single bound RDF term.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Term {
    /// Term kind.
    #[serde(rename = "type")]
    pub kind: TermType,
    /// Lexical value (IRI, literal text, or blank node label).
    pub value: String,
    /// Literal datatype IRI, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datatype: Option<String>,
    /// Language tag, if any.
    #[serde(
        default,
        rename = "xml:lang",
        skip_serializing_if = "Option::is_none"
    )]
    pub lang: Option<String>,
}

impl Term {
    /// Builds an IRI term.
    #[must_use]
    pub fn uri(value: impl Into<String>) -> Self {
        Self {
            kind: TermType::Uri,
            value: value.into(),
            datatype: None,
            lang: None,
        }
    }

    /// Builds a plain literal term.
    #[must_use]
    pub fn literal(value: impl Into<String>) -> Self {
        Self {
            kind: TermType::Literal,
            value: value.into(),
            datatype: None,
            lang: None,
        }
    }

    /// Builds a blank node term.
    #[must_use]
    pub fn bnode(label: impl Into<String>) -> Self {
        Self {
            kind: TermType::Bnode,
            value: label.into(),
            datatype: None,
            lang: None,
        }
    }

    /// Whether this term is a blank node.
    #[must_use]
    pub const fn is_blank(&self) -> bool {
        matches!(self.kind, TermType::Bnode)
    }

    /// Interprets the term as an `xsd:boolean` literal.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self.value.as_str() {
            "true" | "1" => Some(true),
            "false" | "0" => Some(false),
            _ => None,
        }
    }
}

/// One solution row: variable name to bound term. Unbound variables are
/// simply absent.
pub type Row = BTreeMap<String, Term>;

/// The `head` section of a SPARQL JSON response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Head {
    /// Projected variable names.
    #[serde(default)]
    pub vars: Vec<String>,
}

/// The `results` section of a SPARQL JSON response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultSet {
    /// Solution rows.
    #[serde(default)]
    pub bindings: Vec<Row>,
}

/// A full SPARQL JSON response.
///
/// `results` is optional: a store that answers without the wrapper is
/// treated as having returned zero rows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SparqlResults {
    /// Response head.
    #[serde(default)]
    pub head: Head,
    /// Solution rows for `SELECT` queries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<ResultSet>,
    /// Answer for `ASK` queries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub boolean: Option<bool>,
}

impl SparqlResults {
    /// Wraps rows into a `SELECT` response.
    #[must_use]
    pub fn from_rows(bindings: Vec<Row>) -> Self {
        Self {
            head: Head::default(),
            results: Some(ResultSet { bindings }),
            boolean: None,
        }
    }

    /// Wraps an `ASK` answer.
    #[must_use]
    pub fn from_boolean(answer: bool) -> Self {
        Self {
            head: Head::default(),
            results: None,
            boolean: Some(answer),
        }
    }

    /// Borrowed solution rows, empty when the response had no `results`.
    #[must_use]
    pub fn rows(&self) -> &[Row] {
        self.results.as_ref().map_or(&[], |r| r.bindings.as_slice())
    }

    /// Owned solution rows, empty when the response had no `results`.
    #[must_use]
    pub fn into_rows(self) -> Vec<Row> {
        self.results.map(|r| r.bindings).unwrap_or_default()
    }
}

/// Paging metadata echoed back alongside every listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    /// Number of items in this page.
    pub count: usize,
    /// Offset the page was requested at.
    pub offset: u64,
}

/// A value inside a described resource: either a plain string (IRI or
/// literal) or a nested map standing in for a blank node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResourceValue {
    /// IRI or literal lexical value.
    Value(String),
    /// Blank node, described by its own predicates.
    Node(BTreeMap<String, ResourceValue>),
}

/// A described resource: predicate IRI to value.
pub type Resource = BTreeMap<String, ResourceValue>;

/// A feature type declared by a dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetType {
    /// Dataset IRI.
    pub dataset: String,
    /// Feature type IRI.
    pub feature_type: String,
}
