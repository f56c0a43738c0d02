//! Structured SPARQL query construction.
//!
//! Queries are assembled from [`Pattern`] values rather than by string
//! substitution. Variables and vocabulary terms are `&'static str` chosen
//! by this codebase; the only caller-supplied values are IRIs, and those
//! must pass through [`Iri::parse`], which rejects anything that could
//! break out of an `<...>` IRI reference.
//!
//! ```ignore
//! let target = Iri::parse("http://example.org/a")?;
//! let query = Query::select(["l"])
//!     .distinct()
//!     .pattern(Pattern::union([
//!         vec![Pattern::triple(Node::Iri(target.clone()), Path::OneOrMore(GEO_SF_WITHIN), Node::Var("l"))],
//!         vec![Pattern::triple(Node::Iri(target), Path::Name(GEO_SF_WITHIN), Node::Var("l"))],
//!     ]));
//! ```

use std::collections::BTreeSet;
use std::fmt::{self, Write as _};

use oxrdf::NamedNode;

use crate::GraphError;
use crate::vocab;

/// A validated absolute IRI.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Iri(NamedNode);

impl Iri {
    /// Validates `value` as an absolute IRI (RFC 3987).
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::InvalidIri`] if the value is relative or
    /// malformed. Characters that could close an `<...>` reference, such as
    /// `>` or whitespace, are never valid IRI characters.
    pub fn parse(value: &str) -> Result<Self, GraphError> {
        NamedNode::new(value).map(Self).map_err(|e| GraphError::InvalidIri {
            iri: value.to_string(),
            reason: e.to_string(),
        })
    }

    /// The IRI text without angle brackets.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for Iri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}>", self.0.as_str())
    }
}

/// A subject or object position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// `?name`
    Var(&'static str),
    /// `<iri>`
    Iri(Iri),
    /// A prefixed name such as `geo:Feature`.
    Name(&'static str),
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Var(v) => write!(f, "?{v}"),
            Self::Iri(iri) => iri.fmt(f),
            Self::Name(n) => f.write_str(n),
        }
    }
}

/// A predicate position, optionally a property path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Path {
    /// `rdf:type` written as `a`.
    Type,
    /// A single prefixed predicate.
    Name(&'static str),
    /// `pred+`
    OneOrMore(&'static str),
    /// `pred*`
    ZeroOrMore(&'static str),
    /// `?p`
    Var(&'static str),
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Type => f.write_str("a"),
            Self::Name(n) => f.write_str(n),
            Self::OneOrMore(n) => write!(f, "{n}+"),
            Self::ZeroOrMore(n) => write!(f, "{n}*"),
            Self::Var(v) => write!(f, "?{v}"),
        }
    }
}

/// Filter and bind expressions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    /// `isBlank(?v)`
    IsBlank(&'static str),
    /// `true` / `false`
    Bool(bool),
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IsBlank(v) => write!(f, "isBlank(?{v})"),
            Self::Bool(b) => write!(f, "{b}"),
        }
    }
}

/// One element of a group graph pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pattern {
    /// `s p o .`
    Triple(Node, Path, Node),
    /// `{ ... } UNION { ... }`
    Union(Vec<Vec<Pattern>>),
    /// `OPTIONAL { ... }`
    Optional(Vec<Pattern>),
    /// `FILTER (expr)`
    Filter(Expr),
    /// `BIND (expr AS ?var)`
    Bind(Expr, &'static str),
    /// `VALUES ?var { <a> <b> }`
    Values(&'static str, Vec<Iri>),
}

impl Pattern {
    /// Shorthand for [`Pattern::Triple`].
    #[must_use]
    pub const fn triple(subject: Node, path: Path, object: Node) -> Self {
        Self::Triple(subject, path, object)
    }

    /// Shorthand for [`Pattern::Union`].
    #[must_use]
    pub fn union(branches: impl IntoIterator<Item = Vec<Self>>) -> Self {
        Self::Union(branches.into_iter().collect())
    }

    fn collect_prefixes(&self, out: &mut BTreeSet<&'static str>) {
        match self {
            Self::Triple(s, p, o) => {
                for node in [s, o] {
                    if let Node::Name(n) = node {
                        add_prefix(out, *n);
                    }
                }
                if let Path::Name(n) | Path::OneOrMore(n) | Path::ZeroOrMore(n) = p {
                    add_prefix(out, *n);
                }
            }
            Self::Union(branches) => {
                for pattern in branches.iter().flatten() {
                    pattern.collect_prefixes(out);
                }
            }
            Self::Optional(group) => {
                for pattern in group {
                    pattern.collect_prefixes(out);
                }
            }
            Self::Filter(_) | Self::Bind(..) | Self::Values(..) => {}
        }
    }
}

fn add_prefix(out: &mut BTreeSet<&'static str>, name: &'static str) {
    if let Some((prefix, _)) = name.split_once(':') {
        out.insert(prefix);
    }
}

/// A `SELECT` query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectQuery {
    distinct: bool,
    vars: Vec<&'static str>,
    patterns: Vec<Pattern>,
}

/// A complete query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    /// `SELECT [DISTINCT] ?vars WHERE { ... }`
    Select(SelectQuery),
    /// `ASK { ... }`
    Ask(Vec<Pattern>),
}

impl Query {
    /// Starts a `SELECT` over the given variables.
    #[must_use]
    pub fn select(vars: impl IntoIterator<Item = &'static str>) -> Self {
        Self::Select(SelectQuery {
            distinct: false,
            vars: vars.into_iter().collect(),
            patterns: Vec::new(),
        })
    }

    /// Starts an `ASK`.
    #[must_use]
    pub const fn ask() -> Self {
        Self::Ask(Vec::new())
    }

    /// Marks a `SELECT` as `DISTINCT`. No effect on `ASK`.
    #[must_use]
    pub fn distinct(mut self) -> Self {
        if let Self::Select(select) = &mut self {
            select.distinct = true;
        }
        self
    }

    /// Appends a pattern to the `WHERE` group.
    #[must_use]
    pub fn pattern(mut self, pattern: Pattern) -> Self {
        self.patterns_mut().push(pattern);
        self
    }

    /// Appends several patterns to the `WHERE` group.
    #[must_use]
    pub fn patterns(mut self, patterns: impl IntoIterator<Item = Pattern>) -> Self {
        self.patterns_mut().extend(patterns);
        self
    }

    fn patterns_mut(&mut self) -> &mut Vec<Pattern> {
        match self {
            Self::Select(select) => &mut select.patterns,
            Self::Ask(patterns) => patterns,
        }
    }

    fn where_patterns(&self) -> &[Pattern] {
        match self {
            Self::Select(select) => &select.patterns,
            Self::Ask(patterns) => patterns,
        }
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut prefixes = BTreeSet::new();
        for pattern in self.where_patterns() {
            pattern.collect_prefixes(&mut prefixes);
        }
        for prefix in prefixes {
            if let Some(ns) = vocab::namespace(prefix) {
                writeln!(f, "PREFIX {prefix}: <{ns}>")?;
            }
        }

        match self {
            Self::Select(select) => {
                f.write_str("SELECT ")?;
                if select.distinct {
                    f.write_str("DISTINCT ")?;
                }
                for var in &select.vars {
                    write!(f, "?{var} ")?;
                }
                f.write_str("\nWHERE {\n")?;
            }
            Self::Ask(_) => f.write_str("ASK {\n")?,
        }
        let mut body = String::new();
        write_group(&mut body, self.where_patterns(), 1)?;
        f.write_str(&body)?;
        f.write_str("}\n")
    }
}

fn write_group(out: &mut String, patterns: &[Pattern], depth: usize) -> fmt::Result {
    let indent = "    ".repeat(depth);
    for pattern in patterns {
        match pattern {
            Pattern::Triple(s, p, o) => writeln!(out, "{indent}{s} {p} {o} .")?,
            Pattern::Union(branches) => {
                for (i, branch) in branches.iter().enumerate() {
                    if i > 0 {
                        writeln!(out, "{indent}UNION")?;
                    }
                    writeln!(out, "{indent}{{")?;
                    write_group(out, branch, depth + 1)?;
                    writeln!(out, "{indent}}}")?;
                }
            }
            Pattern::Optional(group) => {
                writeln!(out, "{indent}OPTIONAL {{")?;
                write_group(out, group, depth + 1)?;
                writeln!(out, "{indent}}}")?;
            }
            Pattern::Filter(expr) => writeln!(out, "{indent}FILTER ({expr})")?,
            Pattern::Bind(expr, var) => writeln!(out, "{indent}BIND ({expr} AS ?{var})")?,
            Pattern::Values(var, iris) => {
                write!(out, "{indent}VALUES ?{var} {{")?;
                for iri in iris {
                    write!(out, " {iri}")?;
                }
                writeln!(out, " }}")?;
            }
        }
    }
    Ok(())
}
