//! Vocabulary used by the LOCI cache.
//!
//! Terms are written as prefixed names; [`PREFIXES`] supplies the
//! namespace for every prefix that may appear in a rendered query.

/// Known prefixes and their namespace IRIs.
pub const PREFIXES: [(&str, &str); 10] = [
    ("data", "http://linked.data.gov.au/def/datatype/"),
    ("dcat", "http://www.w3.org/ns/dcat#"),
    ("dct", "http://purl.org/dc/terms/"),
    ("epsg", "http://www.opengis.net/def/crs/EPSG/0/"),
    ("geo", "http://www.opengis.net/ont/geosparql#"),
    ("geox", "http://linked.data.gov.au/def/geox#"),
    ("loci", "http://linked.data.gov.au/def/loci#"),
    ("prov", "http://www.w3.org/ns/prov#"),
    ("rdf", "http://www.w3.org/1999/02/22-rdf-syntax-ns#"),
    ("rdfs", "http://www.w3.org/2000/01/rdf-schema#"),
];

// Reification
pub const RDF_SUBJECT: &str = "rdf:subject";
pub const RDF_PREDICATE: &str = "rdf:predicate";
pub const RDF_OBJECT: &str = "rdf:object";
pub const RDF_TYPE: &str = "rdf:type";
pub const RDFS_SUB_CLASS_OF: &str = "rdfs:subClassOf";

// Classes
pub const GEO_FEATURE: &str = "geo:Feature";
pub const PROV_LOCATION: &str = "prov:Location";
pub const LOCI_LINKSET: &str = "loci:Linkset";
pub const DCAT_DATASET: &str = "dcat:Dataset";

// Topology
pub const GEO_SF_OVERLAPS: &str = "geo:sfOverlaps";
pub const GEO_SF_CONTAINS: &str = "geo:sfContains";
pub const GEO_SF_WITHIN: &str = "geo:sfWithin";

// Areas and intersections
pub const GEOX_HAS_AREA_M2: &str = "geox:hasAreaM2";
pub const GEOX_IN_CRS: &str = "geox:inCRS";
pub const GEOX_IS_INTERSECTION_OF: &str = "geox:isIntersectionOf";
pub const DATA_VALUE: &str = "data:value";
/// GDA94 / Australian Albers, the only CRS areas are read in.
pub const EPSG_3577: &str = "epsg:3577";

// Provenance and dataset metadata
pub const DCT_IS_PART_OF: &str = "dct:isPartOf";
pub const LOCI_HAS_FEATURE_TYPE: &str = "loci:hasFeatureType";
pub const LOCI_HAS_BASE_FEATURE_TYPE: &str = "loci:hasBaseFeatureType";

/// Returns the namespace bound to `prefix`, if known.
#[must_use]
pub fn namespace(prefix: &str) -> Option<&'static str> {
    PREFIXES
        .iter()
        .find(|(p, _)| *p == prefix)
        .map(|(_, ns)| *ns)
}
