//! Cross-hierarchy overlap propagation.
//!
//! Features of two hierarchies (say census regions and catchments) are
//! rarely related directly. They are related through their base units,
//! which a linkset relates pairwise. The crosswalk splits the source's
//! area over its base units, pushes each share across to the base units
//! of the other hierarchy, and up to their parents, summing every share
//! that lands on the same feature. Percentages are then taken against the
//! full source area.

use std::collections::BTreeMap;

use loci_overlaps_models::{Numeric, OverlapMeta, OverlapOptions, OverlapRecord};
use rust_decimal::Decimal;

use crate::OverlapError;
use crate::fan_out::fetch_all_rows;
use crate::hierarchy::{Hierarchy, HierarchyRegistry, UnitKind};
use crate::proportion::{build_records, require_source_area};
use crate::relations::{SpatialGraph, fold_by_uri};

/// Options for the internal lookups: always measured.
const fn measured(include_within: bool, include_contains: bool) -> OverlapOptions {
    OverlapOptions {
        include_areas: true,
        include_proportion: true,
        include_within,
        include_contains,
    }
}

#[derive(Debug, Clone)]
struct Accumulated {
    record: OverlapRecord,
    /// Percentages were taken as computed and must not be renormalized.
    fixed: bool,
}

/// A parent reached from a base unit, with its own area.
#[derive(Debug, Clone)]
struct Parent {
    uri: String,
    feature_area: Option<Decimal>,
}

struct Crosswalk<'a> {
    graph: &'a dyn SpatialGraph,
    registry: &'a HierarchyRegistry,
    output_type: Option<&'a str>,
    target: Option<&'a Hierarchy>,
    linkset: Option<&'a str>,
    accumulator: BTreeMap<String, Accumulated>,
    parents: BTreeMap<String, Vec<Parent>>,
}

impl<'a> Crosswalk<'a> {
    fn new(
        graph: &'a dyn SpatialGraph,
        registry: &'a HierarchyRegistry,
        output_type: Option<&'a str>,
        linkset: Option<&'a str>,
    ) -> Self {
        Self {
            graph,
            registry,
            output_type,
            target: output_type.and_then(|t| registry.hierarchy_for_type(t)),
            linkset,
            accumulator: BTreeMap::new(),
            parents: BTreeMap::new(),
        }
    }
}

impl Crosswalk<'_> {
    /// Adds `share` to the intersection accumulated for `uri`. Shares are
    /// never negative, so a known total only grows; once an unknown share
    /// lands the total stays unknown. Passthrough entries are left alone.
    fn accumulate(&mut self, uri: &str, share: Numeric, feature_area: Option<Decimal>) {
        let entry = self
            .accumulator
            .entry(uri.to_string())
            .or_insert_with(|| Accumulated {
                record: OverlapRecord {
                    feature_area: Some(Numeric::from_option(feature_area)),
                    intersection_area: Some(Numeric::known(Decimal::ZERO)),
                    ..OverlapRecord::new(uri)
                },
                fixed: false,
            });
        if entry.fixed {
            return;
        }
        let total = entry
            .record
            .intersection_area
            .unwrap_or(Numeric::Unknown)
            .plus(share);
        entry.record.intersection_area = Some(total);
    }

    /// Records a feature measured directly against the source. It replaces
    /// any shares already accumulated for it, whichever arrives first.
    fn pass_through(&mut self, record: OverlapRecord) {
        self.accumulator.insert(
            record.uri.clone(),
            Accumulated {
                record,
                fixed: true,
            },
        );
    }

    /// Parents `uri` lies within, fetched once per crosswalk.
    async fn parents_of(&mut self, uri: &str) -> Result<&[Parent], OverlapError> {
        if !self.parents.contains_key(uri) {
            let rows = fetch_all_rows(self.graph, uri, &measured(true, false), None).await?;
            let parents = fold_by_uri(rows)
                .into_iter()
                .filter(|row| row.is_within == Some(true))
                .map(|row| Parent {
                    uri: row.uri,
                    feature_area: row.feature_area,
                })
                .collect();
            self.parents.insert(uri.to_string(), parents);
        }
        Ok(self.parents.get(uri).map(Vec::as_slice).unwrap_or_default())
    }

    /// Pushes `incoming` area of base unit `base_uri` across to the other
    /// hierarchies' base units and their parents.
    async fn walk_base(&mut self, base_uri: &str, incoming: Numeric) -> Result<(), OverlapError> {
        let registry = self.registry;
        let options = measured(true, true);
        let base_area = self.graph.feature_area(base_uri).await?;
        let rows = fetch_all_rows(self.graph, base_uri, &options, self.linkset).await?;
        let neighbours = build_records(&fold_by_uri(rows), base_area, &options);

        for neighbour in neighbours {
            let Some(other) = registry.foreign_base_hierarchy(base_uri, &neighbour.uri) else {
                continue;
            };
            if self.target.is_some_and(|target| target.id != other.id) {
                continue;
            }

            let share = incoming.portion(neighbour.forward_percentage.unwrap_or(Numeric::Unknown));
            let neighbour_area = neighbour.feature_area.and_then(Numeric::value);
            self.accumulate(&neighbour.uri, share, neighbour_area);

            if self.output_type == Some(other.base_type.as_str()) {
                continue;
            }
            let parents: Vec<Parent> = self
                .parents_of(&neighbour.uri)
                .await?
                .iter()
                .filter(|parent| other.is_parent(&parent.uri))
                .cloned()
                .collect();
            for parent in parents {
                self.accumulate(&parent.uri, share, parent.feature_area);
            }
        }
        Ok(())
    }

    async fn finish(
        self,
        source_area: Decimal,
        options: &OverlapOptions,
    ) -> Result<Vec<OverlapRecord>, OverlapError> {
        let source = Numeric::known(source_area);
        let mut records = Vec::with_capacity(self.accumulator.len());
        for (uri, Accumulated { mut record, fixed }) in self.accumulator {
            if let Some(type_uri) = self.output_type {
                if !self.graph.has_type(&uri, type_uri).await? {
                    continue;
                }
            }
            if !fixed {
                let intersection = record.intersection_area.unwrap_or(Numeric::Unknown);
                let dest = record.feature_area.unwrap_or(Numeric::Unknown);
                record.forward_percentage = Some(intersection.percentage_of(source).capped_at_full());
                record.reverse_percentage = Some(intersection.percentage_of(dest).capped_at_full());
            }
            record.retain_measures(options);
            records.push(record);
        }
        Ok(records)
    }
}

/// Finds the features of `output_type`'s hierarchy overlapping `uri`,
/// measured against the area of `uri`.
///
/// Features contained by `uri` that are not its own base units pass
/// through with the percentages computed for them directly. Without an
/// output type every other hierarchy is walked.
///
/// # Errors
///
/// Returns [`OverlapError::Reportable`] if `uri` has no known area or does
/// not belong to a known hierarchy, or any graph error.
pub async fn get_location_overlaps_crosswalk(
    graph: &dyn SpatialGraph,
    registry: &HierarchyRegistry,
    uri: &str,
    output_type: Option<&str>,
    options: &OverlapOptions,
) -> Result<(OverlapMeta, Vec<OverlapRecord>), OverlapError> {
    let Some((hierarchy, kind)) = registry.classify(uri) else {
        return Err(OverlapError::Reportable {
            message: format!("{uri} does not belong to a known spatial hierarchy"),
        });
    };
    let source_area = require_source_area(graph.feature_area(uri).await?)?;
    let linkset = registry.find_linkset(uri, output_type);
    log::info!(
        "Crosswalk from {uri} ({}, {kind:?}) to {} via {}",
        hierarchy.id,
        output_type.unwrap_or("any type"),
        linkset.unwrap_or("any linkset")
    );

    let mut walk = Crosswalk::new(graph, registry, output_type, linkset);

    match kind {
        UnitKind::Base => walk.walk_base(uri, Numeric::known(source_area)).await?,
        UnitKind::Parent => {
            let contained_options = measured(false, true);
            let rows = fetch_all_rows(graph, uri, &contained_options, None).await?;
            let contained = build_records(&fold_by_uri(rows), Some(source_area), &contained_options);
            for record in contained {
                if hierarchy.is_base(&record.uri) {
                    let share = Numeric::known(source_area)
                        .portion(record.forward_percentage.unwrap_or(Numeric::Unknown));
                    walk.walk_base(&record.uri, share).await?;
                } else {
                    walk.pass_through(record);
                }
            }
        }
    }

    let reached = walk.accumulator.len();
    let records = walk.finish(source_area, options).await?;
    log::info!(
        "Crosswalk from {uri}: {} of {reached} reached features kept",
        records.len()
    );
    let meta = OverlapMeta {
        count: records.len(),
        offset: 0,
        feature_area: options
            .include_areas
            .then(|| Numeric::known(source_area)),
    };
    Ok((meta, records))
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;
    use crate::relations::{Relation, RelationRow};
    use crate::testing::FakeGraph;

    const P: &str = "http://linked.data.gov.au/dataset/asgs2016/statisticalarealevel1/10102100701";
    const B1: &str = "http://linked.data.gov.au/dataset/asgs2016/meshblock/10000010000";
    const B2: &str = "http://linked.data.gov.au/dataset/asgs2016/meshblock/10000020000";
    const D1: &str = "http://linked.data.gov.au/dataset/geofabric/contractedcatchment/12104805";
    const D: &str = "http://linked.data.gov.au/dataset/geofabric/riverregion/9400216";
    const D2: &str = "http://linked.data.gov.au/dataset/geofabric/contractedcatchment/12104806";
    const RIVER_REGION: &str = "http://linked.data.gov.au/def/geofabric#RiverRegion";
    const CATCHMENT: &str = "http://linked.data.gov.au/def/geofabric#ContractedCatchment";
    const MB16CC: &str = "http://linked.data.gov.au/dataset/mb16cc";

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn contained(uri: &str, area: &str) -> RelationRow {
        RelationRow {
            feature_area: Some(dec(area)),
            contains: Some(true),
            ..RelationRow::new(uri)
        }
    }

    fn overlap(uri: &str, area: &str, intersection: &str) -> RelationRow {
        RelationRow {
            feature_area: Some(dec(area)),
            intersection_area: Some(dec(intersection)),
            ..RelationRow::new(uri)
        }
    }

    fn within(uri: &str, area: &str) -> RelationRow {
        RelationRow {
            feature_area: Some(dec(area)),
            is_within: Some(true),
            ..RelationRow::new(uri)
        }
    }

    /// P (1,000,000) contains b1 (60%) and b2 (40%), plus catchment d2
    /// outright. b1 overlaps d1 on half its area, b2 on 30%. d1 lies
    /// within D, which has area 2,000,000.
    fn scenario() -> FakeGraph {
        FakeGraph::default()
            .with_area(P, dec("1000000"))
            .with_area(B1, dec("600000"))
            .with_area(B2, dec("400000"))
            .with_rows(P, Relation::Contains, vec![
                contained(B1, "600000"),
                contained(B2, "400000"),
                contained(D2, "250000"),
            ])
            .with_rows(B1, Relation::Overlaps, vec![overlap(D1, "800000", "300000")])
            .with_rows(B2, Relation::Overlaps, vec![overlap(D1, "800000", "120000")])
            .with_rows(B1, Relation::Within, vec![within(P, "1000000")])
            .with_rows(D1, Relation::Within, vec![within(D, "2000000")])
            .with_type(D, RIVER_REGION)
            .with_type(D1, CATCHMENT)
    }

    fn find<'a>(records: &'a [OverlapRecord], uri: &str) -> &'a OverlapRecord {
        records.iter().find(|r| r.uri == uri).unwrap()
    }

    #[tokio::test]
    async fn parent_accumulates_every_base_unit_path() {
        let graph = scenario();
        let registry = HierarchyRegistry::embedded();
        let (meta, records) = get_location_overlaps_crosswalk(
            &graph,
            &registry,
            P,
            Some(RIVER_REGION),
            &OverlapOptions::all(),
        )
        .await
        .unwrap();

        assert_eq!(meta.count, 1);
        assert_eq!(meta.feature_area, Some(Numeric::known(dec("1000000"))));
        let d = find(&records, D);
        // 0.6 × 1,000,000 × 0.5 + 0.4 × 1,000,000 × 0.3
        assert_eq!(d.intersection_area, Some(Numeric::known(dec("420000"))));
        assert_eq!(d.forward_percentage.unwrap().to_string(), "42.00000000");
        assert_eq!(d.reverse_percentage.unwrap().to_string(), "21.00000000");
        assert_eq!(d.feature_area, Some(Numeric::known(dec("2000000"))));

        // Both paths reach d1; its parents are looked up once.
        assert_eq!(graph.page_sizes(D1, Relation::Within).len(), 1);
        // Base unit walks are restricted to the bridging linkset.
        assert_eq!(
            graph.linksets(B1, Relation::Overlaps),
            vec![Some(MB16CC.to_string())]
        );
    }

    #[tokio::test]
    async fn unfiltered_walk_keeps_base_units_and_passthroughs() {
        let graph = scenario();
        let registry = HierarchyRegistry::embedded();
        let (_, records) =
            get_location_overlaps_crosswalk(&graph, &registry, P, None, &OverlapOptions::all())
                .await
                .unwrap();

        let uris: Vec<&str> = records.iter().map(|r| r.uri.as_str()).collect();
        assert_eq!(uris, vec![D1, D2, D]);
        let d1 = find(&records, D1);
        assert_eq!(d1.intersection_area, Some(Numeric::known(dec("420000"))));
        assert_eq!(d1.reverse_percentage.unwrap().to_string(), "52.50000000");
        // Passthrough keeps its directly computed percentages.
        let d2 = find(&records, D2);
        assert_eq!(d2.contains, Some(true));
        assert_eq!(d2.reverse_percentage.unwrap().to_string(), "100.00000000");
        assert_eq!(d2.forward_percentage.unwrap().to_string(), "25.00000000");
        assert_eq!(graph.linksets(B1, Relation::Overlaps), vec![None]);
    }

    #[tokio::test]
    async fn percentages_never_exceed_full_coverage() {
        // The recorded base unit areas add up to more than P itself, so the
        // shares landing on d1 sum past both P and d1.
        let graph = FakeGraph::default()
            .with_area(P, dec("1000"))
            .with_area(B1, dec("600"))
            .with_area(B2, dec("600"))
            .with_rows(P, Relation::Contains, vec![
                contained(B1, "600"),
                contained(B2, "600"),
            ])
            .with_rows(B1, Relation::Within, vec![within(D1, "1000")])
            .with_rows(B2, Relation::Within, vec![within(D1, "1000")]);
        let registry = HierarchyRegistry::embedded();
        let (_, records) =
            get_location_overlaps_crosswalk(&graph, &registry, P, None, &OverlapOptions::all())
                .await
                .unwrap();
        let d1 = find(&records, D1);
        assert_eq!(d1.intersection_area, Some(Numeric::known(dec("1200"))));
        assert_eq!(d1.forward_percentage, Some(Numeric::known(dec("100"))));
        assert_eq!(d1.reverse_percentage, Some(Numeric::known(dec("100"))));
    }

    #[tokio::test]
    async fn one_link_reported_by_two_lookups_counts_once() {
        // b1 lies wholly within d1; the store reports the pair both as an
        // overlap and as a within.
        let graph = FakeGraph::default()
            .with_area(B1, dec("100"))
            .with_rows(B1, Relation::Overlaps, vec![overlap(D1, "400", "100")])
            .with_rows(B1, Relation::Within, vec![within(D1, "400")])
            .with_rows(D1, Relation::Within, vec![within(D, "1000")]);
        let registry = HierarchyRegistry::embedded();
        let (_, records) =
            get_location_overlaps_crosswalk(&graph, &registry, B1, None, &OverlapOptions::all())
                .await
                .unwrap();

        let uris: Vec<&str> = records.iter().map(|r| r.uri.as_str()).collect();
        assert_eq!(uris, vec![D1, D]);
        let d1 = find(&records, D1);
        assert_eq!(d1.intersection_area, Some(Numeric::known(dec("100"))));
        assert_eq!(d1.forward_percentage.unwrap().to_string(), "100.00000000");
        assert_eq!(d1.reverse_percentage.unwrap().to_string(), "25.00000000");
        let d = find(&records, D);
        assert_eq!(d.intersection_area, Some(Numeric::known(dec("100"))));
        assert_eq!(d.reverse_percentage.unwrap().to_string(), "10.00000000");
    }

    #[tokio::test]
    async fn base_unit_reported_by_two_lookups_is_walked_once() {
        let graph = FakeGraph::default()
            .with_area(P, dec("1000"))
            .with_area(B1, dec("600"))
            .with_rows(P, Relation::Overlaps, vec![overlap(B1, "600", "600")])
            .with_rows(P, Relation::Contains, vec![contained(B1, "600")])
            .with_rows(B1, Relation::Overlaps, vec![overlap(D1, "800", "300")]);
        let registry = HierarchyRegistry::embedded();
        let (_, records) =
            get_location_overlaps_crosswalk(&graph, &registry, P, None, &OverlapOptions::all())
                .await
                .unwrap();

        assert_eq!(graph.page_sizes(B1, Relation::Overlaps).len(), 1);
        let d1 = find(&records, D1);
        assert_eq!(d1.intersection_area, Some(Numeric::known(dec("300"))));
        assert_eq!(d1.forward_percentage.unwrap().to_string(), "30.00000000");
    }

    #[tokio::test]
    async fn passthrough_wins_regardless_of_order() {
        // d1 is contained by P outright and also reached through b1.
        let graph_with = |contains: Vec<RelationRow>| {
            FakeGraph::default()
                .with_area(P, dec("1000"))
                .with_area(B1, dec("600"))
                .with_rows(P, Relation::Contains, contains)
                .with_rows(B1, Relation::Overlaps, vec![overlap(D1, "300", "200")])
        };
        let walked_first = graph_with(vec![contained(B1, "600"), contained(D1, "300")]);
        let passed_first = graph_with(vec![contained(D1, "300"), contained(B1, "600")]);
        let registry = HierarchyRegistry::embedded();

        let mut results = Vec::new();
        for graph in [&walked_first, &passed_first] {
            let (_, records) =
                get_location_overlaps_crosswalk(graph, &registry, P, None, &OverlapOptions::all())
                    .await
                    .unwrap();
            results.push(records);
        }
        assert_eq!(results[0], results[1]);

        let d1 = find(&results[0], D1);
        assert_eq!(d1.contains, Some(true));
        assert_eq!(d1.intersection_area, Some(Numeric::known(dec("300"))));
        assert_eq!(d1.forward_percentage.unwrap().to_string(), "30.00000000");
        assert_eq!(d1.reverse_percentage.unwrap().to_string(), "100.00000000");
    }

    #[test]
    fn accumulated_intersection_never_decreases() {
        let graph = FakeGraph::default();
        let registry = HierarchyRegistry::embedded();
        let mut walk = Crosswalk::new(&graph, &registry, None, None);

        let shares = [
            Numeric::known(dec("10")),
            Numeric::known(Decimal::ZERO),
            Numeric::known(dec("2.5")),
            Numeric::Unknown,
            Numeric::known(dec("7")),
        ];
        let mut totals = Vec::new();
        for share in shares {
            walk.accumulate(D1, share, Some(dec("100")));
            totals.push(walk.accumulator[D1].record.intersection_area.unwrap());
        }

        assert_eq!(totals, vec![
            Numeric::known(dec("10")),
            Numeric::known(dec("10")),
            Numeric::known(dec("12.5")),
            Numeric::Unknown,
            Numeric::Unknown,
        ]);
        for pair in totals.windows(2) {
            match (pair[0], pair[1]) {
                (Numeric::Known(before), Numeric::Known(after)) => assert!(after >= before),
                // An unknown share makes the total unknown for good.
                (Numeric::Unknown, after) => assert_eq!(after, Numeric::Unknown),
                (Numeric::Known(_), Numeric::Unknown) => {}
            }
        }
    }

    #[tokio::test]
    async fn unknown_neighbour_area_is_visible() {
        let graph = FakeGraph::default()
            .with_area(B1, dec("600000"))
            .with_rows(B1, Relation::Overlaps, vec![RelationRow::new(D1)])
            .with_type(D1, CATCHMENT);
        let registry = HierarchyRegistry::embedded();
        let options = OverlapOptions {
            include_proportion: true,
            ..OverlapOptions::default()
        };
        let (meta, records) =
            get_location_overlaps_crosswalk(&graph, &registry, B1, Some(CATCHMENT), &options)
                .await
                .unwrap();

        assert_eq!(meta.feature_area, None);
        let d1 = find(&records, D1);
        assert_eq!(d1.forward_percentage, Some(Numeric::Unknown));
        assert_eq!(d1.reverse_percentage, Some(Numeric::Unknown));
        assert_eq!(d1.intersection_area, None);
        // The output type is d1's base type, so no parents are looked up.
        assert!(graph.page_sizes(D1, Relation::Within).is_empty());
    }

    #[tokio::test]
    async fn repeated_runs_are_identical() {
        let graph = scenario();
        let registry = HierarchyRegistry::embedded();
        let first =
            get_location_overlaps_crosswalk(&graph, &registry, P, None, &OverlapOptions::all())
                .await
                .unwrap();
        let second =
            get_location_overlaps_crosswalk(&graph, &registry, P, None, &OverlapOptions::all())
                .await
                .unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn unknown_source_area_or_hierarchy_is_reportable() {
        let registry = HierarchyRegistry::embedded();
        let err = get_location_overlaps_crosswalk(
            &FakeGraph::default(),
            &registry,
            P,
            None,
            &OverlapOptions::default(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, OverlapError::Reportable { .. }));

        let err = get_location_overlaps_crosswalk(
            &FakeGraph::default(),
            &registry,
            "http://example.org/nowhere/1",
            None,
            &OverlapOptions::default(),
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("known spatial hierarchy"));
    }
}
