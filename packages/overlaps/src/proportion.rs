//! Turns relation rows into overlap records.
//!
//! Percentages follow a fixed precedence. A within row is 100% forward and
//! the intersection is the whole source; a contains row is 100% reverse
//! and the intersection is the whole destination; anything else is
//! measured from its intersection area. A percentage whose denominator is
//! unknown or zero is left out.

use loci_overlaps_models::{Numeric, OverlapMeta, OverlapOptions, OverlapRecord, percentage};
use rust_decimal::Decimal;

use crate::OverlapError;
use crate::relations::RelationRow;

const NO_SOURCE_AREA: &str =
    "source feature has no known area, cannot compute proportions or areas";

/// Fails unless the source area is known.
///
/// # Errors
///
/// Returns [`OverlapError::Reportable`] when `source_area` is `None`.
pub fn require_source_area(source_area: Option<Decimal>) -> Result<Decimal, OverlapError> {
    source_area.ok_or_else(|| OverlapError::Reportable {
        message: NO_SOURCE_AREA.to_string(),
    })
}

fn measured(row: &RelationRow, source: Option<Decimal>) -> OverlapRecord {
    let dest = row.feature_area;
    let ratio = |part: Option<Decimal>, whole: Option<Decimal>| {
        percentage(part?, whole?).map(Numeric::Known)
    };
    let full = Some(Numeric::Known(Decimal::ONE_HUNDRED));

    let mut record = OverlapRecord::new(&row.uri);
    record.is_within = row.is_within.filter(|w| *w);
    record.contains = row.contains.filter(|c| *c);
    record.feature_area = dest.map(Numeric::known);

    if record.is_within.is_some() {
        record.intersection_area = source.map(Numeric::known);
        record.forward_percentage = full;
        record.reverse_percentage = ratio(source, dest);
    } else if record.contains.is_some() {
        record.intersection_area = dest.map(Numeric::known);
        record.forward_percentage = ratio(dest, source);
        record.reverse_percentage = full;
    } else if let Some(intersection) = row.intersection_area {
        record.intersection_area = Some(Numeric::known(intersection));
        record.forward_percentage = ratio(Some(intersection), source);
        record.reverse_percentage = ratio(Some(intersection), dest);
    }
    record
}

/// Builds one record per row without requiring the source area.
///
/// With no measurements requested each record carries only its URI.
#[must_use]
pub fn build_records(
    rows: &[RelationRow],
    source_area: Option<Decimal>,
    options: &OverlapOptions,
) -> Vec<OverlapRecord> {
    if !options.wants_measures() {
        return rows.iter().map(|row| OverlapRecord::new(&row.uri)).collect();
    }
    rows.iter()
        .map(|row| {
            let mut record = measured(row, source_area);
            record.retain_measures(options);
            record
        })
        .collect()
}

/// Computes the overlap listing for one page of rows.
///
/// # Errors
///
/// Returns [`OverlapError::Reportable`] when areas or proportions were
/// requested and the source area is unknown. No records are returned in
/// that case.
pub fn calculate(
    rows: &[RelationRow],
    source_area: Option<Decimal>,
    options: &OverlapOptions,
    offset: u64,
) -> Result<(OverlapMeta, Vec<OverlapRecord>), OverlapError> {
    if options.wants_measures() {
        require_source_area(source_area)?;
    }
    let records = build_records(rows, source_area, options);
    let meta = OverlapMeta {
        count: records.len(),
        offset,
        feature_area: source_area
            .filter(|_| options.include_areas)
            .map(Numeric::known),
    };
    Ok((meta, records))
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn row(uri: &str, dest: Option<&str>, inter: Option<&str>) -> RelationRow {
        RelationRow {
            uri: uri.to_string(),
            feature_area: dest.map(dec),
            intersection_area: inter.map(dec),
            ..RelationRow::default()
        }
    }

    fn text(value: Option<Numeric>) -> Option<String> {
        value.map(|v| v.to_string())
    }

    #[test]
    fn within_source_is_fully_covered() {
        let mut u2 = row("u2", Some("4000000"), None);
        u2.is_within = Some(true);
        let (meta, records) =
            calculate(&[u2], Some(dec("1000000")), &OverlapOptions::all(), 0).unwrap();

        assert_eq!(meta.count, 1);
        assert_eq!(text(meta.feature_area).as_deref(), Some("1000000.00000000"));
        let r = &records[0];
        assert_eq!(r.is_within, Some(true));
        assert_eq!(text(r.forward_percentage).as_deref(), Some("100.00000000"));
        assert_eq!(text(r.reverse_percentage).as_deref(), Some("25.00000000"));
        assert_eq!(text(r.intersection_area).as_deref(), Some("1000000.00000000"));
    }

    #[test]
    fn contained_destination_is_fully_covered() {
        let mut b1 = row("b1", Some("600000"), None);
        b1.contains = Some(true);
        let (_, records) =
            calculate(&[b1], Some(dec("1000000")), &OverlapOptions::all(), 0).unwrap();
        let r = &records[0];
        assert_eq!(r.reverse_percentage, Some(Numeric::known(dec("100"))));
        assert_eq!(r.forward_percentage, Some(Numeric::known(dec("60"))));
        assert_eq!(r.intersection_area, r.feature_area);
    }

    #[test]
    fn overlap_measured_from_intersection() {
        let rows = [
            row("a", Some("3000000"), Some("1000000")),
            row("b", None, Some("500000")),
            row("c", Some("10"), None),
        ];
        let (_, records) =
            calculate(&rows, Some(dec("2000000")), &OverlapOptions::all(), 0).unwrap();

        assert_eq!(records[0].forward_percentage, Some(Numeric::known(dec("50"))));
        assert_eq!(
            text(records[0].reverse_percentage).as_deref(),
            Some("33.33333333")
        );
        // Unknown destination area skips only the reverse percentage.
        assert_eq!(records[1].forward_percentage, Some(Numeric::known(dec("25"))));
        assert_eq!(records[1].reverse_percentage, None);
        // No intersection: no percentages at all.
        assert_eq!(records[2].intersection_area, None);
        assert_eq!(records[2].forward_percentage, None);
        assert_eq!(records[2].feature_area, Some(Numeric::known(dec("10"))));
    }

    #[test]
    fn missing_source_area_is_reportable() {
        let rows = [row("a", Some("1"), Some("1"))];
        let options = OverlapOptions {
            include_areas: true,
            ..OverlapOptions::default()
        };
        let err = calculate(&rows, None, &options, 0).unwrap_err();
        assert!(matches!(err, OverlapError::Reportable { .. }));
        assert!(err.to_string().contains("no known area"));
    }

    #[test]
    fn uris_only_without_measures() {
        let rows = [row("a", Some("1"), Some("1")), row("b", None, None)];
        let (meta, records) = calculate(&rows, None, &OverlapOptions::default(), 40).unwrap();
        assert_eq!(meta.offset, 40);
        assert_eq!(meta.feature_area, None);
        assert_eq!(records, vec![OverlapRecord::new("a"), OverlapRecord::new("b")]);
    }

    #[test]
    fn proportion_only_drops_areas() {
        let options = OverlapOptions {
            include_proportion: true,
            ..OverlapOptions::default()
        };
        let rows = [row("a", Some("4"), Some("1"))];
        let (meta, records) = calculate(&rows, Some(dec("2")), &options, 0).unwrap();
        assert_eq!(meta.feature_area, None);
        assert_eq!(records[0].feature_area, None);
        assert_eq!(records[0].intersection_area, None);
        assert_eq!(records[0].forward_percentage, Some(Numeric::known(dec("50"))));
    }

    #[test]
    fn zero_area_denominators_are_skipped() {
        let rows = [row("a", Some("0"), Some("0"))];
        let (_, records) =
            calculate(&rows, Some(Decimal::ZERO), &OverlapOptions::all(), 0).unwrap();
        assert_eq!(records[0].forward_percentage, None);
        assert_eq!(records[0].reverse_percentage, None);
    }
}
