//! Text-alignment table strategy.
//!
//! Finds tables drawn without ruling lines: consecutive rows of text that
//! break into the same left-aligned columns.

use crate::geometry::BBox;
use crate::table::{Cell, Table, TableSettings, TableStrategy};
use crate::words::TextLine;

/// Text lines sharing a vertical band, left to right.
struct Row<'a> {
    segments: Vec<&'a TextLine>,
    bbox: BBox,
}

/// Cluster lines into rows by vertical midpoint.
fn cluster_rows<'a>(lines: &'a [TextLine], tolerance: f64) -> Vec<Row<'a>> {
    let mut sorted: Vec<&TextLine> = lines.iter().collect();
    sorted.sort_by(|a, b| {
        a.bbox
            .center_y()
            .total_cmp(&b.bbox.center_y())
            .then(a.bbox.x0.total_cmp(&b.bbox.x0))
    });

    let mut rows: Vec<(f64, Vec<&TextLine>)> = Vec::new();
    for line in sorted {
        let mid = line.bbox.center_y();
        match rows.last_mut() {
            Some((anchor, members)) if (mid - *anchor).abs() <= tolerance => members.push(line),
            _ => rows.push((mid, vec![line])),
        }
    }

    rows.into_iter()
        .filter_map(|(_, mut segments)| {
            segments.sort_by(|a, b| a.bbox.x0.total_cmp(&b.bbox.x0));
            let bbox = BBox::union_all(segments.iter().map(|l| l.bbox))?;
            Some(Row { segments, bbox })
        })
        .collect()
}

fn median(mut values: Vec<f64>) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}

/// Column anchors: left-edge clusters supported by at least `min_rows` rows.
fn column_anchors(rows: &[&Row<'_>], tolerance: f64, min_rows: usize) -> Vec<f64> {
    let mut lefts: Vec<(f64, usize)> = rows
        .iter()
        .enumerate()
        .flat_map(|(ri, row)| row.segments.iter().map(move |s| (s.bbox.x0, ri)))
        .collect();
    lefts.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut anchors = Vec::new();
    let mut start = 0;
    for i in 1..=lefts.len() {
        if i == lefts.len() || lefts[i].0 - lefts[start].0 > tolerance {
            let cluster = &lefts[start..i];
            let mut row_ids: Vec<usize> = cluster.iter().map(|c| c.1).collect();
            row_ids.sort_unstable();
            row_ids.dedup();
            if row_ids.len() >= min_rows {
                let mean = cluster.iter().map(|c| c.0).sum::<f64>() / cluster.len() as f64;
                anchors.push(mean);
            }
            start = i;
        }
    }
    anchors
}

/// Index of the anchor a segment aligns with.
fn anchor_of(anchors: &[f64], x0: f64, tolerance: f64) -> Option<usize> {
    anchors.iter().position(|a| (a - x0).abs() <= tolerance)
}

fn row_is_consistent(row: &Row<'_>, anchors: &[f64], tolerance: f64) -> bool {
    row.segments
        .iter()
        .all(|s| anchor_of(anchors, s.bbox.x0, tolerance).is_some())
}

/// Build a table from rows whose every segment aligns to an anchor.
fn build_table(rows: &[&Row<'_>], anchors: &[f64], tolerance: f64) -> Option<Table> {
    let n = anchors.len();
    let mut col_x0 = vec![f64::INFINITY; n];
    let mut col_x1 = vec![f64::NEG_INFINITY; n];
    let mut assigned: Vec<Vec<Vec<&TextLine>>> = Vec::with_capacity(rows.len());

    for row in rows {
        let mut slots: Vec<Vec<&TextLine>> = vec![Vec::new(); n];
        for seg in &row.segments {
            let col = anchor_of(anchors, seg.bbox.x0, tolerance)?;
            col_x0[col] = col_x0[col].min(seg.bbox.x0);
            col_x1[col] = col_x1[col].max(seg.bbox.x1);
            slots[col].push(*seg);
        }
        assigned.push(slots);
    }

    let grid: Vec<Vec<Cell>> = rows
        .iter()
        .zip(assigned)
        .map(|(row, slots)| {
            slots
                .into_iter()
                .enumerate()
                .map(|(col, segs)| {
                    let text = segs
                        .iter()
                        .map(|s| s.text())
                        .collect::<Vec<_>>()
                        .join(" ");
                    Cell {
                        bbox: BBox::new(col_x0[col], row.bbox.top, col_x1[col], row.bbox.bottom),
                        text: (!text.is_empty()).then_some(text),
                    }
                })
                .collect()
        })
        .collect();

    let bbox = BBox::union_all(grid.iter().flatten().map(|c| c.bbox))?;
    Some(Table {
        bbox,
        rows: grid,
        strategy: TableStrategy::Text,
    })
}

/// Detect tables from recurring column alignment.
///
/// Rows with at least `min_columns` text lines that follow each other within
/// twice the median line height form a run. A run becomes a table when every
/// line in it starts at one of at least `min_columns` left-edge anchors, each
/// anchor shared by at least `min_rows` rows. Rows that break the alignment
/// split the run; the pieces are checked again on their own.
pub fn find_text_tables(lines: &[TextLine], settings: &TableSettings) -> Vec<Table> {
    let rows = cluster_rows(lines, settings.text_row_tolerance);
    let max_gap = 2.0 * median(lines.iter().map(|l| l.bbox.height()).collect());
    let tol = settings.text_x_tolerance;

    let mut runs: Vec<Vec<&Row<'_>>> = Vec::new();
    let mut current: Vec<&Row<'_>> = Vec::new();
    for row in &rows {
        let qualifies = row.segments.len() >= settings.min_columns;
        let adjacent = current
            .last()
            .is_some_and(|prev| row.bbox.top - prev.bbox.bottom <= max_gap);
        if !qualifies || !adjacent {
            runs.push(std::mem::take(&mut current));
        }
        if qualifies {
            current.push(row);
        }
    }
    runs.push(current);

    let mut tables = Vec::new();
    for run in runs.into_iter().filter(|r| r.len() >= settings.min_rows) {
        let anchors = column_anchors(&run, tol, settings.min_rows);
        for piece in run.split(|row| !row_is_consistent(row, &anchors, tol)) {
            if piece.len() < settings.min_rows {
                continue;
            }
            let anchors = column_anchors(piece, tol, settings.min_rows);
            if anchors.len() < settings.min_columns
                || !piece.iter().all(|row| row_is_consistent(row, &anchors, tol))
            {
                continue;
            }
            tables.extend(build_table(piece, &anchors, tol));
        }
    }
    tables
}
