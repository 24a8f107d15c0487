//! Table detection types and pipeline.
//!
//! Two strategies produce [`Table`]s: ruling lines (this module) and text
//! alignment ([`crate::alignment`]). Every emitted table is a full grid: all
//! rows hold the same number of cells, padded with empty cells where the
//! drawn grid is irregular.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::alignment::find_text_tables;
use crate::cancel::Deadline;
use crate::edges::{Edge, Orientation, derive_edges};
use crate::error::PdfError;
use crate::geometry::BBox;
use crate::primitive::Page;
use crate::text::Char;
use crate::words::{TextLine, WordOptions, assemble_lines};

/// Slack used when deciding that a text line lies inside a table.
pub const ENCLOSURE_SLACK: f64 = 1.0;

/// Strategy for table detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "lowercase")
)]
pub enum TableStrategy {
    /// Grids built from ruling lines and rectangle edges.
    Lines,
    /// Grids inferred from column alignment of text lines.
    Text,
    /// Ruling lines, falling back to text alignment on pages without any.
    #[default]
    Auto,
}

impl std::str::FromStr for TableStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "lines" => Ok(TableStrategy::Lines),
            "text" => Ok(TableStrategy::Text),
            "auto" => Ok(TableStrategy::Auto),
            other => Err(format!("unknown table strategy '{other}'")),
        }
    }
}

/// Tolerances for table detection. Distances are in points.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct TableSettings {
    /// Parallel edges closer than this are aligned to their mean position.
    pub snap_tolerance: f64,
    /// Collinear segments with a gap up to this are merged.
    pub join_tolerance: f64,
    /// Slack when testing whether a horizontal and a vertical edge cross.
    pub intersection_tolerance: f64,
    /// Edges shorter than this are ignored.
    pub edge_min_length: f64,
    /// Left edges within this distance share a column anchor.
    pub text_x_tolerance: f64,
    /// Text lines whose midpoints are this close form one row.
    pub text_row_tolerance: f64,
    pub min_rows: usize,
    pub min_columns: usize,
    /// Pages with more ruling edges than this skip the line strategy.
    pub max_edges: usize,
}

impl Default for TableSettings {
    fn default() -> Self {
        Self {
            snap_tolerance: 3.0,
            join_tolerance: 3.0,
            intersection_tolerance: 3.0,
            edge_min_length: 3.0,
            text_x_tolerance: 3.0,
            text_row_tolerance: 3.0,
            min_rows: 2,
            min_columns: 2,
            max_edges: 5000,
        }
    }
}

/// A detected table cell.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Cell {
    pub bbox: BBox,
    /// Text content within the cell, `None` when empty or padded.
    pub text: Option<String>,
}

/// A detected table.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Table {
    /// Union of all cell boxes.
    pub bbox: BBox,
    /// Rows top to bottom, cells left to right. All rows have equal length.
    pub rows: Vec<Vec<Cell>>,
    /// Which strategy found the grid ([`TableStrategy::Lines`] or [`TableStrategy::Text`]).
    pub strategy: TableStrategy,
}

impl Table {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.rows.first().map_or(0, Vec::len)
    }

    /// Cell texts row by row.
    pub fn texts(&self) -> Vec<Vec<Option<String>>> {
        self.rows
            .iter()
            .map(|row| row.iter().map(|c| c.text.clone()).collect())
            .collect()
    }

    /// Whether a text line belongs to this table.
    pub fn encloses(&self, bbox: &BBox) -> bool {
        self.bbox.contains(bbox, ENCLOSURE_SLACK)
    }
}

/// Align nearby parallel edges to the mean of their cluster.
///
/// Horizontal edges cluster by y, vertical edges by x. Edges are not merged.
pub fn snap_edges(edges: Vec<Edge>, tolerance: f64) -> Vec<Edge> {
    let (mut horizontals, mut verticals): (Vec<Edge>, Vec<Edge>) = edges
        .into_iter()
        .partition(|e| e.orientation == Orientation::Horizontal);

    snap_group(&mut horizontals, tolerance, |e| e.top, |e, v| {
        e.top = v;
        e.bottom = v;
    });
    snap_group(&mut verticals, tolerance, |e| e.x0, |e, v| {
        e.x0 = v;
        e.x1 = v;
    });

    horizontals.extend(verticals);
    horizontals
}

fn snap_group<F, G>(edges: &mut [Edge], tolerance: f64, key: F, mut set: G)
where
    F: Fn(&Edge) -> f64,
    G: FnMut(&mut Edge, f64),
{
    if edges.is_empty() {
        return;
    }
    edges.sort_by(|a, b| key(a).total_cmp(&key(b)));

    let mut cluster_start = 0;
    for i in 1..=edges.len() {
        let end_of_cluster =
            i == edges.len() || key(&edges[i]) - key(&edges[cluster_start]) > tolerance;
        if end_of_cluster {
            let sum: f64 = edges[cluster_start..i].iter().map(&key).sum();
            let mean = sum / (i - cluster_start) as f64;
            for edge in &mut edges[cluster_start..i] {
                set(edge, mean);
            }
            cluster_start = i;
        }
    }
}

/// Merge collinear segments that overlap or sit within `tolerance` of each other.
pub fn join_edges(edges: Vec<Edge>, tolerance: f64) -> Vec<Edge> {
    let (horizontals, verticals): (Vec<Edge>, Vec<Edge>) = edges
        .into_iter()
        .partition(|e| e.orientation == Orientation::Horizontal);

    let mut result = join_collinear(
        horizontals,
        |e| e.top,
        |e| (e.x0, e.x1),
        |proto, start, end| Edge {
            x0: start,
            x1: end,
            ..proto.clone()
        },
        tolerance,
    );
    result.extend(join_collinear(
        verticals,
        |e| e.x0,
        |e| (e.top, e.bottom),
        |proto, start, end| Edge {
            top: start,
            bottom: end,
            ..proto.clone()
        },
        tolerance,
    ));
    result
}

fn join_collinear<K, S, B>(mut edges: Vec<Edge>, key: K, span: S, build: B, tolerance: f64) -> Vec<Edge>
where
    K: Fn(&Edge) -> f64,
    S: Fn(&Edge) -> (f64, f64),
    B: Fn(&Edge, f64, f64) -> Edge,
{
    edges.sort_by(|a, b| {
        key(a)
            .total_cmp(&key(b))
            .then_with(|| span(a).0.total_cmp(&span(b).0))
    });

    let mut result = Vec::new();
    let mut i = 0;
    while i < edges.len() {
        let group_key = key(&edges[i]);
        let mut j = i + 1;
        while j < edges.len() && (key(&edges[j]) - group_key).abs() < 1e-9 {
            j += 1;
        }

        let (mut cur_start, mut cur_end) = span(&edges[i]);
        let mut proto = i;
        for k in (i + 1)..j {
            let (s, e) = span(&edges[k]);
            if s <= cur_end + tolerance {
                cur_end = cur_end.max(e);
            } else {
                result.push(build(&edges[proto], cur_start, cur_end));
                cur_start = s;
                cur_end = e;
                proto = k;
            }
        }
        result.push(build(&edges[proto], cur_start, cur_end));
        i = j;
    }
    result
}

/// Integer key for grouping coordinates that are equal after snapping.
fn float_key(v: f64) -> i64 {
    (v * 1000.0).round() as i64
}

/// Points where a horizontal and a vertical edge cross, sorted and unique.
///
/// The deadline is polled once per horizontal edge.
pub fn edges_to_intersections(
    edges: &[Edge],
    tolerance: f64,
    deadline: &Deadline,
) -> Result<Vec<(f64, f64)>, PdfError> {
    let (horizontals, verticals): (Vec<&Edge>, Vec<&Edge>) = edges
        .iter()
        .partition(|e| e.orientation == Orientation::Horizontal);

    let mut seen = HashSet::new();
    let mut points = Vec::new();
    for h in &horizontals {
        deadline.check()?;
        let y = h.top;
        for v in &verticals {
            let x = v.x0;
            if x >= h.x0 - tolerance
                && x <= h.x1 + tolerance
                && y >= v.top - tolerance
                && y <= v.bottom + tolerance
                && seen.insert((float_key(x), float_key(y)))
            {
                points.push((x, y));
            }
        }
    }
    points.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.total_cmp(&b.1)));
    Ok(points)
}

/// Cells between adjacent grid coordinates whose four corners all intersect.
pub fn intersections_to_cells(
    points: &[(f64, f64)],
    deadline: &Deadline,
) -> Result<Vec<BBox>, PdfError> {
    let corners: HashSet<(i64, i64)> = points
        .iter()
        .map(|&(x, y)| (float_key(x), float_key(y)))
        .collect();
    let mut xs: Vec<f64> = points.iter().map(|p| p.0).collect();
    let mut ys: Vec<f64> = points.iter().map(|p| p.1).collect();
    for axis in [&mut xs, &mut ys] {
        axis.sort_by(f64::total_cmp);
        axis.dedup_by(|a, b| float_key(*a) == float_key(*b));
    }

    let has = |x: f64, y: f64| corners.contains(&(float_key(x), float_key(y)));
    let mut cells = Vec::new();
    for yw in ys.windows(2) {
        deadline.check()?;
        for xw in xs.windows(2) {
            let (x0, x1, top, bottom) = (xw[0], xw[1], yw[0], yw[1]);
            if has(x0, top) && has(x1, top) && has(x0, bottom) && has(x1, bottom) {
                cells.push(BBox::new(x0, top, x1, bottom));
            }
        }
    }
    Ok(cells)
}

/// A cell side: orientation, its fixed coordinate and its span.
type SideKey = (Orientation, i64, i64, i64);

fn cell_sides(c: &BBox) -> [SideKey; 4] {
    let (x0, x1) = (float_key(c.x0), float_key(c.x1));
    let (top, bottom) = (float_key(c.top), float_key(c.bottom));
    [
        (Orientation::Horizontal, top, x0, x1),
        (Orientation::Horizontal, bottom, x0, x1),
        (Orientation::Vertical, x0, top, bottom),
        (Orientation::Vertical, x1, top, bottom),
    ]
}

/// Group edge-sharing cells (union-find) into padded grids.
///
/// Cells lie on the windows of one grid, so neighbours share a whole side and
/// each side is looked up once. Grids with fewer than `min_rows` rows or
/// `min_columns` columns are dropped.
pub fn cells_to_tables(cells: &[BBox], min_rows: usize, min_columns: usize) -> Vec<Table> {
    let n = cells.len();
    let mut parent: Vec<usize> = (0..n).collect();

    fn find(parent: &mut [usize], mut i: usize) -> usize {
        while parent[i] != i {
            parent[i] = parent[parent[i]];
            i = parent[i];
        }
        i
    }

    let mut owners: HashMap<SideKey, usize> = HashMap::with_capacity(n * 2);
    for (i, cell) in cells.iter().enumerate() {
        for side in cell_sides(cell) {
            let j = *owners.entry(side).or_insert(i);
            let (ri, rj) = (find(&mut parent, i), find(&mut parent, j));
            if ri != rj {
                parent[ri.max(rj)] = ri.min(rj);
            }
        }
    }

    let mut groups: BTreeMap<usize, Vec<BBox>> = BTreeMap::new();
    for (i, cell) in cells.iter().enumerate() {
        let root = find(&mut parent, i);
        groups.entry(root).or_default().push(*cell);
    }

    let mut tables: Vec<Table> = groups
        .into_values()
        .filter_map(|group| grid_from_cells(&group, min_rows, min_columns))
        .collect();
    tables.sort_by(|a, b| {
        a.bbox
            .top
            .total_cmp(&b.bbox.top)
            .then(a.bbox.x0.total_cmp(&b.bbox.x0))
    });
    tables
}

/// Lay a group of cells onto the grid of their distinct boundaries.
fn grid_from_cells(group: &[BBox], min_rows: usize, min_columns: usize) -> Option<Table> {
    let mut xs: Vec<f64> = group.iter().flat_map(|c| [c.x0, c.x1]).collect();
    let mut ys: Vec<f64> = group.iter().flat_map(|c| [c.top, c.bottom]).collect();
    for axis in [&mut xs, &mut ys] {
        axis.sort_by(f64::total_cmp);
        axis.dedup_by(|a, b| float_key(*a) == float_key(*b));
    }
    let rows = ys.len().saturating_sub(1);
    let columns = xs.len().saturating_sub(1);
    if rows < min_rows || columns < min_columns {
        return None;
    }

    let present: HashMap<(i64, i64), BBox> = group
        .iter()
        .map(|c| ((float_key(c.x0), float_key(c.top)), *c))
        .collect();
    let grid: Vec<Vec<Cell>> = ys
        .windows(2)
        .map(|yw| {
            xs.windows(2)
                .map(|xw| {
                    let bbox = present
                        .get(&(float_key(xw[0]), float_key(yw[0])))
                        .copied()
                        .unwrap_or_else(|| BBox::new(xw[0], yw[0], xw[1], yw[1]));
                    Cell { bbox, text: None }
                })
                .collect()
        })
        .collect();
    let bbox = BBox::union_all(group.iter().copied())?;
    Some(Table {
        bbox,
        rows: grid,
        strategy: TableStrategy::Lines,
    })
}

/// Index of the grid slot holding `v`, given each slot's leading boundary.
/// Values outside the grid go to the nearest end slot.
fn slot(starts: &[f64], v: f64) -> usize {
    starts
        .partition_point(|&s| s <= v)
        .saturating_sub(1)
        .min(starts.len().saturating_sub(1))
}

/// Fill cell text from the characters of lines enclosed by the table.
///
/// Each character goes to the cell containing its centre, or the nearest
/// cell when its centre falls in the enclosure slack outside every cell.
pub fn fill_cell_text(table: &mut Table, lines: &[TextLine], options: &WordOptions) {
    let n_cols = table.column_count();
    if n_cols == 0 {
        return;
    }
    let col_starts: Vec<f64> = table.rows[0].iter().map(|c| c.bbox.x0).collect();
    let row_starts: Vec<f64> = table.rows.iter().map(|r| r[0].bbox.top).collect();
    let mut buckets: Vec<Vec<Char>> = vec![Vec::new(); table.row_count() * n_cols];

    for ch in lines
        .iter()
        .filter(|l| table.encloses(&l.bbox))
        .flat_map(TextLine::chars)
    {
        let row = slot(&row_starts, ch.bbox.center_y());
        let col = slot(&col_starts, ch.bbox.center_x());
        buckets[row * n_cols + col].push(ch.clone());
    }

    for (cell, chars) in table.rows.iter_mut().flatten().zip(buckets) {
        let text = assemble_lines(&chars, options)
            .iter()
            .map(TextLine::text)
            .collect::<Vec<_>>()
            .join("\n");
        cell.text = (!text.is_empty()).then_some(text);
    }
}

/// Keep tables that do not overlap an already kept, larger table.
fn drop_overlapping(mut tables: Vec<Table>) -> Vec<Table> {
    tables.sort_by(|a, b| {
        let area = |t: &Table| t.bbox.width() * t.bbox.height();
        area(b).total_cmp(&area(a))
    });
    let mut kept: Vec<Table> = Vec::new();
    for table in tables {
        let overlaps = kept.iter().any(|k| {
            k.bbox.horizontal_overlap(&table.bbox) > 0.0 && k.bbox.overlaps_vertically(&table.bbox)
        });
        if !overlaps {
            kept.push(table);
        }
    }
    kept.sort_by(|a, b| {
        a.bbox
            .top
            .total_cmp(&b.bbox.top)
            .then(a.bbox.x0.total_cmp(&b.bbox.x0))
    });
    kept
}

/// Runs the configured detection strategy over one page.
#[derive(Debug, Clone, Default)]
pub struct TableFinder {
    settings: TableSettings,
    word_options: WordOptions,
}

impl TableFinder {
    pub fn new(settings: TableSettings, word_options: WordOptions) -> Self {
        Self {
            settings,
            word_options,
        }
    }

    /// Ruling-line pipeline: edges, snap, join, intersections, cells, grids.
    pub fn find_line_tables(
        &self,
        edges: Vec<Edge>,
        lines: &[TextLine],
        deadline: &Deadline,
    ) -> Result<Vec<Table>, PdfError> {
        let s = &self.settings;
        if edges.is_empty() || edges.len() > s.max_edges {
            return Ok(Vec::new());
        }
        let edges = join_edges(snap_edges(edges, s.snap_tolerance), s.join_tolerance);
        let points = edges_to_intersections(&edges, s.intersection_tolerance, deadline)?;
        let cells = intersections_to_cells(&points, deadline)?;
        deadline.check()?;
        let mut tables = cells_to_tables(&cells, s.min_rows, s.min_columns);
        for table in &mut tables {
            deadline.check()?;
            fill_cell_text(table, lines, &self.word_options);
        }
        Ok(tables)
    }

    /// Detect tables on a page with the given strategy.
    ///
    /// Tables never overlap one another, so every text line is enclosed by
    /// at most one table.
    ///
    /// Fails only when `deadline` trips while the ruling-line grid is built.
    pub fn find_tables(
        &self,
        page: &Page,
        lines: &[TextLine],
        strategy: TableStrategy,
        deadline: &Deadline,
    ) -> Result<Vec<Table>, PdfError> {
        let s = &self.settings;
        let tables = match strategy {
            TableStrategy::Lines => {
                let edges = derive_edges(page.lines(), page.rects(), s.edge_min_length);
                self.find_line_tables(edges, lines, deadline)?
            }
            TableStrategy::Text => find_text_tables(lines, s),
            TableStrategy::Auto => {
                let edges = derive_edges(page.lines(), page.rects(), s.edge_min_length);
                if edges.is_empty() {
                    find_text_tables(lines, s)
                } else {
                    self.find_line_tables(edges, lines, deadline)?
                }
            }
        };
        Ok(drop_overlapping(tables))
    }
}
