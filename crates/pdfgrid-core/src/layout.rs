//! Page layout reconstruction: text lines and tables into ordered blocks.

use crate::geometry::BBox;
use crate::table::Table;
use crate::words::TextLine;

/// Paragraph heuristics.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct LayoutOptions {
    /// A vertical gap above this multiple of the median line height starts
    /// a new paragraph block.
    pub paragraph_gap_ratio: f64,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            paragraph_gap_ratio: 1.0,
        }
    }
}

/// Consecutive lines forming one paragraph.
#[derive(Debug, Clone, PartialEq)]
pub struct TextBlock {
    pub lines: Vec<TextLine>,
    pub bbox: BBox,
}

impl TextBlock {
    fn new(line: TextLine) -> Self {
        Self {
            bbox: line.bbox,
            lines: vec![line],
        }
    }

    fn push(&mut self, line: TextLine) {
        self.bbox = self.bbox.union(&line.bbox);
        self.lines.push(line);
    }
}

/// What a block holds.
#[derive(Debug, Clone, PartialEq)]
pub enum BlockKind {
    Text(TextBlock),
    /// A table plus the text lines it absorbed from the free-text stream.
    Table { table: Table, lines: Vec<TextLine> },
}

/// One unit of page content with its reading-order rank.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub kind: BlockKind,
    /// Position in page reading order, starting at 0.
    pub rank: usize,
}

impl Block {
    pub fn bbox(&self) -> BBox {
        match &self.kind {
            BlockKind::Text(t) => t.bbox,
            BlockKind::Table { table, .. } => table.bbox,
        }
    }

    /// Text lines this block accounts for.
    pub fn text_lines(&self) -> &[TextLine] {
        match &self.kind {
            BlockKind::Text(t) => &t.lines,
            BlockKind::Table { lines, .. } => lines,
        }
    }
}

fn median_height(lines: &[TextLine]) -> f64 {
    let mut heights: Vec<f64> = lines.iter().map(|l| l.bbox.height()).collect();
    if heights.is_empty() {
        return 0.0;
    }
    heights.sort_by(f64::total_cmp);
    heights[heights.len() / 2]
}

/// Group free lines into paragraph blocks.
///
/// Each line joins the nearest block above it that it horizontally overlaps,
/// when the gap is at most `max_gap`. Lines overlapping vertically by up to
/// half their own height still count as adjacent.
pub fn cluster_lines_into_blocks(mut lines: Vec<TextLine>, max_gap: f64) -> Vec<TextBlock> {
    lines.sort_by(|a, b| {
        a.bbox
            .top
            .total_cmp(&b.bbox.top)
            .then(a.bbox.x0.total_cmp(&b.bbox.x0))
    });

    let mut blocks: Vec<TextBlock> = Vec::new();
    for line in lines {
        let min_gap = -line.bbox.height() / 2.0;
        let mut best: Option<(usize, f64)> = None;
        for (i, block) in blocks.iter().enumerate() {
            let gap = line.bbox.top - block.bbox.bottom;
            if gap >= min_gap
                && gap <= max_gap
                && block.bbox.horizontal_overlap(&line.bbox) > 0.0
                && best.is_none_or(|(_, g)| gap < g)
            {
                best = Some((i, gap));
            }
        }
        match best {
            Some((i, _)) => blocks[i].push(line),
            None => blocks.push(TextBlock::new(line)),
        }
    }
    blocks
}

/// Order blocks top to bottom, and left to right among blocks whose
/// vertical extents overlap.
///
/// Blocks are swept by top edge into bands of transitively overlapping
/// extent; bands keep their vertical order and each band is read by `x0`.
pub fn sort_blocks_reading_order(blocks: &mut Vec<Block>) {
    blocks.sort_by(|a, b| {
        let (a, b) = (a.bbox(), b.bbox());
        a.top.total_cmp(&b.top).then(a.x0.total_cmp(&b.x0))
    });

    let mut ordered = Vec::with_capacity(blocks.len());
    let mut band: Vec<Block> = Vec::new();
    let mut band_bottom = f64::NEG_INFINITY;
    for block in blocks.drain(..) {
        let bbox = block.bbox();
        if !band.is_empty() && bbox.top >= band_bottom {
            flush_band(&mut band, &mut ordered);
            band_bottom = f64::NEG_INFINITY;
        }
        band_bottom = band_bottom.max(bbox.bottom);
        band.push(block);
    }
    flush_band(&mut band, &mut ordered);

    for (rank, block) in ordered.iter_mut().enumerate() {
        block.rank = rank;
    }
    *blocks = ordered;
}

fn flush_band(band: &mut Vec<Block>, out: &mut Vec<Block>) {
    band.sort_by(|a, b| {
        let (a, b) = (a.bbox(), b.bbox());
        a.x0.total_cmp(&b.x0).then(a.top.total_cmp(&b.top))
    });
    out.append(band);
}

/// Merge text lines and tables into reading-ordered blocks.
///
/// A line fully enclosed by a table belongs to that table and is removed from
/// the free text; the remaining lines become paragraph blocks. Every input
/// line ends up in exactly one block.
pub fn reconstruct(lines: Vec<TextLine>, tables: Vec<Table>, options: &LayoutOptions) -> Vec<Block> {
    let max_gap = options.paragraph_gap_ratio * median_height(&lines);

    let mut absorbed: Vec<Vec<TextLine>> = vec![Vec::new(); tables.len()];
    let mut free = Vec::new();
    for line in lines {
        match tables.iter().position(|t| t.encloses(&line.bbox)) {
            Some(i) => absorbed[i].push(line),
            None => free.push(line),
        }
    }

    let mut blocks: Vec<Block> = tables
        .into_iter()
        .zip(absorbed)
        .map(|(table, lines)| Block {
            kind: BlockKind::Table { table, lines },
            rank: 0,
        })
        .chain(
            cluster_lines_into_blocks(free, max_gap)
                .into_iter()
                .map(|t| Block {
                    kind: BlockKind::Text(t),
                    rank: 0,
                }),
        )
        .collect();
    sort_blocks_reading_order(&mut blocks);
    blocks
}
