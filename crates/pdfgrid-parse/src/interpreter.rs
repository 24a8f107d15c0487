//! Content stream interpreter.
//!
//! Runs a page's operators against a graphics/text state machine and emits
//! [`Primitive`]s in top-left page space: one [`Char`] per shown glyph and
//! shapes for every painted path. Form XObjects are interpreted in place via
//! `Do`.

use std::sync::Arc;

use pdfgrid_core::{
    BBox, Char, Ctm, Deadline, Page, PathBuilder, PdfError, Primitive, extract_shapes,
};

use crate::document::{PageSource, Resources};
use crate::error::BackendError;
use crate::font::FontInfo;
use crate::lopdf_backend::MAX_FORM_DEPTH;
use crate::tokenizer::{Lexer, Operand, Operator};

/// Operators run between deadline checks.
const POLL_INTERVAL: usize = 256;

/// Smallest glyph box side, so zero-advance or zero-size glyphs keep an area.
const MIN_GLYPH_EXTENT: f64 = 0.01;

/// Interpreter limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterpretOptions {
    /// Deepest form XObject nesting that is interpreted; deeper `Do`s are
    /// skipped.
    pub max_form_depth: usize,
}

impl Default for InterpretOptions {
    fn default() -> Self {
        Self {
            max_form_depth: MAX_FORM_DEPTH,
        }
    }
}

/// Interpret one page into its primitives.
///
/// Content that could not be decoded and malformed content both fail the
/// page with [`PdfError::PageExtraction`]; an expired deadline or a cancelled
/// token returns the matching timeout / cancellation error.
pub fn interpret_page(
    source: &PageSource,
    options: &InterpretOptions,
    deadline: &Deadline,
) -> Result<Page, PdfError> {
    deadline.check()?;
    let content = source
        .content
        .as_deref()
        .map_err(|message| PdfError::PageExtraction {
            page: source.index,
            message: message.clone(),
        })?;

    let mut interpreter = Interpreter::new(source, options, deadline);
    interpreter
        .run(content, &source.resources, 0)
        .map_err(|e| e.for_page(source.index))?;
    Ok(interpreter.page)
}

/// Text state parameters saved and restored with the graphics state.
#[derive(Debug, Clone)]
struct TextParams {
    font: Arc<FontInfo>,
    size: f64,
    char_spacing: f64,
    word_spacing: f64,
    /// `Tz / 100`.
    h_scaling: f64,
    leading: f64,
    rise: f64,
}

impl Default for TextParams {
    fn default() -> Self {
        Self {
            font: Arc::new(FontInfo::default()),
            size: 0.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            h_scaling: 1.0,
            leading: 0.0,
            rise: 0.0,
        }
    }
}

#[derive(Debug, Clone)]
struct GraphicsState {
    /// User space to top-left page space.
    ctm: Ctm,
    line_width: f64,
    text: TextParams,
}

struct Interpreter<'a> {
    options: &'a InterpretOptions,
    deadline: &'a Deadline,
    page: Page,
    gs: GraphicsState,
    stack: Vec<GraphicsState>,
    /// Text matrix and text line matrix.
    tm: Ctm,
    tlm: Ctm,
    path: PathBuilder,
    operators: usize,
    seq: usize,
}

fn translate(tx: f64, ty: f64) -> Ctm {
    Ctm::new(1.0, 0.0, 0.0, 1.0, tx, ty)
}

fn missing(op: &Operator) -> BackendError {
    BackendError::Interpreter(format!("operator `{}` is missing operands", op.name))
}

/// The last `N` operands as numbers.
fn numbers<const N: usize>(op: &Operator) -> Result<[f64; N], BackendError> {
    let start = op.operands.len().checked_sub(N).ok_or_else(|| missing(op))?;
    let mut out = [0.0; N];
    for (slot, operand) in out.iter_mut().zip(&op.operands[start..]) {
        *slot = operand.as_f64().ok_or_else(|| {
            BackendError::Interpreter(format!("operator `{}` expects numeric operands", op.name))
        })?;
    }
    Ok(out)
}

/// The operand `back` places from the end.
fn operand_from_end(op: &Operator, back: usize) -> Result<&Operand, BackendError> {
    op.operands
        .len()
        .checked_sub(back + 1)
        .map(|i| &op.operands[i])
        .ok_or_else(|| missing(op))
}

fn string_operand(op: &Operator) -> Result<&[u8], BackendError> {
    operand_from_end(op, 0)?.as_bytes().ok_or_else(|| missing(op))
}

impl<'a> Interpreter<'a> {
    fn new(source: &PageSource, options: &'a InterpretOptions, deadline: &'a Deadline) -> Self {
        let ctm = source.base_ctm();
        Self {
            options,
            deadline,
            page: Page::new(source.index, source.width, source.height),
            gs: GraphicsState {
                ctm,
                line_width: 1.0,
                text: TextParams::default(),
            },
            stack: Vec::new(),
            tm: Ctm::identity(),
            tlm: Ctm::identity(),
            path: PathBuilder::new(ctm),
            operators: 0,
            seq: 0,
        }
    }

    fn run(&mut self, content: &[u8], resources: &Resources, depth: usize) -> Result<(), BackendError> {
        // A stream may only restore states it saved itself.
        let floor = self.stack.len();
        for op in Lexer::new(content) {
            let op = op?;
            self.operators += 1;
            if self.operators % POLL_INTERVAL == 0 {
                self.deadline.check()?;
            }
            self.apply(&op, resources, depth, floor)?;
        }
        Ok(())
    }

    fn set_ctm(&mut self, ctm: Ctm) {
        self.gs.ctm = ctm;
        self.path.set_ctm(ctm);
    }

    fn apply(
        &mut self,
        op: &Operator,
        resources: &Resources,
        depth: usize,
        floor: usize,
    ) -> Result<(), BackendError> {
        match op.name.as_str() {
            // Graphics state
            "q" => self.stack.push(self.gs.clone()),
            "Q" => {
                if self.stack.len() <= floor {
                    return Err(BackendError::Interpreter("unbalanced `Q` operator".to_string()));
                }
                if let Some(saved) = self.stack.pop() {
                    self.gs = saved;
                    self.path.set_ctm(self.gs.ctm);
                }
            }
            "cm" => {
                let m = numbers::<6>(op)?;
                let ctm = Ctm::from_array(m).concat(&self.gs.ctm);
                self.set_ctm(ctm);
            }
            "w" => {
                let [width] = numbers::<1>(op)?;
                self.gs.line_width = width;
            }

            // Path construction
            "m" => {
                let [x, y] = numbers::<2>(op)?;
                self.path.move_to(x, y);
            }
            "l" => {
                let [x, y] = numbers::<2>(op)?;
                self.path.line_to(x, y);
            }
            "c" => {
                let [x1, y1, x2, y2, x3, y3] = numbers::<6>(op)?;
                self.path.curve_to(x1, y1, x2, y2, x3, y3);
            }
            "v" => {
                let [x2, y2, x3, y3] = numbers::<4>(op)?;
                self.path.curve_to_v(x2, y2, x3, y3);
            }
            "y" => {
                let [x1, y1, x3, y3] = numbers::<4>(op)?;
                self.path.curve_to_y(x1, y1, x3, y3);
            }
            "re" => {
                let [x, y, w, h] = numbers::<4>(op)?;
                self.path.rectangle(x, y, w, h);
            }
            "h" => self.path.close_path(),

            // Path painting
            "S" => self.paint(true, false),
            "s" => {
                self.path.close_path();
                self.paint(true, false);
            }
            "f" | "F" | "f*" => self.paint(false, true),
            "B" | "B*" => self.paint(true, true),
            "b" | "b*" => {
                self.path.close_path();
                self.paint(true, true);
            }
            "n" => self.paint(false, false),

            // Text objects and state
            "BT" => {
                self.tm = Ctm::identity();
                self.tlm = Ctm::identity();
            }
            "ET" => {}
            "Tf" => {
                let [size] = numbers::<1>(op)?;
                let name = operand_from_end(op, 1)?.as_name().ok_or_else(|| missing(op))?;
                self.gs.text.size = size;
                self.gs.text.font = match resources.font(name) {
                    Some(font) => Arc::clone(font),
                    None => {
                        #[cfg(feature = "tracing")]
                        tracing::debug!(page = self.page.index, font = name, "font resource not found");
                        Arc::new(FontInfo::default())
                    }
                };
            }
            "Tc" => self.gs.text.char_spacing = numbers::<1>(op)?[0],
            "Tw" => self.gs.text.word_spacing = numbers::<1>(op)?[0],
            "Tz" => self.gs.text.h_scaling = numbers::<1>(op)?[0] / 100.0,
            "TL" => self.gs.text.leading = numbers::<1>(op)?[0],
            "Ts" => self.gs.text.rise = numbers::<1>(op)?[0],

            // Text positioning
            "Td" => {
                let [tx, ty] = numbers::<2>(op)?;
                self.move_line(tx, ty);
            }
            "TD" => {
                let [tx, ty] = numbers::<2>(op)?;
                self.gs.text.leading = -ty;
                self.move_line(tx, ty);
            }
            "Tm" => {
                let m = numbers::<6>(op)?;
                self.tm = Ctm::from_array(m);
                self.tlm = self.tm;
            }
            "T*" => self.next_line(),

            // Text showing
            "Tj" => {
                let bytes = string_operand(op)?;
                self.show(bytes);
            }
            "'" => {
                let bytes = string_operand(op)?;
                self.next_line();
                self.show(bytes);
            }
            "\"" => {
                let bytes = string_operand(op)?;
                let [word_spacing, char_spacing] = match op.operands.len().checked_sub(3) {
                    Some(start) => [&op.operands[start], &op.operands[start + 1]]
                        .map(|o| o.as_f64().ok_or_else(|| missing(op))),
                    None => return Err(missing(op)),
                };
                self.gs.text.word_spacing = word_spacing?;
                self.gs.text.char_spacing = char_spacing?;
                self.next_line();
                self.show(bytes);
            }
            "TJ" => {
                let Operand::Array(items) = operand_from_end(op, 0)? else {
                    return Err(missing(op));
                };
                for item in items {
                    match item {
                        Operand::LiteralString(bytes) | Operand::HexString(bytes) => self.show(bytes),
                        other => {
                            if let Some(adjust) = other.as_f64() {
                                let text = &self.gs.text;
                                let tx = -adjust / 1000.0 * text.size * text.h_scaling;
                                self.tm = translate(tx, 0.0).concat(&self.tm);
                            }
                        }
                    }
                }
            }

            // XObjects
            "Do" => {
                let name = operand_from_end(op, 0)?.as_name().ok_or_else(|| missing(op))?;
                self.invoke_form(name, resources, depth)?;
            }

            // Colour, clipping, marked content, inline images and the rest
            // do not affect geometry.
            _ => {}
        }
        Ok(())
    }

    fn move_line(&mut self, tx: f64, ty: f64) {
        self.tlm = translate(tx, ty).concat(&self.tlm);
        self.tm = self.tlm;
    }

    fn next_line(&mut self) {
        let leading = self.gs.text.leading;
        self.move_line(0.0, -leading);
    }

    /// Stroke width mapped into page space.
    fn device_line_width(&self) -> f64 {
        let ctm = &self.gs.ctm;
        self.gs.line_width * (ctm.x_scale() + ctm.y_scale()) / 2.0
    }

    fn paint(&mut self, stroke: bool, fill: bool) {
        let line_width = self.device_line_width();
        if let Some(painted) = self.path.paint(stroke, fill, line_width) {
            self.page.primitives.extend(extract_shapes(&painted));
        }
    }

    /// Show a string: one [`Char`] per glyph, advancing the text matrix.
    fn show(&mut self, bytes: &[u8]) {
        let text = self.gs.text.clone();
        let font = &text.font;
        let ascent = font.metrics.ascent() / 1000.0;
        let descent = font.metrics.descent() / 1000.0;
        let font_matrix = Ctm::new(text.size * text.h_scaling, 0.0, 0.0, text.size, 0.0, text.rise);

        for glyph in font.decode(bytes) {
            let w0 = font.metrics.width(glyph.code) / 1000.0;
            let trm = font_matrix.concat(&self.tm).concat(&self.gs.ctm);

            if !glyph.text.is_empty() {
                let corners = [
                    trm.transform(0.0, descent),
                    trm.transform(w0, descent),
                    trm.transform(w0, ascent),
                    trm.transform(0.0, ascent),
                ];
                let x0 = corners.iter().map(|p| p.0).fold(f64::INFINITY, f64::min);
                let x1 = corners.iter().map(|p| p.0).fold(f64::NEG_INFINITY, f64::max);
                let top = corners.iter().map(|p| p.1).fold(f64::INFINITY, f64::min);
                let bottom = corners.iter().map(|p| p.1).fold(f64::NEG_INFINITY, f64::max);
                let mut bbox = BBox::new(x0, top, x1, bottom);
                if bbox.width() < MIN_GLYPH_EXTENT {
                    bbox.x1 = bbox.x0 + MIN_GLYPH_EXTENT;
                }
                if bbox.height() < MIN_GLYPH_EXTENT {
                    bbox.bottom = bbox.top + MIN_GLYPH_EXTENT;
                }

                self.page.primitives.push(Primitive::Char(Char {
                    text: glyph.text,
                    bbox,
                    fontname: font.name.clone(),
                    size: trm.y_scale(),
                    baseline: trm.transform(0.0, 0.0).1,
                    upright: trm.b.abs() < 1e-6 && trm.c.abs() < 1e-6,
                    seq: self.seq,
                }));
                self.seq += 1;
            }

            let spacing = if glyph.is_space { text.word_spacing } else { 0.0 };
            let tx = (w0 * text.size + text.char_spacing + spacing) * text.h_scaling;
            self.tm = translate(tx, 0.0).concat(&self.tm);
        }
    }

    /// `Do` for a form XObject: an implicit `q`, the form matrix, its
    /// content, and an implicit `Q`.
    fn invoke_form(&mut self, name: &str, resources: &Resources, depth: usize) -> Result<(), BackendError> {
        // Images and unknown names draw nothing we extract.
        let Some(form) = resources.xobject(name).map(Arc::clone) else {
            return Ok(());
        };
        if depth >= self.options.max_form_depth {
            #[cfg(feature = "tracing")]
            tracing::debug!(page = self.page.index, form = name, depth, "form nesting limit reached");
            return Ok(());
        }
        let content = form
            .content
            .as_deref()
            .map_err(|message| BackendError::Interpreter(format!("form XObject /{name}: {message}")))?;

        let saved_depth = self.stack.len();
        let saved_text = (self.tm, self.tlm);
        self.stack.push(self.gs.clone());
        let ctm = form.matrix.concat(&self.gs.ctm);
        self.set_ctm(ctm);

        let result = self.run(content, form.resources.as_ref().unwrap_or(resources), depth + 1);

        self.stack.truncate(saved_depth + 1);
        if let Some(saved) = self.stack.pop() {
            self.gs = saved;
        }
        self.path.set_ctm(self.gs.ctm);
        (self.tm, self.tlm) = saved_text;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cmap::CMap;
    use crate::document::FormXObject;
    use crate::font_metrics::FontMetrics;
    use pdfgrid_core::{CancelToken, TimeoutScope};
    use std::collections::HashMap;
    use std::time::Duration;

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn helvetica() -> Arc<FontInfo> {
        Arc::new(FontInfo {
            name: "Helvetica".to_string(),
            ..FontInfo::default()
        })
    }

    fn resources() -> Resources {
        Resources {
            fonts: HashMap::from([("F1".to_string(), helvetica())]),
            xobjects: HashMap::new(),
        }
    }

    fn source(content: &[u8], resources: Resources) -> PageSource {
        PageSource {
            index: 2,
            width: 612.0,
            height: 792.0,
            media_box: [0.0, 0.0, 612.0, 792.0],
            content: Ok(content.to_vec()),
            resources,
        }
    }

    fn run(content: &[u8]) -> Result<Page, PdfError> {
        interpret_page(
            &source(content, resources()),
            &InterpretOptions::default(),
            &Deadline::unbounded(2),
        )
    }

    fn chars(page: &Page) -> Vec<Char> {
        page.chars()
    }

    #[test]
    fn blank_page_has_no_primitives() {
        let page = run(b"").unwrap();
        assert!(page.is_blank());
        assert_eq!(page.index, 2);
        assert_eq!((page.width, page.height), (612.0, 792.0));
    }

    #[test]
    fn simple_text_positions() {
        let page = run(b"BT /F1 12 Tf 72 720 Td (Hi) Tj ET").unwrap();
        let chars = chars(&page);
        assert_eq!(chars.len(), 2);

        let h = &chars[0];
        assert_eq!(h.text, "H");
        assert_eq!(h.fontname, "Helvetica");
        assert_approx(h.size, 12.0);
        assert_approx(h.bbox.x0, 72.0);
        assert_approx(h.bbox.x1, 72.0 + 7.2);
        // Ascent 750 and descent -250 around a baseline at y = 720.
        assert_approx(h.bbox.top, 792.0 - 729.0);
        assert_approx(h.bbox.bottom, 792.0 - 717.0);
        assert_approx(h.baseline, 72.0);
        assert!(h.upright);

        let i = &chars[1];
        assert_approx(i.bbox.x0, 79.2);
        assert_eq!((h.seq, i.seq), (0, 1));
    }

    #[test]
    fn char_and_word_spacing() {
        let page = run(b"BT /F1 10 Tf 2 Tc 5 Tw 0 700 Td (a b) Tj ET").unwrap();
        let chars = chars(&page);
        // a: 6 + 2; space: 6 + 2 + 5.
        assert_approx(chars[1].bbox.x0, 8.0);
        assert_approx(chars[2].bbox.x0, 8.0 + 13.0);
    }

    #[test]
    fn horizontal_scaling_and_rise() {
        let page = run(b"BT /F1 10 Tf 50 Tz 3 Ts 0 700 Td (ab) Tj ET").unwrap();
        let chars = chars(&page);
        assert_approx(chars[0].bbox.width(), 3.0);
        assert_approx(chars[1].bbox.x0, 3.0);
        assert_approx(chars[0].baseline, 792.0 - 703.0);
    }

    #[test]
    fn tj_array_adjustments_move_glyphs() {
        let page = run(b"BT /F1 10 Tf 0 700 Td [(A) -1000 (B) 500 (C)] TJ ET").unwrap();
        let chars = chars(&page);
        assert_approx(chars[1].bbox.x0, 16.0);
        assert_approx(chars[2].bbox.x0, 16.0 + 6.0 - 5.0);
    }

    #[test]
    fn leading_and_quote_operators() {
        let page = run(b"BT /F1 10 Tf 14 TL 0 700 Td (a) Tj (b) ' 1 0 (c) \" T* (d) Tj ET").unwrap();
        let chars = chars(&page);
        let baselines: Vec<f64> = chars.iter().map(|c| c.baseline).collect();
        assert_approx(baselines[0], 92.0);
        assert_approx(baselines[1], 106.0);
        assert_approx(baselines[2], 120.0);
        assert_approx(baselines[3], 134.0);
        assert_approx(chars[1].bbox.x0, 0.0);
    }

    #[test]
    fn td_sets_leading() {
        let page = run(b"BT /F1 10 Tf 0 700 Td (a) Tj 0 -20 TD (b) Tj T* (c) Tj ET").unwrap();
        let chars = chars(&page);
        assert_approx(chars[1].baseline, 112.0);
        assert_approx(chars[2].baseline, 132.0);
    }

    #[test]
    fn text_matrix_and_ctm_scale_size() {
        let page = run(b"2 0 0 2 0 0 cm BT /F1 10 Tf 1 0 0 1 10 10 Tm (A) Tj ET").unwrap();
        let a = &chars(&page)[0];
        assert_approx(a.size, 20.0);
        assert_approx(a.bbox.x0, 20.0);
        assert_approx(a.bbox.width(), 12.0);
        assert_approx(a.baseline, 792.0 - 20.0);
    }

    #[test]
    fn rotated_text_is_not_upright() {
        let page = run(b"BT /F1 10 Tf 0 1 -1 0 300 300 Tm (A) Tj ET").unwrap();
        assert!(!chars(&page)[0].upright);
    }

    #[test]
    fn missing_font_falls_back() {
        let page = run(b"BT /F9 10 Tf 0 700 Td (A) Tj ET").unwrap();
        let a = &chars(&page)[0];
        assert_eq!(a.fontname, "unknown");
        assert_approx(a.bbox.width(), 6.0);
    }

    #[test]
    fn zero_width_glyph_keeps_an_area() {
        let font = Arc::new(FontInfo {
            name: "Zero".to_string(),
            metrics: FontMetrics::new(65, vec![0.0], 0.0, 750.0, -250.0),
            ..FontInfo::default()
        });
        let res = Resources {
            fonts: HashMap::from([("Z".to_string(), font)]),
            xobjects: HashMap::new(),
        };
        let page = interpret_page(
            &source(b"BT /Z 10 Tf 0 700 Td (A) Tj ET", res),
            &InterpretOptions::default(),
            &Deadline::unbounded(2),
        )
        .unwrap();
        let a = &chars(&page)[0];
        assert!(!a.bbox.is_empty());
        assert_approx(a.bbox.width(), MIN_GLYPH_EXTENT);
    }

    #[test]
    fn zero_font_size_glyph_keeps_an_area() {
        let page = run(b"BT /F1 0 Tf 72 700 Td (x) Tj ET").unwrap();
        let x = &chars(&page)[0];
        assert!(!x.bbox.is_empty());
        assert_approx(x.bbox.height(), MIN_GLYPH_EXTENT);
        assert_approx(x.bbox.width(), MIN_GLYPH_EXTENT);
    }

    #[test]
    fn composite_font_uses_cmap_text() {
        let font = Arc::new(FontInfo {
            name: "SimSun".to_string(),
            metrics: FontMetrics::new(0, Vec::new(), 1000.0, 880.0, -120.0),
            to_unicode: Some(CMap::parse(b"1 beginbfchar <0001> <4E2D> endbfchar").unwrap()),
            composite: true,
        });
        let res = Resources {
            fonts: HashMap::from([("C0".to_string(), font)]),
            xobjects: HashMap::new(),
        };
        let page = interpret_page(
            &source(b"BT /C0 10 Tf 0 700 Td <00010001> Tj ET", res),
            &InterpretOptions::default(),
            &Deadline::unbounded(2),
        )
        .unwrap();
        let chars = chars(&page);
        assert_eq!(chars.len(), 2);
        assert_eq!(chars[0].text, "\u{4E2D}");
        assert_approx(chars[1].bbox.x0, 10.0);
    }

    #[test]
    fn rectangle_and_lines_become_shapes() {
        let page = run(b"1 w 100 100 50 20 re S 0 0 m 100 0 l S").unwrap();
        let rect = page.rects().next().unwrap();
        assert_approx(rect.bbox.x0, 100.0);
        assert_approx(rect.bbox.top, 792.0 - 120.0);
        assert_approx(rect.bbox.bottom, 792.0 - 100.0);
        assert_eq!(page.lines().count(), 1);
    }

    #[test]
    fn discarded_path_draws_nothing() {
        let page = run(b"0 0 100 100 re W n").unwrap();
        assert!(page.is_blank());
    }

    #[test]
    fn save_restore_isolates_ctm() {
        let page = run(b"q 1 0 0 1 100 0 cm Q BT /F1 10 Tf 0 700 Td (A) Tj ET").unwrap();
        assert_approx(chars(&page)[0].bbox.x0, 0.0);
    }

    #[test]
    fn unbalanced_restore_fails_the_page() {
        let err = run(b"q Q Q").unwrap_err();
        match err {
            PdfError::PageExtraction { page, message } => {
                assert_eq!(page, 2);
                assert!(message.contains("unbalanced"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn missing_operands_fail_the_page() {
        for content in [&b"10 m"[..], b"BT 12 Tf ET", b"1 0 0 cm", b"BT Tj ET"] {
            let err = run(content).unwrap_err();
            assert!(
                matches!(err, PdfError::PageExtraction { page: 2, .. }),
                "{content:?} gave {err:?}"
            );
        }
    }

    #[test]
    fn malformed_content_fails_the_page() {
        let err = run(b"BT /F1 12 Tf (unterminated Tj ET").unwrap_err();
        assert!(matches!(err, PdfError::PageExtraction { page: 2, .. }));
        assert!(!err.is_fatal());
    }

    #[test]
    fn undecodable_content_fails_the_page() {
        let mut src = source(b"", resources());
        src.content = Err("failed to decode content stream: bad zlib".to_string());
        let err = interpret_page(&src, &InterpretOptions::default(), &Deadline::unbounded(2))
            .unwrap_err();
        assert_eq!(
            err,
            PdfError::PageExtraction {
                page: 2,
                message: "failed to decode content stream: bad zlib".to_string(),
            }
        );
    }

    fn form_resources(content: &[u8], matrix: Ctm) -> Resources {
        let mut res = resources();
        res.xobjects.insert(
            "Fm0".to_string(),
            Arc::new(FormXObject {
                matrix,
                content: Ok(content.to_vec()),
                resources: None,
            }),
        );
        res
    }

    #[test]
    fn form_xobject_is_interpreted_with_its_matrix() {
        let res = form_resources(b"BT /F1 10 Tf (A) Tj ET 0 0 10 10 re f", translate(100.0, 200.0));
        let page = interpret_page(
            &source(b"/Fm0 Do BT /F1 10 Tf 0 0 Td (B) Tj ET", res),
            &InterpretOptions::default(),
            &Deadline::unbounded(2),
        )
        .unwrap();
        let chars = chars(&page);
        assert_eq!(chars[0].text, "A");
        assert_approx(chars[0].bbox.x0, 100.0);
        assert_approx(chars[0].baseline, 792.0 - 200.0);
        // The form's matrix does not leak out of `Do`.
        assert_approx(chars[1].bbox.x0, 0.0);
        assert_eq!(page.rects().count(), 1);
    }

    #[test]
    fn form_cannot_restore_callers_state() {
        let res = form_resources(b"Q", Ctm::identity());
        let err = interpret_page(
            &source(b"q /Fm0 Do Q", res),
            &InterpretOptions::default(),
            &Deadline::unbounded(2),
        )
        .unwrap_err();
        assert!(matches!(err, PdfError::PageExtraction { .. }));
    }

    #[test]
    fn unbalanced_save_in_form_is_dropped() {
        let res = form_resources(b"q q 1 0 0 1 50 0 cm", Ctm::identity());
        let page = interpret_page(
            &source(b"/Fm0 Do BT /F1 10 Tf (A) Tj ET", res),
            &InterpretOptions::default(),
            &Deadline::unbounded(2),
        )
        .unwrap();
        assert_approx(chars(&page)[0].bbox.x0, 0.0);
    }

    #[test]
    fn form_depth_limit_skips_deeper_forms() {
        let res = form_resources(b"0 0 10 10 re f", Ctm::identity());
        let options = InterpretOptions { max_form_depth: 0 };
        let page = interpret_page(&source(b"/Fm0 Do", res), &options, &Deadline::unbounded(2))
            .unwrap();
        assert!(page.is_blank());
    }

    #[test]
    fn unknown_xobject_is_ignored() {
        let page = run(b"/Im1 Do").unwrap();
        assert!(page.is_blank());
    }

    #[test]
    fn cancelled_token_stops_interpretation() {
        let token = CancelToken::new();
        token.cancel();
        let deadline = Deadline::for_page(2, None, None, token);
        let err = interpret_page(
            &source(b"0 0 m 1 1 l S", resources()),
            &InterpretOptions::default(),
            &deadline,
        )
        .unwrap_err();
        assert_eq!(err, PdfError::Cancelled);
    }

    #[test]
    fn expired_page_deadline_is_polled() {
        let deadline = Deadline::for_page(2, Some(Duration::ZERO), None, CancelToken::new());
        let content = "0 0 m 1 1 l S ".repeat(200);
        let err = interpret_page(
            &source(content.as_bytes(), resources()),
            &InterpretOptions::default(),
            &deadline,
        )
        .unwrap_err();
        assert_eq!(err, PdfError::Timeout(TimeoutScope::Page(2)));
    }

    #[test]
    fn media_box_origin_is_removed() {
        let mut src = source(b"BT /F1 10 Tf 150 300 Td (A) Tj ET", resources());
        src.media_box = [100.0, 100.0, 400.0, 500.0];
        src.width = 300.0;
        src.height = 400.0;
        let page = interpret_page(&src, &InterpretOptions::default(), &Deadline::unbounded(2))
            .unwrap();
        let a = &chars(&page)[0];
        assert_approx(a.bbox.x0, 50.0);
        assert_approx(a.baseline, 200.0);
    }
}
