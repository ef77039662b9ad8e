//! Content stream interpretation.
//!
//! Walks a page's decoded operators and produces the two kinds of page
//! objects that extraction needs: positioned characters and axis-aligned
//! ruling edges. Positions are in PDF user space after the CTM.

use std::collections::HashMap;

use crate::error::Result;

use super::backend::{
    decode_text_simple, BackendFont, ContentOp, PageId, PdfBackend, PdfValue, TextDecoder,
};
use super::font::FontMetrics;
use super::geometry::{Edge, Matrix};

/// Segments within this many points of axis-aligned count as ruling lines.
const AXIS_TOLERANCE: f32 = 1.0;

/// A single positioned character.
#[derive(Debug, Clone, PartialEq)]
pub struct TextChar {
    /// The decoded text (usually one character)
    pub text: String,
    /// X position of the glyph origin
    pub x: f32,
    /// Y position (baseline)
    pub y: f32,
    /// Advance width in user space
    pub width: f32,
    /// Effective font size in user space
    pub font_size: f32,
    /// Base font name
    pub font_name: String,
}

impl TextChar {
    /// Right edge of the glyph.
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    /// Approximate glyph centre, using a 20% descender / 80% ascender split.
    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.font_size * 0.3)
    }

    pub fn is_whitespace(&self) -> bool {
        self.text.chars().all(char::is_whitespace)
    }
}

/// Everything extraction needs from one page.
#[derive(Debug, Clone, Default)]
pub struct PageObjects {
    /// Characters in content-stream order
    pub chars: Vec<TextChar>,
    /// Ruling edges from stroked or filled paths
    pub edges: Vec<Edge>,
}

#[derive(Debug, Clone)]
struct TextState {
    font: Option<Vec<u8>>,
    font_size: f32,
    char_spacing: f32,
    word_spacing: f32,
    horizontal_scaling: f32,
    leading: f32,
    rise: f32,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            font: None,
            font_size: 12.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            horizontal_scaling: 1.0,
            leading: 0.0,
            rise: 0.0,
        }
    }
}

#[derive(Debug, Clone, Default)]
struct GraphicsState {
    ctm: Matrix,
    text: TextState,
}

/// Path under construction, already in user space.
#[derive(Debug, Default)]
struct PathBuilder {
    segments: Vec<((f32, f32), (f32, f32))>,
    current: Option<(f32, f32)>,
    subpath_start: Option<(f32, f32)>,
}

impl PathBuilder {
    fn move_to(&mut self, p: (f32, f32)) {
        self.current = Some(p);
        self.subpath_start = Some(p);
    }

    fn line_to(&mut self, p: (f32, f32)) {
        if let Some(from) = self.current {
            self.segments.push((from, p));
        }
        self.current = Some(p);
    }

    fn close(&mut self) {
        if let (Some(from), Some(start)) = (self.current, self.subpath_start) {
            if from != start {
                self.segments.push((from, start));
            }
            self.current = Some(start);
        }
    }

    fn rect(&mut self, corners: [(f32, f32); 4]) {
        self.move_to(corners[0]);
        for corner in &corners[1..] {
            self.line_to(*corner);
        }
        self.close();
    }

    fn take_edges(&mut self) -> Vec<Edge> {
        let edges = self
            .segments
            .drain(..)
            .filter_map(|(p, q)| Edge::from_segment(p, q, AXIS_TOLERANCE))
            .collect();
        self.current = None;
        self.subpath_start = None;
        edges
    }

    fn discard(&mut self) {
        self.segments.clear();
        self.current = None;
        self.subpath_start = None;
    }
}

/// Interprets the content stream of a single page.
pub struct ContentInterpreter<'a, B: PdfBackend> {
    backend: &'a B,
    page: PageId,
    fonts: HashMap<Vec<u8>, BackendFont>,
    decoders: HashMap<Vec<u8>, TextDecoder<'a>>,
    fallback_metrics: FontMetrics,
}

impl<'a, B: PdfBackend> ContentInterpreter<'a, B> {
    /// Prepare an interpreter for `page`, loading its font resources and
    /// their text decoders.
    pub fn new(backend: &'a B, page: PageId) -> Result<Self> {
        let fonts: HashMap<Vec<u8>, BackendFont> = backend
            .page_fonts(page)?
            .into_iter()
            .map(|f| (f.name.clone(), f))
            .collect();
        let decoders = backend.font_decoders(page);
        log::debug!(
            "page {:?}: {} font(s), {} with a text decoder",
            page,
            fonts.len(),
            decoders.len()
        );
        Ok(Self {
            backend,
            page,
            fonts,
            decoders,
            fallback_metrics: FontMetrics::default(),
        })
    }

    /// Decode and interpret the page's content stream.
    pub fn interpret_page(&self) -> Result<PageObjects> {
        let data = self.backend.page_content(self.page)?;
        if data.is_empty() {
            return Ok(PageObjects::default());
        }
        let ops = self.backend.decode_content(&data)?;
        Ok(self.interpret(&ops))
    }

    /// Interpret a sequence of already-decoded operations.
    pub fn interpret(&self, ops: &[ContentOp]) -> PageObjects {
        let mut out = PageObjects::default();
        let mut gs = GraphicsState::default();
        let mut stack: Vec<GraphicsState> = Vec::new();
        let mut path = PathBuilder::default();
        let mut tm = Matrix::IDENTITY;
        let mut tlm = Matrix::IDENTITY;
        let mut in_text_block = false;

        for op in ops {
            match op.operator.as_str() {
                "q" => stack.push(gs.clone()),
                "Q" => match stack.pop() {
                    Some(saved) => gs = saved,
                    None => log::warn!("unbalanced Q operator ignored"),
                },
                "cm" => {
                    if let Some(m) = matrix_operands(op) {
                        gs.ctm = m.then(&gs.ctm);
                    }
                }

                // Path construction
                "m" => {
                    if let (Some(x), Some(y)) = (op.number(0), op.number(1)) {
                        path.move_to(gs.ctm.apply(x, y));
                    }
                }
                "l" => {
                    if let (Some(x), Some(y)) = (op.number(0), op.number(1)) {
                        path.line_to(gs.ctm.apply(x, y));
                    }
                }
                "c" | "v" | "y" => {
                    // Curves never form ruling lines; just track the end point
                    let n = op.operands.len();
                    if n >= 2 {
                        if let (Some(x), Some(y)) = (op.number(n - 2), op.number(n - 1)) {
                            path.current = Some(gs.ctm.apply(x, y));
                        }
                    }
                }
                "re" => {
                    if let (Some(x), Some(y), Some(w), Some(h)) =
                        (op.number(0), op.number(1), op.number(2), op.number(3))
                    {
                        path.rect([
                            gs.ctm.apply(x, y),
                            gs.ctm.apply(x + w, y),
                            gs.ctm.apply(x + w, y + h),
                            gs.ctm.apply(x, y + h),
                        ]);
                    }
                }
                "h" => path.close(),

                // Path painting
                "S" | "f" | "F" | "f*" | "B" | "B*" => out.edges.extend(path.take_edges()),
                "s" | "b" | "b*" => {
                    path.close();
                    out.edges.extend(path.take_edges());
                }
                "n" => path.discard(),

                // Text objects
                "BT" => {
                    in_text_block = true;
                    tm = Matrix::IDENTITY;
                    tlm = Matrix::IDENTITY;
                }
                "ET" => in_text_block = false,

                // Text state
                "Tf" => {
                    if let Some(PdfValue::Name(name)) = op.operands.first() {
                        gs.text.font = Some(name.clone());
                    }
                    if let Some(size) = op.number(1) {
                        gs.text.font_size = size;
                    }
                }
                "Tc" => gs.text.char_spacing = op.number(0).unwrap_or(0.0),
                "Tw" => gs.text.word_spacing = op.number(0).unwrap_or(0.0),
                "Tz" => gs.text.horizontal_scaling = op.number(0).unwrap_or(100.0) / 100.0,
                "TL" => gs.text.leading = op.number(0).unwrap_or(0.0),
                "Ts" => gs.text.rise = op.number(0).unwrap_or(0.0),

                // Text positioning
                "Td" | "TD" => {
                    if let (Some(tx), Some(ty)) = (op.number(0), op.number(1)) {
                        if op.operator == "TD" {
                            gs.text.leading = -ty;
                        }
                        tlm = Matrix::translation(tx, ty).then(&tlm);
                        tm = tlm;
                    }
                }
                "Tm" => {
                    if let Some(m) = matrix_operands(op) {
                        tlm = m;
                        tm = m;
                    }
                }
                "T*" => {
                    tlm = Matrix::translation(0.0, -gs.text.leading).then(&tlm);
                    tm = tlm;
                }

                // Text showing
                "Tj" => {
                    if in_text_block {
                        if let Some(PdfValue::Str(bytes)) = op.operands.first() {
                            self.show_text(bytes, &mut tm, &gs, &mut out.chars);
                        }
                    }
                }
                "TJ" => {
                    if in_text_block {
                        if let Some(PdfValue::Array(items)) = op.operands.first() {
                            for item in items {
                                match item {
                                    PdfValue::Str(bytes) => {
                                        self.show_text(bytes, &mut tm, &gs, &mut out.chars)
                                    }
                                    other => {
                                        if let Some(adj) = other.as_number() {
                                            let tx = -adj / 1000.0
                                                * gs.text.font_size
                                                * gs.text.horizontal_scaling;
                                            tm = Matrix::translation(tx, 0.0).then(&tm);
                                        }
                                    }
                                }
                            }
                        }
                    }
                }
                "'" | "\"" => {
                    let text_idx = if op.operator == "\"" {
                        gs.text.word_spacing = op.number(0).unwrap_or(gs.text.word_spacing);
                        gs.text.char_spacing = op.number(1).unwrap_or(gs.text.char_spacing);
                        2
                    } else {
                        0
                    };
                    tlm = Matrix::translation(0.0, -gs.text.leading).then(&tlm);
                    tm = tlm;
                    if in_text_block {
                        if let Some(PdfValue::Str(bytes)) = op.operands.get(text_idx) {
                            self.show_text(bytes, &mut tm, &gs, &mut out.chars);
                        }
                    }
                }

                "Do" => {
                    log::debug!("XObject content is not interpreted: {:?}", op.operands.first());
                }
                _ => {}
            }
        }

        log::debug!(
            "interpreted {} operators: {} chars, {} edges",
            ops.len(),
            out.chars.len(),
            out.edges.len()
        );
        out
    }

    /// Emit characters for one string operand and advance the text matrix.
    fn show_text(
        &self,
        bytes: &[u8],
        tm: &mut Matrix,
        gs: &GraphicsState,
        chars: &mut Vec<TextChar>,
    ) {
        let ts = &gs.text;
        let font = ts.font.as_ref().and_then(|name| self.fonts.get(name));
        let metrics = font.map(|f| &f.metrics).unwrap_or(&self.fallback_metrics);
        let font_name = font
            .map(|f| f.base_font.clone())
            .or_else(|| ts.font.as_ref().map(|n| String::from_utf8_lossy(n).to_string()))
            .unwrap_or_default();

        let decoded = match ts.font.as_ref().and_then(|name| self.decoders.get(name)) {
            Some(decode) => decode(bytes),
            None => decode_text_simple(bytes),
        };

        let advances: Vec<f32> = metrics
            .codes(bytes)
            .into_iter()
            .map(|code| {
                let mut tx = metrics.width(code) / 1000.0 * ts.font_size + ts.char_spacing;
                if metrics.code_bytes == 1 && code == 32 {
                    tx += ts.word_spacing;
                }
                tx * ts.horizontal_scaling
            })
            .collect();

        let glyphs: Vec<char> = decoded.chars().collect();
        let per_glyph: Vec<f32> = if glyphs.len() == advances.len() {
            advances
        } else {
            // Multi-byte or ligature decodes: spread the run width evenly
            let total: f32 = advances.iter().sum();
            if glyphs.is_empty() {
                *tm = Matrix::translation(total, 0.0).then(tm);
                return;
            }
            vec![total / glyphs.len() as f32; glyphs.len()]
        };

        let rise = Matrix::translation(0.0, ts.rise);
        for (ch, advance) in glyphs.into_iter().zip(per_glyph) {
            let render = rise.then(tm).then(&gs.ctm);
            let next_tm = Matrix::translation(advance, 0.0).then(tm);
            let end = rise.then(&next_tm).then(&gs.ctm).apply(0.0, 0.0);
            let (x, y) = render.apply(0.0, 0.0);

            if !ch.is_control() {
                chars.push(TextChar {
                    text: ch.to_string(),
                    x,
                    y,
                    width: (end.0 - x).max(0.0),
                    font_size: ts.font_size * render.vertical_scale(),
                    font_name: font_name.clone(),
                });
            }
            *tm = next_tm;
        }
    }
}

fn matrix_operands(op: &ContentOp) -> Option<Matrix> {
    Some(Matrix::new(
        op.number(0)?,
        op.number(1)?,
        op.number(2)?,
        op.number(3)?,
        op.number(4)?,
        op.number(5)?,
    ))
}
