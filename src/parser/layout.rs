//! Text reconstruction from positioned characters.
//!
//! Characters are grouped into words (spans), words into lines, and lines
//! are emitted top to bottom. An optional layout mode places words on a
//! character grid so that horizontal and vertical whitespace survives.

use std::cmp::Ordering;

use unicode_normalization::UnicodeNormalization;

use super::content::TextChar;
use super::geometry::BBox;

/// Unicode normalization form applied to extracted text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnicodeNorm {
    Nfc,
    Nfkc,
    Nfd,
    Nfkd,
}

impl UnicodeNorm {
    fn apply(self, text: &str) -> String {
        match self {
            UnicodeNorm::Nfc => text.nfc().collect(),
            UnicodeNorm::Nfkc => text.nfkc().collect(),
            UnicodeNorm::Nfd => text.nfd().collect(),
            UnicodeNorm::Nfkd => text.nfkd().collect(),
        }
    }
}

/// Options for text extraction.
#[derive(Debug, Clone)]
pub struct TextOptions {
    /// Maximum horizontal gap (points) between characters of one word
    pub x_tolerance: f32,
    /// Maximum baseline difference (points) within one line
    pub y_tolerance: f32,
    /// Preserve layout by placing words on a character grid
    pub layout: bool,
    /// Points per grid column in layout mode
    pub x_density: f32,
    /// Points per grid row in layout mode
    pub y_density: f32,
    /// Optional Unicode normalization of the result
    pub unicode_norm: Option<UnicodeNorm>,
}

impl Default for TextOptions {
    fn default() -> Self {
        Self {
            x_tolerance: 3.0,
            y_tolerance: 3.0,
            layout: false,
            x_density: 7.25,
            y_density: 13.0,
            unicode_norm: None,
        }
    }
}

impl TextOptions {
    /// Create new text options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable layout mode.
    pub fn with_layout(mut self, layout: bool) -> Self {
        self.layout = layout;
        self
    }

    /// Set word and line tolerances.
    pub fn with_tolerance(mut self, x: f32, y: f32) -> Self {
        self.x_tolerance = x;
        self.y_tolerance = y;
        self
    }

    /// Set Unicode normalization.
    pub fn with_unicode_norm(mut self, norm: UnicodeNorm) -> Self {
        self.unicode_norm = Some(norm);
        self
    }
}

/// A word: a run of characters on one baseline without a significant gap.
#[derive(Debug, Clone)]
pub struct TextSpan {
    /// The text content
    pub text: String,
    /// X position (left edge)
    pub x: f32,
    /// Y position (baseline)
    pub y: f32,
    /// Width of the text
    pub width: f32,
    /// Font size in points
    pub font_size: f32,
    /// Font name (e.g., "Helvetica-Bold")
    pub font_name: String,
}

impl TextSpan {
    /// Create a new text span.
    pub fn new(text: String, x: f32, y: f32, width: f32, font_size: f32, font_name: String) -> Self {
        Self {
            text,
            x,
            y,
            width,
            font_size,
            font_name,
        }
    }

    /// Build a span from consecutive characters of one word.
    fn from_chars(chars: &[&TextChar]) -> Option<Self> {
        let first = chars.first()?;
        let right = chars
            .iter()
            .map(|c| c.right())
            .fold(f32::MIN, f32::max);
        let font_size = chars.iter().map(|c| c.font_size).fold(0.0, f32::max);
        let y = chars.iter().map(|c| c.y).sum::<f32>() / chars.len() as f32;
        Some(Self {
            text: chars.iter().map(|c| c.text.as_str()).collect(),
            x: first.x,
            y,
            width: right - first.x,
            font_size,
            font_name: first.font_name.clone(),
        })
    }

    /// Right edge.
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    /// Get the bottom Y coordinate (approximate, based on font size).
    pub fn bottom(&self) -> f32 {
        self.y - self.font_size * 0.2
    }

    /// Get the top Y coordinate (approximate, based on font size).
    pub fn top(&self) -> f32 {
        self.y + self.font_size * 0.8
    }
}

/// A text line composed of multiple spans on the same baseline.
#[derive(Debug, Clone)]
pub struct TextLine {
    /// The spans in this line, sorted by X position
    pub spans: Vec<TextSpan>,
    /// Y position (baseline)
    pub y: f32,
    /// Leftmost X position
    pub x: f32,
}

impl TextLine {
    /// Create a new text line from spans.
    pub fn from_spans(mut spans: Vec<TextSpan>) -> Self {
        spans.sort_by(|a, b| a.x.partial_cmp(&b.x).unwrap_or(Ordering::Equal));
        let y = spans.first().map(|s| s.y).unwrap_or(0.0);
        let x = spans.first().map(|s| s.x).unwrap_or(0.0);
        Self { spans, y, x }
    }

    /// Get the combined text of all spans with appropriate spacing.
    ///
    /// Inserts spaces between spans based on their X coordinate gaps.
    /// No space is inserted between adjacent CJK characters.
    pub fn text(&self) -> String {
        let mut result = String::new();

        for (i, span) in self.spans.iter().enumerate() {
            if i > 0 && needs_space(&self.spans[i - 1], span) {
                result.push(' ');
            }
            result.push_str(&span.text);
        }

        result
    }
}

fn needs_space(prev: &TextSpan, span: &TextSpan) -> bool {
    let gap = span.x - prev.right();

    let char_count = span.text.chars().count();
    let avg_char_width = if char_count > 0 && span.width > 0.0 {
        span.width / char_count as f32
    } else {
        span.font_size * 0.5
    };

    if gap <= avg_char_width * 0.2 {
        return false;
    }

    let prev_is_cjk = prev
        .text
        .chars()
        .last()
        .map(is_spaceless_script_char)
        .unwrap_or(false);
    let curr_is_cjk = span
        .text
        .chars()
        .next()
        .map(is_spaceless_script_char)
        .unwrap_or(false);

    !(prev_is_cjk && curr_is_cjk)
}

fn by_baseline_then_x(a: f32, ax: f32, b: f32, bx: f32) -> Ordering {
    // PDF y grows upwards: higher baselines come first
    b.partial_cmp(&a)
        .unwrap_or(Ordering::Equal)
        .then(ax.partial_cmp(&bx).unwrap_or(Ordering::Equal))
}

/// Group characters into words.
///
/// Characters are clustered into rows by baseline, sorted left to right,
/// and split on whitespace or on a gap wider than `x_tolerance`.
pub fn group_chars_into_spans(chars: &[TextChar], options: &TextOptions) -> Vec<TextSpan> {
    let mut sorted: Vec<&TextChar> = chars.iter().collect();
    sorted.sort_by(|a, b| by_baseline_then_x(a.y, a.x, b.y, b.x));

    let mut rows: Vec<Vec<&TextChar>> = Vec::new();
    let mut row_y: Option<f32> = None;
    for ch in sorted {
        match row_y {
            Some(y) if (ch.y - y).abs() <= options.y_tolerance => {
                if let Some(row) = rows.last_mut() {
                    row.push(ch);
                }
            }
            _ => {
                row_y = Some(ch.y);
                rows.push(vec![ch]);
            }
        }
    }

    let mut spans = Vec::new();
    for mut row in rows {
        row.sort_by(|a, b| a.x.partial_cmp(&b.x).unwrap_or(Ordering::Equal));

        let mut word: Vec<&TextChar> = Vec::new();
        for ch in row {
            if ch.is_whitespace() {
                spans.extend(TextSpan::from_chars(&word));
                word.clear();
                continue;
            }
            if let Some(prev) = word.last() {
                if ch.x - prev.right() > options.x_tolerance {
                    spans.extend(TextSpan::from_chars(&word));
                    word.clear();
                }
            }
            word.push(ch);
        }
        spans.extend(TextSpan::from_chars(&word));
    }

    spans
}

/// Group spans into lines by baseline, top to bottom.
pub fn group_spans_into_lines(spans: Vec<TextSpan>, y_tolerance: f32) -> Vec<TextLine> {
    let mut spans = spans;
    spans.sort_by(|a, b| by_baseline_then_x(a.y, a.x, b.y, b.x));

    let mut lines: Vec<TextLine> = Vec::new();
    let mut current_line_spans: Vec<TextSpan> = Vec::new();
    let mut current_y: Option<f32> = None;

    for span in spans {
        match current_y {
            Some(y) if (span.y - y).abs() <= y_tolerance => current_line_spans.push(span),
            _ => {
                if !current_line_spans.is_empty() {
                    lines.push(TextLine::from_spans(std::mem::take(
                        &mut current_line_spans,
                    )));
                }
                current_y = Some(span.y);
                current_line_spans.push(span);
            }
        }
    }

    if !current_line_spans.is_empty() {
        lines.push(TextLine::from_spans(current_line_spans));
    }

    lines
}

/// Reconstruct reading-order text from characters.
///
/// Returns `None` when there is no visible text at all; an image-only page
/// is a valid, empty result rather than a failure.
pub fn extract_text(chars: &[TextChar], bounds: &BBox, options: &TextOptions) -> Option<String> {
    let spans = group_chars_into_spans(chars, options);
    if spans.is_empty() {
        return None;
    }

    let lines = group_spans_into_lines(spans, options.y_tolerance);
    let text = if options.layout {
        render_layout(&lines, bounds, options)
    } else {
        lines
            .iter()
            .map(TextLine::text)
            .collect::<Vec<_>>()
            .join("\n")
    };

    Some(match options.unicode_norm {
        Some(norm) => norm.apply(&text),
        None => text,
    })
}

/// Place lines and words on a character grid anchored at the top-left of `bounds`.
fn render_layout(lines: &[TextLine], bounds: &BBox, options: &TextOptions) -> String {
    let mut out: Vec<String> = Vec::new();

    for line in lines {
        let row = grid_index(bounds.y1 - line.y, options.y_density, bounds.height());
        let target = if out.is_empty() { row } else { row.max(out.len()) };
        while out.len() < target {
            out.push(String::new());
        }

        let mut rendered = String::new();
        let mut col = 0usize;
        for span in &line.spans {
            let want = grid_index(span.x - bounds.x0, options.x_density, bounds.width());
            let pad = if col == 0 && rendered.is_empty() {
                want
            } else {
                want.max(col + 1)
            };
            while col < pad {
                rendered.push(' ');
                col += 1;
            }
            rendered.push_str(&span.text);
            col += span.text.chars().count();
        }
        out.push(rendered.trim_end().to_string());
    }

    out.join("\n")
}

/// Grid cell for a point `offset` into the page, clamped to the page grid.
///
/// Off-page glyphs land on the nearest grid edge.
fn grid_index(offset: f32, density: f32, extent: f32) -> usize {
    if density.is_nan() || density <= 0.0 {
        return 0;
    }
    let limit = (extent / density).ceil().max(0.0);
    (offset / density).round().clamp(0.0, limit) as usize
}

/// Check if character is from a script that doesn't use word spaces.
/// Chinese and Japanese don't use spaces between words, but Korean does.
fn is_spaceless_script_char(c: char) -> bool {
    let code = c as u32;

    // CJK Unified Ideographs and extensions
    (0x4E00..=0x9FFF).contains(&code)
    || (0x3400..=0x4DBF).contains(&code)
    || (0x20000..=0x2EBEF).contains(&code)
    // Hiragana, Katakana
    || (0x3040..=0x30FF).contains(&code)
    // CJK Symbols and Punctuation
    || (0x3000..=0x303F).contains(&code)
}
