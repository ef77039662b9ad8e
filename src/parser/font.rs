//! Glyph advance metrics.

use std::collections::HashMap;

/// Width assumed for glyphs of fonts that carry no metrics, in glyph units.
const FALLBACK_WIDTH: f32 = 500.0;

/// Glyph widths for one font, in thousandths of an em.
#[derive(Debug, Clone)]
pub struct FontMetrics {
    /// Bytes per character code (1 for simple fonts, 2 for Type0).
    pub code_bytes: usize,
    first_char: u32,
    widths: Vec<f32>,
    cid_widths: HashMap<u32, f32>,
    default_width: f32,
}

impl Default for FontMetrics {
    fn default() -> Self {
        Self::simple(0, Vec::new(), None)
    }
}

impl FontMetrics {
    /// Metrics for a simple (single-byte) font.
    pub fn simple(first_char: u32, widths: Vec<f32>, missing_width: Option<f32>) -> Self {
        let default_width = match missing_width {
            Some(w) if w > 0.0 => w,
            _ => FALLBACK_WIDTH,
        };
        Self {
            code_bytes: 1,
            first_char,
            widths,
            cid_widths: HashMap::new(),
            default_width,
        }
    }

    /// Metrics for a composite (two-byte CID) font.
    pub fn composite(default_width: Option<f32>, cid_widths: HashMap<u32, f32>) -> Self {
        Self {
            code_bytes: 2,
            first_char: 0,
            widths: Vec::new(),
            cid_widths,
            // CIDFont DW defaults to 1000
            default_width: default_width.unwrap_or(1000.0),
        }
    }

    /// Advance width of a character code.
    pub fn width(&self, code: u32) -> f32 {
        if self.code_bytes == 2 {
            return self
                .cid_widths
                .get(&code)
                .copied()
                .unwrap_or(self.default_width);
        }
        code.checked_sub(self.first_char)
            .and_then(|i| self.widths.get(i as usize))
            .copied()
            .filter(|w| *w > 0.0)
            .unwrap_or(self.default_width)
    }

    /// Split a string operand into character codes.
    pub fn codes(&self, bytes: &[u8]) -> Vec<u32> {
        match self.code_bytes {
            2 => bytes
                .chunks(2)
                .map(|c| match c {
                    [hi, lo] => u32::from(*hi) << 8 | u32::from(*lo),
                    [b] => u32::from(*b),
                    _ => 0,
                })
                .collect(),
            _ => bytes.iter().map(|&b| u32::from(b)).collect(),
        }
    }
}
