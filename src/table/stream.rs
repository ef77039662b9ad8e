//! Table finding from text alignment (stream mode).
//!
//! Words are grouped into rows by baseline; x positions where words start
//! in many rows become column anchors; runs of consecutive rows aligned to
//! those anchors form a table.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use crate::parser::{BBox, TextSpan};

use super::Table;

/// Width of the buckets that word start positions are counted in.
const BUCKET_SIZE: f32 = 5.0;

/// How far a word may start from an anchor and still count as aligned.
const ALIGN_TOLERANCE: f32 = 5.0;

/// Slack for words starting just left of their column.
const COLUMN_LEAD: f32 = 10.0;

/// A table region and the words inside it.
#[derive(Debug, Clone)]
pub struct DetectedTable {
    /// Baseline of the first row
    pub top_y: f32,
    /// Baseline of the last row
    pub bottom_y: f32,
    pub left_x: f32,
    pub right_x: f32,
    /// Column anchors, left to right
    pub columns: Vec<f32>,
    /// Rows, top to bottom
    pub rows: Vec<TableRowData>,
}

/// Words sharing a baseline.
#[derive(Debug, Clone)]
pub struct TableRowData {
    /// Mean baseline of the row
    pub y: f32,
    /// Words sorted by x
    pub spans: Vec<TextSpan>,
}

/// Tuning for the text-alignment detector.
#[derive(Debug, Clone)]
pub struct TableDetectorConfig {
    /// Minimum number of rows to consider as table
    pub min_rows: usize,
    /// Minimum number of columns to consider as table
    pub min_columns: usize,
    /// Regions with more anchors than this are prose split into words
    pub max_columns: usize,
    /// Row grouping tolerance as a fraction of font size
    pub y_tolerance_factor: f32,
    /// Fraction of a row's words that must sit on an anchor
    pub min_alignment_ratio: f32,
    /// Minimum distance between two anchors (points)
    pub min_column_gap: f32,
}

impl Default for TableDetectorConfig {
    fn default() -> Self {
        Self {
            min_rows: 2,
            min_columns: 2,
            max_columns: 6,
            y_tolerance_factor: 0.4,
            min_alignment_ratio: 0.3,
            min_column_gap: 15.0,
        }
    }
}

/// Detects whitespace-separated tables in a list of words.
#[derive(Debug, Clone, Default)]
pub struct TableDetector {
    config: TableDetectorConfig,
}

impl TableDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: TableDetectorConfig) -> Self {
        Self { config }
    }

    /// Detect table regions among `spans`.
    pub fn detect(&self, spans: &[TextSpan]) -> Vec<DetectedTable> {
        let min_spans = self.config.min_rows * self.config.min_columns;
        if spans.len() < min_spans {
            log::debug!("stream: {} words, need at least {}", spans.len(), min_spans);
            return Vec::new();
        }

        let rows = self.group_into_rows(spans);
        if rows.len() < self.config.min_rows {
            log::debug!("stream: only {} rows", rows.len());
            return Vec::new();
        }

        let columns = self.detect_columns(&rows);
        log::debug!("stream: page column anchors {:?}", columns);
        if columns.len() < self.config.min_columns {
            return Vec::new();
        }

        let mut tables = Vec::new();
        for (start, end) in self.find_table_regions(&rows, &columns) {
            let region = &rows[start..=end];

            // Anchors are re-derived per region; page-wide ones mix tables
            let region_columns = self.detect_columns(region);
            if region_columns.len() < self.config.min_columns {
                continue;
            }
            if region_columns.len() > self.config.max_columns {
                log::debug!(
                    "stream: skipping rows {}..={}, {} columns looks like prose",
                    start,
                    end,
                    region_columns.len()
                );
                continue;
            }
            if self.is_list_pattern(region, &region_columns) {
                log::debug!("stream: skipping rows {}..={}, list markers", start, end);
                continue;
            }

            let words = || region.iter().flat_map(|r| r.spans.iter());
            tables.push(DetectedTable {
                top_y: region[0].y,
                bottom_y: region[region.len() - 1].y,
                left_x: words().map(|s| s.x).fold(f32::MAX, f32::min),
                right_x: words().map(TextSpan::right).fold(f32::MIN, f32::max),
                columns: region_columns,
                rows: region.to_vec(),
            });
        }

        log::debug!("stream: {} table region(s)", tables.len());
        tables
    }

    /// Build a [`Table`] with one cell per anchor in every row.
    pub fn to_table(&self, detected: &DetectedTable) -> Table {
        let columns = &detected.columns;

        let rows = detected
            .rows
            .iter()
            .map(|row| {
                let mut cells: Vec<Vec<&str>> = vec![Vec::new(); columns.len()];
                for span in &row.spans {
                    let col = find_column(span.x, columns, detected.right_x);
                    if let Some(cell) = cells.get_mut(col) {
                        cell.push(span.text.trim());
                    }
                }
                cells.into_iter().map(|words| Some(words.join(" "))).collect()
            })
            .collect();

        let words = || detected.rows.iter().flat_map(|r| r.spans.iter());
        let top = words().map(TextSpan::top).fold(detected.top_y, f32::max);
        let bottom = words()
            .map(TextSpan::bottom)
            .fold(detected.bottom_y, f32::min);

        Table::new(
            BBox::new(detected.left_x, bottom, detected.right_x, top),
            rows,
        )
    }

    /// Group words into rows, top to bottom.
    fn group_into_rows(&self, spans: &[TextSpan]) -> Vec<TableRowData> {
        let mut sorted = spans.to_vec();
        sorted.sort_by(|a, b| {
            b.y.partial_cmp(&a.y)
                .unwrap_or(Ordering::Equal)
                .then(a.x.partial_cmp(&b.x).unwrap_or(Ordering::Equal))
        });

        let mut rows: Vec<TableRowData> = Vec::new();
        let mut current: Vec<TextSpan> = Vec::new();
        let mut current_y: Option<f32> = None;

        for span in sorted {
            let tolerance = span.font_size * self.config.y_tolerance_factor;
            match current_y {
                Some(y) if (span.y - y).abs() <= tolerance => current.push(span),
                _ => {
                    if !current.is_empty() {
                        rows.push(make_row(std::mem::take(&mut current)));
                    }
                    current_y = Some(span.y);
                    current.push(span);
                }
            }
        }
        if !current.is_empty() {
            rows.push(make_row(current));
        }

        rows
    }

    /// Find x positions where words start in enough rows.
    ///
    /// Rows holding several words are the likely table rows, so only they
    /// vote when there are enough of them; otherwise every row votes.
    fn detect_columns(&self, rows: &[TableRowData]) -> Vec<f32> {
        let multi: Vec<&TableRowData> = rows.iter().filter(|r| r.spans.len() >= 2).collect();
        let voters: Vec<&TableRowData> = if multi.len() >= self.config.min_rows {
            multi
        } else {
            rows.iter().collect()
        };
        if voters.is_empty() {
            return Vec::new();
        }

        let mut counts: HashMap<i32, usize> = HashMap::new();
        for row in &voters {
            let buckets: HashSet<i32> = row
                .spans
                .iter()
                .map(|s| (s.x / BUCKET_SIZE).round() as i32)
                .collect();
            for bucket in buckets {
                *counts.entry(bucket).or_insert(0) += 1;
            }
        }

        let min_votes = ((voters.len() as f32 * self.config.min_alignment_ratio) as usize).max(2);
        let mut anchors: Vec<f32> = counts
            .into_iter()
            .filter(|(_, votes)| *votes >= min_votes)
            .map(|(bucket, _)| bucket as f32 * BUCKET_SIZE)
            .collect();
        anchors.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));

        let mut merged: Vec<f32> = Vec::new();
        for anchor in anchors {
            match merged.last() {
                Some(last) if anchor - last < self.config.min_column_gap => {}
                _ => merged.push(anchor),
            }
        }
        merged
    }

    /// Runs of at least `min_rows` consecutive aligned rows, as inclusive index ranges.
    fn find_table_regions(&self, rows: &[TableRowData], columns: &[f32]) -> Vec<(usize, usize)> {
        let mut regions = Vec::new();
        let mut start: Option<usize> = None;

        for (i, row) in rows.iter().enumerate() {
            if alignment_score(row, columns) >= self.config.min_alignment_ratio {
                start.get_or_insert(i);
            } else if let Some(s) = start.take() {
                if i - s >= self.config.min_rows {
                    regions.push((s, i - 1));
                }
            }
        }
        if let Some(s) = start {
            if rows.len() - s >= self.config.min_rows {
                regions.push((s, rows.len() - 1));
            }
        }

        regions
    }

    /// Whether the region is a bulleted or numbered list rather than a table.
    ///
    /// A list marker and its item text become separate words at two x
    /// positions, which otherwise reads as a two-column table.
    fn is_list_pattern(&self, rows: &[TableRowData], columns: &[f32]) -> bool {
        if columns.len() < 2 || rows.is_empty() {
            return false;
        }

        let mut bullets = 0;
        let mut numbers = 0;
        for row in rows {
            let first = row
                .spans
                .iter()
                .min_by(|a, b| a.x.partial_cmp(&b.x).unwrap_or(Ordering::Equal));
            if let Some(span) = first {
                if is_bullet_marker(&span.text) {
                    bullets += 1;
                } else if is_number_marker(&span.text) {
                    numbers += 1;
                }
            }
        }

        let bullet_ratio = bullets as f32 / rows.len() as f32;
        let marker_ratio = (bullets + numbers) as f32 / rows.len() as f32;

        // Numbered first columns are common in real tables; only two-column regions are rejected
        bullet_ratio >= 0.5 || (columns.len() == 2 && marker_ratio >= 0.5)
    }
}

fn make_row(mut spans: Vec<TextSpan>) -> TableRowData {
    spans.sort_by(|a, b| a.x.partial_cmp(&b.x).unwrap_or(Ordering::Equal));
    let y = spans.iter().map(|s| s.y).sum::<f32>() / spans.len() as f32;
    TableRowData { y, spans }
}

/// Fraction of the row's words that start on an anchor.
fn alignment_score(row: &TableRowData, columns: &[f32]) -> f32 {
    if row.spans.is_empty() || columns.is_empty() {
        return 0.0;
    }
    let aligned = row
        .spans
        .iter()
        .filter(|s| columns.iter().any(|c| (s.x - c).abs() <= ALIGN_TOLERANCE))
        .count();
    aligned as f32 / row.spans.len() as f32
}

/// Index of the column a word starting at `x` belongs to.
fn find_column(x: f32, columns: &[f32], right_x: f32) -> usize {
    for (i, &start) in columns.iter().enumerate() {
        let end = columns.get(i + 1).copied().unwrap_or(right_x + 100.0);
        if x >= start - COLUMN_LEAD && x < end - COLUMN_LEAD {
            return i;
        }
    }

    columns
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| {
            (x - **a)
                .abs()
                .partial_cmp(&(x - **b).abs())
                .unwrap_or(Ordering::Equal)
        })
        .map(|(i, _)| i)
        .unwrap_or(0)
}

fn is_bullet_marker(text: &str) -> bool {
    matches!(
        text.trim(),
        "-" | "–" | "—" | "•" | "·" | "*" | "○" | "▪" | "◦" | "▸" | "►" | "■" | "●" | "□" | "◆" | "▶" | "➤"
    )
}

/// "1.", "12)", "3", "a.", "B)"
fn is_number_marker(text: &str) -> bool {
    let cleaned: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    if cleaned.is_empty() {
        return false;
    }
    if cleaned.parse::<u32>().is_ok() {
        return true;
    }

    let Some(suffix) = cleaned.chars().last().filter(|c| *c == '.' || *c == ')') else {
        return false;
    };
    let body = &cleaned[..cleaned.len() - suffix.len_utf8()];
    let mut body_chars = body.chars();
    match (body_chars.next(), body_chars.next()) {
        (Some(c), None) if c.is_alphabetic() => true,
        _ => !body.is_empty() && body.chars().all(|c| c.is_ascii_digit()),
    }
}
