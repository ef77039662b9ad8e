//! Table model and table finding.
//!
//! Two strategies are available. [`TableStrategy::Lines`] builds a grid
//! from ruling lines and rectangle sides drawn on the page;
//! [`TableStrategy::Text`] infers columns from whitespace alignment of
//! words when no rulings exist.

mod lattice;
mod model;
mod stream;

pub use lattice::LatticeFinder;
pub use model::Table;
pub use stream::{DetectedTable, TableDetector, TableDetectorConfig, TableRowData};

use crate::parser::{group_chars_into_spans, PageObjects, TextOptions};

/// How tables are located on a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TableStrategy {
    /// Ruling lines and rectangle edges (lattice)
    #[default]
    Lines,
    /// Whitespace alignment of words (stream)
    Text,
}

/// Settings for table finding.
#[derive(Debug, Clone)]
pub struct TableSettings {
    /// Which finder to run
    pub strategy: TableStrategy,
    /// Parallel edges closer than this are snapped to one position
    pub snap_tolerance: f32,
    /// Collinear edges with gaps up to this are joined
    pub join_tolerance: f32,
    /// Edges shorter than this are discarded
    pub edge_min_length: f32,
    /// Slack allowed when deciding whether two edges cross
    pub intersection_tolerance: f32,
    /// Options used to extract each cell's text
    pub text: TextOptions,
    /// Configuration of the text-alignment detector
    pub detector: TableDetectorConfig,
}

impl Default for TableSettings {
    fn default() -> Self {
        Self {
            strategy: TableStrategy::Lines,
            snap_tolerance: 3.0,
            join_tolerance: 3.0,
            edge_min_length: 3.0,
            intersection_tolerance: 3.0,
            text: TextOptions::default(),
            detector: TableDetectorConfig::default(),
        }
    }
}

impl TableSettings {
    /// Create new table settings with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the strategy.
    pub fn with_strategy(mut self, strategy: TableStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Set snap and join tolerances.
    pub fn with_tolerances(mut self, snap: f32, join: f32) -> Self {
        self.snap_tolerance = snap;
        self.join_tolerance = join;
        self
    }

    /// Set the text-alignment detector configuration.
    pub fn with_detector(mut self, detector: TableDetectorConfig) -> Self {
        self.detector = detector;
        self
    }
}

/// Find the tables on a page, ordered top to bottom then left to right.
pub fn find_tables(objects: &PageObjects, settings: &TableSettings) -> Vec<Table> {
    let mut tables = match settings.strategy {
        TableStrategy::Lines => LatticeFinder::new(settings).find(objects),
        TableStrategy::Text => {
            let spans = group_chars_into_spans(&objects.chars, &settings.text);
            let detector = TableDetector::with_config(settings.detector.clone());
            detector
                .detect(&spans)
                .iter()
                .map(|detected| detector.to_table(detected))
                .collect()
        }
    };

    tables.sort_by(|a, b| {
        b.bbox
            .y1
            .partial_cmp(&a.bbox.y1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(
                a.bbox
                    .x0
                    .partial_cmp(&b.bbox.x0)
                    .unwrap_or(std::cmp::Ordering::Equal),
            )
    });

    log::debug!(
        "{:?} strategy found {} table(s)",
        settings.strategy,
        tables.len()
    );
    tables
}
