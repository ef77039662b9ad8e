//! Table finding from ruling lines.
//!
//! Edges are snapped, joined and filtered; their crossings become grid
//! vertices; every vertex that is the top-left corner of a fully ruled
//! rectangle yields the smallest such cell; cells sharing corners form a
//! table.

use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::parser::{extract_text, BBox, Edge, Orientation, PageObjects, TextChar};

use super::{Table, TableSettings};

/// Coordinates quantized to 1/100 pt so snapped positions compare exactly.
type PointKey = (i64, i64);

fn quantize(v: f32) -> i64 {
    (v * 100.0).round() as i64
}

fn key(x: f32, y: f32) -> PointKey {
    (quantize(x), quantize(y))
}

/// A grid vertex and the edges crossing at it.
#[derive(Debug, Clone)]
struct Intersection {
    x: f32,
    y: f32,
    horizontal: Vec<usize>,
    vertical: Vec<usize>,
}

impl Intersection {
    /// Two vertices are connected when they lie on a shared edge.
    fn connects(&self, other: &Intersection) -> bool {
        let shares = |a: &[usize], b: &[usize]| a.iter().any(|i| b.contains(i));
        if quantize(self.x) == quantize(other.x) {
            shares(&self.vertical, &other.vertical)
        } else if quantize(self.y) == quantize(other.y) {
            shares(&self.horizontal, &other.horizontal)
        } else {
            false
        }
    }
}

/// Finds tables bounded by ruling lines.
pub struct LatticeFinder<'a> {
    settings: &'a TableSettings,
}

impl<'a> LatticeFinder<'a> {
    pub fn new(settings: &'a TableSettings) -> Self {
        Self { settings }
    }

    /// Find all ruled tables among the page objects.
    pub fn find(&self, objects: &PageObjects) -> Vec<Table> {
        let edges = self.merge_edges(&objects.edges);
        if edges.is_empty() {
            return Vec::new();
        }

        let points = self.intersections(&edges);
        let cells = cells_from_intersections(&points);
        log::debug!(
            "lattice: {} edges, {} intersections, {} cells",
            edges.len(),
            points.len(),
            cells.len()
        );

        group_cells(cells)
            .into_iter()
            // A lone rectangle is a box, not a table
            .filter(|group| group.len() > 1)
            .map(|group| self.build_table(&group, &objects.chars))
            .collect()
    }

    /// Snap, join and length-filter raw edges.
    pub fn merge_edges(&self, edges: &[Edge]) -> Vec<Edge> {
        let snapped = snap_edges(edges, self.settings.snap_tolerance);
        join_edges(snapped, self.settings.join_tolerance)
            .into_iter()
            .filter(|e| e.length() >= self.settings.edge_min_length)
            .collect()
    }

    fn intersections(&self, edges: &[Edge]) -> HashMap<PointKey, Intersection> {
        let tol = self.settings.intersection_tolerance;
        let mut points: HashMap<PointKey, Intersection> = HashMap::new();

        for (vi, v) in edges.iter().enumerate() {
            if v.orientation != Orientation::Vertical {
                continue;
            }
            for (hi, h) in edges.iter().enumerate() {
                if h.orientation != Orientation::Horizontal {
                    continue;
                }
                let crosses = h.pos >= v.start - tol
                    && h.pos <= v.end + tol
                    && v.pos >= h.start - tol
                    && v.pos <= h.end + tol;
                if !crosses {
                    continue;
                }
                let point = points.entry(key(v.pos, h.pos)).or_insert(Intersection {
                    x: v.pos,
                    y: h.pos,
                    horizontal: Vec::new(),
                    vertical: Vec::new(),
                });
                point.horizontal.push(hi);
                point.vertical.push(vi);
            }
        }

        points
    }

    fn build_table(&self, cells: &[BBox], chars: &[TextChar]) -> Table {
        let mut columns: Vec<i64> = cells.iter().map(|c| quantize(c.x0)).collect();
        columns.sort_unstable();
        columns.dedup();

        let mut rows: BTreeMap<Reverse<i64>, HashMap<i64, &BBox>> = BTreeMap::new();
        for cell in cells {
            rows.entry(Reverse(quantize(cell.y1)))
                .or_default()
                .insert(quantize(cell.x0), cell);
        }

        let values = rows
            .values()
            .map(|row| {
                columns
                    .iter()
                    .map(|x| row.get(x).map(|cell| self.cell_text(cell, chars)))
                    .collect()
            })
            .collect();

        let bbox = cells
            .iter()
            .skip(1)
            .fold(cells[0], |acc, c| acc.union(c));

        Table::new(bbox, values)
    }

    /// Text of the characters whose centre lies inside `cell`.
    fn cell_text(&self, cell: &BBox, chars: &[TextChar]) -> String {
        let inside: Vec<TextChar> = chars
            .iter()
            .filter(|c| {
                let (cx, cy) = c.center();
                cell.contains_point(cx, cy)
            })
            .cloned()
            .collect();
        extract_text(&inside, cell, &self.settings.text).unwrap_or_default()
    }
}

/// Move parallel edges within `tolerance` of each other onto their mean position.
fn snap_edges(edges: &[Edge], tolerance: f32) -> Vec<Edge> {
    let mut out = Vec::with_capacity(edges.len());

    for orientation in [Orientation::Horizontal, Orientation::Vertical] {
        let mut group: Vec<Edge> = edges
            .iter()
            .filter(|e| e.orientation == orientation)
            .copied()
            .collect();
        group.sort_by(|a, b| a.pos.partial_cmp(&b.pos).unwrap_or(std::cmp::Ordering::Equal));

        let mut cluster: Vec<Edge> = Vec::new();
        for edge in group {
            let breaks = cluster
                .last()
                .map(|last| edge.pos - last.pos > tolerance)
                .unwrap_or(false);
            if breaks {
                flush_cluster(&mut cluster, &mut out);
            }
            cluster.push(edge);
        }
        flush_cluster(&mut cluster, &mut out);
    }

    out
}

fn flush_cluster(cluster: &mut Vec<Edge>, out: &mut Vec<Edge>) {
    if cluster.is_empty() {
        return;
    }
    let mean = cluster.iter().map(|e| e.pos).sum::<f32>() / cluster.len() as f32;
    out.extend(cluster.drain(..).map(|e| Edge { pos: mean, ..e }));
}

/// Merge collinear edges whose gap is at most `tolerance`.
fn join_edges(edges: Vec<Edge>, tolerance: f32) -> Vec<Edge> {
    let mut lanes: BTreeMap<(u8, i64), Vec<Edge>> = BTreeMap::new();
    for edge in edges {
        let lane = match edge.orientation {
            Orientation::Horizontal => 0,
            Orientation::Vertical => 1,
        };
        lanes.entry((lane, quantize(edge.pos))).or_default().push(edge);
    }

    let mut out = Vec::new();
    for (_, mut lane) in lanes {
        lane.sort_by(|a, b| a.start.partial_cmp(&b.start).unwrap_or(std::cmp::Ordering::Equal));
        let mut merged: Vec<Edge> = Vec::new();
        for edge in lane {
            match merged.last_mut() {
                Some(last) if edge.start <= last.end + tolerance => {
                    last.end = last.end.max(edge.end);
                }
                _ => merged.push(edge),
            }
        }
        out.extend(merged);
    }
    out
}

/// Build the minimal ruled cell for every vertex that is a top-left corner.
fn cells_from_intersections(points: &HashMap<PointKey, Intersection>) -> Vec<BBox> {
    let mut ordered: Vec<&Intersection> = points.values().collect();
    ordered.sort_by(|a, b| {
        b.y.partial_cmp(&a.y)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal))
    });

    let mut cells = Vec::new();
    for pt in &ordered {
        let (px, py) = key(pt.x, pt.y);

        let below: Vec<&Intersection> = ordered
            .iter()
            .filter(|p| quantize(p.x) == px && quantize(p.y) < py)
            .copied()
            .collect();
        let mut right: Vec<&Intersection> = ordered
            .iter()
            .filter(|p| quantize(p.y) == py && quantize(p.x) > px)
            .copied()
            .collect();
        right.sort_by(|a, b| a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal));

        'search: for b in &below {
            if !pt.connects(b) {
                continue;
            }
            for r in &right {
                if !pt.connects(r) {
                    continue;
                }
                let Some(corner) = points.get(&key(r.x, b.y)) else {
                    continue;
                };
                if corner.connects(r) && corner.connects(b) {
                    cells.push(BBox::new(pt.x, b.y, r.x, pt.y));
                    break 'search;
                }
            }
        }
    }

    cells
}

/// Group cells that share at least one corner.
fn group_cells(cells: Vec<BBox>) -> Vec<Vec<BBox>> {
    let corners = |c: &BBox| {
        [
            key(c.x0, c.y0),
            key(c.x0, c.y1),
            key(c.x1, c.y0),
            key(c.x1, c.y1),
        ]
    };

    let mut remaining = cells;
    let mut groups = Vec::new();
    let mut current: Vec<BBox> = Vec::new();
    let mut current_corners: HashSet<PointKey> = HashSet::new();

    while !remaining.is_empty() {
        let before = current.len();
        let mut rest = Vec::new();

        for cell in remaining.drain(..) {
            let cell_corners = corners(&cell);
            if current.is_empty() || cell_corners.iter().any(|k| current_corners.contains(k)) {
                current_corners.extend(cell_corners);
                current.push(cell);
            } else {
                rest.push(cell);
            }
        }
        remaining = rest;

        if current.len() == before {
            groups.push(std::mem::take(&mut current));
            current_corners.clear();
        }
    }

    if !current.is_empty() {
        groups.push(current);
    }

    groups
}
