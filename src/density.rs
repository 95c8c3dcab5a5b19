use std::collections::BTreeMap;

use serde::Serialize;
use tracing::trace;

use crate::business::GeoPoint;

pub const DEFAULT_GRID_SIZE: usize = 8;

const SATURATED_ABOVE: f64 = 0.6;
const MODERATE_ABOVE: f64 = 0.3;
const METERS_PER_DEGREE: f64 = 111_111.0;
const RADIUS_SHRINK: f64 = 2.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DensityTier {
    Saturated,
    Moderate,
    Sparse,
}

impl DensityTier {
    pub fn classify(intensity: f64) -> Self {
        if intensity > SATURATED_ABOVE {
            DensityTier::Saturated
        } else if intensity > MODERATE_ABOVE {
            DensityTier::Moderate
        } else {
            DensityTier::Sparse
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DensityTier::Saturated => "High Competition",
            DensityTier::Moderate => "Moderate",
            DensityTier::Sparse => "Potential Gap",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BoundingBox {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl BoundingBox {
    pub fn enclosing(points: &[GeoPoint]) -> Option<Self> {
        let first = points.first()?;
        let seed = Self {
            south: first.lat,
            west: first.lng,
            north: first.lat,
            east: first.lng,
        };
        Some(points.iter().fold(seed, |bounds, point| Self {
            south: bounds.south.min(point.lat),
            west: bounds.west.min(point.lng),
            north: bounds.north.max(point.lat),
            east: bounds.east.max(point.lng),
        }))
    }

    pub fn lat_span(&self) -> f64 {
        self.north - self.south
    }

    pub fn lng_span(&self) -> f64 {
        self.east - self.west
    }

    pub fn is_degenerate(&self) -> bool {
        self.lat_span() == 0.0 || self.lng_span() == 0.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DensityCell {
    pub row: usize,
    pub col: usize,
    pub count: usize,
    pub intensity: f64,
    pub tier: DensityTier,
    pub center: GeoPoint,
    pub bounds: BoundingBox,
    pub radius_meters: f64,
}

impl DensityCell {
    /// Fill opacity a renderer uses so hotter cells read stronger.
    pub fn fill_opacity(&self) -> f64 {
        0.3 + self.intensity * 0.4
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DensityMap {
    pub bounds: BoundingBox,
    pub grid_size: usize,
    pub max_count: usize,
    pub cells: Vec<DensityCell>,
}

/// Bins valid points into a `grid_size` x `grid_size` grid over their
/// bounding box and reports the occupied cells.
///
/// Empty input, a zero grid, or a zero-span box on either axis yields no
/// cells.
pub fn analyze(points: &[GeoPoint], grid_size: usize) -> Vec<DensityCell> {
    analyze_map(points, grid_size)
        .map(|map| map.cells)
        .unwrap_or_default()
}

pub fn analyze_map(points: &[GeoPoint], grid_size: usize) -> Option<DensityMap> {
    if grid_size == 0 {
        return None;
    }
    let bounds = BoundingBox::enclosing(points)?;
    if bounds.is_degenerate() {
        trace!(points = points.len(), "density grid skipped for zero-span bounds");
        return None;
    }

    let lat_step = bounds.lat_span() / grid_size as f64;
    let lng_step = bounds.lng_span() / grid_size as f64;

    // Only occupied cells are stored; keys iterate row-major.
    let mut counts: BTreeMap<(usize, usize), usize> = BTreeMap::new();
    let mut max_count = 0;
    for point in points {
        let row = cell_index(point.lat - bounds.south, lat_step, grid_size);
        let col = cell_index(point.lng - bounds.west, lng_step, grid_size);
        let slot = counts.entry((row, col)).or_insert(0);
        *slot += 1;
        max_count = max_count.max(*slot);
    }

    let radius_meters = lat_step.min(lng_step) * METERS_PER_DEGREE / RADIUS_SHRINK;
    let cells = counts
        .into_iter()
        .map(|((row, col), count)| {
            let south = bounds.south + row as f64 * lat_step;
            let west = bounds.west + col as f64 * lng_step;
            let intensity = count as f64 / max_count as f64;
            DensityCell {
                row,
                col,
                count,
                intensity,
                tier: DensityTier::classify(intensity),
                center: GeoPoint::new(south + lat_step / 2.0, west + lng_step / 2.0),
                bounds: BoundingBox {
                    south,
                    west,
                    north: south + lat_step,
                    east: west + lng_step,
                },
                radius_meters,
            }
        })
        .collect();

    Some(DensityMap {
        bounds,
        grid_size,
        max_count,
        cells,
    })
}

/// Floors the fractional position and keeps points on the far edge inside.
fn cell_index(offset: f64, step: f64, grid_size: usize) -> usize {
    let index = (offset / step).floor();
    if index <= 0.0 {
        0
    } else {
        (index as usize).min(grid_size - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn points(coords: &[(f64, f64)]) -> Vec<GeoPoint> {
        coords.iter().map(|(lat, lng)| GeoPoint::new(*lat, *lng)).collect()
    }

    #[test]
    fn bins_pair_and_far_corner() {
        let cells = analyze(
            &points(&[(10.0, 106.0), (10.0, 106.0), (10.1, 106.1)]),
            2,
        );
        assert_eq!(cells.len(), 2);

        let hot = cells.iter().find(|cell| cell.count == 2).unwrap();
        assert_eq!((hot.row, hot.col), (0, 0));
        assert_eq!(hot.intensity, 1.0);
        assert_eq!(hot.tier, DensityTier::Saturated);
        assert!((hot.fill_opacity() - 0.7).abs() < 1e-9);

        let edge = cells.iter().find(|cell| cell.count == 1).unwrap();
        assert_eq!((edge.row, edge.col), (1, 1));
        assert_eq!(edge.intensity, 0.5);
        assert_eq!(edge.tier, DensityTier::Moderate);
        assert!((edge.center.lat - 10.075).abs() < 1e-9);
        assert!((edge.center.lng - 106.075).abs() < 1e-9);
    }

    #[test]
    fn degenerate_bounds_yield_nothing() {
        assert!(analyze(&[], 8).is_empty());
        assert!(analyze(&points(&[(10.0, 106.0)]), 8).is_empty());
        assert!(analyze(&points(&[(10.0, 106.0), (10.0, 106.2)]), 8).is_empty());
        assert!(analyze(&points(&[(10.0, 106.0), (10.3, 106.0)]), 8).is_empty());
        assert!(analyze(&points(&[(10.0, 106.0), (10.3, 106.3)]), 0).is_empty());
    }

    #[test]
    fn single_cell_grid_holds_every_point() {
        let input = points(&[(10.0, 106.0), (10.05, 106.2), (10.3, 106.1), (10.2, 106.3)]);
        let cells = analyze(&input, 1);
        assert_eq!(cells.len(), 1);
        assert_eq!(cells[0].count, input.len());
        assert_eq!(cells[0].intensity, 1.0);
    }

    #[test]
    fn huge_grid_only_tracks_occupied_cells() {
        let input = points(&[(10.0, 106.0), (10.1, 106.1)]);
        let grid = 1_usize << 33;
        let map = analyze_map(&input, grid).unwrap();
        assert_eq!(map.grid_size, grid);
        assert_eq!(map.cells.len(), 2);
        assert_eq!((map.cells[0].row, map.cells[0].col), (0, 0));
        assert_eq!((map.cells[1].row, map.cells[1].col), (grid - 1, grid - 1));
        assert!(map.cells.iter().all(|cell| cell.count == 1 && cell.intensity == 1.0));
    }

    #[test]
    fn cells_come_out_row_major() {
        let input = points(&[(10.3, 106.0), (10.0, 106.3), (10.0, 106.0), (10.3, 106.3)]);
        let cells = analyze(&input, 2);
        let order: Vec<_> = cells.iter().map(|cell| (cell.row, cell.col)).collect();
        assert_eq!(order, vec![(0, 0), (0, 1), (1, 0), (1, 1)]);
    }

    #[test]
    fn intensity_peaks_at_one() {
        let input = points(&[
            (10.00, 106.00),
            (10.01, 106.01),
            (10.02, 106.02),
            (10.40, 106.40),
            (10.79, 106.79),
            (10.80, 106.80),
        ]);
        let map = analyze_map(&input, 8).unwrap();
        let total: usize = map.cells.iter().map(|cell| cell.count).sum();
        assert_eq!(total, input.len());
        assert!(map.cells.iter().all(|cell| cell.intensity <= 1.0));
        let peak = map
            .cells
            .iter()
            .find(|cell| cell.count == map.max_count)
            .unwrap();
        assert_eq!(peak.intensity, 1.0);
    }

    #[test]
    fn classifies_on_fixed_thresholds() {
        assert_eq!(DensityTier::classify(0.61), DensityTier::Saturated);
        assert_eq!(DensityTier::classify(0.6), DensityTier::Moderate);
        assert_eq!(DensityTier::classify(0.31), DensityTier::Moderate);
        assert_eq!(DensityTier::classify(0.3), DensityTier::Sparse);
        assert_eq!(DensityTier::Sparse.label(), "Potential Gap");
    }
}
