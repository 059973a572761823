use std::collections::HashMap;

use crate::pointcloud::point::Color;

/// Classification value for cells whose elevation was synthesized by
/// edge-growth in-painting rather than sensed. Any non-zero classification
/// counts as data.
pub const GROWTH_FILLED_CLASS: u8 = 13;

/// A dense 2-D elevation raster in row-major order, top row first.
///
/// Classification `0` marks a no-data cell ("hole"); such a cell's elevation
/// must not be trusted until a filler has run. `physical_top`/`physical_bottom`
/// carry the source header's min/max y; raster row 0 corresponds to the
/// maximum-y edge of the physical bounds.
#[derive(Debug, Clone, Default)]
pub struct RasterGrid {
    pub width: usize,
    pub height: usize,
    pub elevations: Vec<f64>,
    pub classifications: Vec<u8>,
    pub colors: Option<Vec<Color>>,
    pub physical_left: f64,
    pub physical_top: f64,
    pub physical_right: f64,
    pub physical_bottom: f64,
    pub physical_width: f64,
    pub physical_height: f64,
    pub physical_high: f64,
    pub physical_low: f64,
    pub zone: String,
    pub other: HashMap<String, String>,
}

impl RasterGrid {
    pub fn new(width: usize, height: usize) -> Self {
        let size = width * height;
        RasterGrid {
            width,
            height,
            elevations: vec![0.0; size],
            classifications: vec![0; size],
            colors: None,
            ..Default::default()
        }
    }

    pub fn cell_count(&self) -> usize {
        self.width * self.height
    }

    pub fn idx(&self, x: usize, y: usize) -> usize {
        y * self.width + x
    }

    pub fn is_hole(&self, i: usize) -> bool {
        self.classifications[i] == 0
    }

    pub fn hole_count(&self) -> usize {
        self.classifications.iter().filter(|&&c| c == 0).count()
    }
}
