use dem_core::raster::grid::RasterGrid;

use super::HoleFiller;

/// One-pass fill: scans each row left to right and overwrites zero-elevation
/// cells with the last non-zero elevation seen in that row. The carry resets
/// at every row start, so cells before the first data in a row stay zero.
/// Classifications are not modified.
pub struct LinearHoleFiller;

impl HoleFiller for LinearHoleFiller {
    fn fill(&self, grid: &mut RasterGrid) {
        let mut i = 0;
        for _y in 0..grid.height {
            let mut last_value = 0.0;
            for _x in 0..grid.width {
                let v = grid.elevations[i];
                if v == 0.0 {
                    grid.elevations[i] = last_value;
                } else {
                    last_value = v;
                }
                i += 1;
            }
        }
    }
}
