use dem_core::raster::grid::RasterGrid;
use rayon::iter::{IndexedParallelIterator as _, ParallelIterator as _};
use rayon::slice::ParallelSliceMut as _;

/// Windowed geometric-mean low-pass filter over the elevation field.
///
/// Each output cell is the geometric mean of `1 + elevation` over the
/// window centered on it, minus one; the offset keeps the mean defined at
/// zero elevations. Windows are clipped at the grid edges: out-of-bounds
/// neighbors are excluded from the count, not treated as zero. The half
/// width is `window / 2` with integer division, so an even window is
/// tolerated and widens to the next odd size.
///
/// The filter writes into a fresh array and swaps it in at the end; no cell
/// ever reads a partially smoothed neighbor. Rows are computed in parallel.
pub struct GeometricMeanSmoother {
    pub window: usize,
}

impl GeometricMeanSmoother {
    pub fn new(window: usize) -> Self {
        Self { window }
    }

    pub fn smooth(&self, grid: &mut RasterGrid) {
        let width = grid.width;
        let height = grid.height;
        let half = (self.window / 2) as isize;
        let elevations = &grid.elevations;

        let mut new_elevations = vec![0.0; elevations.len()];
        new_elevations
            .par_chunks_mut(width)
            .enumerate()
            .for_each(|(y, row)| {
                let y = y as isize;
                for (x, out) in row.iter_mut().enumerate() {
                    let x = x as isize;
                    let mut product = 1.0_f64;
                    let mut count = 0u32;
                    for dy in -half..=half {
                        for dx in -half..=half {
                            let xx = x + dx;
                            let yy = y + dy;
                            if xx < 0 || xx >= width as isize || yy < 0 || yy >= height as isize {
                                continue;
                            }
                            count += 1;
                            product *= elevations[yy as usize * width + xx as usize] + 1.0;
                        }
                    }
                    *out = product.powf(1.0 / count as f64) - 1.0;
                }
            });

        grid.elevations = new_elevations;
    }
}
