use std::collections::HashSet;

use dem_core::raster::grid::RasterGrid;
use log::debug;
use rand::{Rng as _, SeedableRng as _};
use rand_chacha::ChaCha8Rng;

use crate::error::RasterError;

/// Builds synthetic grids for exercising the hole fillers without real
/// point-cloud data: a flat plane with unit classification, pocked with
/// random single-cell holes and a few larger circular holes. Seed the
/// generator to make a run reproducible.
pub struct SyntheticGridGenerator {
    pub point_holes: usize,
    pub circle_holes: usize,
    pub seed: Option<u64>,
}

impl Default for SyntheticGridGenerator {
    fn default() -> Self {
        Self {
            point_holes: 100,
            circle_holes: 10,
            seed: None,
        }
    }
}

impl SyntheticGridGenerator {
    pub fn generate(
        &self,
        kind: &str,
        width: usize,
        height: usize,
    ) -> Result<RasterGrid, RasterError> {
        match kind {
            "fill-test" => self.fill_test_grid(width, height),
            _ => Err(RasterError::UnknownSyntheticType(kind.to_string())),
        }
    }

    fn rng(&self) -> ChaCha8Rng {
        let seed = self
            .seed
            .unwrap_or_else(|| rand::thread_rng().gen::<u64>());
        debug!("synthetic grid seed {}", seed);
        ChaCha8Rng::seed_from_u64(seed)
    }

    fn fill_test_grid(&self, width: usize, height: usize) -> Result<RasterGrid, RasterError> {
        if width == 0 || height == 0 {
            return Err(RasterError::EmptySynthetic { width, height });
        }
        let cells = width * height;
        if self.point_holes >= cells {
            return Err(RasterError::TooManyHoles {
                holes: self.point_holes,
                cells,
            });
        }

        let mut grid = RasterGrid::new(width, height);
        grid.physical_left = 0.0;
        grid.physical_top = 0.0;
        grid.physical_right = 100.0;
        grid.physical_bottom = 100.0;
        grid.physical_width = 100.0;
        grid.physical_height = 100.0;
        grid.zone = "12T".to_string();
        grid.elevations.fill(100.0);
        grid.classifications.fill(1);

        let mut rng = self.rng();

        // single-cell holes at unique indices
        let mut used = HashSet::new();
        for _ in 0..self.point_holes {
            let mut i = rng.gen_range(0..cells);
            while !used.insert(i) {
                i = rng.gen_range(0..cells);
            }
            grid.elevations[i] = 0.0;
            grid.classifications[i] = 0;
        }

        // a few larger circular holes
        for _ in 0..self.circle_holes {
            let x = rng.gen_range(0..width);
            let y = rng.gen_range(0..height);
            let radius = rng.gen_range(10..110);
            cut_circle(&mut grid, x, y, radius);
        }

        Ok(grid)
    }
}

/// Cuts a circular hole whose bounding box has its top-left corner at
/// (x, y); cells strictly closer to the center than `radius` are cleared.
fn cut_circle(grid: &mut RasterGrid, x: usize, y: usize, radius: usize) {
    let r = radius as isize;
    let x1 = x as isize;
    let y1 = y as isize;
    let xc = x1 + r;
    let yc = y1 + r;
    let r2 = r * r;

    for yy in y1..=y1 + 2 * r {
        for xx in x1..=x1 + 2 * r {
            if xx < 0 || xx >= grid.width as isize || yy < 0 || yy >= grid.height as isize {
                continue;
            }
            let dx = xx - xc;
            let dy = yy - yc;
            if dx * dx + dy * dy < r2 {
                let i = yy as usize * grid.width + xx as usize;
                grid.elevations[i] = 0.0;
                grid.classifications[i] = 0;
            }
        }
    }
}
