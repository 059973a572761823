use std::collections::HashMap;

use dem_core::raster::grid::{RasterGrid, GROWTH_FILLED_CLASS};
use log::debug;

use super::HoleFiller;

/// Isotropic in-painting of no-data regions.
///
/// Every data cell bordering a hole becomes the initial growth frontier.
/// Each iteration pushes the frontier one ring inward: a hole cell touched
/// by one or more frontier cells receives the arithmetic mean of their
/// elevations and the `GROWTH_FILLED_CLASS` sentinel, then grows in turn on
/// the next iteration. The loop ends when an iteration reaches no new cells;
/// holes with no path to any data keep elevation and classification zero.
pub struct EdgeGrowthHoleFiller;

impl HoleFiller for EdgeGrowthHoleFiller {
    fn fill(&self, grid: &mut RasterGrid) {
        let width = grid.width;
        let height = grid.height;

        // initial frontier: interior data cells with at least one hole among
        // their 8 neighbors
        let mut frontier: Vec<usize> = Vec::new();
        for y in 1..height.saturating_sub(1) {
            for x in 1..width.saturating_sub(1) {
                let i = y * width + x;
                let c = &grid.classifications;
                let is_boundary = c[i] != 0
                    && (c[i - width - 1] == 0
                        || c[i - width] == 0
                        || c[i - width + 1] == 0
                        || c[i - 1] == 0
                        || c[i + 1] == 0
                        || c[i + width - 1] == 0
                        || c[i + width] == 0
                        || c[i + width + 1] == 0);
                if is_boundary {
                    frontier.push(i);
                }
            }
        }

        let mut iterations = 0u64;
        while !frontier.is_empty() {
            // per-neighbor (sum, contributor count), keyed by cell index and
            // rebuilt every iteration
            let mut growth: HashMap<usize, (f64, u32)> = HashMap::new();

            for &i in &frontier {
                let value = grid.elevations[i];
                let x = i % width;
                let y = i / width;

                for yy in y.saturating_sub(1)..=(y + 1).min(height - 1) {
                    for xx in x.saturating_sub(1)..=(x + 1).min(width - 1) {
                        if xx == x && yy == y {
                            continue;
                        }
                        let ii = yy * width + xx;
                        if grid.classifications[ii] != 0 {
                            continue;
                        }
                        let entry = growth.entry(ii).or_insert((0.0, 0));
                        entry.0 += value;
                        entry.1 += 1;
                    }
                }
            }

            // commit this ring; the committed cells grow next
            frontier.clear();
            for (ii, (sum, count)) in growth {
                grid.elevations[ii] = sum / count as f64;
                grid.classifications[ii] = GROWTH_FILLED_CLASS;
                frontier.push(ii);
            }

            iterations += 1;
            if iterations % 10 == 0 {
                debug!(
                    "fill iteration {} frontier size {}",
                    iterations,
                    frontier.len()
                );
            }
        }
    }
}
