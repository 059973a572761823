use dem_core::pointcloud::point::{Color, PointCloud};
use dem_core::raster::grid::RasterGrid;
use log::debug;

use crate::error::RasterError;

/// Maps point-cloud records into the cells of a regular elevation grid.
///
/// The grid height is derived from the target width so the source aspect
/// ratio is preserved. Every point landing in a cell contributes to that
/// cell's elevation (cells hit more than once store the arithmetic mean);
/// classification and color are last-write-wins. Cells no point reaches keep
/// elevation `0` and classification `0` (hole).
pub struct Rasterizer {
    pub grid_width: usize,
}

impl Rasterizer {
    pub fn new(grid_width: usize) -> Self {
        Self { grid_width }
    }

    pub fn rasterize(&self, cloud: &PointCloud) -> Result<RasterGrid, RasterError> {
        let header = &cloud.header;

        if self.grid_width == 0 {
            return Err(RasterError::ZeroWidth);
        }

        let physical_width = header.max[0] - header.min[0];
        let physical_height = header.max[1] - header.min[1];
        if physical_width <= 0.0 || physical_height <= 0.0 {
            return Err(RasterError::DegenerateBounds {
                width: physical_width,
                height: physical_height,
            });
        }

        let width = self.grid_width;
        let height = (width as f64 / physical_width * physical_height) as usize;
        if height == 0 {
            return Err(RasterError::ZeroHeight {
                width,
                physical_width,
                physical_height,
            });
        }

        let mut grid = RasterGrid::new(width, height);
        grid.physical_left = header.min[0];
        grid.physical_top = header.min[1];
        grid.physical_right = header.max[0];
        grid.physical_bottom = header.max[1];
        grid.physical_width = physical_width;
        grid.physical_height = physical_height;
        grid.physical_high = header.max[2];
        grid.physical_low = header.min[2];
        grid.zone = header.zone.clone();
        if header.has_color {
            grid.colors = Some(vec![Color::default(); grid.cell_count()]);
        }

        let x_scale = (width - 1) as f64 / physical_width;
        let y_scale = (height - 1) as f64 / physical_height;
        let min_x = grid.physical_left;
        let min_y = grid.physical_top;

        let mut contributors = vec![0u32; grid.cell_count()];
        let total = cloud.points.len();

        for (i, ([x, y, z], point)) in cloud.iter_physical().enumerate() {
            if i % 1_000_000 == 0 {
                debug!(
                    "{}/{} points {:.2}%",
                    i,
                    total,
                    i as f64 / total as f64 * 100.0
                );
            }

            // skip points outside the declared bounding box; normal for a
            // clipped tile
            if x < grid.physical_left
                || x > grid.physical_right
                || y < grid.physical_top
                || y > grid.physical_bottom
            {
                continue;
            }

            let xi = ((x - min_x) * x_scale) as usize;
            // row 0 is the maximum-y edge of the bounds
            let yi = height - ((y - min_y) * y_scale) as usize - 1;
            let ii = yi * width + xi;

            grid.elevations[ii] += z;
            contributors[ii] += 1;
            grid.classifications[ii] = point.classification;
            if let (Some(colors), Some(color)) = (grid.colors.as_mut(), point.color) {
                colors[ii] = color;
            }
        }

        // cells with a single contributor keep the raw value untouched
        for (i, &count) in contributors.iter().enumerate() {
            if count > 1 {
                grid.elevations[i] /= count as f64;
            }
        }

        Ok(grid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dem_core::pointcloud::point::{CloudHeader, PointRecord};

    // scale 1 / offset 0 so raw integer coordinates are the physical ones
    fn make_cloud(points: Vec<(i32, i32, i32, u8)>, max_xy: f64) -> PointCloud {
        let header = CloudHeader {
            min: [0.0, 0.0, 0.0],
            max: [max_xy, max_xy, 100.0],
            scale: [1.0, 1.0, 1.0],
            offset: [0.0, 0.0, 0.0],
            point_format: 1,
            has_color: false,
            point_count: points.len() as u64,
            zone: "12T".to_string(),
        };
        let points = points
            .into_iter()
            .map(|(x, y, z, classification)| PointRecord {
                x,
                y,
                z,
                classification,
                color: None,
            })
            .collect();
        PointCloud { header, points }
    }

    #[test]
    fn grid_metadata_comes_from_the_header() {
        let cloud = make_cloud(vec![(0, 0, 10, 2)], 10.0);
        let grid = Rasterizer::new(11).rasterize(&cloud).unwrap();

        assert_eq!(grid.width, 11);
        assert_eq!(grid.height, 11);
        assert_eq!(grid.physical_left, 0.0);
        assert_eq!(grid.physical_right, 10.0);
        assert_eq!(grid.physical_width, 10.0);
        assert_eq!(grid.physical_height, 10.0);
        assert_eq!(grid.physical_low, 0.0);
        assert_eq!(grid.physical_high, 100.0);
        assert_eq!(grid.zone, "12T");
    }

    #[test]
    fn cells_average_all_contributing_points() {
        let cloud = make_cloud(
            vec![
                (2, 3, 5, 2),
                (2, 3, 7, 2),
                (4, 4, 9, 2),
                (5, 5, 1, 2),
                (5, 5, 2, 2),
                (5, 5, 6, 2),
            ],
            10.0,
        );
        let grid = Rasterizer::new(11).rasterize(&cloud).unwrap();

        // (2, 3) -> xi = 2, yi = 11 - 3 - 1 = 7
        let two_hits = grid.idx(2, 7);
        assert_eq!(grid.elevations[two_hits], 6.0);
        assert_ne!(grid.classifications[two_hits], 0);

        // single contributor keeps the raw value
        let one_hit = grid.idx(4, 6);
        assert_eq!(grid.elevations[one_hit], 9.0);

        let three_hits = grid.idx(5, 5);
        assert_eq!(grid.elevations[three_hits], 3.0);

        // untouched cells stay holes
        let empty = grid.idx(0, 0);
        assert_eq!(grid.elevations[empty], 0.0);
        assert_eq!(grid.classifications[empty], 0);
    }

    #[test]
    fn y_axis_is_inverted() {
        let cloud = make_cloud(vec![(0, 10, 3, 2), (0, 0, 4, 2)], 10.0);
        let grid = Rasterizer::new(11).rasterize(&cloud).unwrap();

        // maximum y lands on row 0 (top), minimum y on the last row
        assert_eq!(grid.elevations[grid.idx(0, 0)], 3.0);
        assert_eq!(grid.elevations[grid.idx(0, grid.height - 1)], 4.0);
    }

    #[test]
    fn points_outside_the_bounds_are_dropped() {
        let cloud = make_cloud(
            vec![(-1, 5, 9, 2), (11, 5, 9, 2), (5, -1, 9, 2), (5, 11, 9, 2)],
            10.0,
        );
        let grid = Rasterizer::new(11).rasterize(&cloud).unwrap();
        assert_eq!(grid.hole_count(), grid.cell_count());
        assert!(grid.elevations.iter().all(|&e| e == 0.0));
    }

    #[test]
    fn classification_is_last_write_wins() {
        let cloud = make_cloud(vec![(2, 2, 5, 2), (2, 2, 5, 6)], 10.0);
        let grid = Rasterizer::new(11).rasterize(&cloud).unwrap();
        assert_eq!(grid.classifications[grid.idx(2, 8)], 6);
    }

    #[test]
    fn colors_follow_the_declared_point_format() {
        let mut cloud = make_cloud(vec![(2, 2, 5, 2)], 10.0);
        cloud.points[0].color = Some(Color {
            r: 1000,
            g: 2000,
            b: 3000,
        });

        // format without color: the color plane stays unset
        let grid = Rasterizer::new(11).rasterize(&cloud).unwrap();
        assert!(grid.colors.is_none());

        // color-bearing format: last write sticks
        cloud.header.has_color = true;
        cloud.header.point_format = 2;
        let grid = Rasterizer::new(11).rasterize(&cloud).unwrap();
        let colors = grid.colors.as_ref().unwrap();
        assert_eq!(colors.len(), grid.cell_count());
        assert_eq!(
            colors[grid.idx(2, 8)],
            Color {
                r: 1000,
                g: 2000,
                b: 3000
            }
        );
    }

    #[test]
    fn degenerate_geometry_is_rejected() {
        let mut cloud = make_cloud(vec![(0, 0, 1, 2)], 10.0);

        assert!(matches!(
            Rasterizer::new(0).rasterize(&cloud),
            Err(RasterError::ZeroWidth)
        ));

        cloud.header.max[0] = 0.0;
        assert!(matches!(
            Rasterizer::new(10).rasterize(&cloud),
            Err(RasterError::DegenerateBounds { .. })
        ));

        // a very wide, very flat area truncates to a zero-row grid
        cloud.header.max[0] = 1000.0;
        cloud.header.max[1] = 1.0;
        assert!(matches!(
            Rasterizer::new(10).rasterize(&cloud),
            Err(RasterError::ZeroHeight { .. })
        ));
    }
}
