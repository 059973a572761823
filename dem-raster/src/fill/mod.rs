use dem_core::raster::grid::RasterGrid;

pub mod edge_growth;
pub mod linear;

pub use edge_growth::EdgeGrowthHoleFiller;
pub use linear::LinearHoleFiller;

/// Repairs no-data regions of a raster in place.
pub trait HoleFiller {
    fn fill(&self, grid: &mut RasterGrid);
}
