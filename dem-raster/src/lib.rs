pub mod error;
pub mod fill;
pub mod rasterizer;
pub mod smooth;
pub mod synthetic;

pub use error::RasterError;
pub use fill::{EdgeGrowthHoleFiller, HoleFiller, LinearHoleFiller};
pub use rasterizer::Rasterizer;
pub use smooth::GeometricMeanSmoother;
pub use synthetic::SyntheticGridGenerator;
