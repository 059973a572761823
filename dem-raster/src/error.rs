use thiserror::Error;

#[derive(Debug, Error)]
pub enum RasterError {
    #[error("target raster width must be at least one cell")]
    ZeroWidth,

    #[error("degenerate physical bounds: width {width}, height {height}")]
    DegenerateBounds { width: f64, height: f64 },

    #[error(
        "derived raster height is zero for width {width} over a {physical_width} x {physical_height} area"
    )]
    ZeroHeight {
        width: usize,
        physical_width: f64,
        physical_height: f64,
    },

    #[error("unknown synthetic grid type {0:?}")]
    UnknownSyntheticType(String),

    #[error("synthetic grid dimensions must be non-zero, got {width} x {height}")]
    EmptySynthetic { width: usize, height: usize },

    #[error("cannot punch {holes} unique single-cell holes into a {cells}-cell grid")]
    TooManyHoles { holes: usize, cells: usize },
}
