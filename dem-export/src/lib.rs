pub mod grid_file;

pub use grid_file::{load_grid, read_grid, save_grid, write_grid, GridFileError};
