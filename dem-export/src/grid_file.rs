use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt as _, WriteBytesExt as _};
use thiserror::Error;

use dem_core::pointcloud::point::Color;
use dem_core::raster::grid::RasterGrid;

pub const MAGIC: &[u8; 4] = b"DEMG";
pub const FORMAT_VERSION: u16 = 1;

const FLAG_COLORS: u16 = 1;

#[derive(Error, Debug)]
pub enum GridFileError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("not a grid file (bad magic)")]
    BadMagic,
    #[error("unsupported grid file version {0}")]
    UnsupportedVersion(u16),
    #[error("text field is not valid UTF-8")]
    Utf8(#[from] std::string::FromUtf8Error),
    #[error("grid of {width}x{height} cells does not fit in memory")]
    OversizedGrid { width: u64, height: u64 },
}

/// Serializes a grid. The layout is versioned: a fixed header (magic,
/// version, flags, dimensions, physical extents), the zone and property
/// strings, then the dense cell planes in row-major order. Colors are
/// present only when the flags say so. All integers and floats are
/// little-endian.
pub fn write_grid<W: Write>(writer: &mut W, grid: &RasterGrid) -> Result<(), GridFileError> {
    writer.write_all(MAGIC)?;
    writer.write_u16::<LittleEndian>(FORMAT_VERSION)?;

    let mut flags = 0u16;
    if grid.colors.is_some() {
        flags |= FLAG_COLORS;
    }
    writer.write_u16::<LittleEndian>(flags)?;

    writer.write_u64::<LittleEndian>(grid.width as u64)?;
    writer.write_u64::<LittleEndian>(grid.height as u64)?;

    for value in [
        grid.physical_left,
        grid.physical_top,
        grid.physical_right,
        grid.physical_bottom,
        grid.physical_width,
        grid.physical_height,
        grid.physical_high,
        grid.physical_low,
    ] {
        writer.write_f64::<LittleEndian>(value)?;
    }

    write_string(writer, &grid.zone)?;

    // Properties are sorted so the same grid always produces the same bytes.
    let mut properties: Vec<_> = grid.other.iter().collect();
    properties.sort();
    writer.write_u32::<LittleEndian>(properties.len() as u32)?;
    for (key, value) in properties {
        write_string(writer, key)?;
        write_string(writer, value)?;
    }

    for &elevation in &grid.elevations {
        writer.write_f64::<LittleEndian>(elevation)?;
    }
    writer.write_all(&grid.classifications)?;

    if let Some(colors) = &grid.colors {
        for color in colors {
            writer.write_u16::<LittleEndian>(color.r)?;
            writer.write_u16::<LittleEndian>(color.g)?;
            writer.write_u16::<LittleEndian>(color.b)?;
        }
    }

    Ok(())
}

pub fn read_grid<R: Read>(reader: &mut R) -> Result<RasterGrid, GridFileError> {
    let mut magic = [0u8; 4];
    reader.read_exact(&mut magic)?;
    if &magic != MAGIC {
        return Err(GridFileError::BadMagic);
    }

    let version = reader.read_u16::<LittleEndian>()?;
    if version != FORMAT_VERSION {
        return Err(GridFileError::UnsupportedVersion(version));
    }

    let flags = reader.read_u16::<LittleEndian>()?;

    let width_raw = reader.read_u64::<LittleEndian>()?;
    let height_raw = reader.read_u64::<LittleEndian>()?;
    let oversized = || GridFileError::OversizedGrid {
        width: width_raw,
        height: height_raw,
    };
    let cell_count = width_raw
        .checked_mul(height_raw)
        .and_then(|cells| usize::try_from(cells).ok())
        .ok_or_else(oversized)?;
    let width = usize::try_from(width_raw).map_err(|_| oversized())?;
    let height = usize::try_from(height_raw).map_err(|_| oversized())?;

    let physical_left = reader.read_f64::<LittleEndian>()?;
    let physical_top = reader.read_f64::<LittleEndian>()?;
    let physical_right = reader.read_f64::<LittleEndian>()?;
    let physical_bottom = reader.read_f64::<LittleEndian>()?;
    let physical_width = reader.read_f64::<LittleEndian>()?;
    let physical_height = reader.read_f64::<LittleEndian>()?;
    let physical_high = reader.read_f64::<LittleEndian>()?;
    let physical_low = reader.read_f64::<LittleEndian>()?;

    let zone = read_string(reader)?;

    let property_count = reader.read_u32::<LittleEndian>()?;
    let mut other = HashMap::new();
    for _ in 0..property_count {
        let key = read_string(reader)?;
        let value = read_string(reader)?;
        other.insert(key, value);
    }

    let mut elevations = vec![0.0f64; cell_count];
    reader.read_f64_into::<LittleEndian>(&mut elevations)?;

    let mut classifications = vec![0u8; cell_count];
    reader.read_exact(&mut classifications)?;

    let colors = if flags & FLAG_COLORS != 0 {
        let channel_count = cell_count.checked_mul(3).ok_or_else(oversized)?;
        let mut channels = vec![0u16; channel_count];
        reader.read_u16_into::<LittleEndian>(&mut channels)?;
        Some(
            channels
                .chunks_exact(3)
                .map(|c| Color {
                    r: c[0],
                    g: c[1],
                    b: c[2],
                })
                .collect(),
        )
    } else {
        None
    };

    Ok(RasterGrid {
        width,
        height,
        elevations,
        classifications,
        colors,
        physical_left,
        physical_top,
        physical_right,
        physical_bottom,
        physical_width,
        physical_height,
        physical_high,
        physical_low,
        zone,
        other,
    })
}

pub fn save_grid<P: AsRef<Path>>(path: P, grid: &RasterGrid) -> Result<(), GridFileError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    write_grid(&mut writer, grid)?;
    writer.flush()?;
    Ok(())
}

pub fn load_grid<P: AsRef<Path>>(path: P) -> Result<RasterGrid, GridFileError> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    read_grid(&mut reader)
}

fn write_string<W: Write>(writer: &mut W, value: &str) -> Result<(), GridFileError> {
    writer.write_u32::<LittleEndian>(value.len() as u32)?;
    writer.write_all(value.as_bytes())?;
    Ok(())
}

fn read_string<R: Read>(reader: &mut R) -> Result<String, GridFileError> {
    let len = reader.read_u32::<LittleEndian>()? as usize;
    let mut buffer = vec![0u8; len];
    reader.read_exact(&mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}
