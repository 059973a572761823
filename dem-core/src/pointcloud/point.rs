#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Color {
    pub r: u16,
    pub g: u16,
    pub b: u16,
}

// Point coordinates are stored in the scaled integer form used by LAS.
// The physical coordinates are recovered with the header's per-axis scale
// and offset, as follows:
// x = (x as f64 * scale[0]) + offset[0]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PointRecord {
    pub x: i32,
    pub y: i32,
    pub z: i32,
    pub classification: u8,
    pub color: Option<Color>,
}

impl PointRecord {
    /// Physical x/y/z in source coordinate units.
    pub fn to_physical(&self, header: &CloudHeader) -> [f64; 3] {
        [
            self.x as f64 * header.scale[0] + header.offset[0],
            self.y as f64 * header.scale[1] + header.offset[1],
            self.z as f64 * header.scale[2] + header.offset[2],
        ]
    }
}

/// Header of a point-cloud source: declared bounds in physical units, the
/// scale/offset pair that maps stored integers to physical units, and the
/// coordinate-reference "zone" carried through opaquely.
#[derive(Debug, Clone, Default)]
pub struct CloudHeader {
    pub min: [f64; 3],
    pub max: [f64; 3],
    pub scale: [f64; 3],
    pub offset: [f64; 3],
    pub point_format: u8,
    pub has_color: bool,
    pub point_count: u64,
    pub zone: String,
}

#[derive(Debug, Clone)]
pub struct PointCloud {
    pub header: CloudHeader,
    pub points: Vec<PointRecord>,
}

impl PointCloud {
    pub fn iter_physical(&self) -> impl Iterator<Item = ([f64; 3], &PointRecord)> {
        self.points
            .iter()
            .map(|point| (point.to_physical(&self.header), point))
    }
}
