use std::{error::Error, path::PathBuf};

use las::Reader;
use log::info;

use dem_core::pointcloud::point::{CloudHeader, Color, PointCloud, PointRecord};

use super::{Parser, ParserProvider};

pub struct LasParserProvider {
    pub filenames: Vec<PathBuf>,
    pub zone: String,
}

impl ParserProvider for LasParserProvider {
    fn get_parser(&self) -> Box<dyn Parser> {
        Box::new(LasParser {
            filenames: self.filenames.clone(),
            zone: self.zone.clone(),
        })
    }
}

pub struct LasParser {
    pub filenames: Vec<PathBuf>,
    pub zone: String,
}

impl Parser for LasParser {
    fn parse(&self) -> Result<PointCloud, Box<dyn Error>> {
        if self.filenames.is_empty() {
            return Err("no input files".into());
        }

        // The first header fixes the integer grid; points from every other
        // file are re-quantized onto it.
        let (transforms, point_format, mut has_color) = {
            let reader = Reader::from_path(&self.filenames[0])?;
            let header = reader.header();
            (
                header.transforms().clone(),
                header.point_format().to_u8()?,
                header.point_format().has_color,
            )
        };

        let mut points = Vec::new();
        let mut min = [f64::MAX, f64::MAX, f64::MAX];
        let mut max = [f64::MIN, f64::MIN, f64::MIN];

        for filename in &self.filenames {
            let mut reader = Reader::from_path(filename)?;
            info!(
                "reading {} ({} points)",
                filename.display(),
                reader.header().number_of_points()
            );

            let bounds = reader.header().bounds();
            min[0] = min[0].min(bounds.min.x);
            min[1] = min[1].min(bounds.min.y);
            min[2] = min[2].min(bounds.min.z);
            max[0] = max[0].max(bounds.max.x);
            max[1] = max[1].max(bounds.max.y);
            max[2] = max[2].max(bounds.max.z);
            has_color = has_color && reader.header().point_format().has_color;

            for las_point in reader.points() {
                let las_point = las_point?;

                let point = PointRecord {
                    x: ((las_point.x - transforms.x.offset) / transforms.x.scale).round() as i32,
                    y: ((las_point.y - transforms.y.offset) / transforms.y.scale).round() as i32,
                    z: ((las_point.z - transforms.z.offset) / transforms.z.scale).round() as i32,
                    classification: u8::from(las_point.classification),
                    color: las_point.color.map(|c| Color {
                        r: c.red,
                        g: c.green,
                        b: c.blue,
                    }),
                };

                points.push(point);
            }
        }

        if points.is_empty() {
            return Err("no points found in the input files".into());
        }

        let header = CloudHeader {
            min,
            max,
            scale: [transforms.x.scale, transforms.y.scale, transforms.z.scale],
            offset: [transforms.x.offset, transforms.y.offset, transforms.z.offset],
            point_format,
            has_color,
            point_count: points.len() as u64,
            zone: self.zone.clone(),
        };

        Ok(PointCloud { header, points })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use las::point::{Classification, Format};
    use las::{Builder, Transform, Vector, Writer};

    fn write_las(path: &std::path::Path, format: u8, points: &[las::Point]) {
        let mut builder = Builder::from((1, 2));
        builder.point_format = Format::new(format).unwrap();
        builder.transforms = Vector {
            x: Transform {
                scale: 0.001,
                offset: 100.0,
            },
            y: Transform {
                scale: 0.001,
                offset: 200.0,
            },
            z: Transform {
                scale: 0.01,
                offset: 0.0,
            },
        };
        let header = builder.into_header().unwrap();

        let mut writer = Writer::from_path(path, header).unwrap();
        for point in points {
            writer.write_point(point.clone()).unwrap();
        }
        writer.close().unwrap();
    }

    #[test]
    fn points_are_recovered_on_the_header_grid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plain.las");
        write_las(
            &path,
            0,
            &[
                las::Point {
                    x: 101.234,
                    y: 200.5,
                    z: 3.21,
                    classification: Classification::Ground,
                    ..Default::default()
                },
                las::Point {
                    x: 100.001,
                    y: 201.0,
                    z: 15.0,
                    classification: Classification::LowVegetation,
                    ..Default::default()
                },
            ],
        );

        let parser = LasParser {
            filenames: vec![path],
            zone: "12T".to_string(),
        };
        let cloud = parser.parse().unwrap();

        assert_eq!(cloud.header.scale, [0.001, 0.001, 0.01]);
        assert_eq!(cloud.header.offset, [100.0, 200.0, 0.0]);
        assert_eq!(cloud.header.point_format, 0);
        assert!(!cloud.header.has_color);
        assert_eq!(cloud.header.point_count, 2);
        assert_eq!(cloud.header.zone, "12T");
        assert!((cloud.header.min[0] - 100.001).abs() < 1e-6);
        assert!((cloud.header.max[1] - 201.0).abs() < 1e-6);

        assert_eq!(
            cloud.points[0],
            PointRecord {
                x: 1234,
                y: 500,
                z: 321,
                classification: 2,
                color: None,
            }
        );
        assert_eq!(
            cloud.points[1],
            PointRecord {
                x: 1,
                y: 1000,
                z: 1500,
                classification: 3,
                color: None,
            }
        );
    }

    #[test]
    fn colors_survive_when_the_format_carries_them() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("colored.las");
        write_las(
            &path,
            2,
            &[las::Point {
                x: 100.5,
                y: 200.5,
                z: 1.0,
                classification: Classification::Ground,
                color: Some(las::Color {
                    red: 1000,
                    green: 2000,
                    blue: 3000,
                }),
                ..Default::default()
            }],
        );

        let parser = LasParser {
            filenames: vec![path],
            zone: String::new(),
        };
        let cloud = parser.parse().unwrap();

        assert!(cloud.header.has_color);
        assert_eq!(cloud.header.point_format, 2);
        assert_eq!(
            cloud.points[0].color,
            Some(Color {
                r: 1000,
                g: 2000,
                b: 3000,
            })
        );
    }

    #[test]
    fn multiple_files_share_the_first_grid_and_union_bounds() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("a.las");
        let second = dir.path().join("b.las");
        write_las(
            &first,
            0,
            &[las::Point {
                x: 100.1,
                y: 200.1,
                z: 1.0,
                ..Default::default()
            }],
        );
        write_las(
            &second,
            0,
            &[las::Point {
                x: 105.0,
                y: 207.5,
                z: 2.0,
                ..Default::default()
            }],
        );

        let parser = LasParser {
            filenames: vec![first, second],
            zone: String::new(),
        };
        let cloud = parser.parse().unwrap();

        assert_eq!(cloud.points.len(), 2);
        assert_eq!(cloud.points[0].x, 100);
        assert_eq!(cloud.points[1].x, 5000);
        assert!((cloud.header.min[0] - 100.1).abs() < 1e-6);
        assert!((cloud.header.max[0] - 105.0).abs() < 1e-6);
        assert!((cloud.header.max[1] - 207.5).abs() < 1e-6);
    }
}
