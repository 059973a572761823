use std::{collections::HashMap, error::Error, path::PathBuf};

use csv::ReaderBuilder;
use log::info;

use dem_core::pointcloud::point::{CloudHeader, Color, PointCloud, PointRecord};

use super::{Parser, ParserProvider};

pub struct CsvParserProvider {
    pub filenames: Vec<PathBuf>,
    pub zone: String,
}

impl ParserProvider for CsvParserProvider {
    fn get_parser(&self) -> Box<dyn Parser> {
        Box::new(CsvParser {
            filenames: self.filenames.clone(),
            zone: self.zone.clone(),
        })
    }
}

pub struct CsvParser {
    pub filenames: Vec<PathBuf>,
    pub zone: String,
}

/// Quantization step for text sources, which have no header grid of their
/// own. One unit is a millimeter for metric coordinates.
pub static SCALE_FACTOR: f64 = 0.001;

impl Parser for CsvParser {
    fn parse(&self) -> Result<PointCloud, Box<dyn Error>> {
        let mut rows: Vec<(f64, f64, f64, u8, Option<Color>)> = Vec::new();
        let mut min = [f64::MAX, f64::MAX, f64::MAX];
        let mut max = [f64::MIN, f64::MIN, f64::MIN];

        for filename in &self.filenames {
            let mut reader = ReaderBuilder::new()
                .has_headers(true)
                .from_path(filename)?;
            let headers = reader.headers()?.clone();
            // A first row made entirely of numbers is data, not headers.
            let has_headers = !headers.iter().all(|h| h.trim().parse::<f64>().is_ok());

            let field_mapping = create_field_mapping(&headers, has_headers)?;

            let mut reader = ReaderBuilder::new()
                .has_headers(has_headers)
                .from_path(filename)?;
            info!("reading {}", filename.display());

            for record in reader.records() {
                let record: csv::StringRecord = record?;

                let x_str =
                    get_field_value(&record, &field_mapping, "x").ok_or("Missing 'x' field")?;
                let y_str =
                    get_field_value(&record, &field_mapping, "y").ok_or("Missing 'y' field")?;
                let z_str =
                    get_field_value(&record, &field_mapping, "z").ok_or("Missing 'z' field")?;

                let x: f64 = x_str
                    .parse()
                    .map_err(|e| format!("Failed to parse 'x': {}", e))?;
                let y: f64 = y_str
                    .parse()
                    .map_err(|e| format!("Failed to parse 'y': {}", e))?;
                let z: f64 = z_str
                    .parse()
                    .map_err(|e| format!("Failed to parse 'z': {}", e))?;

                let classification =
                    parse_optional_field::<u8>(&record, &field_mapping, "classification")?
                        .unwrap_or(1);

                let r = parse_optional_field::<u16>(&record, &field_mapping, "r")?;
                let g = parse_optional_field::<u16>(&record, &field_mapping, "g")?;
                let b = parse_optional_field::<u16>(&record, &field_mapping, "b")?;
                let color = match (r, g, b) {
                    (Some(r), Some(g), Some(b)) => Some(Color { r, g, b }),
                    _ => None,
                };

                min[0] = min[0].min(x);
                min[1] = min[1].min(y);
                min[2] = min[2].min(z);
                max[0] = max[0].max(x);
                max[1] = max[1].max(y);
                max[2] = max[2].max(z);

                rows.push((x, y, z, classification, color));
            }
        }

        if rows.is_empty() {
            return Err("no points found in the input files".into());
        }

        // The color plane exists only when every row carried a full color.
        let has_color = rows.iter().all(|row| row.4.is_some());
        let offset = [min[0], min[1], min[2]];

        let points = rows
            .iter()
            .map(|&(x, y, z, classification, color)| PointRecord {
                x: ((x - offset[0]) / SCALE_FACTOR).round() as i32,
                y: ((y - offset[1]) / SCALE_FACTOR).round() as i32,
                z: ((z - offset[2]) / SCALE_FACTOR).round() as i32,
                classification,
                color: if has_color { color } else { None },
            })
            .collect::<Vec<_>>();

        let header = CloudHeader {
            min,
            max,
            scale: [SCALE_FACTOR, SCALE_FACTOR, SCALE_FACTOR],
            offset,
            point_format: 0,
            has_color,
            point_count: points.len() as u64,
            zone: self.zone.clone(),
        };

        Ok(PointCloud { header, points })
    }
}

fn create_field_mapping(
    headers: &csv::StringRecord,
    has_headers: bool,
) -> Result<HashMap<String, usize>, Box<dyn Error>> {
    let mut mapping = HashMap::new();

    let attribute_names = vec!["x", "y", "z", "classification", "r", "g", "b"];

    if has_headers {
        for (index, header) in headers.iter().enumerate() {
            let normalized_header = header.trim().to_lowercase().replace(['_', '-'], "");
            for attr_name in &attribute_names {
                if normalized_header == *attr_name {
                    mapping.insert(attr_name.to_string(), index);
                    break;
                }
            }
        }
    } else {
        for (index, attr_name) in attribute_names.iter().enumerate() {
            mapping.insert(attr_name.to_string(), index);
        }
    }

    for attr_name in &["x", "y", "z"] {
        if !mapping.contains_key(*attr_name) {
            return Err(format!(
                "Required attribute '{}' is missing in CSV headers or mapping.",
                attr_name
            )
            .into());
        }
    }

    Ok(mapping)
}

fn get_field_value<'a>(
    record: &'a csv::StringRecord,
    field_mapping: &HashMap<String, usize>,
    field_name: &str,
) -> Option<&'a str> {
    if let Some(&index) = field_mapping.get(field_name) {
        record.get(index)
    } else {
        None
    }
}

fn parse_optional_field<T: std::str::FromStr>(
    record: &csv::StringRecord,
    field_mapping: &HashMap<String, usize>,
    field_name: &str,
) -> Result<Option<T>, Box<dyn Error>> {
    if let Some(value_str) = get_field_value(record, field_mapping, field_name) {
        if value_str.trim().is_empty() {
            Ok(None)
        } else {
            let value = value_str
                .parse::<T>()
                .map_err(|_| format!("Failed to parse '{}'", field_name))?;
            Ok(Some(value))
        }
    } else {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_str(contents: &str) -> Result<PointCloud, Box<dyn Error>> {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("points.csv");
        std::fs::write(&path, contents).unwrap();

        let parser = CsvParser {
            filenames: vec![path],
            zone: "12T".to_string(),
        };
        parser.parse()
    }

    #[test]
    fn named_columns_are_quantized_against_the_minimum() {
        let cloud = parse_str(
            "x,y,z,classification\n\
             1.0,10.0,100.0,2\n\
             1.5,10.25,100.125,3\n",
        )
        .unwrap();

        assert_eq!(cloud.header.offset, [1.0, 10.0, 100.0]);
        assert_eq!(cloud.header.min, [1.0, 10.0, 100.0]);
        assert_eq!(cloud.header.max, [1.5, 10.25, 100.125]);
        assert_eq!(cloud.header.scale, [0.001, 0.001, 0.001]);
        assert_eq!(cloud.header.zone, "12T");
        assert!(!cloud.header.has_color);

        assert_eq!(
            cloud.points[0],
            PointRecord {
                x: 0,
                y: 0,
                z: 0,
                classification: 2,
                color: None,
            }
        );
        assert_eq!(
            cloud.points[1],
            PointRecord {
                x: 500,
                y: 250,
                z: 125,
                classification: 3,
                color: None,
            }
        );
    }

    #[test]
    fn classification_defaults_when_the_column_is_missing() {
        let cloud = parse_str("x,y,z\n5.0,6.0,7.0\n").unwrap();
        assert_eq!(cloud.points[0].classification, 1);
    }

    #[test]
    fn colors_need_all_three_channels() {
        let cloud = parse_str(
            "x,y,z,r,g,b\n\
             0.0,0.0,0.0,1000,2000,3000\n",
        )
        .unwrap();
        assert!(cloud.header.has_color);
        assert_eq!(
            cloud.points[0].color,
            Some(Color {
                r: 1000,
                g: 2000,
                b: 3000,
            })
        );

        let cloud = parse_str(
            "x,y,z,r,g\n\
             0.0,0.0,0.0,1000,2000\n",
        )
        .unwrap();
        assert!(!cloud.header.has_color);
        assert_eq!(cloud.points[0].color, None);
    }

    #[test]
    fn headerless_files_map_columns_by_position() {
        let cloud = parse_str("2.0,3.0,4.0,5\n2.5,3.5,4.5,6\n").unwrap();

        assert_eq!(cloud.points.len(), 2);
        assert_eq!(cloud.header.offset, [2.0, 3.0, 4.0]);
        assert_eq!(cloud.points[1].x, 500);
        assert_eq!(cloud.points[0].classification, 5);
        assert_eq!(cloud.points[1].classification, 6);
    }

    #[test]
    fn missing_required_column_is_an_error() {
        let result = parse_str("x,y\n1.0,2.0\n");
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("'z'"));
    }

    #[test]
    fn empty_input_is_an_error() {
        let result = parse_str("x,y,z\n");
        assert!(result.is_err());
    }
}
