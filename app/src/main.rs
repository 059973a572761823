use std::ffi::OsStr;
use std::fs;
use std::io::Write;
use std::path::PathBuf;

use chrono::Local;
use clap::{Parser, ValueEnum};
use env_logger::Builder;
use glob::glob;
use log::LevelFilter;
use serde::Serialize;

use dem_export::save_grid;
use dem_parser::parsers::csv::CsvParserProvider;
use dem_parser::parsers::{get_extension, Extension};
use dem_parser::parsers::{las::LasParserProvider, ParserProvider as _};
use dem_raster::{
    EdgeGrowthHoleFiller, GeometricMeanSmoother, HoleFiller as _, LinearHoleFiller, Rasterizer,
    SyntheticGridGenerator,
};

#[derive(Parser, Debug)]
#[command(
    name = "DEM Raster",
    about = "A tool for converting point cloud data into elevation grids",
    version = "0.1.0"
)]
struct Cli {
    #[arg(short, long, num_args = 1.., value_name = "FILE")]
    input: Vec<String>,

    #[arg(short, long, required = true, value_name = "FILE")]
    output: String,

    #[arg(short, long, default_value_t = 1000)]
    width: usize,

    #[arg(long, default_value = "")]
    zone: String,

    #[arg(long, value_enum, default_value = "edge-growth")]
    fill: FillMode,

    #[arg(long, value_name = "CELLS")]
    smooth: Option<usize>,

    #[arg(long, value_name = "FILE")]
    metadata_json: Option<PathBuf>,

    #[arg(long, value_name = "KIND")]
    synthetic: Option<String>,

    #[arg(long, default_value_t = 1000)]
    grid_width: usize,

    #[arg(long, default_value_t = 1000)]
    grid_height: usize,

    #[arg(long)]
    seed: Option<u64>,

    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum FillMode {
    EdgeGrowth,
    Linear,
    None,
}

#[derive(Debug, Serialize)]
struct GridInfo {
    width: usize,
    height: usize,
    physical_width: f64,
    physical_height: f64,
    physical_low: f64,
    physical_high: f64,
    holes: usize,
    zone: String,
}

fn check_and_get_extension(paths: &[PathBuf]) -> Result<Extension, String> {
    let mut extensions = vec![];
    for path in paths.iter() {
        let extension = path.extension().and_then(OsStr::to_str);
        match extension {
            Some(ext) => extensions.push(ext),
            None => return Err("File extension is not found".to_string()),
        }
    }
    extensions.sort();
    extensions.dedup();

    if extensions.len() > 1 {
        return Err("Multiple extensions are not supported".to_string());
    }

    get_extension(extensions[0]).ok_or_else(|| format!("Unsupported extension: {}", extensions[0]))
}

fn expand_globs(input_patterns: Vec<String>) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    for pattern in input_patterns {
        if pattern.contains('*') || pattern.contains('?') || pattern.contains('[') {
            for entry in glob(&pattern).expect("Failed to read glob pattern") {
                match entry {
                    Ok(path) => paths.push(path),
                    Err(e) => eprintln!("Error: {:?}", e),
                }
            }
        } else {
            paths.push(PathBuf::from(pattern));
        }
    }
    paths
}

fn main() {
    let args = Cli::parse();

    let level = if args.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    Builder::new()
        .format(|buf, record| {
            writeln!(
                buf,
                "{} [{}] - {}",
                Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .filter(None, level)
        .init();

    if args.input.is_empty() && args.synthetic.is_none() {
        log::error!("either --input or --synthetic is required");
        std::process::exit(1);
    }
    if !args.input.is_empty() && args.synthetic.is_some() {
        log::error!("--input and --synthetic are mutually exclusive");
        std::process::exit(1);
    }

    log::info!("output file: {}", args.output);

    let start = std::time::Instant::now();

    let mut grid = if let Some(kind) = &args.synthetic {
        log::info!("start generating synthetic grid ({})...", kind);
        let start_local = std::time::Instant::now();

        let generator = SyntheticGridGenerator {
            seed: args.seed,
            ..Default::default()
        };
        let mut grid = match generator.generate(kind, args.grid_width, args.grid_height) {
            Ok(grid) => grid,
            Err(e) => {
                log::error!("Failed to generate synthetic grid: {}", e);
                std::process::exit(1);
            }
        };
        log::info!("finish generating in {:?}", start_local.elapsed());

        grid.other.insert("source".to_string(), kind.clone());
        if let Some(seed) = args.seed {
            grid.other.insert("seed".to_string(), seed.to_string());
        }
        grid
    } else {
        log::info!("input files: {:?}", args.input);
        let input_files = expand_globs(args.input.clone());
        log::info!("expanded input files: {:?}", input_files);
        if input_files.is_empty() {
            log::error!("no input files matched");
            std::process::exit(1);
        }

        let extension = match check_and_get_extension(&input_files) {
            Ok(extension) => extension,
            Err(e) => {
                log::error!("{}", e);
                std::process::exit(1);
            }
        };

        let source = input_files
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(",");

        log::info!("start parsing...");
        let start_local = std::time::Instant::now();

        let parser = match extension {
            Extension::Las | Extension::Laz => {
                let las_parser_provider = LasParserProvider {
                    filenames: input_files,
                    zone: args.zone.clone(),
                };
                las_parser_provider.get_parser()
            }
            Extension::Csv | Extension::Txt => {
                let csv_parser_provider = CsvParserProvider {
                    filenames: input_files,
                    zone: args.zone.clone(),
                };
                csv_parser_provider.get_parser()
            }
        };
        let point_cloud = match parser.parse() {
            Ok(point_cloud) => point_cloud,
            Err(e) => {
                log::error!("Failed to parse point cloud: {:?}", e);
                std::process::exit(1);
            }
        };
        log::info!(
            "finish parsing {} points in {:?}",
            point_cloud.points.len(),
            start_local.elapsed()
        );

        log::info!("start rasterizing at width {}...", args.width);
        let start_local = std::time::Instant::now();

        let rasterizer = Rasterizer::new(args.width);
        let mut grid = match rasterizer.rasterize(&point_cloud) {
            Ok(grid) => grid,
            Err(e) => {
                log::error!("Failed to rasterize: {}", e);
                std::process::exit(1);
            }
        };
        log::info!(
            "finish rasterizing {}x{} cells in {:?}",
            grid.width,
            grid.height,
            start_local.elapsed()
        );

        grid.other.insert("source".to_string(), source);
        grid
    };

    let fill_name = match args.fill {
        FillMode::EdgeGrowth => "edge-growth",
        FillMode::Linear => "linear",
        FillMode::None => "none",
    };
    grid.other.insert("fill".to_string(), fill_name.to_string());

    match args.fill {
        FillMode::EdgeGrowth => {
            log::info!("start filling holes (edge growth)...");
            let start_local = std::time::Instant::now();
            EdgeGrowthHoleFiller.fill(&mut grid);
            log::info!("finish filling in {:?}", start_local.elapsed());
        }
        FillMode::Linear => {
            log::info!("start filling holes (linear)...");
            let start_local = std::time::Instant::now();
            LinearHoleFiller.fill(&mut grid);
            log::info!("finish filling in {:?}", start_local.elapsed());
        }
        FillMode::None => {}
    }
    log::info!("{} unfilled holes remain", grid.hole_count());

    if let Some(window) = args.smooth {
        log::info!("start smoothing (window size {})...", window);
        let start_local = std::time::Instant::now();

        let smoother = GeometricMeanSmoother::new(window);
        smoother.smooth(&mut grid);
        grid.other
            .insert("smoothing".to_string(), window.to_string());
        log::info!("finish smoothing in {:?}", start_local.elapsed());
    }

    log::info!("start writing {}...", args.output);
    let start_local = std::time::Instant::now();
    if let Err(e) = save_grid(&args.output, &grid) {
        log::error!("Failed to write grid: {}", e);
        std::process::exit(1);
    }
    log::info!("finish writing in {:?}", start_local.elapsed());

    if let Some(path) = &args.metadata_json {
        let info = GridInfo {
            width: grid.width,
            height: grid.height,
            physical_width: grid.physical_width,
            physical_height: grid.physical_height,
            physical_low: grid.physical_low,
            physical_high: grid.physical_high,
            holes: grid.hole_count(),
            zone: grid.zone.clone(),
        };
        log::info!("write metadata: {:?}", path);
        if let Err(e) = fs::write(path, serde_json::to_string_pretty(&info).unwrap()) {
            log::error!("Failed to write metadata: {}", e);
            std::process::exit(1);
        }
    }

    log::info!("finish processing in {:?}", start.elapsed());
}
