// ----------------------------------- CLI -----------------------------------
use clap::Parser;
use std::path::PathBuf;

use amapola::utils::parse_triplet;

#[derive(clap::Parser, Debug, Clone)]
#[clap(name = "roistats", about = "Quantify regions of interest in a raw image volume")]
pub struct Cli {

    /// Raw image file (little-endian f32, x varying fastest)
    #[clap(short = 'f', long)]
    pub input_file: PathBuf,

    /// Number of voxels in each dimension
    #[clap(short, long, value_parser = parse_triplet::<usize>, default_value = "128,128,128")]
    pub nvoxels: (usize, usize, usize),

    /// Voxel size in mm
    #[clap(short, long, value_parser = parse_triplet::<f64>, default_value = "1,1,1")]
    pub voxel_size: (f64, f64, f64),

    /// TOML file describing the regions to quantify
    #[clap(short, long)]
    pub rois: PathBuf,

    /// Classify with sub-voxel sampling: slower, but boundary voxels are
    /// weighted by their fractional overlap
    #[clap(short, long)]
    pub accurate: bool,

}
// --------------------------------------------------------------------------------

use std::error::Error;

use indicatif::{ProgressBar, ProgressStyle};
use serde::Deserialize;

use amapola::analysis::analyze_all;
use amapola::dataset::DataSet;
use amapola::roi::{Kind, Roi};
use amapola::{Point, Vector};

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
struct RoiFile {
    roi: Vec<RoiDef>,
}

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
struct RoiDef {

    name: String,

    shape: ShapeDef,

    /// Center of the region in mm, base frame
    center: [f64; 3],

    /// Full extents of the region in mm
    size: [f64; 3],

    /// Rotation of the region about its center, degrees about the z axis
    #[serde(default)]
    rotation_deg: f64,
}

#[derive(Deserialize, Debug, Clone, Copy)]
#[serde(rename_all = "snake_case")]
enum ShapeDef { Ellipsoid, Cylinder, Box }

fn build_roi(def: &RoiDef) -> Roi {
    let kind = match def.shape {
        ShapeDef::Ellipsoid => Kind::Ellipsoid,
        ShapeDef::Cylinder  => Kind::Cylinder,
        ShapeDef::Box       => Kind::Box,
    };
    let mut roi = Roi::new(def.name.as_str(), kind);
    let size = Vector::new(def.size[0], def.size[1], def.size[2]);
    let center = Point::new(def.center[0], def.center[1], def.center[2]);
    // the region's frame origin sits at its near corner
    roi.volume_mut().space_mut().shift(center - Point::from(size / 2.0));
    roi.set_corner(Point::from(size));
    if def.rotation_deg != 0.0 {
        roi.volume_mut().space_mut()
            .rotate_on_vector(Vector::z(), def.rotation_deg.to_radians(), center);
    }
    roi
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let args = Cli::parse();

    let (nx, ny, nz) = args.nvoxels;
    let voxel_size = Vector::new(args.voxel_size.0, args.voxel_size.1, args.voxel_size.2);
    let ds = DataSet::from_raw_file(&args.input_file, args.nvoxels, voxel_size)?;
    println!("Loaded {}: {nx}x{ny}x{nz} voxels of {:.2}x{:.2}x{:.2} mm",
             args.input_file.display(), voxel_size.x, voxel_size.y, voxel_size.z);

    let config: RoiFile = toml::from_str(&std::fs::read_to_string(&args.rois)?)?;

    println!("{:<16} {:>5} {:>4} {:>11} {:>11} {:>11} {:>11} {:>11} {:>13} {:>12}",
             "roi", "frame", "gate", "mean", "median", "sd", "min", "max", "total", "volume/mm3");
    for def in &config.roi {
        let roi = build_roi(def);

        let bar = ProgressBar::new(1000);
        bar.set_style(ProgressStyle::default_bar()
                      .template("[{elapsed_precise}] {wide_bar} {percent:>3}% {msg}")?);
        let mut update = |message: Option<&str>, fraction: f64| {
            if let Some(message) = message { bar.set_message(message.to_owned()); }
            if fraction < 0.0 {
                bar.tick();
            } else if fraction > 1.0 {
                bar.finish_and_clear();
            } else {
                bar.set_position((fraction * 1000.0) as u64);
            }
            true
        };

        let stats = analyze_all(&roi, &ds, args.accurate, &mut update)?
            .expect("the progress bar never cancels");

        for (frame, row) in stats.iter().enumerate() {
            for (gate, s) in row.iter().enumerate() {
                println!("{:<16} {:>5} {:>4} {:>11.4} {:>11.4} {:>11.4} {:>11.4} {:>11.4} {:>13.4} {:>12.3}",
                         def.name, frame, gate,
                         s.mean, s.median, s.variance.sqrt(),
                         s.min, s.max, s.total, s.volume);
            }
        }
    }
    Ok(())
}
