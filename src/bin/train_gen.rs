//! SVG generator for whole trains of meshing gears, from a TOML train file or a built-in layout
use anyhow::{bail, Context, Result};
use geartrain::fonts::Font;
use geartrain::geometry::Degrees;
use geartrain::svg::{write_gear, write_gear_set};
use geartrain::train::{back_and_forth, diagonal, example_train, spiral, TrainConfig};
use geartrain::{init_logging, GearSet};
use std::fs::{create_dir_all, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use structopt::StructOpt;
use tracing::{info, warn};

#[derive(Debug, StructOpt)]
#[structopt(name = "train_gen", about = "Lays out and draws trains of meshing spur gears")]
struct Opt {
    /// TOML file describing the train. Overrides --layout
    #[structopt(short, long, parse(from_os_str))]
    config: Option<PathBuf>,

    /// Built-in layout to draw when no train file is given
    #[structopt(long, default_value = "example", possible_values = &["example", "spiral", "diagonal", "back-and-forth"])]
    layout: String,

    /// Tooth counts for the spiral, diagonal and back-and-forth layouts
    #[structopt(long, use_delimiter = true, default_value = "10,12,9,14,11,8,16,10,13")]
    teeth: Vec<u32>,

    /// Diametral pitch for the spiral, diagonal and back-and-forth layouts
    #[structopt(long, default_value = "8")]
    pitch: f64,

    /// Pressure angle for the spiral, diagonal and back-and-forth layouts, in degrees
    #[structopt(long, default_value = "27")]
    pressure_angle: f64,

    /// Gears per row for the back-and-forth layout
    #[structopt(long, default_value = "4")]
    per_row: usize,

    /// Pixels per unit for root gears in a train file that don't set their own
    #[structopt(short, long)]
    scale: Option<f64>,

    /// Drive angle, in degrees. Defaults to the train file's, or zero
    #[structopt(short, long)]
    angle: Option<f64>,

    /// Space around the drawing, in pixels. Defaults to the train file's, or zero
    #[structopt(long)]
    padding: Option<f64>,

    /// SVG font to label the gears with
    #[structopt(short, long, parse(from_os_str))]
    font: Option<PathBuf>,

    /// Also write each gear on its own into this directory
    #[structopt(long, parse(from_os_str))]
    gear_dir: Option<PathBuf>,

    /// Output file for the resulting SVG
    #[structopt(short, long, parse(from_os_str))]
    output: PathBuf,
}

fn help_text(set: &GearSet, angle: Degrees) {
    println!("{} gears, driven to {} degrees", set.len(), angle.0);
    for gear in set.iter() {
        println!(
            "        - {} ratio {:.4} on layer {}",
            gear.description(),
            gear.total_ratio(),
            gear.layer()
        );
    }
}

fn create(path: &Path) -> Result<BufWriter<std::fs::File>> {
    Ok(BufWriter::new(
        OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .with_context(|| format!("creating {}", path.display()))?,
    ))
}

fn main() -> Result<()> {
    init_logging();
    let opt = Opt::from_args();

    let (mut set, file_angle, file_padding) = match &opt.config {
        Some(path) => {
            let mut config = TrainConfig::load(path)
                .with_context(|| format!("loading train {}", path.display()))?;
            if opt.scale.is_some() {
                config.scale = opt.scale;
            }
            (config.build()?, config.drive_angle, config.padding)
        }
        None => {
            if opt.scale.is_some() {
                warn!("--scale only applies to train files");
            }
            let set = match opt.layout.as_str() {
                "example" => example_train()?,
                "spiral" => spiral(opt.pitch, opt.pressure_angle, &opt.teeth)?,
                "diagonal" => diagonal(opt.pitch, opt.pressure_angle, &opt.teeth)?,
                "back-and-forth" => {
                    back_and_forth(opt.pitch, opt.pressure_angle, &opt.teeth, opt.per_row)?
                }
                other => bail!("unknown layout {other}"),
            };
            (set, 0.0, 0.0)
        }
    };
    set.validate()?;

    let angle = Degrees(opt.angle.unwrap_or(file_angle));
    let padding = opt.padding.unwrap_or(file_padding);
    set.drive(angle);
    help_text(&set, angle);

    let font = match &opt.font {
        Some(path) => Some(
            Font::new_from_svg(path)
                .with_context(|| format!("loading font {}", path.display()))?,
        ),
        None => None,
    };

    let mut file = create(&opt.output)?;
    write_gear_set(&mut file, &set, padding, font.as_ref())?;
    file.flush()?;
    info!(output = %opt.output.display(), gears = set.len(), "wrote gear set");

    if let Some(dir) = &opt.gear_dir {
        create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
        for gear in set.iter() {
            let path = dir.join(format!("{} {}.svg", gear.id(), gear.file_name()));
            let mut file = create(&path)?;
            write_gear(&mut file, gear, font.as_ref())?;
            file.flush()?;
        }
        info!(dir = %dir.display(), "wrote individual gears");
    }

    Ok(())
}
