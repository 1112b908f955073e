//! SVG generator for a single involute spur gear, for printing or laser cutting
use anyhow::{Context, Result};
use geartrain::fonts::Font;
use geartrain::svg::write_gear;
use geartrain::{init_logging, Gear, GearParams};
use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use structopt::StructOpt;
use tracing::info;

#[derive(Debug, StructOpt)]
#[structopt(name = "gear_gen", about = "A simple spur gear generator")]
struct Opt {
    /// Number of gear teeth
    #[structopt(short, long)]
    teeth: Option<u32>,

    /// Pitch diameter, in the same units the pitch is given per
    #[structopt(short, long)]
    diameter: Option<f64>,

    /// Diametral pitch, in teeth per unit of pitch diameter
    #[structopt(short, long)]
    pitch: Option<f64>,

    /// Pressure angle, in degrees
    #[structopt(long, default_value = "27")]
    pressure_angle: f64,

    /// Cut the teeth on the inside of a ring
    #[structopt(long)]
    internal: bool,

    /// Thickness of the ring round an internal gear. Defaults to half the pitch diameter
    #[structopt(long)]
    internal_thickness: Option<f64>,

    /// Pixels per unit
    #[structopt(short, long, default_value = "100")]
    scale: f64,

    /// SVG font to label the gear with
    #[structopt(short, long, parse(from_os_str))]
    font: Option<PathBuf>,

    /// Output file for the resulting SVG. Defaults to a name describing the gear
    #[structopt(short, long, parse(from_os_str))]
    output: Option<PathBuf>,
}

fn help_text(gear: &Gear) {
    println!(
        "{}
        - Outer diameter {:.3}, root diameter {:.3}, base diameter {:.3}
        - Drawing is {}px square",
        gear.description(),
        gear.d_outer(),
        gear.d_inner(),
        gear.d_base(),
        gear.size()
    )
}

fn main() -> Result<()> {
    init_logging();
    let opt = Opt::from_args();

    let mut params = GearParams::new()
        .pressure_angle(opt.pressure_angle)
        .internal(opt.internal)
        .scale(opt.scale);
    params.teeth = opt.teeth;
    params.diameter = opt.diameter;
    params.pitch = opt.pitch;
    params.internal_thickness = opt.internal_thickness;
    let gear = Gear::new(params, None)?;
    help_text(&gear);

    let font = match &opt.font {
        Some(path) => Some(
            Font::new_from_svg(path)
                .with_context(|| format!("loading font {}", path.display()))?,
        ),
        None => None,
    };

    let output = opt
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(format!("{}.svg", gear.file_name())));
    let mut file = BufWriter::new(
        OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&output)
            .with_context(|| format!("creating {}", output.display()))?,
    );
    write_gear(&mut file, &gear, font.as_ref())?;
    file.flush()?;
    info!(output = %output.display(), "wrote gear");

    Ok(())
}
