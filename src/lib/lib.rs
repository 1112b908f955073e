//! Geometry and kinematics for trains of meshing involute gears.
//!
//! A [`Gear`] is resolved from a sparse set of [`GearParams`] (two of teeth, pitch diameter and
//! diametrical pitch, plus a pressure angle, or whatever it inherits from its parent) and traces
//! its own tooth profile. A [`GearSet`] owns a forest of gears linked by parent id, lays them out
//! and propagates a drive angle through the meshes.
//!
//! ```
//! use geartrain::{GearParams, GearSet};
//! use geartrain::geometry::Degrees;
//!
//! let mut set = GearSet::new();
//! set.add(GearParams::new().id("A").teeth(8).pitch(8.0).pressure_angle(25.0)).unwrap();
//! set.add(GearParams::new().id("B").parent("A").teeth(19)).unwrap();
//!
//! assert_eq!(set.get("B").unwrap().diameter(), 2.375);
//! set.drive(Degrees(10.0));
//! ```
use thiserror::Error;

pub mod fonts;
pub mod gear;
pub mod gearset;
pub mod geometry;
pub mod svg;
pub mod train;

pub use gear::{DescriptionText, Gear, GearParams, ToothMarker};
pub use gearset::{Dimensions, GearSet};

/// Log to stderr, filtered by `RUST_LOG` (`info` when unset). Call once, from `main`.
pub fn init_logging() {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}

/// Reasons a gear (or a change to a gear set) is rejected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigurationError {
    /// An internal gear was attached to an internal parent.
    #[error("two internal gears cannot mesh: {child} on {parent}")]
    IncompatibleMesh { child: String, parent: String },

    /// Too many of N, D, P, or a value that must be inherited was given.
    #[error("too many parameters: {0}")]
    Overconstrained(String),

    /// Not enough parameters to size the gear.
    #[error("not enough parameters: {0}")]
    Underconstrained(String),

    /// Pressure angle outside of 15..=35 degrees.
    #[error("pressure angle must be between 15 and 35 degrees, got {0}")]
    Range(f64),

    /// The gear does not fit where it was placed in the tree.
    #[error("invalid topology: {0}")]
    InvalidTopology(String),

    /// A dimension resolved to something no gear can have.
    #[error("invalid dimension: {0}")]
    InvalidDimension(String),

    /// The involute trace ran out of room before reaching the outer radius.
    #[error("tooth profile did not reach the outer radius (N={teeth}, PA={pressure_angle} degrees)")]
    ProfileNotConverged { teeth: u32, pressure_angle: f64 },
}
