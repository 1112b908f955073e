//! Ready-made gear trains, and gear trains described in TOML files.
//!
//! ```toml
//! scale = 100.0
//! drive_angle = 15.0
//!
//! [[gear]]
//! id = "A"
//! teeth = 8
//! pitch = 8.0
//! pressure_angle = 25.0
//!
//! [[gear]]
//! id = "B"
//! parent = "A"
//! teeth = 19
//! joint_angle = -30.0
//! ```
use std::fs::read_to_string;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::{ConfigurationError, GearParams, GearSet};

#[derive(Debug, Error)]
pub enum TrainError {
    #[error("failed to read train file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse train file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
}

/// A gear train file
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TrainConfig {
    /// Pixels per unit, for root gears that don't set their own
    #[serde(default)]
    pub scale: Option<f64>,
    /// Drive angle to draw the train at, in degrees
    #[serde(default)]
    pub drive_angle: f64,
    /// Space around the drawing, in pixels
    #[serde(default)]
    pub padding: f64,
    #[serde(rename = "gear", default)]
    pub gears: Vec<GearParams>,
}

impl TrainConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, TrainError> {
        Ok(toml::from_str(s)?)
    }

    pub fn load(path: &Path) -> Result<Self, TrainError> {
        Self::from_toml_str(&read_to_string(path)?)
    }

    /// Resolve every gear, in file order
    pub fn build(&self) -> Result<GearSet, ConfigurationError> {
        GearSet::from_params(self.gears.iter().cloned().map(|mut g| {
            if g.parent.is_none() && g.scale.is_none() {
                g.scale = self.scale;
            }
            g
        }))
    }
}

/// The ten gear demonstration train: a chain, a branch, an axle joint carrying a finer pitch and a
/// ring gear drawn underneath the rest.
pub fn example_train() -> Result<GearSet, ConfigurationError> {
    GearSet::from_params(vec![
        GearParams::new().id("G1").teeth(8).pitch(8.0).pressure_angle(25.0),
        GearParams::new().id("G2").parent("G1").teeth(19),
        GearParams::new().id("G3").parent("G2").teeth(11).joint_angle(10.0),
        GearParams::new().id("G4").parent("G3").teeth(8).joint_angle(60.0),
        GearParams::new().id("G5").parent("G2").teeth(9).joint_angle(70.0),
        GearParams::new().id("G6").parent("G2").teeth(11).joint_angle(-60.0),
        GearParams::new().id("G7").parent("G3").teeth(14).joint_angle(-40.0),
        GearParams::new()
            .id("G8")
            .parent("G2")
            .size_np(14, 20.0)
            .axle_joint(true),
        GearParams::new().id("G9").parent("G8").teeth(25).joint_angle(-150.0),
        GearParams::new()
            .id("G10")
            .parent("G7")
            .teeth(20)
            .joint_angle(180.0)
            .internal(true)
            .layer(0),
    ])
}

fn chain<F>(pitch: f64, pressure_angle: f64, teeth: &[u32], joint: F) -> Result<GearSet, ConfigurationError>
where
    F: Fn(usize) -> f64,
{
    let mut set = GearSet::new();
    let mut parent: Option<String> = None;
    for (i, n) in teeth.iter().enumerate() {
        let params = GearParams::new().id(format!("G{}", i + 1)).teeth(*n);
        let params = match parent {
            None => params.pitch(pitch).pressure_angle(pressure_angle),
            Some(p) => params.parent(p).joint_angle(joint(i)),
        };
        parent = Some(set.add(params)?);
    }
    Ok(set)
}

/// A single chain that curls round, each joint 17 degrees further clockwise than the last
pub fn spiral(pitch: f64, pressure_angle: f64, teeth: &[u32]) -> Result<GearSet, ConfigurationError> {
    chain(pitch, pressure_angle, teeth, |i| -17.0 * (i as f64 - 1.0))
}

/// A single chain running down and to the right, zigzagging between joints of -15 and -75 degrees
pub fn diagonal(pitch: f64, pressure_angle: f64, teeth: &[u32]) -> Result<GearSet, ConfigurationError> {
    chain(pitch, pressure_angle, teeth, |i| if i % 2 == 1 { -15.0 } else { -75.0 })
}

/// A single chain rastering right, down, left, down, right..., `per_row` gears per row
pub fn back_and_forth(
    pitch: f64,
    pressure_angle: f64,
    teeth: &[u32],
    per_row: usize,
) -> Result<GearSet, ConfigurationError> {
    if per_row == 0 {
        return Err(ConfigurationError::InvalidDimension(
            "a raster row needs at least one gear".into(),
        ));
    }
    chain(pitch, pressure_angle, teeth, |i| {
        if i % per_row == 0 {
            -90.0
        } else if i % (2 * per_row) < per_row {
            -15.0
        } else {
            -175.0
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::io::Write;

    const TRAIN: &str = r#"
scale = 50.0
drive_angle = 15.0
padding = 4.0

[[gear]]
id = "A"
teeth = 8
pitch = 8.0
pressure_angle = 25.0

[[gear]]
id = "B"
parent = "A"
teeth = 19
joint_angle = -30.0

[[gear]]
id = "C"
parent = "B"
teeth = 40
axle_joint = true
layer = 2
"#;

    #[test]
    fn test_parse_and_build() {
        let config = TrainConfig::from_toml_str(TRAIN).unwrap();
        assert_eq!(config.drive_angle, 15.0);
        assert_eq!(config.padding, 4.0);
        assert_eq!(config.gears.len(), 3);
        // Fields left out take the usual defaults
        assert_eq!(config.gears[0].joint_angle, -60.0);
        assert_eq!(config.gears[0].layer, 1);

        let set = config.build().unwrap();
        assert_eq!(set.get("A").unwrap().scale(), 50.0);
        assert_eq!(set.get("C").unwrap().scale(), 50.0);
        assert_abs_diff_eq!(set.get("B").unwrap().diameter(), 2.375, epsilon = 1e-9);
        assert_abs_diff_eq!(set.get("C").unwrap().diameter(), 5.0, epsilon = 1e-9);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(TRAIN.as_bytes()).unwrap();
        let config = TrainConfig::load(file.path()).unwrap();
        assert_eq!(config.gears[2].id.as_deref(), Some("C"));
    }

    #[test]
    fn test_bad_files() {
        let err = TrainConfig::from_toml_str("[[gear]]\nteeth = 8\ncolour = \"red\"\n").unwrap_err();
        assert!(matches!(err, TrainError::Parse(_)));

        let config = TrainConfig::from_toml_str("[[gear]]\nteeth = 8\npitch = 8.0\n").unwrap();
        assert!(matches!(
            config.build(),
            Err(ConfigurationError::Underconstrained(_))
        ));

        let err = TrainConfig::load(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, TrainError::Io(_)));
    }

    #[test]
    fn test_example_train() {
        let set = example_train().unwrap();
        let g8 = set.get("G8").unwrap();
        assert!(g8.is_axle_joint());
        assert_abs_diff_eq!(g8.pitch(), 20.0, epsilon = 1e-9);
        // G9 meshes with G8, so it picks up the finer pitch
        assert_abs_diff_eq!(set.get("G9").unwrap().diameter(), 1.25, epsilon = 1e-9);
        let ring = set.get("G10").unwrap();
        assert!(ring.is_internal_link());
        assert_eq!(ring.layer(), 0);
    }

    #[test]
    fn test_spiral() {
        let set = spiral(8.0, 25.0, &[10, 12, 9, 14]).unwrap();
        assert_eq!(set.len(), 4);
        let joints: Vec<f64> = set
            .iter()
            .skip(1)
            .map(|g| g.joint_angle().to_degrees().0)
            .collect();
        assert_abs_diff_eq!(joints[0], 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(joints[1], -17.0, epsilon = 1e-9);
        assert_abs_diff_eq!(joints[2], -34.0, epsilon = 1e-9);
        assert_eq!(set.get("G4").unwrap().parent_id(), Some("G3"));
    }

    #[test]
    fn test_diagonal() {
        let set = diagonal(9.0, 25.0, &[12, 8, 15, 10, 20]).unwrap();
        let joints: Vec<f64> = set
            .iter()
            .skip(1)
            .map(|g| g.joint_angle().to_degrees().0.round())
            .collect();
        assert_eq!(joints, vec![-15.0, -75.0, -15.0, -75.0]);
        // Every step moves right and down the screen
        let positions: Vec<_> = set.iter().map(|g| g.position()).collect();
        for pair in positions.windows(2) {
            assert!(pair[1].x > pair[0].x);
            assert!(pair[1].y > pair[0].y);
        }
    }

    #[test]
    fn test_back_and_forth() {
        let teeth = vec![8; 8];
        let set = back_and_forth(10.0, 25.0, &teeth, 3).unwrap();
        let joints: Vec<f64> = set
            .iter()
            .skip(1)
            .map(|g| g.joint_angle().to_degrees().0.round())
            .collect();
        assert_eq!(
            joints,
            vec![-15.0, -15.0, -90.0, -175.0, -175.0, -90.0, -15.0]
        );
        assert!(back_and_forth(10.0, 25.0, &teeth, 0).is_err());
    }
}
