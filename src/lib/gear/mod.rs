//! A single involute spur gear, resolved from sparse construction parameters.
//!
//! Gears are immutable once built. Changing any parameter means building a new gear from edited
//! [`GearParams`]; [`crate::GearSet::replace`] does that for a gear and everything hanging off it.
use std::f64::consts::PI;
use std::sync::atomic::{AtomicUsize, Ordering};

use nalgebra::geometry::Point2;
use nalgebra::Vector2;
use serde::Deserialize;
use tracing::debug;

use crate::geometry::{fix2, polar_to_linear, Degrees, Polar, Radians};
use crate::ConfigurationError;

mod profile;

use profile::{outline, trace_flank, Radii};

/// Pixels per unit length for a root gear that doesn't say otherwise
pub const DEFAULT_SCALE: f64 = 100.0;
/// Pressure angle offered to users when they don't pick one, in degrees
pub const DEFAULT_PRESSURE_ANGLE: f64 = 27.0;
/// Angle from the parent's center to a child's center, in degrees
pub const DEFAULT_JOINT_ANGLE: f64 = -60.0;
/// Internal ring thickness, as a fraction of the pitch diameter
pub const INTERNAL_THICKNESS_RATIO: f64 = 0.5;

const MIN_PRESSURE_ANGLE: f64 = 15.0;
const MAX_PRESSURE_ANGLE: f64 = 35.0;

// Addendum plus dedendum, in units of 1/P, and the extra clearance cut into the root
const TOOTH_MODULE: f64 = 2.0;
const TOOTH_GAP: f64 = 0.3;

// Label sizing, relative to the inner radius
const MAX_TEXT_HEIGHT: f64 = 0.03;

/// Construction parameters for a [`Gear`].
///
/// Any of `teeth` (N), `diameter` (D) and `pitch` (P) may be left out; which combinations are
/// accepted depends on whether the gear has a parent and whether it shares its parent's axle.
/// Angles are in degrees.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GearParams {
    pub id: Option<String>,
    pub parent: Option<String>,
    pub teeth: Option<u32>,
    pub diameter: Option<f64>,
    pub pitch: Option<f64>,
    pub pressure_angle: Option<f64>,
    pub joint_angle: f64,
    pub internal: bool,
    pub internal_thickness: Option<f64>,
    pub axle_joint: bool,
    pub layer: i32,
    pub scale: Option<f64>,
}

impl Default for GearParams {
    fn default() -> Self {
        GearParams {
            id: None,
            parent: None,
            teeth: None,
            diameter: None,
            pitch: None,
            pressure_angle: None,
            joint_angle: DEFAULT_JOINT_ANGLE,
            internal: false,
            internal_thickness: None,
            axle_joint: false,
            layer: 1,
            scale: None,
        }
    }
}

impl GearParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn teeth(mut self, n: u32) -> Self {
        self.teeth = Some(n);
        self
    }

    pub fn diameter(mut self, d: f64) -> Self {
        self.diameter = Some(d);
        self
    }

    pub fn pitch(mut self, p: f64) -> Self {
        self.pitch = Some(p);
        self
    }

    pub fn pressure_angle(mut self, degrees: f64) -> Self {
        self.pressure_angle = Some(degrees);
        self
    }

    pub fn joint_angle(mut self, degrees: f64) -> Self {
        self.joint_angle = degrees;
        self
    }

    pub fn internal(mut self, internal: bool) -> Self {
        self.internal = internal;
        self
    }

    pub fn internal_thickness(mut self, thickness: f64) -> Self {
        self.internal_thickness = Some(thickness);
        self
    }

    pub fn axle_joint(mut self, axle_joint: bool) -> Self {
        self.axle_joint = axle_joint;
        self
    }

    pub fn layer(mut self, layer: i32) -> Self {
        self.layer = layer;
        self
    }

    pub fn scale(mut self, scale: f64) -> Self {
        self.scale = Some(scale);
        self
    }

    /// Size the gear by teeth and pitch diameter, forgetting any pitch
    pub fn size_nd(mut self, n: u32, d: f64) -> Self {
        self.teeth = Some(n);
        self.diameter = Some(d);
        self.pitch = None;
        self
    }

    /// Size the gear by teeth and diametrical pitch, forgetting any diameter
    pub fn size_np(mut self, n: u32, p: f64) -> Self {
        self.teeth = Some(n);
        self.diameter = None;
        self.pitch = Some(p);
        self
    }

    /// Size the gear by pitch diameter and diametrical pitch, forgetting any tooth count
    pub fn size_dp(mut self, d: f64, p: f64) -> Self {
        self.teeth = None;
        self.diameter = Some(d);
        self.pitch = Some(p);
        self
    }
}

/// What a child remembers about the gear it hangs off.
#[derive(Clone, Debug, PartialEq)]
pub struct ParentLink {
    pub id: String,
    pub teeth: u32,
    pub internal: bool,
}

/// Where to draw the marker for tooth number one, relative to the gear center, in unscaled units.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ToothMarker {
    pub position: Point2<f64>,
    pub size: f64,
}

/// Placement of the identification label, for laying out text along an arc.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DescriptionText {
    /// Baseline radius of the label
    pub radius: f64,
    /// Height of one font grid unit
    pub height: f64,
}

#[derive(Clone, Debug)]
pub struct Gear {
    id: String,
    params: GearParams,
    parent: Option<ParentLink>,

    teeth: u32,
    diameter: f64,
    pressure_angle: Radians,
    joint_angle: Radians,
    internal: bool,
    internal_thickness: f64,
    axle_joint: bool,
    layer: i32,
    scale: f64,

    // Static geometry, fixed at construction
    flank: Vec<Polar>,
    base_angle: Degrees,
    offset: Vector2<f64>,
    position: Point2<f64>,
    total_ratio: f64,

    // Last rotation handed to us by a drive pass
    rotation: Degrees,
}

static NEXT_ID: AtomicUsize = AtomicUsize::new(1);

/// Five upper-case base-36 characters, unique within this process
pub(crate) fn generate_id() -> String {
    let mut n = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    let mut chars = [b'0'; 5];
    for c in chars.iter_mut().rev() {
        let digit = (n % 36) as u8;
        *c = if digit < 10 {
            b'0' + digit
        } else {
            b'A' + digit - 10
        };
        n /= 36;
    }
    chars.iter().map(|&c| c as char).collect()
}

/// Turn a derived tooth count into a whole number of teeth
fn whole_teeth(n: f64) -> Result<u32, ConfigurationError> {
    let rounded = n.round();
    if !n.is_finite() || (n - rounded).abs() > 1e-9 || rounded < 1.0 {
        return Err(ConfigurationError::InvalidDimension(format!(
            "N = {n} is not a whole, positive number of teeth"
        )));
    }
    Ok(rounded as u32)
}

fn positive(name: &str, v: Option<f64>) -> Result<(), ConfigurationError> {
    match v {
        Some(v) if !(v.is_finite() && v > 0.0) => Err(ConfigurationError::InvalidDimension(
            format!("{name} must be positive, got {v}"),
        )),
        _ => Ok(()),
    }
}

impl Gear {
    /// Resolve `params` into a fully specified gear, hanging off `parent` if given.
    ///
    /// When a parent is passed and `params.parent` is set, they must agree. Fails without
    /// building anything if the parameters are inconsistent with each other or with the parent.
    pub fn new(mut params: GearParams, parent: Option<&Gear>) -> Result<Gear, ConfigurationError> {
        match (&params.parent, parent) {
            (Some(named), Some(p)) if named != p.id() => {
                return Err(ConfigurationError::InvalidTopology(format!(
                    "gear names {named} as parent but was attached to {}",
                    p.id()
                )));
            }
            (Some(named), None) => {
                return Err(ConfigurationError::InvalidTopology(format!(
                    "parent {named} was not supplied"
                )));
            }
            (None, Some(p)) => params.parent = Some(p.id().to_string()),
            _ => {}
        }
        let id = params.id.clone().unwrap_or_else(generate_id);

        if let Some(p) = parent {
            if p.internal && params.internal {
                return Err(ConfigurationError::IncompatibleMesh {
                    child: id,
                    parent: p.id.clone(),
                });
            }
        }

        let scale = match parent {
            Some(p) => {
                if params.scale.is_some() {
                    return Err(ConfigurationError::InvalidTopology(format!(
                        "cannot set scale on child gear {id}, it is inherited from the root"
                    )));
                }
                p.scale
            }
            None => params.scale.unwrap_or(DEFAULT_SCALE),
        };
        positive("scale", Some(scale))?;

        if let Some(pa) = params.pressure_angle {
            if !(MIN_PRESSURE_ANGLE..=MAX_PRESSURE_ANGLE).contains(&pa) {
                return Err(ConfigurationError::Range(pa));
            }
        }

        if params.teeth.is_some() && params.diameter.is_some() && params.pitch.is_some() {
            return Err(ConfigurationError::Overconstrained(
                "N, D and P were all given, only two may be".into(),
            ));
        }
        if params.teeth == Some(0) {
            return Err(ConfigurationError::InvalidDimension(
                "a gear needs at least one tooth".into(),
            ));
        }
        positive("D", params.diameter)?;
        positive("P", params.pitch)?;

        let given_pa = params.pressure_angle.map(|pa| Degrees(pa).to_radians());
        let (pressure_angle, teeth, diameter) = if params.axle_joint {
            let p = parent.ok_or_else(|| {
                ConfigurationError::InvalidTopology(format!(
                    "cannot set axle_joint on root gear {id}"
                ))
            })?;
            let (n, d) = match (params.teeth, params.diameter, params.pitch) {
                (Some(n), None, Some(pitch)) => (n, n as f64 / pitch),
                (None, Some(d), Some(pitch)) => (whole_teeth(d * pitch)?, d),
                (Some(n), Some(d), None) => (n, d),
                (Some(n), None, None) => (n, n as f64 / p.pitch()),
                (None, Some(d), None) => (whole_teeth(d * p.pitch())?, d),
                _ => {
                    return Err(ConfigurationError::Underconstrained(
                        "an axle joint gear needs N, D, N+P, D+P or N+D".into(),
                    ))
                }
            };
            (given_pa.unwrap_or(p.pressure_angle), n, d)
        } else if let Some(p) = parent {
            if params.pressure_angle.is_some() {
                return Err(ConfigurationError::Overconstrained(
                    "the pressure angle of a meshing child is inherited from its parent".into(),
                ));
            }
            if params.pitch.is_some() {
                return Err(ConfigurationError::Overconstrained(
                    "the pitch of a meshing child is inherited from its parent".into(),
                ));
            }
            let (n, d) = match (params.teeth, params.diameter) {
                (Some(_), Some(_)) => {
                    return Err(ConfigurationError::Overconstrained(
                        "pitch is inherited, so give only one of N or D".into(),
                    ))
                }
                (Some(n), None) => (n, n as f64 / p.pitch()),
                (None, Some(d)) => (whole_teeth(d * p.pitch())?, d),
                (None, None) => {
                    return Err(ConfigurationError::Underconstrained(
                        "a meshing child needs N or D".into(),
                    ))
                }
            };
            (p.pressure_angle, n, d)
        } else {
            let (n, d) = match (params.teeth, params.diameter, params.pitch) {
                (Some(n), None, Some(pitch)) => (n, n as f64 / pitch),
                (None, Some(d), Some(pitch)) => (whole_teeth(d * pitch)?, d),
                (Some(n), Some(d), None) => (n, d),
                _ => {
                    return Err(ConfigurationError::Underconstrained(
                        "a root gear needs N+D, N+P or D+P".into(),
                    ))
                }
            };
            let pa = given_pa.ok_or_else(|| {
                ConfigurationError::Underconstrained(format!(
                    "root gear {id} needs a pressure angle"
                ))
            })?;
            (pa, n, d)
        };
        positive("D", Some(diameter))?;

        let internal_thickness = params
            .internal_thickness
            .unwrap_or(diameter * INTERNAL_THICKNESS_RATIO);
        if !(internal_thickness.is_finite() && internal_thickness >= 0.0) {
            return Err(ConfigurationError::InvalidDimension(format!(
                "internal thickness must not be negative, got {internal_thickness}"
            )));
        }

        let mut gear = Gear {
            id,
            parent: parent.map(|p| ParentLink {
                id: p.id.clone(),
                teeth: p.teeth,
                internal: p.internal,
            }),
            teeth,
            diameter,
            pressure_angle,
            joint_angle: Degrees(params.joint_angle).to_radians(),
            internal: params.internal,
            internal_thickness,
            axle_joint: params.axle_joint,
            layer: params.layer,
            scale,
            flank: Vec::new(),
            base_angle: Degrees(0.0),
            offset: Vector2::zeros(),
            position: Point2::origin(),
            total_ratio: 1.0,
            rotation: Degrees(0.0),
            params,
        };
        gear.update_static(parent)?;
        debug!(
            id = %gear.id,
            parent = ?gear.parent_id(),
            n = gear.teeth,
            d = gear.diameter,
            p = gear.pitch(),
            "resolved gear"
        );
        Ok(gear)
    }

    /// Trace the profile, then place the gear relative to its parent
    fn update_static(&mut self, parent: Option<&Gear>) -> Result<(), ConfigurationError> {
        let trace = trace_flank(self.teeth, self.radii()).ok_or(
            ConfigurationError::ProfileNotConverged {
                teeth: self.teeth,
                pressure_angle: self.pressure_angle.to_degrees().0,
            },
        )?;
        self.flank = trace.flank;
        self.base_angle = trace.pitch_angle;

        self.offset = self.offset_from(parent);
        self.position = match parent {
            None => {
                let c = self.size() * 0.5;
                Point2::new(c, c)
            }
            Some(p) => p.position + self.offset,
        };
        self.total_ratio = match parent {
            None => 1.0,
            Some(p) if self.axle_joint => p.total_ratio,
            Some(p) => p.total_ratio * self.ratio(),
        };
        Ok(())
    }

    fn offset_from(&self, parent: Option<&Gear>) -> Vector2<f64> {
        let p = match parent {
            Some(p) if !self.axle_joint => p,
            _ => return Vector2::zeros(),
        };
        let distance = if self.is_internal_link() {
            self.r_scaled() - p.r_scaled()
        } else {
            p.r_scaled() + self.r_scaled()
        };
        Vector2::new(
            self.joint_angle.cos() * distance,
            -self.joint_angle.sin() * distance,
        )
    }

    fn radii(&self) -> Radii {
        Radii {
            base: self.r_base(),
            inner: self.r_inner(),
            pitch: self.r(),
            outer: self.r_outer(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// The parameters this gear was built from, with the parent id filled in
    pub fn params(&self) -> &GearParams {
        &self.params
    }

    pub fn parent(&self) -> Option<&ParentLink> {
        self.parent.as_ref()
    }

    pub fn parent_id(&self) -> Option<&str> {
        self.parent.as_ref().map(|p| p.id.as_str())
    }

    /// Number of teeth, N
    pub fn teeth(&self) -> u32 {
        self.teeth
    }

    /// Pitch diameter, D
    pub fn diameter(&self) -> f64 {
        self.diameter
    }

    /// Diametrical pitch, P = N / D
    pub fn pitch(&self) -> f64 {
        self.teeth as f64 / self.diameter
    }

    pub fn pressure_angle(&self) -> Radians {
        self.pressure_angle
    }

    pub fn joint_angle(&self) -> Radians {
        self.joint_angle
    }

    pub fn is_internal(&self) -> bool {
        self.internal
    }

    /// Ring thickness outside the teeth. Always zero for an external gear.
    pub fn internal_thickness(&self) -> f64 {
        if self.internal {
            self.internal_thickness
        } else {
            0.0
        }
    }

    pub fn is_axle_joint(&self) -> bool {
        self.axle_joint
    }

    pub fn layer(&self) -> i32 {
        self.layer
    }

    /// Pixels per unit length
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Angle between neighbouring teeth
    pub fn gear_angle(&self) -> Degrees {
        Degrees(360.0 / self.teeth as f64)
    }

    pub fn d_outer(&self) -> f64 {
        let extra = if self.internal {
            TOOTH_MODULE + TOOTH_GAP
        } else {
            TOOTH_MODULE
        };
        (self.teeth as f64 + extra) / self.pitch()
    }

    pub fn d_inner(&self) -> f64 {
        let extra = if self.internal {
            TOOTH_MODULE
        } else {
            TOOTH_MODULE + TOOTH_GAP
        };
        (self.teeth as f64 - extra) / self.pitch()
    }

    pub fn r_outer(&self) -> f64 {
        self.d_outer() / 2.0
    }

    pub fn r_inner(&self) -> f64 {
        self.d_inner() / 2.0
    }

    pub fn d_base(&self) -> f64 {
        self.diameter * self.pressure_angle.cos()
    }

    pub fn r_base(&self) -> f64 {
        self.d_base() / 2.0
    }

    /// Pitch radius
    pub fn r(&self) -> f64 {
        self.diameter / 2.0
    }

    pub fn r_scaled(&self) -> f64 {
        self.r() * self.scale
    }

    /// Side of the square, in pixels, that holds the whole gear
    pub fn size(&self) -> f64 {
        (self.scale * (self.d_outer() + self.internal_thickness())).ceil()
    }

    /// Angle of the leading flank where it crosses the pitch circle. Rotating by this lines the
    /// teeth up with the drive angle.
    pub fn base_angle(&self) -> Degrees {
        self.base_angle
    }

    /// One ring gear meshing with one external gear
    pub fn is_internal_link(&self) -> bool {
        match &self.parent {
            Some(p) => self.internal != p.internal,
            None => false,
        }
    }

    /// Speed of this gear relative to its parent's, ignoring direction
    pub fn ratio(&self) -> f64 {
        match &self.parent {
            Some(p) => p.teeth as f64 / self.teeth as f64,
            None => 1.0,
        }
    }

    /// Product of the ratios up to the root. Axle joints pass their parent's value through.
    pub fn total_ratio(&self) -> f64 {
        self.total_ratio
    }

    /// Center offset from the parent's center, in pixels
    pub fn offset(&self) -> Vector2<f64> {
        self.offset
    }

    /// Absolute center, in pixels
    pub fn position(&self) -> Point2<f64> {
        self.position
    }

    /// Top left corner of this gear's square, in pixels
    pub fn origin(&self) -> Point2<f64> {
        let half = self.size() / 2.0;
        Point2::new(
            fix2(self.position.x - half),
            fix2(self.position.y - half),
        )
    }

    /// Rotation from the most recent drive pass
    pub fn rotation(&self) -> Degrees {
        self.rotation
    }

    pub(crate) fn set_rotation(&mut self, rotation: Degrees) {
        self.rotation = rotation;
    }

    /// One step of rotation propagation: this gear's rotation for drive angle `global`, given
    /// that its parent is at `parent_rotation`. Root gears ignore `parent_rotation`.
    pub fn rotation_from(&self, global: Degrees, parent_rotation: Degrees) -> Degrees {
        let ja = self.joint_angle.to_degrees();
        let p = match &self.parent {
            None => return global - ja,
            Some(p) => p,
        };
        if self.axle_joint {
            return parent_rotation - ja;
        }
        let ratio_adjustment = (parent_rotation + ja) * self.ratio();
        if self.is_internal_link() {
            let parity = if (self.teeth + p.teeth) % 2 == 1 {
                Degrees(180.0 / self.teeth as f64)
            } else {
                Degrees(0.0)
            };
            parity + ratio_adjustment - ja
        } else {
            Degrees(180.0) - ratio_adjustment - ja
        }
    }

    /// The closed outline of the whole gear: every tooth, starting and ending on the same point.
    /// Radii are in unscaled units, angles are counter-clockwise on screen.
    pub fn points_polar(&self) -> Vec<Polar> {
        outline(self.teeth, self.r_inner(), &self.flank, self.base_angle)
    }

    /// [`Gear::points_polar`] in drawing coordinates, centered on the origin
    pub fn points_linear(&self) -> Vec<Point2<f64>> {
        self.points_polar().into_iter().map(polar_to_linear).collect()
    }

    pub fn first_tooth_marker(&self) -> ToothMarker {
        let side = if self.internal { -1.0 } else { 1.0 };
        let a = self.base_angle + self.gear_angle() * (side / 4.0);
        ToothMarker {
            position: polar_to_linear(Polar::new(self.diameter / 2.0, a)),
            size: PI / self.pitch() / 8.0,
        }
    }

    pub fn description(&self) -> String {
        format!(
            "*{} N={} Pitch D={} P={} PA={}",
            self.id,
            self.teeth,
            fix2(self.diameter),
            fix2(self.pitch()),
            fix2(self.pressure_angle.to_degrees().0)
        )
    }

    pub fn description_text_data(&self) -> DescriptionText {
        let height = if self.internal {
            1.0
        } else {
            self.r_inner() / 42.0
        };
        let height = height.min(MAX_TEXT_HEIGHT);
        let radius = if self.internal {
            self.d_outer() / 2.0 + height * 9.0
        } else {
            self.r_inner() - height * 10.0
        };
        DescriptionText { radius, height }
    }

    /// A descriptive base name for files holding this gear
    pub fn file_name(&self) -> String {
        format!(
            "gear N{} D{} P{} PA{} @{}",
            self.teeth,
            fix2(self.diameter),
            fix2(self.pitch()),
            fix2(self.pressure_angle.to_degrees().0),
            fix2(self.scale)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const EPSILON: f64 = 1e-9;

    fn root() -> Gear {
        Gear::new(
            GearParams::new().id("A").teeth(8).pitch(8.0).pressure_angle(25.0),
            None,
        )
        .unwrap()
    }

    fn child(parent: &Gear, params: GearParams) -> Result<Gear, ConfigurationError> {
        Gear::new(params.parent(parent.id()), Some(parent))
    }

    #[test]
    fn test_example_root_and_child() {
        let a = root();
        assert_abs_diff_eq!(a.diameter(), 1.0, epsilon = EPSILON);
        assert_abs_diff_eq!(a.pitch(), 8.0, epsilon = EPSILON);
        assert_abs_diff_eq!(a.pressure_angle().to_degrees().0, 25.0, epsilon = EPSILON);

        let b = child(&a, GearParams::new().teeth(19)).unwrap();
        assert_abs_diff_eq!(b.diameter(), 2.375, epsilon = EPSILON);
        assert_abs_diff_eq!(b.pitch(), 8.0, epsilon = EPSILON);
        // Pressure angle and scale are inherited
        assert_eq!(b.pressure_angle(), a.pressure_angle());
        assert_eq!(b.scale(), DEFAULT_SCALE);
    }

    #[test]
    fn test_pitch_relation_holds() {
        for (n, d, p) in &[
            (Some(10), Some(2.5), None),
            (Some(12), None, Some(6.0)),
            (None, Some(3.0), Some(8.0)),
        ] {
            let mut params = GearParams::new().pressure_angle(20.0);
            params.teeth = *n;
            params.diameter = *d;
            params.pitch = *p;
            let g = Gear::new(params, None).unwrap();
            assert_abs_diff_eq!(g.teeth() as f64 / g.diameter(), g.pitch(), epsilon = EPSILON);
            if let Some(p) = p {
                assert_abs_diff_eq!(g.pitch(), *p, epsilon = EPSILON);
            }
        }
    }

    #[test]
    fn test_d_and_p_give_whole_teeth() {
        let g = Gear::new(GearParams::new().size_dp(3.0, 8.0).pressure_angle(20.0), None).unwrap();
        assert_eq!(g.teeth(), 24);

        let err = Gear::new(GearParams::new().size_dp(1.3, 7.0).pressure_angle(20.0), None)
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::InvalidDimension(_)));
    }

    #[test]
    fn test_overconstrained_root() {
        let err = Gear::new(
            GearParams::new().teeth(10).diameter(2.0).pitch(5.0).pressure_angle(20.0),
            None,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigurationError::Overconstrained(_)));
    }

    #[test]
    fn test_underconstrained_root() {
        let err = Gear::new(GearParams::new().teeth(10).pressure_angle(20.0), None).unwrap_err();
        assert!(matches!(err, ConfigurationError::Underconstrained(_)));

        let err = Gear::new(GearParams::new().size_np(10, 5.0), None).unwrap_err();
        assert!(matches!(err, ConfigurationError::Underconstrained(_)));
    }

    #[test]
    fn test_pressure_angle_range() {
        for pa in &[14.9, 35.1, 0.0, -20.0] {
            let err = Gear::new(GearParams::new().size_np(10, 5.0).pressure_angle(*pa), None)
                .unwrap_err();
            assert_eq!(err, ConfigurationError::Range(*pa));
        }
        for pa in &[15.0, 35.0] {
            assert!(Gear::new(GearParams::new().size_np(10, 5.0).pressure_angle(*pa), None).is_ok());
        }
    }

    #[test]
    fn test_two_internal_gears() {
        let ring = Gear::new(
            GearParams::new().size_np(30, 8.0).pressure_angle(20.0).internal(true),
            None,
        )
        .unwrap();
        let err = child(&ring, GearParams::new().teeth(12).internal(true)).unwrap_err();
        assert!(matches!(err, ConfigurationError::IncompatibleMesh { .. }));
        assert!(child(&ring, GearParams::new().teeth(12)).is_ok());
    }

    #[test]
    fn test_child_scale_rejected() {
        let a = root();
        let err = child(&a, GearParams::new().teeth(12).scale(50.0)).unwrap_err();
        assert!(matches!(err, ConfigurationError::InvalidTopology(_)));
    }

    #[test]
    fn test_root_axle_joint_rejected() {
        let err = Gear::new(
            GearParams::new().size_np(10, 5.0).pressure_angle(20.0).axle_joint(true),
            None,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigurationError::InvalidTopology(_)));
    }

    #[test]
    fn test_meshing_child_inherits() {
        let a = root();
        let err = child(&a, GearParams::new().teeth(12).pressure_angle(20.0)).unwrap_err();
        assert!(matches!(err, ConfigurationError::Overconstrained(_)));
        let err = child(&a, GearParams::new().teeth(12).pitch(4.0)).unwrap_err();
        assert!(matches!(err, ConfigurationError::Overconstrained(_)));
        let err = child(&a, GearParams::new().size_nd(12, 1.5)).unwrap_err();
        assert!(matches!(err, ConfigurationError::Overconstrained(_)));
        let err = child(&a, GearParams::new()).unwrap_err();
        assert!(matches!(err, ConfigurationError::Underconstrained(_)));

        let by_d = child(&a, GearParams::new().diameter(2.0)).unwrap();
        assert_eq!(by_d.teeth(), 16);
    }

    #[test]
    fn test_axle_joint_child() {
        let a = root();
        // Own pitch and pressure angle are allowed on an axle joint
        let g = child(
            &a,
            GearParams::new().size_np(14, 20.0).axle_joint(true).pressure_angle(30.0),
        )
        .unwrap();
        assert_abs_diff_eq!(g.diameter(), 0.7, epsilon = EPSILON);
        assert_abs_diff_eq!(g.pressure_angle().to_degrees().0, 30.0, epsilon = EPSILON);

        // Otherwise they come from the parent
        let g = child(&a, GearParams::new().teeth(16).axle_joint(true)).unwrap();
        assert_abs_diff_eq!(g.diameter(), 2.0, epsilon = EPSILON);
        assert_eq!(g.pressure_angle(), a.pressure_angle());

        let err = child(&a, GearParams::new().axle_joint(true)).unwrap_err();
        assert!(matches!(err, ConfigurationError::Underconstrained(_)));
    }

    #[test]
    fn test_mismatched_parent() {
        let a = root();
        let err = Gear::new(GearParams::new().teeth(12).parent("nope"), Some(&a)).unwrap_err();
        assert!(matches!(err, ConfigurationError::InvalidTopology(_)));
        let err = Gear::new(GearParams::new().teeth(12).parent("A"), None).unwrap_err();
        assert!(matches!(err, ConfigurationError::InvalidTopology(_)));
    }

    #[test]
    fn test_generated_ids_are_unique() {
        let a = Gear::new(GearParams::new().size_np(10, 5.0).pressure_angle(20.0), None).unwrap();
        let b = Gear::new(GearParams::new().size_np(10, 5.0).pressure_angle(20.0), None).unwrap();
        assert_ne!(a.id(), b.id());
        assert_eq!(a.id().len(), 5);
    }

    #[test]
    fn test_dimensions() {
        let a = root();
        assert_abs_diff_eq!(a.d_outer(), 10.0 / 8.0, epsilon = EPSILON);
        assert_abs_diff_eq!(a.d_inner(), 5.7 / 8.0, epsilon = EPSILON);
        assert_abs_diff_eq!(a.r_base(), 0.5 * 25f64.to_radians().cos(), epsilon = EPSILON);
        assert_eq!(a.internal_thickness(), 0.0);
        assert_eq!(a.size(), 125.0);
        // Root gears sit in the middle of their own square
        assert_eq!(a.position(), Point2::new(62.5, 62.5));
        assert_eq!(a.origin(), Point2::new(0.0, 0.0));

        let ring = Gear::new(
            GearParams::new().size_np(20, 10.0).pressure_angle(20.0).internal(true),
            None,
        )
        .unwrap();
        assert_abs_diff_eq!(ring.d_outer(), 2.23, epsilon = EPSILON);
        assert_abs_diff_eq!(ring.d_inner(), 1.8, epsilon = EPSILON);
        assert_abs_diff_eq!(ring.internal_thickness(), 1.0, epsilon = EPSILON);
        // Ring thickness adds to the square
        assert_eq!(ring.size(), (100.0 * (ring.d_outer() + 1.0)).ceil());
        assert!(ring.size() >= 323.0);
    }

    #[test]
    fn test_external_mesh_position() {
        let a = root();
        let b = child(&a, GearParams::new().teeth(16).joint_angle(0.0)).unwrap();
        // Pitch radii 50px and 100px sit side by side along +x
        assert_abs_diff_eq!(b.offset().x, 150.0, epsilon = EPSILON);
        assert_abs_diff_eq!(b.offset().y, 0.0, epsilon = EPSILON);
        assert_abs_diff_eq!(b.position().x, 62.5 + 150.0, epsilon = EPSILON);

        let c = child(&a, GearParams::new().teeth(16).joint_angle(90.0)).unwrap();
        // Positive joint angles point up the screen
        assert_abs_diff_eq!(c.offset().x, 0.0, epsilon = EPSILON);
        assert_abs_diff_eq!(c.offset().y, -150.0, epsilon = EPSILON);
    }

    #[test]
    fn test_internal_link_position() {
        let a = root();
        let ring = child(&a, GearParams::new().teeth(24).internal(true).joint_angle(0.0)).unwrap();
        assert!(ring.is_internal_link());
        // Ring radius 150px minus pinion radius 50px
        assert_abs_diff_eq!(ring.offset().x, 100.0, epsilon = EPSILON);
        assert_abs_diff_eq!(ring.offset().y, 0.0, epsilon = EPSILON);
    }

    #[test]
    fn test_axle_joint_shares_center() {
        let a = root();
        let g = child(&a, GearParams::new().teeth(30).axle_joint(true).joint_angle(45.0)).unwrap();
        assert_eq!(g.position(), a.position());
        assert_eq!(g.offset(), Vector2::zeros());
    }

    #[test]
    fn test_rotation_step() {
        let a = root();
        let b = child(&a, GearParams::new().teeth(16).joint_angle(0.0)).unwrap();
        assert_abs_diff_eq!(a.rotation_from(Degrees(10.0), Degrees(0.0)).0, 70.0, epsilon = EPSILON);
        // 180 - (8/16) * (70 + 0) - 0
        assert_abs_diff_eq!(b.rotation_from(Degrees(0.0), Degrees(70.0)).0, 145.0, epsilon = EPSILON);
    }

    #[test]
    fn test_internal_rotation_parity() {
        let a = root();
        let odd = child(&a, GearParams::new().teeth(25).internal(true).joint_angle(0.0)).unwrap();
        // 8 + 25 is odd: half a tooth of phase
        assert_abs_diff_eq!(
            odd.rotation_from(Degrees(0.0), Degrees(50.0)).0,
            180.0 / 25.0 + 8.0 / 25.0 * 50.0,
            epsilon = EPSILON
        );
        let even = child(&a, GearParams::new().teeth(24).internal(true).joint_angle(0.0)).unwrap();
        assert_abs_diff_eq!(
            even.rotation_from(Degrees(0.0), Degrees(48.0)).0,
            16.0,
            epsilon = EPSILON
        );
    }

    #[test]
    fn test_first_tooth_marker() {
        let a = root();
        let m = a.first_tooth_marker();
        assert_abs_diff_eq!(m.size, PI / 64.0, epsilon = EPSILON);
        assert_abs_diff_eq!(m.position.coords.norm(), 0.5, epsilon = EPSILON);
    }

    #[test]
    fn test_description() {
        let a = root();
        assert_eq!(a.description(), "*A N=8 Pitch D=1 P=8 PA=25");
        let text = a.description_text_data();
        assert_abs_diff_eq!(text.height, a.r_inner() / 42.0, epsilon = EPSILON);
        assert_abs_diff_eq!(text.radius, a.r_inner() - 10.0 * text.height, epsilon = EPSILON);

        let ring = Gear::new(
            GearParams::new().size_np(20, 10.0).pressure_angle(20.0).internal(true),
            None,
        )
        .unwrap();
        let text = ring.description_text_data();
        assert_eq!(text.height, MAX_TEXT_HEIGHT);
        assert_abs_diff_eq!(text.radius, ring.r_outer() + 9.0 * MAX_TEXT_HEIGHT, epsilon = EPSILON);
        assert_eq!(a.file_name(), "gear N8 D1 P8 PA25 @100");
    }
}
