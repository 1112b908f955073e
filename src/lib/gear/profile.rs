//! Involute tooth profile, traced by unrolling a taut line off the base circle.
use tracing::trace;

use crate::geometry::{linear_to_polar, polar_to_linear, Degrees, Polar};

/// The unrolled angle the trace gives up at, in degrees
const MAX_UNROLL: f64 = 100.0;
/// Step used until the trace reaches the root circle, in degrees
const COARSE_STEP: f64 = 0.1;
/// Bisections allowed when the trace overshoots the tip
const MAX_REFINEMENTS: u32 = 10;

#[derive(Clone, Copy, Debug)]
pub(crate) struct Radii {
    pub base: f64,
    pub inner: f64,
    pub pitch: f64,
    pub outer: f64,
}

#[derive(Clone, Debug)]
pub(crate) struct Trace {
    /// Leading flank, from the root circle out to a point clamped onto the outer circle
    pub flank: Vec<Polar>,
    /// Angle of the last traced point inside the pitch circle
    pub pitch_angle: Degrees,
}

/// Trace one leading flank. Returns `None` if the trace never reached the outer radius.
pub(crate) fn trace_flank(teeth: u32, radii: Radii) -> Option<Trace> {
    let mut flank = Vec::new();
    let mut pitch_angle = Degrees(0.0);

    let mut i = 1.0;
    let mut step = COARSE_STEP;
    let mut first = true;
    let mut refinements = 0;
    while i < MAX_UNROLL {
        // Point on the base circle, plus the length of line unrolled to get there
        let on_base = polar_to_linear(Polar::new(radii.base, Degrees(-i)));
        let len = Degrees(i * radii.base).to_radians().0;
        let unrolled = polar_to_linear(Polar::new(len, Degrees(90.0 - i)));
        let mut np = linear_to_polar(on_base + unrolled.coords);

        if np.r >= radii.inner {
            if first {
                first = false;
                step = (2.0 / teeth as f64) * 10.0;
            }
            if np.r < radii.pitch {
                pitch_angle = np.a;
            }
            if np.r > radii.outer {
                refinements += 1;
                if refinements < MAX_REFINEMENTS {
                    trace!(i, step, r = np.r, "overshot the tip, backing off");
                    i -= step;
                    step /= 2.0;
                    i += step;
                    continue;
                }
                np.r = radii.outer;
                flank.push(np);
                return Some(Trace { flank, pitch_angle });
            }
            flank.push(np);
        }
        i += step;
    }
    None
}

/// Mirror a traced flank into a whole tooth and repeat it around the gear.
///
/// The first tooth is symmetric about `pitch_angle + gear_angle / 4`; the first point sits on the
/// root circle and is repeated at the end to close the outline.
///
/// Flank points past the tooth's midline are dropped. When the two flanks cross inside the outer
/// circle the tooth comes to a point there, and the clamped tip at `r_outer` is not drawn.
pub(crate) fn outline(teeth: u32, r_inner: f64, flank: &[Polar], pitch_angle: Degrees) -> Vec<Polar> {
    let gear_angle = Degrees(360.0 / teeth as f64);
    let mirror_angle = gear_angle / 2.0 + pitch_angle * 2.0;
    let first_angle = if (gear_angle - mirror_angle).0 > 0.0 {
        Degrees(0.0)
    } else {
        -(gear_angle - mirror_angle) / 2.0
    };

    let mut half = Vec::with_capacity(flank.len() + 1);
    half.push(Polar::new(r_inner, first_angle));
    half.extend_from_slice(flank);
    // Drop anything past the middle of the tooth
    while half.len() > 1 && half[half.len() - 1].a > mirror_angle / 2.0 {
        half.pop();
    }

    let tooth: Vec<Polar> = half
        .iter()
        .copied()
        .chain(
            half.iter()
                .rev()
                .map(|p| Polar::new(p.r, mirror_angle - p.a)),
        )
        .collect();

    let mut points = Vec::with_capacity(tooth.len() * teeth as usize + 1);
    for n in 0..teeth {
        let turn = gear_angle * n as f64;
        points.extend(tooth.iter().map(|p| Polar::new(p.r, p.a + turn)));
    }
    points.push(half[0]);
    points
}
