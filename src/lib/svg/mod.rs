//! SVG drawings of single gears and whole gear sets.
use std::io::{Result, Write};

use nalgebra::geometry::Point2;

use crate::fonts::Font;
use crate::geometry::{fix2, fix7};
use crate::{Gear, GearSet};

/// Half the length of each arm of the center cross, in pixels
const CROSS_SIZE: f64 = 8.0;
/// Diameter of the axle hole, in unscaled units
const HOLE_SIZE: f64 = 0.25;

const LINE_STYLE: &str = r##"stroke="#444" stroke-width="0.5" stroke-miterlimit="10""##;

/// A closed circle as path commands, centered on the origin
fn circle_path(r: f64) -> String {
    format!(
        "M{},0a{r},{r} 0 0,1 {},0a{r},{r} 0 0,1 {},0z",
        -r,
        2.0 * r,
        -2.0 * r,
        r = r
    )
}

fn point_list(points: &[Point2<f64>], scale: f64) -> String {
    points
        .iter()
        .map(|p| format!("{},{}", fix7(p.x * scale), fix7(p.y * scale)))
        .collect::<Vec<_>>()
        .join(" ")
}

/// One gear as an `<svg>` element whose viewBox is centered on the gear
fn gear_element(file: &mut dyn Write, gear: &Gear, font: Option<&Font>) -> Result<()> {
    let s = gear.size();
    let scale = gear.scale();
    writeln!(
        file,
        r#"<svg version="1.2" xmlns="http://www.w3.org/2000/svg" x="0px" y="0px" width="{s}px" height="{s}px" viewBox="{} {} {s} {s}" overflow="visible">"#,
        -s / 2.0,
        -s / 2.0,
    )?;

    // Profile, with the ring cut round it for internal gears
    let profile = point_list(&gear.points_linear(), scale);
    let ring = if gear.is_internal() {
        circle_path(s / 2.0)
    } else {
        String::new()
    };
    writeln!(
        file,
        r##"<path class="gear-profile" id="gear-{}" fill="#ddd" fill-rule="evenodd" stroke="#444" stroke-width="1" stroke-miterlimit="10" d="M{profile}{ring}z"/>"##,
        gear.id(),
    )?;

    if !gear.is_axle_joint() {
        writeln!(
            file,
            r#"<g><polyline class="gear-cross" {LINE_STYLE} points="{c},0 -{c},0"/><polyline class="gear-cross" {LINE_STYLE} points="0,{c} 0,-{c}"/></g>"#,
            c = CROSS_SIZE,
        )?;
    }

    let marker = gear.first_tooth_marker();
    writeln!(
        file,
        r##"<circle class="gear-first-tooth-marker" fill="#c00" stroke="none" cx="{}" cy="{}" r="{}"/>"##,
        fix7(marker.position.x * scale),
        fix7(marker.position.y * scale),
        fix7(marker.size * scale),
    )?;

    if let Some(font) = font {
        for line in font.gear_label(gear) {
            writeln!(
                file,
                r##"<polyline class="gear-text" fill="none" stroke="#444" stroke-width="0.5" stroke-linecap="square" stroke-miterlimit="1" points="{}"/>"##,
                point_list(&line, scale),
            )?;
        }
    }

    writeln!(
        file,
        r##"<circle class="gear-hole" fill="none" stroke="#000" r="{}"/>"##,
        fix2(HOLE_SIZE / 2.0 * scale),
    )?;

    writeln!(file, r#"<g class="gear-guides" opacity="0.3">"#)?;
    writeln!(
        file,
        r##"<circle class="gear-guide-pitch" fill="none" stroke="#f00" stroke-miterlimit="10" r="{}"/>"##,
        fix2(gear.r() * scale),
    )?;
    writeln!(
        file,
        r##"<circle class="gear-guide-outer" fill="none" stroke="#aaa" stroke-miterlimit="10" stroke-dasharray="2,2" r="{}"/>"##,
        fix2(gear.r_outer() * scale),
    )?;
    writeln!(
        file,
        r##"<circle class="gear-guide-base" fill="none" stroke="#00f" stroke-miterlimit="10" stroke-dasharray="2,2" r="{}"/>"##,
        fix2(gear.r_base() * scale),
    )?;
    writeln!(file, "</g>")?;

    writeln!(file, "</svg>")
}

/// Write a standalone drawing of one gear, unrotated. The label is only drawn when a font is given.
pub fn write_gear(file: &mut dyn Write, gear: &Gear, font: Option<&Font>) -> Result<()> {
    writeln!(file, r#"<?xml version="1.0" encoding="UTF-8"?>"#)?;
    gear_element(file, gear, font)
}

/// Write every gear of `set` into one drawing, lowest layer first, each turned to the rotation
/// cached by the last [`GearSet::drive`]. `padding` pixels are left round the edge.
pub fn write_gear_set(
    file: &mut dyn Write,
    set: &GearSet,
    padding: f64,
    font: Option<&Font>,
) -> Result<()> {
    let dims = set.dimensions();
    let w = dims.w + padding * 2.0;
    let h = dims.h + padding * 2.0;
    writeln!(file, r#"<?xml version="1.0" encoding="UTF-8"?>"#)?;
    writeln!(
        file,
        r#"<svg version="1.2" xmlns="http://www.w3.org/2000/svg" x="0px" y="0px" width="{w}px" height="{h}px" viewBox="0 0 {w} {h}" xml:space="preserve">"#,
    )?;
    for gear in set.draw_order() {
        let origin = gear.origin();
        let c = gear.size() / 2.0;
        let rot = fix7((gear.rotation() + gear.base_angle()).0);
        writeln!(
            file,
            r#"<g class="gear" id="set-{}" transform="translate({} {}) rotate({rot} {c} {c})">"#,
            gear.id(),
            origin.x + padding,
            origin.y + padding,
        )?;
        gear_element(file, gear, font)?;
        writeln!(file, "</g>")?;
    }
    writeln!(file, "</svg>")
}
