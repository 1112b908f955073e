//! Single-stroke SVG fonts, and laying text out along an arc for gear labels.
use std::collections::HashMap;
use std::fs::read_to_string;
use std::path::Path;

use nalgebra::geometry::Point2;
use roxmltree::{Document, Node, ParsingOptions};
use thiserror::Error;
use tracing::debug;

use crate::geometry::{polar_to_linear, Degrees, Polar};
use crate::Gear;

/// Layout grid units in one em. Label heights are given per grid unit.
pub const EM_GRID: f64 = 8.0;
/// Extra space between letters of a gear label, in em
const LABEL_SPACING: f64 = 0.1;
/// Advance for a space when the font has no glyph for it, in em
const DEFAULT_SPACE: f64 = 0.5;

#[derive(Debug, Error)]
pub enum FontError {
    #[error("failed to read font: {0}")]
    Io(#[from] std::io::Error),
    #[error("font is not valid XML: {0}")]
    Xml(#[from] roxmltree::Error),
    #[error("font is missing {0}")]
    Missing(String),
    #[error("bad value {value:?} for {what}")]
    BadValue { what: String, value: String },
}

pub struct Font {
    glyphs: HashMap<char, Glyph>,
}

/// A glyph's strokes and advance, in em. y grows upwards from the baseline.
struct Glyph {
    strokes: Vec<Vec<Point2<f64>>>,
    width: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum MoveType {
    Move,
    Line,
}

/// Text turned into strokes, in em, starting at x = 0.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ShapedText {
    pub lines: Vec<Vec<Point2<f64>>>,
    pub advance: f64,
}

impl Font {
    pub fn new_from_svg(path: &Path) -> Result<Self, FontError> {
        Self::from_svg_str(&read_to_string(path)?)
    }

    pub fn from_svg_str(data: &str) -> Result<Self, FontError> {
        parse_svg_xml_font(data)
    }

    /// Lay `s` out left to right, with `spacing` em between letters. Characters the font doesn't
    /// have are skipped.
    pub fn shape(&self, s: &str, spacing: f64) -> ShapedText {
        let mut shaped = ShapedText::default();
        let mut x_off = 0.0;
        for c in s.chars() {
            let glyph = match self.glyphs.get(&c) {
                Some(glyph) => glyph,
                None if c == ' ' => {
                    x_off += DEFAULT_SPACE + spacing;
                    continue;
                }
                None => {
                    debug!(?c, "no glyph, skipping");
                    continue;
                }
            };
            for stroke in &glyph.strokes {
                shaped
                    .lines
                    .push(stroke.iter().map(|p| Point2::new(p.x + x_off, p.y)).collect());
            }
            x_off += glyph.width + spacing;
        }
        shaped.advance = if x_off > 0.0 { x_off - spacing } else { 0.0 };
        shaped
    }

    /// The gear's description, bent round the arc given by its description text data
    pub fn gear_label(&self, gear: &Gear) -> Vec<Vec<Point2<f64>>> {
        let placement = gear.description_text_data();
        polar_text(
            &self.shape(&gear.description(), LABEL_SPACING),
            placement.radius,
            placement.height,
        )
    }
}

/// Bend shaped text round a circle, centered on angle zero and reading clockwise, with the tops
/// of letters pointing outwards. `radius` is the baseline, `height` the size of one grid unit.
/// Strokes are subdivided at every grid unit so long lines follow the curve.
pub fn polar_text(text: &ShapedText, radius: f64, height: f64) -> Vec<Vec<Point2<f64>>> {
    // Degrees per grid unit along the baseline
    let plot = height * 180.0 / (radius * std::f64::consts::PI);
    let center = text.advance * EM_GRID * plot / 2.0;
    let place = |p: Point2<f64>| {
        polar_to_linear(Polar::new(
            radius + p.y * EM_GRID * height,
            Degrees(center - p.x * EM_GRID * plot),
        ))
    };

    text.lines
        .iter()
        .filter(|line| !line.is_empty())
        .map(|line| {
            let mut points = vec![place(line[0])];
            for pair in line.windows(2) {
                let d = pair[1] - pair[0];
                let steps = (d.norm() * EM_GRID).ceil().max(1.0) as usize;
                for s in 1..=steps {
                    let t = s as f64 / steps as f64;
                    points.push(place(pair[0] + d * t));
                }
            }
            points
        })
        .collect()
}

fn number(node: Node, name: &str) -> Result<f64, FontError> {
    let value = node
        .attribute(name)
        .ok_or_else(|| FontError::Missing(format!("attribute {name} on <{}>", node.tag_name().name())))?;
    value.trim().parse::<f64>().map_err(|_| FontError::BadValue {
        what: name.to_string(),
        value: value.to_string(),
    })
}

/// Parse a path made of M and L commands into strokes, scaled by `1 / units_per_em`
fn parse_path(d: &str, units_per_em: f64) -> Result<Vec<Vec<Point2<f64>>>, FontError> {
    let mut strokes: Vec<Vec<Point2<f64>>> = Vec::new();
    let mut move_type = MoveType::Move;
    let mut x: Option<f64> = None;
    for entry in d.split(|c: char| c.is_whitespace() || c == ',') {
        match entry {
            "" => continue,
            "M" => move_type = MoveType::Move,
            "L" => move_type = MoveType::Line,
            _ => {
                let v = entry.parse::<f64>().map_err(|_| FontError::BadValue {
                    what: "glyph path".into(),
                    value: entry.to_string(),
                })?;
                match x.take() {
                    None => x = Some(v),
                    Some(px) => {
                        let p = Point2::new(px / units_per_em, v / units_per_em);
                        match (move_type, strokes.last_mut()) {
                            (MoveType::Line, Some(stroke)) => stroke.push(p),
                            _ => strokes.push(vec![p]),
                        }
                        // Further pairs after an M are implicit line-tos
                        move_type = MoveType::Line;
                    }
                }
            }
        }
    }
    Ok(strokes)
}

fn parse_svg_xml_font(data: &str) -> Result<Font, FontError> {
    let doc = Document::parse_with_options(
        data,
        ParsingOptions {
            allow_dtd: true,
            ..Default::default()
        },
    )?;

    let face = doc
        .descendants()
        .find(|n| n.is_element() && n.tag_name().name() == "font-face")
        .ok_or_else(|| FontError::Missing("<font-face>".into()))?;
    let units_per_em = number(face, "units-per-em")?;
    if units_per_em <= 0.0 {
        return Err(FontError::BadValue {
            what: "units-per-em".into(),
            value: units_per_em.to_string(),
        });
    }

    let mut glyphs = HashMap::new();
    for n in doc
        .descendants()
        .filter(|n| n.is_element() && n.tag_name().name() == "glyph")
    {
        // <glyph unicode="L" horiz-adv-x="500" d="M 100 700 L 100 0 L 400 0" />
        let name = match n.attribute("unicode").and_then(|u| u.chars().next()) {
            Some(c) => c,
            None => continue,
        };
        let strokes = match n.attribute("d") {
            Some(d) => parse_path(d, units_per_em)?,
            None => Vec::new(),
        };
        let width = number(n, "horiz-adv-x")? / units_per_em;
        glyphs.insert(name, Glyph { strokes, width });
    }

    Ok(Font { glyphs })
}
