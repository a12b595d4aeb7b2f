//! SVG preview of the rendered trail segments.
//!
//! Each arrow line becomes a `<path>` stroked with the slope color ramp
//! (white at 0 %, yellow at 5 %, red at 10 % and above) and the segment's
//! opacity. Labels become `<text>` elements at their anchor points.
//!
//! Longitude/latitude are mapped onto a pixel grid with north up, using a
//! plain equirectangular scale. This is a preview, not a map projection.
//!
//! This is a pure function with no I/O -- it returns a `String`.

use geo::{BoundingRect, Coord, LineString, MultiLineString, Rect};
use svg::Document;
use svg::node::element::path::Data;
use svg::node::element::{Description, Element, Path, Title};
use svg::node::{Node, Text, Value};

use trailslope_pipeline::RenderCollections;

/// Width of the preview in pixels; height follows the data's aspect.
const DOCUMENT_WIDTH_PX: f64 = 1000.0;
/// Blank border around the data, in pixels.
const MARGIN_PX: f64 = 20.0;

/// Metadata to embed in the SVG document.
///
/// Text values are XML-escaped automatically by the `svg` crate.
#[derive(Debug, Clone, Default)]
pub struct SvgMetadata<'a> {
    /// Document title, emitted as `<title>`.
    pub title: Option<&'a str>,

    /// Document description, emitted as `<desc>`.
    pub description: Option<&'a str>,

    /// Analyzer configuration JSON, embedded in `<metadata>` so a preview
    /// records the settings that produced it.
    pub config_json: Option<&'a str>,
}

/// Stroke color for a slope in percent.
///
/// Interpolates white → yellow over 0–5 % and yellow → red over 5–10 %;
/// values outside the ramp clamp to its ends.
#[must_use]
pub fn slope_color(slope_percent: f64) -> String {
    let t = slope_percent.clamp(0.0, 10.0);
    let (green, blue) = if t <= 5.0 {
        (1.0, 1.0 - t / 5.0)
    } else {
        (1.0 - (t - 5.0) / 5.0, 0.0)
    };
    format!("#ff{:02x}{:02x}", channel(green), channel(blue))
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn channel(fraction: f64) -> u8 {
    (fraction.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Maps lng/lat into preview pixels.
struct Frame {
    west: f64,
    north: f64,
    scale: f64,
    width: f64,
    height: f64,
}

impl Frame {
    fn around(bounds: Rect<f64>) -> Self {
        let span_x = bounds.width();
        let span_y = bounds.height();
        let span = span_x.max(span_y);
        let scale = if span > 0.0 {
            2.0f64.mul_add(-MARGIN_PX, DOCUMENT_WIDTH_PX) / span
        } else {
            1.0
        };
        Self {
            west: bounds.min().x,
            north: bounds.max().y,
            scale,
            width: 2.0f64.mul_add(MARGIN_PX, span_x * scale),
            height: 2.0f64.mul_add(MARGIN_PX, span_y * scale),
        }
    }

    fn project(&self, c: Coord<f64>) -> (f64, f64) {
        (
            (c.x - self.west).mul_add(self.scale, MARGIN_PX),
            (self.north - c.y).mul_add(self.scale, MARGIN_PX),
        )
    }

    fn path_data(&self, line: &LineString<f64>) -> Option<String> {
        let (first, rest) = line.0.split_first()?;
        if rest.is_empty() {
            return None;
        }
        let mut data = Data::new().move_to(self.project(*first));
        for c in rest {
            data = data.line_to(self.project(*c));
        }
        Some(String::from(Value::from(data)))
    }
}

/// Render a preview of the line and label collections.
///
/// Returns a document with no content beyond its metadata when
/// `collections` is empty.
#[must_use]
pub fn to_svg(collections: &RenderCollections, metadata: &SvgMetadata<'_>) -> String {
    let all_lines = MultiLineString::new(
        collections
            .lines
            .iter()
            .flat_map(|line| line.geometry.0.iter().cloned())
            .collect(),
    );
    let frame = all_lines.bounding_rect().map_or(
        Frame {
            west: 0.0,
            north: 0.0,
            scale: 1.0,
            width: DOCUMENT_WIDTH_PX,
            height: DOCUMENT_WIDTH_PX,
        },
        Frame::around,
    );

    let mut doc = Document::new()
        .set("width", frame.width)
        .set("height", frame.height)
        .set("viewBox", (0.0, 0.0, frame.width, frame.height));

    if let Some(title) = metadata.title {
        doc = doc.add(Title::new(title));
    }
    if let Some(description) = metadata.description {
        doc = doc.add(Description::new().add(Text::new(description)));
    }
    if let Some(config_json) = metadata.config_json {
        let mut config_el = Element::new("trailslope:config");
        config_el.assign("xmlns:trailslope", "https://trailslope.dev/ns/1");
        config_el.append(Text::new(config_json));
        let mut metadata_el = Element::new("metadata");
        metadata_el.append(config_el);
        doc = doc.add(metadata_el);
    }

    let mut background = Element::new("rect");
    background.assign("width", "100%");
    background.assign("height", "100%");
    background.assign("fill", "#404040");
    doc = doc.add(background);

    for line in &collections.lines {
        let color = slope_color(line.properties.slope);
        for part in &line.geometry {
            let Some(d) = frame.path_data(part) else {
                continue;
            };
            let path = Path::new()
                .set("d", d)
                .set("fill", "none")
                .set("stroke", color.as_str())
                .set("stroke-opacity", line.properties.opacity)
                .set("stroke-width", 2)
                .set("stroke-linecap", "round");
            doc = doc.add(path);
        }
    }

    for label in &collections.labels {
        let (x, y) = frame.project(label.geometry.0);
        let mut text = Element::new("text");
        text.assign("x", x);
        text.assign("y", y);
        text.assign("font-size", 11);
        text.assign("fill", "white");
        text.assign("text-anchor", "middle");
        text.append(Text::new(format!(
            "{} {}",
            label.properties.slope_label, label.properties.elevation_delta_label
        )));
        doc = doc.add(text);
    }

    // The svg crate omits the XML declaration, so we prepend it.
    format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{doc}\n")
}
