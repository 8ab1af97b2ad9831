//! Image graphics overlays.
//!
//! The reader describes where it found codes as a small SVG document. Only the
//! shapes it emits are supported: lines, rectangles, polygons, polylines,
//! circles and ellipses. Text and anything unknown is skipped.

use image::{Rgba, RgbaImage};
use imageproc::drawing::{
    draw_filled_ellipse_mut, draw_hollow_ellipse_mut, draw_line_segment_mut, draw_polygon_mut,
};
use imageproc::point::Point;
use roxmltree::{Document, Node};

const DEFAULT_STROKE: Rgba<u8> = Rgba([0, 255, 0, 255]);

/// Shapes reaching further than this many target diagonals are skipped
const REACH_IN_DIAGONALS: f32 = 4.0;

#[derive(Debug, thiserror::Error)]
pub enum GraphicsError {
    #[error("XML error: {0}")]
    Xml(#[from] roxmltree::Error),

    #[error("Root element is <{0}>, expected <svg>")]
    NotSvg(String),

    #[error("Invalid canvas size {0}x{1}")]
    InvalidCanvas(f32, f32),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stroke {
    pub color: Rgba<u8>,
    pub width: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    /// Line, rectangle, polygon or polyline, already in target pixels
    Path {
        points: Vec<(f32, f32)>,
        closed: bool,
        stroke: Option<Stroke>,
        fill: Option<Rgba<u8>>,
    },
    Ellipse {
        center: (f32, f32),
        radius: (f32, f32),
        stroke: Option<Stroke>,
        fill: Option<Rgba<u8>>,
    },
}

/// Overlay scaled to a target bitmap, ready to paint
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultGraphics {
    pub shapes: Vec<Shape>,
}

/// Maps SVG user units onto target pixels
#[derive(Debug, Clone, Copy)]
struct Transform {
    origin: (f32, f32),
    scale: (f32, f32),
    /// Largest coordinate or radius magnitude, in target pixels
    reach: f32,
    /// Stroke widths are capped to the target diagonal
    max_stroke: f32,
}

impl Transform {
    fn point(&self, x: f32, y: f32) -> (f32, f32) {
        (
            (x - self.origin.0) * self.scale.0,
            (y - self.origin.1) * self.scale.1,
        )
    }

    fn length(&self, value: f32) -> f32 {
        value * self.scale.0.min(self.scale.1)
    }

    fn stroke_width(&self, value: f32) -> u32 {
        let width = self.length(value);
        if width.is_finite() {
            width.round().clamp(1.0, self.max_stroke) as u32
        } else {
            1
        }
    }

    fn in_reach(&self, value: f32) -> bool {
        value.is_finite() && value.abs() <= self.reach
    }
}

impl Shape {
    /// Whether every coordinate and radius can be painted
    fn fits(&self, transform: &Transform) -> bool {
        let point_fits = |p: &(f32, f32)| transform.in_reach(p.0) && transform.in_reach(p.1);

        match self {
            Shape::Path { points, .. } => points.iter().all(point_fits),
            Shape::Ellipse { center, radius, .. } => point_fits(center) && point_fits(radius),
        }
    }
}

impl ResultGraphics {
    /// Parse an overlay and scale it to a `target` bitmap.
    ///
    /// The overlay canvas comes from `viewBox`, then `width`/`height`, then
    /// `fallback_canvas` (normally the size of the source image).
    pub fn parse(
        svg: &str,
        target: (u32, u32),
        fallback_canvas: (u32, u32),
    ) -> Result<Self, GraphicsError> {
        let doc = Document::parse(svg)?;
        let root = doc.root_element();

        let root_name = root.tag_name().name();
        if root_name != "svg" {
            return Err(GraphicsError::NotSvg(root_name.to_string()));
        }

        let (origin, canvas) = canvas_of(&root, fallback_canvas);
        if canvas.0 <= 0.0 || canvas.1 <= 0.0 {
            return Err(GraphicsError::InvalidCanvas(canvas.0, canvas.1));
        }

        let diagonal = (target.0 as f32).hypot(target.1 as f32).max(1.0);
        let transform = Transform {
            origin,
            scale: (target.0 as f32 / canvas.0, target.1 as f32 / canvas.1),
            reach: diagonal * REACH_IN_DIAGONALS,
            max_stroke: diagonal,
        };

        let shapes = root
            .descendants()
            .filter(|n| n.is_element())
            .filter_map(|n| shape_of(&n, &transform))
            .filter(|shape| {
                let fits = shape.fits(&transform);
                if !fits {
                    tracing::debug!("Skipping out of range overlay shape");
                }
                fits
            })
            .collect();

        Ok(Self { shapes })
    }

    /// Paint every shape onto `image`, in document order
    pub fn paint(&self, image: &mut RgbaImage) {
        for shape in &self.shapes {
            match shape {
                Shape::Path {
                    points,
                    closed,
                    stroke,
                    fill,
                } => {
                    if let (Some(color), true) = (fill, *closed) {
                        fill_polygon(image, points, *color);
                    }
                    if let Some(stroke) = stroke {
                        stroke_path(image, points, *closed, *stroke);
                    }
                }
                Shape::Ellipse {
                    center,
                    radius,
                    stroke,
                    fill,
                } => {
                    let c = (center.0.round() as i32, center.1.round() as i32);
                    let (rx, ry) = (radius.0.round() as i32, radius.1.round() as i32);
                    if rx < 1 || ry < 1 {
                        continue;
                    }
                    if let Some(color) = fill {
                        draw_filled_ellipse_mut(image, c, rx, ry, *color);
                    }
                    if let Some(stroke) = stroke {
                        for offset in stroke_offsets(stroke.width) {
                            let offset = offset.round() as i32;
                            if rx + offset >= 1 && ry + offset >= 1 {
                                draw_hollow_ellipse_mut(
                                    image,
                                    c,
                                    rx + offset,
                                    ry + offset,
                                    stroke.color,
                                );
                            }
                        }
                    }
                }
            }
        }
    }
}

fn canvas_of(root: &Node<'_, '_>, fallback: (u32, u32)) -> ((f32, f32), (f32, f32)) {
    if let Some(view_box) = root.attribute("viewBox") {
        let values = parse_numbers(view_box);
        if let [x, y, w, h] = values[..] {
            return ((x, y), (w, h));
        }
    }

    let width = root.attribute("width").and_then(parse_length);
    let height = root.attribute("height").and_then(parse_length);

    match (width, height) {
        (Some(w), Some(h)) => ((0.0, 0.0), (w, h)),
        _ => ((0.0, 0.0), (fallback.0 as f32, fallback.1 as f32)),
    }
}

fn shape_of(node: &Node<'_, '_>, transform: &Transform) -> Option<Shape> {
    let number = |name: &str| node.attribute(name).and_then(parse_length);

    let (stroke, fill) = paint_of(node, transform);

    match node.tag_name().name() {
        "line" => {
            let from = transform.point(number("x1")?, number("y1")?);
            let to = transform.point(number("x2")?, number("y2")?);
            Some(Shape::Path {
                points: vec![from, to],
                closed: false,
                stroke,
                fill: None,
            })
        }
        "rect" => {
            let (x, y) = (number("x").unwrap_or(0.0), number("y").unwrap_or(0.0));
            let (w, h) = (number("width")?, number("height")?);
            let points = [(x, y), (x + w, y), (x + w, y + h), (x, y + h)]
                .into_iter()
                .map(|(px, py)| transform.point(px, py))
                .collect();
            Some(Shape::Path {
                points,
                closed: true,
                stroke,
                fill,
            })
        }
        name @ ("polygon" | "polyline") => {
            let values = parse_numbers(node.attribute("points")?);
            let points: Vec<(f32, f32)> = values
                .chunks_exact(2)
                .map(|pair| transform.point(pair[0], pair[1]))
                .collect();
            if points.len() < 2 {
                return None;
            }
            let closed = name == "polygon";
            Some(Shape::Path {
                points,
                closed,
                stroke,
                fill: if closed { fill } else { None },
            })
        }
        "circle" => {
            let r = transform.length(number("r")?);
            Some(Shape::Ellipse {
                center: transform.point(number("cx").unwrap_or(0.0), number("cy").unwrap_or(0.0)),
                radius: (r, r),
                stroke,
                fill,
            })
        }
        "ellipse" => {
            let center = transform.point(number("cx").unwrap_or(0.0), number("cy").unwrap_or(0.0));
            let rx = number("rx")? * transform.scale.0;
            let ry = number("ry")? * transform.scale.1;
            Some(Shape::Ellipse {
                center,
                radius: (rx, ry),
                stroke,
                fill,
            })
        }
        _ => None,
    }
}

/// Stroke and fill of an element. Without any paint attribute an element is
/// outlined in the default stroke colour.
fn paint_of(node: &Node<'_, '_>, transform: &Transform) -> (Option<Stroke>, Option<Rgba<u8>>) {
    let stroke_attr = presentation(node, "stroke");
    let fill_attr = presentation(node, "fill");

    let fill = fill_attr.as_deref().and_then(parse_color);

    let stroke_color = match stroke_attr {
        Some(value) => parse_color(&value),
        None if fill.is_some() => None,
        None => Some(DEFAULT_STROKE),
    };

    let stroke = stroke_color.map(|color| {
        let width = presentation(node, "stroke-width")
            .and_then(|w| parse_length(&w))
            .unwrap_or(1.0);
        Stroke {
            color,
            width: transform.stroke_width(width),
        }
    });

    (stroke, fill)
}

/// Presentation value from `style` (which wins) or the attribute itself
fn presentation(node: &Node<'_, '_>, name: &str) -> Option<String> {
    let from_style = node.attribute("style").and_then(|style| {
        style.split(';').find_map(|decl| {
            let (key, value) = decl.split_once(':')?;
            (key.trim() == name).then(|| value.trim().to_string())
        })
    });

    from_style.or_else(|| node.attribute(name).map(|v| v.trim().to_string()))
}

fn parse_length(value: &str) -> Option<f32> {
    value
        .trim()
        .trim_end_matches("px")
        .trim()
        .parse()
        .ok()
        .filter(|v: &f32| v.is_finite())
}

fn parse_numbers(value: &str) -> Vec<f32> {
    value
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse().ok())
        .filter(|v: &f32| v.is_finite())
        .collect()
}

/// `None` for `none`/`transparent`; unknown colours fall back to the default
fn parse_color(value: &str) -> Option<Rgba<u8>> {
    let value = value.trim().to_ascii_lowercase();

    if value == "none" || value == "transparent" {
        return None;
    }

    if let Some(hex) = value.strip_prefix('#') {
        return Some(parse_hex(hex).unwrap_or(DEFAULT_STROKE));
    }

    if let Some(args) = value
        .strip_prefix("rgb(")
        .and_then(|rest| rest.strip_suffix(')'))
    {
        let channels: Vec<u8> = args
            .split(',')
            .filter_map(|c| c.trim().parse::<f32>().ok())
            .map(|c| c.clamp(0.0, 255.0) as u8)
            .collect();
        if let [r, g, b] = channels[..] {
            return Some(Rgba([r, g, b, 255]));
        }
        return Some(DEFAULT_STROKE);
    }

    let rgb = match value.as_str() {
        "black" => [0, 0, 0],
        "white" => [255, 255, 255],
        "red" => [255, 0, 0],
        "green" => [0, 128, 0],
        "lime" => [0, 255, 0],
        "blue" => [0, 0, 255],
        "yellow" => [255, 255, 0],
        "cyan" | "aqua" => [0, 255, 255],
        "magenta" | "fuchsia" => [255, 0, 255],
        "orange" => [255, 165, 0],
        "gray" | "grey" => [128, 128, 128],
        _ => return Some(DEFAULT_STROKE),
    };

    Some(Rgba([rgb[0], rgb[1], rgb[2], 255]))
}

fn parse_hex(hex: &str) -> Option<Rgba<u8>> {
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }

    let expanded: String = match hex.len() {
        3 => hex.chars().flat_map(|c| [c, c]).collect(),
        6 => hex.to_string(),
        _ => return None,
    };

    let channel = |i: usize| u8::from_str_radix(&expanded[i..i + 2], 16).ok();
    Some(Rgba([channel(0)?, channel(2)?, channel(4)?, 255]))
}

/// Offsets, in pixels, of the parallel lines making up a stroke
fn stroke_offsets(width: u32) -> impl Iterator<Item = f32> {
    let half = (width.max(1) - 1) as f32 / 2.0;
    (0..width.max(1)).map(move |i| i as f32 - half)
}

fn stroke_path(image: &mut RgbaImage, points: &[(f32, f32)], closed: bool, stroke: Stroke) {
    let closing = if closed && points.len() > 2 {
        Some((points[points.len() - 1], points[0]))
    } else {
        None
    };

    let segments = points
        .windows(2)
        .map(|pair| (pair[0], pair[1]))
        .chain(closing);

    for (from, to) in segments {
        let (dx, dy) = (to.0 - from.0, to.1 - from.1);
        let length = (dx * dx + dy * dy).sqrt();
        let normal = if length > f32::EPSILON {
            (-dy / length, dx / length)
        } else {
            (0.0, 0.0)
        };

        for offset in stroke_offsets(stroke.width) {
            let (ox, oy) = (normal.0 * offset, normal.1 * offset);
            draw_line_segment_mut(
                image,
                (from.0 + ox, from.1 + oy),
                (to.0 + ox, to.1 + oy),
                stroke.color,
            );
        }
    }
}

fn fill_polygon(image: &mut RgbaImage, points: &[(f32, f32)], color: Rgba<u8>) {
    let mut polygon: Vec<Point<i32>> = Vec::with_capacity(points.len());
    for (x, y) in points {
        let point = Point::new(x.round() as i32, y.round() as i32);
        if polygon.last() != Some(&point) {
            polygon.push(point);
        }
    }

    // imageproc rejects polygons whose first and last points coincide
    while polygon.len() > 1 && polygon.first() == polygon.last() {
        polygon.pop();
    }

    if polygon.len() >= 3 {
        draw_polygon_mut(image, &polygon, color);
    }
}
