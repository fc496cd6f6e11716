use std::fmt::Write as _;
use std::io::Write;

use crate::error::Error;
use crate::images::ImageFormat;
use crate::model::{Form, FormItem, Point};

/// Produces the image of a form's diagram. Called exactly once per form,
/// before any layout happens.
pub trait DiagramRenderer {
    fn render_form(&self, form: &Form, out: &mut dyn Write) -> Result<ImageFormat, Error>;
}

/// Draws form items as SVG at 72 user units per inch. A form that names a
/// pre-rendered diagram file gets that file copied through unchanged.
pub struct SvgDiagramRenderer {
    pub stroke: String,
    pub stroke_width: f32,
    pub font_family: String,
}

impl Default for SvgDiagramRenderer {
    fn default() -> Self {
        Self {
            stroke: "#000000".to_string(),
            stroke_width: 1.0,
            font_family: "sans-serif".to_string(),
        }
    }
}

impl DiagramRenderer for SvgDiagramRenderer {
    fn render_form(&self, form: &Form, out: &mut dyn Write) -> Result<ImageFormat, Error> {
        if let Some(src) = &form.diagram {
            let data = std::fs::read(src).map_err(|e| {
                Error::Io(std::io::Error::new(
                    e.kind(),
                    format!("{}: {}", e, src.display()),
                ))
            })?;
            let format = ImageFormat::detect(src, &data[..data.len().min(64)])
                .ok_or_else(|| Error::image(src, "unrecognised diagram format"))?;
            out.write_all(&data)?;
            return Ok(format);
        }

        out.write_all(self.form_svg(form).as_bytes())?;
        Ok(ImageFormat::Svg)
    }
}

impl SvgDiagramRenderer {
    pub fn form_svg(&self, form: &Form) -> String {
        let mut svg = String::new();
        let _ = write!(
            svg,
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w:.2}\" height=\"{h:.2}\" viewBox=\"0 0 {w:.2} {h:.2}\">",
            w = form.width,
            h = form.height
        );
        let _ = write!(
            svg,
            "<rect x=\"0\" y=\"0\" width=\"{:.2}\" height=\"{:.2}\" fill=\"#ffffff\"/>",
            form.width, form.height
        );
        let _ = write!(
            svg,
            "<g fill=\"none\" stroke=\"{}\" stroke-width=\"{:.2}\">",
            self.stroke, self.stroke_width
        );
        for item in &form.items {
            self.item_svg(item, &mut svg);
        }
        svg.push_str("</g></svg>");
        svg
    }

    fn item_svg(&self, item: &FormItem, svg: &mut String) {
        match item {
            FormItem::Line { from, to } => {
                let _ = write!(
                    svg,
                    "<line x1=\"{:.2}\" y1=\"{:.2}\" x2=\"{:.2}\" y2=\"{:.2}\"/>",
                    from.x, from.y, to.x, to.y
                );
            }
            FormItem::Polyline { points, closed } => {
                let tag = if *closed { "polygon" } else { "polyline" };
                let _ = write!(svg, "<{tag} points=\"{}\"/>", points_attr(points));
            }
            FormItem::Rect {
                x,
                y,
                width,
                height,
            } => {
                let _ = write!(
                    svg,
                    "<rect x=\"{x:.2}\" y=\"{y:.2}\" width=\"{width:.2}\" height=\"{height:.2}\"/>"
                );
            }
            FormItem::Label { origin, run } => {
                let mut style = format!("font-size:{:.1}px", run.size);
                if run.bold {
                    style.push_str(";font-weight:bold");
                }
                if run.italic {
                    style.push_str(";font-style:italic");
                }
                if run.underline {
                    style.push_str(";text-decoration:underline");
                }
                let _ = write!(
                    svg,
                    "<text x=\"{:.2}\" y=\"{:.2}\" stroke=\"none\" fill=\"{}\" font-family=\"{}\" style=\"{}\">{}</text>",
                    origin.x,
                    origin.y,
                    self.stroke,
                    escape_xml(&self.font_family),
                    style,
                    escape_xml(&run.text)
                );
            }
            FormItem::SpinBox {
                x,
                y,
                width,
                height,
                value,
            } => self.spinbox_svg(*x, *y, *width, *height, value, svg),
        }
    }

    /// Rounded box with the value right-aligned and up/down arrows in a
    /// button column three quarters of the box height wide.
    fn spinbox_svg(&self, x: f32, y: f32, w: f32, h: f32, value: &str, svg: &mut String) {
        let button_w = h * 0.75;
        let left_x = x + w - button_w;
        let mid_y = y + h / 2.0;
        let _ = write!(
            svg,
            "<rect x=\"{x:.2}\" y=\"{y:.2}\" width=\"{w:.2}\" height=\"{h:.2}\" rx=\"2\" ry=\"2\"/>"
        );
        let _ = write!(
            svg,
            "<line x1=\"{left_x:.2}\" y1=\"{y:.2}\" x2=\"{left_x:.2}\" y2=\"{:.2}\"/>",
            y + h
        );
        let up = [
            Point { x: left_x + 5.0, y: mid_y - 2.5 },
            Point { x: left_x + button_w - 5.0, y: mid_y - 2.5 },
            Point { x: left_x + button_w / 2.0, y: y + 5.0 },
        ];
        let down = [
            Point { x: left_x + 5.0, y: mid_y + 2.5 },
            Point { x: left_x + button_w - 5.0, y: mid_y + 2.5 },
            Point { x: left_x + button_w / 2.0, y: y + h - 5.0 },
        ];
        for arrow in [up, down] {
            let _ = write!(
                svg,
                "<polygon points=\"{}\" fill=\"{}\"/>",
                points_attr(&arrow),
                self.stroke
            );
        }
        let _ = write!(
            svg,
            "<text x=\"{:.2}\" y=\"{:.2}\" stroke=\"none\" fill=\"{}\" font-family=\"{}\" font-size=\"10\" text-anchor=\"end\" dominant-baseline=\"central\">{}</text>",
            left_x - 5.0,
            mid_y,
            self.stroke,
            escape_xml(&self.font_family),
            escape_xml(value)
        );
    }
}

fn points_attr(points: &[Point]) -> String {
    points
        .iter()
        .map(|p| format!("{:.2},{:.2}", p.x, p.y))
        .collect::<Vec<_>>()
        .join(" ")
}

fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
