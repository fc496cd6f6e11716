#![allow(dead_code)]

use std::io::Write;

use prototyper_pdf::Error;
use prototyper_pdf::blocks::Block;
use prototyper_pdf::diagram::DiagramRenderer;
use prototyper_pdf::images::ImageFormat;
use prototyper_pdf::measure::{MeasuredSize, Measurer};
use prototyper_pdf::model::{Description, Form, Project, StyledText, TextRun};

pub const HEADING_HEIGHT: f32 = 30.0;
pub const LINE_HEIGHT: f32 = 20.0;
pub const CHARS_PER_LINE: usize = 60;
pub const IMAGE_ASPECT: f32 = 1.5;

/// Fixed heights: headings 30pt, paragraphs 20pt per 60 characters,
/// images 3:2 followed by 20pt per blank line.
pub struct FixtureMeasurer;

impl Measurer for FixtureMeasurer {
    fn measure(&self, block: &Block, available_width: f32) -> MeasuredSize {
        match block {
            Block::Heading(_) => MeasuredSize {
                height: HEADING_HEIGHT,
                aspect_ratio: None,
                space_after: 0.0,
            },
            Block::Paragraph(tb) => {
                let chars: usize = tb.runs.iter().map(|r| r.text.chars().count()).sum();
                let lines = chars.div_ceil(CHARS_PER_LINE).max(1);
                MeasuredSize {
                    height: lines as f32 * LINE_HEIGHT,
                    aspect_ratio: None,
                    space_after: 0.0,
                }
            }
            Block::Image(img) => MeasuredSize {
                height: available_width / IMAGE_ASPECT,
                aspect_ratio: Some(IMAGE_ASPECT),
                space_after: img.blank_lines_after as f32 * LINE_HEIGHT,
            },
            Block::PageBreak => MeasuredSize {
                height: 0.0,
                aspect_ratio: None,
                space_after: 0.0,
            },
        }
    }
}

/// Writes a 300x200 SVG box for every form.
pub struct BoxRenderer;

impl DiagramRenderer for BoxRenderer {
    fn render_form(&self, _form: &Form, out: &mut dyn Write) -> Result<ImageFormat, Error> {
        out.write_all(
            br##"<svg xmlns="http://www.w3.org/2000/svg" width="300" height="200" viewBox="0 0 300 200"><rect x="10" y="10" width="280" height="180" fill="none" stroke="#000"/></svg>"##,
        )?;
        Ok(ImageFormat::Svg)
    }
}

/// Fails on the form named `name`, succeeds like `BoxRenderer` otherwise.
pub struct FailingRenderer {
    pub name: &'static str,
}

impl DiagramRenderer for FailingRenderer {
    fn render_form(&self, form: &Form, out: &mut dyn Write) -> Result<ImageFormat, Error> {
        if form.name == self.name {
            return Err(Error::Io(std::io::Error::other("renderer crashed")));
        }
        BoxRenderer.render_form(form, out)
    }
}

pub fn styled(text: &str) -> StyledText {
    StyledText {
        runs: vec![TextRun::plain(text)],
    }
}

pub fn form(name: &str, descriptions: &[(&str, &str)]) -> Form {
    Form {
        name: name.to_string(),
        width: 300.0,
        height: 200.0,
        items: Vec::new(),
        diagram: None,
        descriptions: descriptions
            .iter()
            .map(|(id, text)| Description {
                id: id.to_string(),
                text: styled(text),
            })
            .collect(),
    }
}

pub fn project(forms: Vec<Form>) -> Project {
    Project {
        name: "Fixture".to_string(),
        description: StyledText::default(),
        forms,
    }
}

/// Page count from the page tree's `/Count` entry.
pub fn pdf_page_count(pdf: &[u8]) -> Option<usize> {
    let text = String::from_utf8_lossy(pdf);
    let at = text.find("/Count ")?;
    text[at + 7..]
        .split(|c: char| !c.is_ascii_digit())
        .next()?
        .parse()
        .ok()
}
