//! The flat block stream a project is exported as.
//!
//! Each form contributes, in order: a page break, a heading with the form
//! name, the form's diagram, its primary description (the one named after the
//! form) and then every other description under its own smaller heading.

use crate::error::Error;
use crate::images::{ImageId, ImagePool};
use crate::model::{Project, StyledText, TextRun};

pub const HEADING_SIZE: f32 = 20.0;
pub const SUBHEADING_SIZE: f32 = 15.0;
/// Blank lines separating a diagram from the description below it.
pub const DIAGRAM_DESCRIPTION_GAP: u32 = 2;

/// Index of the originating form in `Project::forms`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FormId(pub usize);

#[derive(Clone, Debug, PartialEq)]
pub struct TextBlock {
    pub runs: Vec<TextRun>,
    /// Empty lines following the block, sized by its last run.
    pub blank_lines_after: u32,
    pub source_form: Option<FormId>,
}

impl TextBlock {
    pub fn new(runs: Vec<TextRun>) -> Self {
        Self {
            runs,
            blank_lines_after: 0,
            source_form: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ImageBlock {
    pub image: ImageId,
    /// Empty lines between the image and the next block, in the document's
    /// body text size.
    pub blank_lines_after: u32,
    pub source_form: Option<FormId>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Block {
    Paragraph(TextBlock),
    Heading(TextBlock),
    Image(ImageBlock),
    PageBreak,
}

impl Block {
    pub fn text(&self) -> Option<&TextBlock> {
        match self {
            Block::Paragraph(t) | Block::Heading(t) => Some(t),
            _ => None,
        }
    }

    /// Whether the block paints anything. Page breaks only move the cursor.
    pub fn is_visible(&self) -> bool {
        !matches!(self, Block::PageBreak)
    }
}

/// Turn a project into its block stream. Every form must have a generated
/// image in `images`.
pub fn build_blocks(project: &Project, images: &ImagePool) -> Result<Vec<Block>, Error> {
    let mut blocks = Vec::new();

    push_paragraphs(&mut blocks, &project.description, None);

    for (i, form) in project.forms.iter().enumerate() {
        let form_id = FormId(i);
        let image = images
            .image_for_form(i)
            .ok_or_else(|| Error::MissingDiagram(form.name.clone()))?;

        blocks.push(Block::PageBreak);
        blocks.push(heading(&form.name, HEADING_SIZE, false, form_id));
        let primary = form.primary_description();
        blocks.push(Block::Image(ImageBlock {
            image,
            blank_lines_after: if primary.is_some() {
                DIAGRAM_DESCRIPTION_GAP
            } else {
                0
            },
            source_form: Some(form_id),
        }));

        if let Some(desc) = primary {
            push_paragraphs(&mut blocks, &desc.text, Some(form_id));
        }

        for desc in &form.descriptions {
            if primary.is_some_and(|p| std::ptr::eq(p, desc)) {
                continue;
            }
            blocks.push(heading(&desc.id, SUBHEADING_SIZE, true, form_id));
            push_paragraphs(&mut blocks, &desc.text, Some(form_id));
        }
    }

    validate_blocks(&blocks)?;
    log::debug!(
        "Built {} blocks from {} forms",
        blocks.len(),
        project.forms.len()
    );
    Ok(blocks)
}

fn heading(text: &str, size: f32, italic: bool, form: FormId) -> Block {
    Block::Heading(TextBlock {
        runs: vec![TextRun {
            text: text.to_string(),
            size,
            bold: true,
            italic,
            underline: false,
        }],
        blank_lines_after: 1,
        source_form: Some(form),
    })
}

/// Split styled text at newlines into paragraph blocks. Empty lines become
/// `blank_lines_after` of the paragraph before them, and the last paragraph
/// is followed by at least one blank line.
fn push_paragraphs(blocks: &mut Vec<Block>, text: &StyledText, form: Option<FormId>) {
    let first = blocks.len();
    let mut current: Vec<TextRun> = Vec::new();

    let flush = |current: &mut Vec<TextRun>, blocks: &mut Vec<Block>| {
        let runs = std::mem::take(current);
        if runs.iter().any(|r| !r.text.trim().is_empty()) {
            blocks.push(Block::Paragraph(TextBlock {
                runs,
                blank_lines_after: 0,
                source_form: form,
            }));
        } else if blocks.len() > first
            && let Some(Block::Paragraph(prev)) = blocks.last_mut()
        {
            prev.blank_lines_after += 1;
        }
    };

    for run in &text.runs {
        let mut pieces = run.text.split('\n').peekable();
        while let Some(piece) = pieces.next() {
            if !piece.is_empty() {
                current.push(run.with_text(piece));
            }
            if pieces.peek().is_some() {
                flush(&mut current, blocks);
            }
        }
    }
    flush(&mut current, blocks);

    if blocks.len() > first
        && let Some(Block::Paragraph(last)) = blocks.last_mut()
    {
        last.blank_lines_after = last.blank_lines_after.max(1);
    }
}

/// Reject block streams layout cannot handle: text blocks without runs.
pub fn validate_blocks(blocks: &[Block]) -> Result<(), Error> {
    for (i, block) in blocks.iter().enumerate() {
        if let Some(text) = block.text()
            && text.runs.is_empty()
        {
            return Err(Error::EmptyTextBlock(format!("block {i}")));
        }
    }
    Ok(())
}
