use crate::blocks::Block;
use crate::fonts::FontSet;
use crate::images::ImagePool;
use crate::text::{blank_line_height, build_lines};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MeasuredSize {
    pub height: f32,
    /// Intrinsic width / height, reported for images only.
    pub aspect_ratio: Option<f32>,
    /// Empty space below the block that is not part of its rendered height.
    pub space_after: f32,
}

/// Reports how big a block renders at a given width without placing it.
/// Implementations must return the same answer for the same inputs.
pub trait Measurer {
    fn measure(&self, block: &Block, available_width: f32) -> MeasuredSize;
}

/// Measures text with the document fonts and images by their intrinsic size.
pub(crate) struct DocumentMeasurer<'a> {
    pub(crate) fonts: &'a FontSet,
    pub(crate) images: &'a ImagePool,
}

impl Measurer for DocumentMeasurer<'_> {
    fn measure(&self, block: &Block, available_width: f32) -> MeasuredSize {
        match block {
            Block::Paragraph(text) | Block::Heading(text) => {
                let lines = build_lines(&text.runs, self.fonts, available_width);
                let height = lines.iter().map(|l| l.height).sum::<f32>()
                    + text.blank_lines_after as f32 * blank_line_height(&text.runs, self.fonts);
                MeasuredSize {
                    height,
                    aspect_ratio: None,
                    space_after: 0.0,
                }
            }
            Block::Image(img) => {
                let aspect = self.images.get(img.image).map(|h| h.aspect_ratio());
                MeasuredSize {
                    height: aspect.map_or(0.0, |a| available_width / a),
                    aspect_ratio: aspect,
                    space_after: img.blank_lines_after as f32 * blank_line_height(&[], self.fonts),
                }
            }
            Block::PageBreak => MeasuredSize {
                height: 0.0,
                aspect_ratio: None,
                space_after: 0.0,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::blocks::{ImageBlock, TextBlock};
    use crate::diagram::DiagramRenderer;
    use crate::error::Error;
    use crate::fonts::UsedChars;
    use crate::images::{ImageFormat, ImageId};
    use crate::model::{Form, TextRun};

    struct Wide;

    impl DiagramRenderer for Wide {
        fn render_form(&self, _form: &Form, out: &mut dyn Write) -> Result<ImageFormat, Error> {
            out.write_all(br#"<svg xmlns="http://www.w3.org/2000/svg" width="400" height="100"><rect width="400" height="100"/></svg>"#)?;
            Ok(ImageFormat::Svg)
        }
    }

    fn one_form() -> Vec<Form> {
        vec![Form {
            name: "Main".into(),
            width: 400.0,
            height: 100.0,
            items: vec![],
            diagram: None,
            descriptions: vec![],
        }]
    }

    fn paragraph(text: &str, blank_lines_after: u32) -> Block {
        let mut tb = TextBlock::new(vec![TextRun::plain(text)]);
        tb.blank_lines_after = blank_lines_after;
        Block::Paragraph(tb)
    }

    #[test]
    fn text_height_is_wrapped_lines_plus_blank_lines() {
        let fonts = FontSet::load("Helvetica", &UsedChars::new());
        let pool = ImagePool::generate(&[], &Wide).unwrap();
        assert!(pool.is_empty());
        let measurer = DocumentMeasurer {
            fonts: &fonts,
            images: &pool,
        };
        let text = "several words that will need more than one line at this width";
        let block = paragraph(text, 2);

        let lines = build_lines(&[TextRun::plain(text)], &fonts, 80.0);
        assert!(lines.len() > 1);
        let expected = lines.iter().map(|l| l.height).sum::<f32>()
            + 2.0 * blank_line_height(&[TextRun::plain(text)], &fonts);

        let size = measurer.measure(&block, 80.0);
        assert!((size.height - expected).abs() < 1e-4);
        assert_eq!(size.aspect_ratio, None);
        assert!(measurer.measure(&block, 1000.0).height < size.height);
    }

    #[test]
    fn image_aspect_comes_from_pool() {
        let fonts = FontSet::load("Helvetica", &UsedChars::new());
        let pool = ImagePool::generate(&one_form(), &Wide).unwrap();
        let measurer = DocumentMeasurer {
            fonts: &fonts,
            images: &pool,
        };
        let block = Block::Image(ImageBlock {
            image: ImageId(0),
            blank_lines_after: 2,
            source_form: None,
        });

        let size = measurer.measure(&block, 200.0);
        assert_eq!(size.aspect_ratio, Some(4.0));
        assert!((size.height - 50.0).abs() < 1e-4);
        assert!((size.space_after - 2.0 * blank_line_height(&[], &fonts)).abs() < 1e-4);
    }

    #[test]
    fn measuring_twice_gives_the_same_answer() {
        let fonts = FontSet::load("Helvetica", &UsedChars::new());
        let pool = ImagePool::generate(&one_form(), &Wide).unwrap();
        let measurer = DocumentMeasurer {
            fonts: &fonts,
            images: &pool,
        };
        let blocks = [
            paragraph("some text to wrap around a narrow column", 1),
            Block::Image(ImageBlock {
                image: ImageId(0),
                blank_lines_after: 0,
                source_form: None,
            }),
            Block::PageBreak,
        ];
        for block in &blocks {
            assert_eq!(measurer.measure(block, 120.0), measurer.measure(block, 120.0));
        }
    }
}
