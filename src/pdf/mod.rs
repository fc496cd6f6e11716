mod raster;
mod text;

use pdf_writer::{Content, Filter, Name, Pdf, Rect, Ref, TextStr};
use resvg::usvg;

use crate::blocks::Block;
use crate::config::{ExportConfig, ImageAlign};
use crate::error::Error;
use crate::fonts::{EmbeddedFont, FontSet};
use crate::images::ImagePool;
use crate::layout::Layout;
use crate::text::build_lines;

use raster::embed_image;
use text::render_lines;

/// Paint `blocks` at their `layout` positions and serialize the PDF.
/// One page is emitted per page index holding a visible block.
pub(crate) fn render(
    blocks: &[Block],
    layout: &Layout,
    fonts: &FontSet,
    images: &ImagePool,
    config: &ExportConfig,
    title: &str,
) -> Result<Vec<u8>, Error> {
    assert_eq!(
        blocks.len(),
        layout.assignments.len(),
        "layout does not belong to this block stream"
    );
    let t0 = std::time::Instant::now();
    let mut pdf = Pdf::new();
    let mut next_id = 1i32;
    let mut alloc = || {
        let r = Ref::new(next_id);
        next_id += 1;
        r
    };

    let catalog_id = alloc();
    let pages_id = alloc();
    let info_id = alloc();

    // Phase 1: fonts
    let embedded_fonts = fonts.embed(&mut pdf, &mut alloc);
    let t_fonts = t0.elapsed();

    // Phase 2: page content streams
    let (page_width, page_height) = config.page_size.dimensions();
    let n = layout.page_count;
    let pages = paint_pages(
        &mut pdf,
        &mut alloc,
        blocks,
        layout,
        fonts,
        &embedded_fonts,
        images,
        config,
    )?;
    let image_count: usize = pages.iter().map(|p| p.images.len()).sum();
    let t_layout = t0.elapsed();

    // Phase 3: allocate page and content IDs now that page count is known
    let page_ids: Vec<Ref> = (0..n).map(|_| alloc()).collect();
    let content_ids: Vec<Ref> = (0..n).map(|_| alloc()).collect();

    let mut page_images = Vec::with_capacity(n);
    for (i, page) in pages.into_iter().enumerate() {
        page_images.push(page.images);
        let raw = page.content.finish();
        let compressed = miniz_oxide::deflate::compress_to_vec_zlib(raw.as_slice(), 6);
        pdf.stream(content_ids[i], &compressed).filter(Filter::FlateDecode);
    }

    pdf.catalog(catalog_id).pages(pages_id);
    pdf.pages(pages_id)
        .kids(page_ids.iter().copied())
        .count(n as i32);

    {
        let mut info = pdf.document_info(info_id);
        if !title.is_empty() {
            info.title(TextStr(title));
        }
        info.producer(TextStr(concat!("prototyper-pdf ", env!("CARGO_PKG_VERSION"))));
    }

    for i in 0..n {
        let mut page = pdf.page(page_ids[i]);
        page.media_box(Rect::new(0.0, 0.0, page_width, page_height))
            .parent(pages_id)
            .contents(content_ids[i]);
        let mut resources = page.resources();
        {
            let mut font_dict = resources.fonts();
            for f in &embedded_fonts {
                font_dict.pair(Name(f.pdf_name.as_bytes()), f.font_ref);
            }
        }
        if !page_images[i].is_empty() {
            let mut xobjects = resources.x_objects();
            for (name, xobj_ref) in &page_images[i] {
                xobjects.pair(Name(name.as_bytes()), *xobj_ref);
            }
        }
    }

    let t_assembly = t0.elapsed();
    log::info!(
        "Render phases: fonts={:.1}ms, pages={:.1}ms, assembly={:.1}ms ({} pages, {} images)",
        t_fonts.as_secs_f64() * 1000.0,
        (t_layout - t_fonts).as_secs_f64() * 1000.0,
        (t_assembly - t_layout).as_secs_f64() * 1000.0,
        n,
        image_count,
    );

    Ok(pdf.finish())
}

/// Content stream and image resources of one page.
struct PageContent {
    content: Content,
    images: Vec<(String, Ref)>,
}

/// Paint every block into the content stream of its assigned page. Images
/// are written to `pdf` as they are met and named `Im1`, `Im2`, ... in
/// document order.
#[allow(clippy::too_many_arguments)]
fn paint_pages(
    pdf: &mut Pdf,
    alloc: &mut impl FnMut() -> Ref,
    blocks: &[Block],
    layout: &Layout,
    fonts: &FontSet,
    embedded_fonts: &[EmbeddedFont],
    images: &ImagePool,
    config: &ExportConfig,
) -> Result<Vec<PageContent>, Error> {
    let (_, page_height) = config.page_size.dimensions();
    let body = config.page_body();
    let body_top = page_height - config.margin;

    let mut pages: Vec<PageContent> = (0..layout.page_count)
        .map(|_| PageContent {
            content: Content::new(),
            images: Vec::new(),
        })
        .collect();
    let mut image_count = 0usize;
    let mut svg_opt: Option<usvg::Options<'static>> = None;

    for (block, a) in blocks.iter().zip(&layout.assignments) {
        let slot_top = body_top - a.y_offset;
        match block {
            Block::PageBreak => continue,
            Block::Paragraph(tb) | Block::Heading(tb) => {
                // Same width the blocks were measured at, so the same lines.
                let lines = build_lines(&tb.runs, fonts, body.width);
                let page = &mut pages[a.page_index];
                render_lines(&mut page.content, &lines, config.margin, slot_top, embedded_fonts);
            }
            Block::Image(ib) => {
                let handle = images
                    .get(ib.image)
                    .ok_or_else(|| Error::MissingDiagram(format!("image #{}", ib.image.0)))?;
                let (w, h) = (a.rendered_width, a.rendered_height);
                let xobj_ref = embed_image(pdf, alloc, handle, w, h, config.dpi, &mut svg_opt)?;
                image_count += 1;
                let pdf_name = format!("Im{image_count}");

                let x = config.margin
                    + match config.image_align {
                        ImageAlign::Left => 0.0,
                        ImageAlign::Center => (body.width - w).max(0.0) / 2.0,
                    };
                let page = &mut pages[a.page_index];
                page.content.save_state();
                page.content.transform([w, 0.0, 0.0, h, x, slot_top - h]);
                page.content.x_object(Name(pdf_name.as_bytes()));
                page.content.restore_state();
                page.images.push((pdf_name, xobj_ref));
            }
        }
    }
    Ok(pages)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::blocks::{ImageBlock, TextBlock};
    use crate::diagram::DiagramRenderer;
    use crate::fonts::UsedChars;
    use crate::images::{ImageFormat, ImageId};
    use crate::layout::LayoutAssignment;
    use crate::model::{Form, TextRun};

    struct Square;

    impl DiagramRenderer for Square {
        fn render_form(&self, _form: &Form, out: &mut dyn Write) -> Result<ImageFormat, Error> {
            out.write_all(
                br#"<svg xmlns="http://www.w3.org/2000/svg" width="20" height="10"><rect width="20" height="10"/></svg>"#,
            )?;
            Ok(ImageFormat::Svg)
        }
    }

    fn form(name: &str) -> Form {
        Form {
            name: name.into(),
            width: 20.0,
            height: 10.0,
            items: vec![],
            diagram: None,
            descriptions: vec![],
        }
    }

    fn at(page_index: usize, y_offset: f32, rendered_height: f32) -> LayoutAssignment {
        LayoutAssignment {
            page_index,
            y_offset,
            rendered_height,
            rendered_width: 2.0 * rendered_height,
        }
    }

    fn contains(haystack: &[u8], needle: &[u8]) -> bool {
        haystack.windows(needle.len()).any(|w| w == needle)
    }

    #[test]
    fn blocks_land_on_their_assigned_pages() {
        let fonts = FontSet::load("Helvetica", &UsedChars::new());
        let pool = ImagePool::generate(&[form("A"), form("B")], &Square).unwrap();
        let heading = |t: &str| Block::Heading(TextBlock::new(vec![TextRun::plain(t)]));
        let image = |i: usize| {
            Block::Image(ImageBlock {
                image: ImageId(i),
                blank_lines_after: 0,
                source_form: None,
            })
        };
        let blocks = vec![
            heading("A"),
            image(0),
            Block::PageBreak,
            heading("B"),
            image(1),
        ];
        let layout = Layout {
            assignments: vec![
                at(0, 0.0, 20.0),
                at(0, 20.0, 50.0),
                at(1, 0.0, 0.0),
                at(1, 0.0, 20.0),
                at(1, 20.0, 50.0),
            ],
            page_count: 2,
        };
        let config = ExportConfig {
            dpi: 72.0,
            ..ExportConfig::default()
        };

        let mut pdf = Pdf::new();
        let mut next_id = 1;
        let mut alloc = || {
            next_id += 1;
            Ref::new(next_id)
        };
        let embedded = fonts.embed(&mut pdf, &mut alloc);
        let pages = paint_pages(
            &mut pdf, &mut alloc, &blocks, &layout, &fonts, &embedded, &pool, &config,
        )
        .unwrap();

        assert_eq!(pages.len(), 2);
        let names: Vec<Vec<&str>> = pages
            .iter()
            .map(|p| p.images.iter().map(|(n, _)| n.as_str()).collect())
            .collect();
        assert_eq!(names, vec![vec!["Im1"], vec!["Im2"]]);

        let streams: Vec<Vec<u8>> = pages
            .into_iter()
            .map(|p| p.content.finish().as_slice().to_vec())
            .collect();
        assert!(contains(&streams[0], b"(A) Tj"));
        assert!(contains(&streams[0], b"/Im1 Do"));
        assert!(!contains(&streams[0], b"(B) Tj"));
        assert!(contains(&streams[1], b"(B) Tj"));
        assert!(contains(&streams[1], b"/Im2 Do"));
        assert!(!contains(&streams[1], b"/Im1"));
    }

    #[test]
    fn image_is_anchored_at_top_of_its_slot() {
        let fonts = FontSet::load("Helvetica", &UsedChars::new());
        let pool = ImagePool::generate(&[form("A")], &Square).unwrap();
        let blocks = vec![Block::Image(ImageBlock {
            image: ImageId(0),
            blank_lines_after: 0,
            source_form: None,
        })];
        let layout = Layout {
            assignments: vec![at(0, 100.0, 50.0)],
            page_count: 1,
        };
        let config = ExportConfig {
            page_size: crate::config::PageSize::Custom {
                width: 400.0,
                height: 600.0,
            },
            margin: 50.0,
            dpi: 72.0,
            ..ExportConfig::default()
        };

        let mut pdf = Pdf::new();
        let mut next_id = 1;
        let mut alloc = || {
            next_id += 1;
            Ref::new(next_id)
        };
        let embedded = fonts.embed(&mut pdf, &mut alloc);
        let pages = paint_pages(
            &mut pdf, &mut alloc, &blocks, &layout, &fonts, &embedded, &pool, &config,
        )
        .unwrap();

        // top of body 550, slot top 450, image 100x50 so its bottom is 400.
        let stream = pages.into_iter().next().unwrap().content.finish().as_slice().to_vec();
        assert!(contains(&stream, b"100 0 0 50 50 400 cm"));
    }
}
