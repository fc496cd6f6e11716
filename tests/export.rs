mod common;

use std::fs;

use common::{BoxRenderer, FailingRenderer, FixtureMeasurer, form, project, styled};
use prototyper_pdf::blocks::{Block, DIAGRAM_DESCRIPTION_GAP, build_blocks};
use prototyper_pdf::diagram::SvgDiagramRenderer;
use prototyper_pdf::images::{ImageFormat, ImagePool};
use prototyper_pdf::layout::paginate;
use prototyper_pdf::{Error, ExportConfig, ImageAlign};

fn kinds(blocks: &[Block]) -> Vec<&'static str> {
    blocks
        .iter()
        .map(|b| match b {
            Block::PageBreak => "break",
            Block::Heading(_) => "heading",
            Block::Image(_) => "image",
            Block::Paragraph(_) => "paragraph",
        })
        .collect()
}

#[test]
fn three_forms_start_three_pages() {
    let project = project(vec![
        form("Login", &[("Login", "Enter credentials.")]),
        form("Search", &[("Search", "Find things.")]),
        form("Results", &[("Results", "Browse hits.")]),
    ]);
    let pool = ImagePool::generate(&project.forms, &BoxRenderer).expect("generate");
    let blocks = build_blocks(&project, &pool).expect("blocks");
    assert_eq!(
        kinds(&blocks),
        [
            "break", "heading", "image", "paragraph", //
            "break", "heading", "image", "paragraph", //
            "break", "heading", "image", "paragraph",
        ]
    );

    let layout = paginate(&blocks, &FixtureMeasurer, ExportConfig::default().page_body());
    assert_eq!(layout.page_count, 3);
    for (form_index, chunk) in layout.assignments.chunks(4).enumerate() {
        for a in chunk {
            assert_eq!(a.page_index, form_index);
        }
        assert_eq!(chunk[1].y_offset, 0.0, "heading of form {form_index} not at top");
    }
}

#[test]
fn description_starts_below_the_diagram_gap() {
    let project = project(vec![form("Login", &[("Login", "Enter credentials.")])]);
    let pool = ImagePool::generate(&project.forms, &BoxRenderer).expect("generate");
    let blocks = build_blocks(&project, &pool).expect("blocks");
    let Block::Image(img_block) = &blocks[2] else {
        panic!("expected image, got {:?}", blocks[2]);
    };
    assert_eq!(img_block.blank_lines_after, DIAGRAM_DESCRIPTION_GAP);

    let layout = paginate(&blocks, &FixtureMeasurer, ExportConfig::default().page_body());
    let (img, para) = (layout.assignments[2], layout.assignments[3]);
    assert_eq!(para.page_index, img.page_index);
    let gap = para.y_offset - (img.y_offset + img.rendered_height);
    assert!(
        (gap - DIAGRAM_DESCRIPTION_GAP as f32 * common::LINE_HEIGHT).abs() < 1e-3,
        "gap between diagram and description is {gap}"
    );
}

#[test]
fn form_without_descriptions_has_no_paragraph() {
    let project = project(vec![form("Empty", &[])]);
    let pool = ImagePool::generate(&project.forms, &BoxRenderer).expect("generate");
    let blocks = build_blocks(&project, &pool).expect("blocks");
    assert_eq!(kinds(&blocks), ["break", "heading", "image"]);
    let Block::Image(img) = &blocks[2] else {
        panic!("expected image, got {:?}", blocks[2]);
    };
    assert_eq!(img.blank_lines_after, 0);
}

#[test]
fn secondary_descriptions_get_their_own_heading() {
    let project = project(vec![form(
        "Editor",
        &[("Toolbar", "Icons."), ("Editor", "Main view.")],
    )]);
    let pool = ImagePool::generate(&project.forms, &BoxRenderer).expect("generate");
    let blocks = build_blocks(&project, &pool).expect("blocks");
    assert_eq!(
        kinds(&blocks),
        ["break", "heading", "image", "paragraph", "heading", "paragraph"]
    );
    let primary = blocks[3].text().unwrap();
    assert_eq!(primary.runs[0].text, "Main view.");
    let sub = blocks[4].text().unwrap();
    assert_eq!(sub.runs[0].text, "Toolbar");
    assert!(sub.runs[0].bold && sub.runs[0].italic);
}

#[test]
fn project_description_comes_first() {
    let mut project = project(vec![form("Only", &[])]);
    project.description = styled("Overview\nSecond line");
    let pool = ImagePool::generate(&project.forms, &BoxRenderer).expect("generate");
    let blocks = build_blocks(&project, &pool).expect("blocks");
    assert_eq!(
        kinds(&blocks),
        ["paragraph", "paragraph", "break", "heading", "image"]
    );
    let layout = paginate(&blocks, &FixtureMeasurer, ExportConfig::default().page_body());
    assert_eq!(layout.assignments[3].page_index, 1);
    assert_eq!(layout.page_count, 2);
}

#[test]
fn overflowing_paragraph_still_renders() {
    let long = "lorem ipsum dolor sit amet ".repeat(1500);
    let project = project(vec![form("Overview", &[("Overview", long.as_str())])]);
    let pdf = prototyper_pdf::render_pdf(&project, &BoxRenderer, &ExportConfig::default())
        .expect("render");
    assert!(pdf.starts_with(b"%PDF"));
    assert_eq!(common::pdf_page_count(&pdf), Some(2));
}

#[test]
fn missing_image_is_reported() {
    let project = project(vec![form("A", &[]), form("B", &[])]);
    let pool = ImagePool::generate(&project.forms[..1], &BoxRenderer).expect("generate");
    match build_blocks(&project, &pool) {
        Err(Error::MissingDiagram(name)) => assert_eq!(name, "B"),
        other => panic!("expected MissingDiagram, got {other:?}"),
    }
}

#[test]
fn renderer_failure_aborts_export() {
    let tmp = tempfile::tempdir().unwrap();
    let out = tmp.path().join("out.pdf");
    let project = project(vec![form("A", &[]), form("B", &[])]);
    let result = prototyper_pdf::export_with_renderer(
        &project,
        &FailingRenderer { name: "B" },
        &out,
        &ExportConfig::default(),
    );
    assert!(matches!(result, Err(Error::Io(_))));
    assert!(!out.exists());
}

#[test]
fn pool_directory_is_removed() {
    let project = project(vec![form("A", &[])]);

    let pool = ImagePool::generate(&project.forms, &BoxRenderer).expect("generate");
    assert_eq!(pool.len(), 1);
    let dir = pool.dir().to_path_buf();
    assert!(dir.join("form-0.svg").is_file());
    drop(pool);
    assert!(!dir.exists());

    let pool = ImagePool::generate(&project.forms, &BoxRenderer).expect("generate");
    let dir = pool.dir().to_path_buf();
    pool.close().expect("close");
    assert!(!dir.exists());
}

#[test]
fn prerendered_png_is_used_as_is() {
    let tmp = tempfile::tempdir().unwrap();
    let png = tmp.path().join("mock.png");
    image::RgbaImage::from_pixel(40, 20, image::Rgba([200, 30, 30, 255]))
        .save(&png)
        .unwrap();

    let mut f = form("Mock", &[("Mock", "Drawn elsewhere.")]);
    f.diagram = Some(png);
    let project = project(vec![f]);

    let renderer = SvgDiagramRenderer::default();
    let pool = ImagePool::generate(&project.forms, &renderer).expect("generate");
    let handle = pool.get(pool.image_for_form(0).unwrap()).unwrap();
    assert_eq!(handle.format, ImageFormat::Png);
    assert_eq!((handle.width, handle.height), (40.0, 20.0));
    assert_eq!(handle.aspect_ratio(), 2.0);

    let config = ExportConfig {
        image_align: ImageAlign::Center,
        ..ExportConfig::default()
    };
    let pdf = prototyper_pdf::render_pdf(&project, &renderer, &config).expect("render");
    assert_eq!(common::pdf_page_count(&pdf), Some(1));
}

#[test]
fn project_file_exports_to_pdf() {
    let _ = env_logger::try_init();
    let tmp = tempfile::tempdir().unwrap();
    let input = tmp.path().join("shop.xml");
    fs::write(
        &input,
        r#"<project name="Shop">
  <description><text style="bold">Web shop</text><text> prototype</text></description>
  <form tabName="Cart" width="320" height="240">
    <rect x="10" y="10" width="300" height="40"/>
    <label x="20" y="35" size="14">Your cart</label>
    <spinbox x="20" y="60" width="80" height="24" value="2"/>
    <desc id="Cart"><text>Lists the items.</text></desc>
  </form>
  <form tabName="Checkout">
    <line x1="0" y1="0" x2="100" y2="100"/>
    <polyline points="0,0 50,20 100,0" closed="true"/>
  </form>
</project>"#,
    )
    .unwrap();
    let output = tmp.path().join("shop.pdf");

    prototyper_pdf::export_project_file(&input, &output, &ExportConfig::default())
        .expect("export");

    let pdf = fs::read(&output).unwrap();
    assert!(pdf.starts_with(b"%PDF"));
    assert_eq!(common::pdf_page_count(&pdf), Some(3));
    let text = String::from_utf8_lossy(&pdf);
    assert!(text.contains("/XObject"));
}
