use pdf_writer::{Filter, Pdf, Ref};
use resvg::tiny_skia::{Pixmap, Transform};
use resvg::usvg;

use crate::error::Error;
use crate::images::{ImageFormat, ImageHandle};

/// Longest raster side in pixels; larger requests are scaled down.
const MAX_RASTER_SIDE: u32 = 10_000;

struct RasterImage {
    width: u32,
    height: u32,
    rgb: Vec<u8>,
    alpha: Option<Vec<u8>>,
}

/// usvg options with system fonts loaded, so diagram labels render.
pub(super) fn svg_options() -> usvg::Options<'static> {
    let mut opt = usvg::Options::default();
    opt.fontdb_mut().load_system_fonts();
    opt
}

/// Embed `handle` as an image XObject. SVG diagrams are rasterised at `dpi`
/// for a display size of `display_w` x `display_h` points; PNGs are embedded
/// at their native resolution.
pub(super) fn embed_image(
    pdf: &mut Pdf,
    alloc: &mut impl FnMut() -> Ref,
    handle: &ImageHandle,
    display_w: f32,
    display_h: f32,
    dpi: f32,
    svg_opt: &mut Option<usvg::Options<'static>>,
) -> Result<Ref, Error> {
    let raster = match handle.format {
        ImageFormat::Svg => {
            let opt = svg_opt.get_or_insert_with(svg_options);
            rasterize_svg(handle, display_w, display_h, dpi, opt)?
        }
        ImageFormat::Png => decode_png(handle)?,
    };
    log::debug!(
        "Embedding {} as {}x{} px",
        handle.path.display(),
        raster.width,
        raster.height
    );
    Ok(write_xobject(pdf, alloc, &raster))
}

fn raster_size(display_w: f32, display_h: f32, dpi: f32) -> (u32, u32) {
    let scale = dpi / 72.0;
    let mut w = (display_w * scale).ceil().max(1.0) as u32;
    let mut h = (display_h * scale).ceil().max(1.0) as u32;
    let longest = w.max(h);
    if longest > MAX_RASTER_SIDE {
        let f = MAX_RASTER_SIDE as f32 / longest as f32;
        log::warn!("Raster {w}x{h} exceeds {MAX_RASTER_SIDE}px, scaling by {f:.3}");
        w = ((w as f32 * f).round() as u32).max(1);
        h = ((h as f32 * f).round() as u32).max(1);
    }
    (w, h)
}

fn rasterize_svg(
    handle: &ImageHandle,
    display_w: f32,
    display_h: f32,
    dpi: f32,
    opt: &usvg::Options,
) -> Result<RasterImage, Error> {
    let data = std::fs::read(&handle.path)?;
    let tree = usvg::Tree::from_data(&data, opt).map_err(|e| Error::image(&handle.path, e))?;

    let (w, h) = raster_size(display_w, display_h, dpi);
    let mut pixmap = Pixmap::new(w, h)
        .ok_or_else(|| Error::image(&handle.path, format!("cannot allocate {w}x{h} pixmap")))?;

    let size = tree.size();
    let transform = Transform::from_scale(w as f32 / size.width(), h as f32 / size.height());
    resvg::render(&tree, transform, &mut pixmap.as_mut());

    let mut rgb = Vec::with_capacity((w * h * 3) as usize);
    let mut alpha = Vec::with_capacity((w * h) as usize);
    for px in pixmap.pixels() {
        let c = px.demultiply();
        rgb.extend_from_slice(&[c.red(), c.green(), c.blue()]);
        alpha.push(c.alpha());
    }
    let has_alpha = alpha.iter().any(|&a| a < 255);

    Ok(RasterImage {
        width: w,
        height: h,
        rgb,
        alpha: has_alpha.then_some(alpha),
    })
}

fn decode_png(handle: &ImageHandle) -> Result<RasterImage, Error> {
    let rgba = image::open(&handle.path)
        .map_err(|e| Error::image(&handle.path, e))?
        .to_rgba8();
    let (w, h) = (rgba.width(), rgba.height());
    let has_alpha = rgba.pixels().any(|p| p.0[3] < 255);

    let rgb: Vec<u8> = rgba
        .pixels()
        .flat_map(|p| [p.0[0], p.0[1], p.0[2]])
        .collect();
    let alpha = has_alpha.then(|| rgba.pixels().map(|p| p.0[3]).collect());

    Ok(RasterImage {
        width: w,
        height: h,
        rgb,
        alpha,
    })
}

fn write_xobject(pdf: &mut Pdf, alloc: &mut impl FnMut() -> Ref, img: &RasterImage) -> Ref {
    let xobj_ref = alloc();
    let compressed_rgb = miniz_oxide::deflate::compress_to_vec_zlib(&img.rgb, 6);

    let smask_ref = img.alpha.as_ref().map(|alpha| {
        let compressed_alpha = miniz_oxide::deflate::compress_to_vec_zlib(alpha, 6);
        let mask_ref = alloc();
        let mut mask = pdf.image_xobject(mask_ref, &compressed_alpha);
        mask.filter(Filter::FlateDecode);
        mask.width(img.width as i32);
        mask.height(img.height as i32);
        mask.color_space().device_gray();
        mask.bits_per_component(8);
        mask_ref
    });

    let mut xobj = pdf.image_xobject(xobj_ref, &compressed_rgb);
    xobj.filter(Filter::FlateDecode);
    xobj.width(img.width as i32);
    xobj.height(img.height as i32);
    xobj.color_space().device_rgb();
    xobj.bits_per_component(8);
    if let Some(mask_ref) = smask_ref {
        xobj.s_mask(mask_ref);
    }
    xobj_ref
}
