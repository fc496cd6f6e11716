use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::diagram::DiagramRenderer;
use crate::error::Error;
use crate::model::Form;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImageFormat {
    Svg,
    Png,
}

impl ImageFormat {
    fn extension(self) -> &'static str {
        match self {
            ImageFormat::Svg => "svg",
            ImageFormat::Png => "png",
        }
    }

    /// Sniff the format from file content, falling back to the extension.
    pub fn detect(path: &Path, head: &[u8]) -> Option<Self> {
        if head.starts_with(b"\x89PNG\r\n\x1a\n") {
            return Some(ImageFormat::Png);
        }
        let trimmed = head
            .iter()
            .position(|b| !b.is_ascii_whitespace())
            .map_or(&head[..0], |i| &head[i..]);
        if trimmed.starts_with(b"<") {
            return Some(ImageFormat::Svg);
        }
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref()
        {
            Some("svg") => Some(ImageFormat::Svg),
            Some("png") => Some(ImageFormat::Png),
            _ => None,
        }
    }
}

/// Index of an image inside its `ImagePool`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ImageId(pub usize);

#[derive(Clone, Debug)]
pub struct ImageHandle {
    pub path: PathBuf,
    pub format: ImageFormat,
    /// Intrinsic size in the image's own units (SVG user units or PNG pixels).
    pub width: f32,
    pub height: f32,
}

impl ImageHandle {
    pub fn aspect_ratio(&self) -> f32 {
        self.width / self.height
    }
}

/// Diagram images generated for one export, one per form in form order.
/// Backing files live in a temporary directory removed when the pool drops,
/// so a failing export still cleans up.
pub struct ImagePool {
    dir: TempDir,
    images: Vec<ImageHandle>,
}

impl ImagePool {
    /// Render every form once through `renderer` into a fresh temporary directory.
    pub fn generate(forms: &[Form], renderer: &dyn DiagramRenderer) -> Result<Self, Error> {
        let dir = tempfile::Builder::new()
            .prefix("prototyper-pdf-")
            .tempdir()?;
        let mut pool = ImagePool {
            dir,
            images: Vec::with_capacity(forms.len()),
        };
        for (i, form) in forms.iter().enumerate() {
            let staging = pool.dir.path().join(format!("form-{i}.tmp"));
            let format = {
                let mut out = BufWriter::new(File::create(&staging)?);
                let format = renderer.render_form(form, &mut out)?;
                out.flush()?;
                format
            };
            let path = pool
                .dir
                .path()
                .join(format!("form-{i}.{}", format.extension()));
            std::fs::rename(&staging, &path)?;

            let (width, height) = intrinsic_size(&path, format)?;
            if !(width > 0.0 && height > 0.0) {
                return Err(Error::image(&path, "image has an empty size"));
            }
            log::debug!(
                "Generated diagram for form \"{}\": {:?} {width}x{height}",
                form.name,
                format
            );
            pool.images.push(ImageHandle {
                path,
                format,
                width,
                height,
            });
        }
        Ok(pool)
    }

    /// Image generated for the form at `form_index`.
    pub fn image_for_form(&self, form_index: usize) -> Option<ImageId> {
        (form_index < self.images.len()).then_some(ImageId(form_index))
    }

    pub fn get(&self, id: ImageId) -> Option<&ImageHandle> {
        self.images.get(id.0)
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    /// Remove the backing directory now, reporting failures instead of
    /// ignoring them as drop does.
    pub fn close(self) -> Result<(), Error> {
        log::debug!("Releasing {} temporary images", self.images.len());
        self.dir.close()?;
        Ok(())
    }
}

fn intrinsic_size(path: &Path, format: ImageFormat) -> Result<(f32, f32), Error> {
    match format {
        ImageFormat::Svg => {
            let data = std::fs::read(path)?;
            let tree = resvg::usvg::Tree::from_data(&data, &resvg::usvg::Options::default())
                .map_err(|e| Error::image(path, e))?;
            let size = tree.size();
            Ok((size.width(), size.height()))
        }
        ImageFormat::Png => {
            let (w, h) = image::image_dimensions(path).map_err(|e| Error::image(path, e))?;
            Ok((w as f32, h as f32))
        }
    }
}
