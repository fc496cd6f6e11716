use crate::layout::PageBody;

/// Points per centimetre.
pub const PT_PER_CM: f32 = 72.0 / 2.54;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum PageSize {
    #[default]
    A4,
    A5,
    Letter,
    Legal,
    Custom {
        width: f32,
        height: f32,
    },
}

impl PageSize {
    /// Returns (width, height) in points.
    pub fn dimensions(&self) -> (f32, f32) {
        match self {
            PageSize::A4 => (595.28, 841.89),
            PageSize::A5 => (419.53, 595.28),
            PageSize::Letter => (612.0, 792.0),
            PageSize::Legal => (612.0, 1008.0),
            PageSize::Custom { width, height } => (*width, *height),
        }
    }
}

/// Horizontal placement of diagrams narrower than the page body.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum ImageAlign {
    #[default]
    Left,
    Center,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ExportConfig {
    pub page_size: PageSize,
    /// Symmetric margin on all four sides, in points.
    pub margin: f32,
    /// Resolution diagrams are rasterised at.
    pub dpi: f32,
    pub font_family: String,
    pub image_align: ImageAlign,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            page_size: PageSize::A4,
            margin: 2.0 * PT_PER_CM,
            dpi: 300.0,
            font_family: "Helvetica".to_string(),
            image_align: ImageAlign::Left,
        }
    }
}

impl ExportConfig {
    pub fn page_body(&self) -> PageBody {
        let (w, h) = self.page_size.dimensions();
        PageBody {
            width: (w - 2.0 * self.margin).max(1.0),
            height: (h - 2.0 * self.margin).max(1.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_body_is_a4_minus_two_cm() {
        let body = ExportConfig::default().page_body();
        assert!((body.width - (595.28 - 4.0 * PT_PER_CM)).abs() < 1e-3);
        assert!((body.height - (841.89 - 4.0 * PT_PER_CM)).abs() < 1e-3);
    }
}
