use std::path::PathBuf;

pub const DEFAULT_FONT_SIZE: f32 = 12.0;

#[derive(Clone, Debug, PartialEq)]
pub struct TextRun {
    pub text: String,
    pub size: f32, // points
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
}

impl TextRun {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            size: DEFAULT_FONT_SIZE,
            bold: false,
            italic: false,
            underline: false,
        }
    }

    /// Copy of this run's styling carrying different text.
    pub fn with_text(&self, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..self.clone()
        }
    }
}

/// Styled text attached to a form (or to the whole project). Runs may contain
/// newlines; each line becomes its own paragraph in the exported document.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StyledText {
    pub runs: Vec<TextRun>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Description {
    pub id: String,
    pub text: StyledText,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

/// Drawable object placed on a form, in form-local units (1 unit = 1pt at 72 dpi).
#[derive(Clone, Debug, PartialEq)]
pub enum FormItem {
    Line {
        from: Point,
        to: Point,
    },
    Polyline {
        points: Vec<Point>,
        closed: bool,
    },
    Rect {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    },
    Label {
        origin: Point, // baseline start
        run: TextRun,
    },
    SpinBox {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        value: String,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct Form {
    pub name: String,
    pub width: f32,
    pub height: f32,
    pub items: Vec<FormItem>,
    /// Pre-rendered diagram (SVG or PNG) used instead of drawing `items`.
    pub diagram: Option<PathBuf>,
    pub descriptions: Vec<Description>,
}

impl Form {
    /// The description whose identifier matches the form's own name.
    pub fn primary_description(&self) -> Option<&Description> {
        self.descriptions.iter().find(|d| d.id == self.name)
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Project {
    pub name: String,
    pub description: StyledText,
    pub forms: Vec<Form>,
}
