use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("XML parse error: {0}")]
    Xml(#[from] roxmltree::Error),

    #[error("invalid project: {0}")]
    InvalidProject(String),

    #[error("no diagram image was generated for form \"{0}\"")]
    MissingDiagram(String),

    #[error("text block without runs in {0}")]
    EmptyTextBlock(String),

    #[error("image error in {path}: {message}")]
    Image { path: PathBuf, message: String },
}

impl Error {
    pub(crate) fn image(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Error::Image {
            path: path.into(),
            message: message.to_string(),
        }
    }
}
