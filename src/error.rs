use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("XML parse error: {0}")]
    Xml(#[from] roxmltree::Error),

    #[error("XML write error: {0}")]
    XmlWrite(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid PPTX: {0}")]
    InvalidPptx(String),

    /// The template has no slide master or no slide layout to work from.
    #[error("template has no slide layouts")]
    NoLayouts,

    /// The placeholder's text body has no paragraph to use as a template.
    #[error("placeholder {slot} has no paragraph to fill")]
    EmptyTextBody { slot: u32 },
}

impl From<quick_xml::Error> for Error {
    fn from(err: quick_xml::Error) -> Self {
        Error::XmlWrite(err.to_string())
    }
}
