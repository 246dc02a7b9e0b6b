use thiserror::Error;

use std::io::Error as IOError;
use std::path::PathBuf;

#[derive(Debug, Error)]
pub enum LprError {
    #[error("io error: {0}")]
    IOError(#[from] IOError),

    #[error("image error: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("cannot parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Config(String),

    #[error("tensorflow error: {0}")]
    TensorflowError(String),

    #[error("recognizer error: {0}")]
    Recognizer(String),

    #[error("{}: {}", .path.display(), .source)]
    InImage {
        path: PathBuf,
        #[source]
        source: Box<LprError>,
    },
}

impl LprError {
    /// Attach the image file being read to an error.
    pub fn in_image(self, path: impl Into<PathBuf>) -> Self {
        Self::InImage {
            path: path.into(),
            source: Box::new(self),
        }
    }
}

#[cfg(feature = "tensorflow")]
impl From<tensorflow::Status> for LprError {
    fn from(e: tensorflow::Status) -> Self {
        Self::TensorflowError(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, LprError>;
