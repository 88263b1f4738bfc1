use std::path::PathBuf;

use thiserror::Error;

/// Everything that can stop a prediction. Callers only ever see the message,
/// but each failure keeps its own variant.
#[derive(Debug, Error)]
pub enum PredictError {
    #[error("No image path provided")]
    MissingImagePath,

    #[error("{0}")]
    Usage(String),

    #[error("Image file not found: {}", .0.display())]
    ImageNotFound(PathBuf),

    #[error("Unable to load model from {}: {source}", .path.display())]
    ModelLoad {
        path: PathBuf,
        #[source]
        source: ort::Error,
    },

    #[error("Cannot decode image {}: {source}", .path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Inference failed: {0}")]
    Inference(String),
}

impl PredictError {
    /// Short tag for the failure kind, used in diagnostics only.
    pub fn kind(&self) -> &'static str {
        match self {
            PredictError::MissingImagePath | PredictError::Usage(_) => "usage",
            PredictError::ImageNotFound(_) => "not_found",
            PredictError::ModelLoad { .. } => "load",
            PredictError::Decode { .. } => "decode",
            PredictError::Inference(_) => "inference",
        }
    }
}

impl From<ort::Error> for PredictError {
    fn from(error: ort::Error) -> Self {
        PredictError::Inference(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        assert_eq!(
            PredictError::MissingImagePath.to_string(),
            "No image path provided"
        );
        assert_eq!(
            PredictError::ImageNotFound(PathBuf::from("missing.jpg")).to_string(),
            "Image file not found: missing.jpg"
        );
        assert_eq!(
            PredictError::Inference("no output".into()).to_string(),
            "Inference failed: no output"
        );
    }

    #[test]
    fn test_kind() {
        assert_eq!(PredictError::MissingImagePath.kind(), "usage");
        assert_eq!(PredictError::Usage("bad flag".into()).kind(), "usage");
        assert_eq!(
            PredictError::ImageNotFound(PathBuf::from("x.png")).kind(),
            "not_found"
        );
        assert_eq!(PredictError::Inference(String::new()).kind(), "inference");
    }
}
