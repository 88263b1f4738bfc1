#![doc = include_str!("../README.md")]

pub mod config;
pub mod error;
pub mod labels;
pub mod model;
pub mod prediction;
pub mod preprocess;

use std::path::Path;

pub use config::{Config, Layout};
pub use error::PredictError;
pub use labels::Emotion;
pub use model::Classifier;
pub use prediction::{Outcome, Prediction};
pub use preprocess::ImageTensor;

/// Classify the emotion shown in the image at `image_path`.
///
/// Runs the whole pipeline once: check the path, load the model, preprocess
/// the image, run a forward pass and pick the most likely label.
pub fn predict(image_path: Option<&Path>, config: &Config) -> Result<Prediction, PredictError> {
    let image_path = image_path.ok_or(PredictError::MissingImagePath)?;

    if !image_path.exists() {
        return Err(PredictError::ImageNotFound(image_path.to_path_buf()));
    }

    let mut classifier = Classifier::load(config)?;
    tracing::debug!("{}", classifier);

    let img = ImageTensor::open(image_path, config.input_size)?;
    tracing::debug!("Input tensor shape: {:?}", img.shape());
    let scores = classifier.infer(&img)?;

    let prediction = Prediction::from_scores(&scores)?;
    tracing::info!(
        "Predicted {} ({:.1}%)",
        prediction.label,
        prediction.confidence * 100.0
    );

    Ok(prediction)
}
