use std::fmt;
use std::path::PathBuf;

use ort::{
    session::{builder::GraphOptimizationLevel, Session},
    value::Value,
};
use tracing::{debug, info};

use crate::config::{Config, Layout};
use crate::error::PredictError;
use crate::preprocess::ImageTensor;

/// Pre-trained emotion classifier backed by an ONNX Runtime session.
pub struct Classifier {
    session: Session,
    model_path: PathBuf,
    layout: Layout,
}

impl fmt::Display for Classifier {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Classifier: model: {}, layout: {:?}",
            self.model_path.display(),
            self.layout
        )
    }
}

impl Classifier {
    /// Load the classifier from `config.model_path`.
    ///
    /// Nothing is cached: every call reads and compiles the artifact again.
    pub fn load(config: &Config) -> Result<Classifier, PredictError> {
        let load_err = |source: ort::Error| PredictError::ModelLoad {
            path: config.model_path.clone(),
            source,
        };

        info!("Loading model from {:?}", config.model_path);

        let session = Session::builder()
            .map_err(load_err)?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(load_err)?
            .with_intra_threads(config.intra_threads)
            .map_err(load_err)?
            .commit_from_file(&config.model_path)
            .map_err(load_err)?;

        info!("Model loaded successfully");

        Ok(Classifier {
            session,
            model_path: config.model_path.clone(),
            layout: config.layout,
        })
    }

    /// Run one forward pass and return the raw output scores.
    pub fn infer(&mut self, img: &ImageTensor) -> Result<Vec<f32>, PredictError> {
        let (shape, data) = img.to_layout(self.layout);
        debug!("Inference input shape: {:?}", shape);

        let input_tensor = Value::from_array((shape, data))?;

        let outputs = self.session.run(ort::inputs![input_tensor])?;

        let output = outputs
            .iter()
            .next()
            .ok_or_else(|| PredictError::Inference("No output from model".to_string()))?;

        // (Shape, &[f32])
        let tensor = output.1.try_extract_tensor::<f32>()?;
        let scores = tensor.1.to_vec();

        debug!("Raw scores: {:?}", scores);

        Ok(scores)
    }
}
