use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Location of the classifier, relative to the working directory.
pub const DEFAULT_MODEL_PATH: &str = "model/ResNet50V2_Model.onnx";

/// Side length of the square image the model was trained on.
pub const DEFAULT_INPUT_SIZE: u32 = 224;

/// Largest accepted `input_size`; the tensor grows with its square.
pub const MAX_INPUT_SIZE: u32 = 4096;

/// Inference configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub model_path: PathBuf,
    pub input_size: u32,
    pub layout: Layout,
    pub intra_threads: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            input_size: DEFAULT_INPUT_SIZE,
            layout: Layout::Nhwc,
            intra_threads: 1,
        }
    }
}

impl Config {
    /// Load config from file, or fall back to defaults if it does not exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        anyhow::ensure!(
            (1..=MAX_INPUT_SIZE).contains(&config.input_size),
            "input_size must be between 1 and {}, got {}",
            MAX_INPUT_SIZE,
            config.input_size
        );
        anyhow::ensure!(config.intra_threads > 0, "intra_threads must be positive");

        Ok(config)
    }
}

/// Memory layout of the model's image input.
///
/// Keras exports keep channels last; some converters move them first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layout {
    #[default]
    Nhwc,
    Nchw,
}

impl std::str::FromStr for Layout {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "nhwc" => Ok(Self::Nhwc),
            "nchw" => Ok(Self::Nchw),
            _ => Err(format!("Unknown layout: {}", s)),
        }
    }
}
