//! Configuration management for the head scroller

use crate::{
    constants::{DEFAULT_FPS, DEFAULT_FRAME_HEIGHT, DEFAULT_FRAME_WIDTH},
    Error, Result,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
///
/// Scroll thresholds and step size are fixed constants and deliberately not
/// part of the configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Model configuration
    pub models: ModelConfig,

    /// Camera configuration
    pub camera: CameraConfig,

    /// Face detection configuration
    pub face_detection: FaceDetectionConfig,

    /// Display configuration
    pub display: DisplayConfig,

    /// Scroll output configuration
    pub scroll: ScrollConfig,
}

/// Model file paths configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Path to the SCRFD face detection ONNX model
    pub face_detector: PathBuf,

    /// Path to the 468-point face mesh ONNX model
    pub face_mesh: PathBuf,
}

/// Camera capture configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Camera device index
    pub index: i32,

    /// Requested frame width
    pub width: i32,

    /// Requested frame height
    pub height: i32,

    /// Requested frame rate
    pub fps: f64,
}

/// Face detection parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FaceDetectionConfig {
    /// Confidence threshold for face detection (0.0-1.0)
    pub confidence_threshold: f32,

    /// IOU threshold for non-maximum suppression (0.0-1.0)
    pub nms_threshold: f32,

    /// Face region expansion before meshing, as a fraction of the box size
    pub roi_expansion: f32,

    /// Minimum face presence probability reported by the mesh model (0.0-1.0)
    pub presence_threshold: f32,
}

/// Display configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Show the annotated preview window
    pub show_preview: bool,

    /// Mirror frames horizontally before processing
    pub mirror: bool,
}

/// Scroll output configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrollConfig {
    /// Inject scroll events; when false the app only reports intents
    pub enabled: bool,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            face_detector: PathBuf::from("assets/face_detector.onnx"),
            face_mesh: PathBuf::from("assets/face_mesh.onnx"),
        }
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            index: 0,
            width: DEFAULT_FRAME_WIDTH,
            height: DEFAULT_FRAME_HEIGHT,
            fps: DEFAULT_FPS,
        }
    }
}

impl Default for FaceDetectionConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.5,
            nms_threshold: 0.4,
            roi_expansion: 0.25,
            presence_threshold: 0.5,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            show_preview: false,
            mirror: true,
        }
    }
}

impl Default for ScrollConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl Config {
    /// Load configuration from a YAML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid YAML
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML text
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid configuration YAML
    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).map_err(|e| Error::ConfigError(format!("Failed to parse config: {e}")))
    }

    /// Save configuration to a YAML file
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yaml::to_string(self)
            .map_err(|e| Error::ConfigError(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path, content)?;

        Ok(())
    }

    /// Validate parameter ranges, without touching the filesystem
    ///
    /// # Errors
    ///
    /// Returns an error describing the first invalid setting
    pub fn validate_parameters(&self) -> Result<()> {
        let unit_range = 0.0..=1.0;
        if !unit_range.contains(&self.face_detection.confidence_threshold) {
            return Err(Error::ConfigError(
                "Confidence threshold must be between 0.0 and 1.0".to_string(),
            ));
        }
        if !unit_range.contains(&self.face_detection.nms_threshold) {
            return Err(Error::ConfigError(
                "NMS threshold must be between 0.0 and 1.0".to_string(),
            ));
        }
        if !unit_range.contains(&self.face_detection.presence_threshold) {
            return Err(Error::ConfigError(
                "Presence threshold must be between 0.0 and 1.0".to_string(),
            ));
        }
        if self.face_detection.roi_expansion.is_nan() || self.face_detection.roi_expansion < 0.0 {
            return Err(Error::ConfigError(
                "ROI expansion must not be negative".to_string(),
            ));
        }

        if self.camera.index < 0 {
            return Err(Error::ConfigError("Camera index must not be negative".to_string()));
        }
        if self.camera.width <= 0 || self.camera.height <= 0 {
            return Err(Error::ConfigError(
                "Camera width and height must be greater than 0".to_string(),
            ));
        }
        if self.camera.fps.is_nan() || self.camera.fps <= 0.0 {
            return Err(Error::ConfigError("Camera FPS must be greater than 0".to_string()));
        }

        Ok(())
    }

    /// Validate configuration, including that model files exist
    ///
    /// # Errors
    ///
    /// Returns an error describing the first invalid setting or missing model
    pub fn validate(&self) -> Result<()> {
        self.validate_parameters()?;

        if !self.models.face_detector.exists() {
            return Err(Error::ConfigError(format!(
                "Face detector model not found: {}",
                self.models.face_detector.display()
            )));
        }
        if !self.models.face_mesh.exists() {
            return Err(Error::ConfigError(format!(
                "Face mesh model not found: {}",
                self.models.face_mesh.display()
            )));
        }

        Ok(())
    }
}

/// Example configuration file content
pub const EXAMPLE_CONFIG: &str = r#"# Head Scroller Configuration

# Model paths
models:
  face_detector: "assets/face_detector.onnx"
  face_mesh: "assets/face_mesh.onnx"

# Camera capture (best effort, drivers may pick the nearest mode)
camera:
  index: 0
  width: 640
  height: 480
  fps: 30.0

# Face detection parameters
face_detection:
  confidence_threshold: 0.5
  nms_threshold: 0.4
  roi_expansion: 0.25
  presence_threshold: 0.5

# Display settings
display:
  show_preview: false
  mirror: true

# Scroll output
scroll:
  enabled: true
"#;
