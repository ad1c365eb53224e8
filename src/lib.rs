//! Head-tilt scrolling driven by webcam head pose estimation.
//!
//! The pipeline runs once per captured frame:
//! 1. Face detection (SCRFD) locates the primary face
//! 2. A 468-point face mesh model finds landmarks inside the face region
//! 3. Six key landmarks feed a `PnP` solve against a canonical face model
//! 4. The rotation is turned into Euler angles offset by 180 degrees
//! 5. The first 120 poses calibrate a neutral baseline
//! 6. Roll deviation from the baseline becomes a scroll intent
//!
//! # Examples
//!
//! ## Scroll intents from poses
//!
//! ```
//! use head_scroller::calibration::{Calibrator, ScrollIntent};
//! use head_scroller::pose_estimation::HeadPose;
//!
//! let mut calibrator = Calibrator::new();
//! for _ in 0..120 {
//!     calibrator.observe(&HeadPose::new(180.0, 180.0, 50.0));
//! }
//!
//! assert_eq!(calibrator.observe(&HeadPose::new(180.0, 180.0, 65.0)), ScrollIntent::Down);
//! assert_eq!(calibrator.observe(&HeadPose::new(180.0, 180.0, 38.0)), ScrollIntent::Up);
//! assert_eq!(calibrator.observe(&HeadPose::new(180.0, 180.0, 50.0)), ScrollIntent::None);
//! ```
//!
//! ## Full pipeline on a single image
//!
//! ```no_run
//! use head_scroller::{
//!     face_detection::FaceDetector,
//!     landmarks::LandmarkProvider,
//!     mesh_detection::FaceMeshDetector,
//!     pose_estimation::PoseEstimator,
//! };
//! use opencv::{imgcodecs, prelude::*};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let face_detector = FaceDetector::new("assets/face_detector.onnx", 0.5, 0.4)?;
//! let mut mesh = FaceMeshDetector::new("assets/face_mesh.onnx", face_detector, 0.25, 0.5)?;
//! let estimator = PoseEstimator::new()?;
//!
//! let image = imgcodecs::imread("face.jpg", imgcodecs::IMREAD_COLOR)?;
//! if let Some(key_points) = mesh.find_landmarks(&image)?.and_then(|l| l.key_points()) {
//!     if let Some(pose) = estimator.estimate(image.size()?, &key_points)? {
//!         println!("Pitch: {:.2}, Yaw: {:.2}, Roll: {:.2}", pose.pitch, pose.yaw, pose.roll);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

/// Main application module
pub mod app;

/// Calibration baseline and scroll decisions
pub mod calibration;

/// Configuration management
pub mod config;

/// Constants used throughout the application
pub mod constants;

/// Error types and result handling
pub mod error;

/// Face detection module for finding faces in images
pub mod face_detection;

/// Landmark sets and the provider seam
pub mod landmarks;

/// 468-point face mesh landmark detection
pub mod mesh_detection;

/// Pose and status text overlays
pub mod overlay;

/// Head pose estimation module using `PnP` algorithm
pub mod pose_estimation;

/// Scroll injection for X11 systems
pub mod scroll_control;

/// Utility functions for coordinate handling
pub mod utils;

pub use error::{Error, Result};
