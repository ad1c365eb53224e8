//! Main application module: capture loop, frame processing and output.

use crate::{
    calibration::{Baseline, Calibrator, ScrollIntent},
    config::{Config, DisplayConfig},
    error::{Error, Result},
    face_detection::FaceDetector,
    landmarks::LandmarkProvider,
    mesh_detection::FaceMeshDetector,
    overlay,
    pose_estimation::{HeadPose, PoseEstimator},
    scroll_control::{ScrollSink, X11ScrollController},
};
use log::{debug, info, warn};
use opencv::{
    core::{self, Mat},
    highgui,
    prelude::*,
    videoio::{self, VideoCapture, CAP_PROP_FPS, CAP_PROP_FRAME_HEIGHT, CAP_PROP_FRAME_WIDTH},
};

/// Preview window title
const WINDOW_NAME: &str = "Face Rotation";

/// Key code of Escape as reported by `wait_key`
const ESCAPE_KEY: i32 = 27;

const BANNER: &str = r"
 _   _                _   _____                _ _
| | | |              | | /  ___|              | | |
| |_| | ___  __ _  __| | \ `--.  ___ _ __ ___ | | | ___ _ __
|  _  |/ _ \/ _` |/ _` |  `--. \/ __| '__/ _ \| | |/ _ \ '__|
| | | |  __/ (_| | (_| | /\__/ / (__| | | (_) | | |  __/ |
\_| |_/\___|\__,_|\__,_| \____/ \___|_|  \___/|_|_|\___|_|
";

/// Why a frame produced no pose
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The landmark provider found no face
    NoFace,
    /// The landmark set lacked one of the pose key points
    MissingKeyPoints,
    /// The pose solver did not converge or produced a degenerate pose
    NoPose,
}

/// Result of processing one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FrameOutcome {
    /// No pose this frame; calibration untouched, nothing to output
    Skipped(SkipReason),
    /// A pose was estimated and fed to the calibrator
    Tracked {
        /// Estimated pose
        pose: HeadPose,
        /// Scroll decision for this frame
        intent: ScrollIntent,
        /// Baseline frozen by this very frame, if calibration just completed
        completed_baseline: Option<Baseline>,
    },
}

/// Landmarks → pose → calibration, for one frame at a time
pub struct FrameProcessor<P: LandmarkProvider> {
    landmark_provider: P,
    pose_estimator: PoseEstimator,
    calibrator: Calibrator,
}

impl<P: LandmarkProvider> FrameProcessor<P> {
    /// Create a processor with a fresh calibration
    ///
    /// # Errors
    ///
    /// Returns an error if the pose estimator cannot be initialized
    pub fn new(landmark_provider: P) -> Result<Self> {
        Ok(Self {
            landmark_provider,
            pose_estimator: PoseEstimator::new()?,
            calibrator: Calibrator::new(),
        })
    }

    /// Process a single frame
    ///
    /// Only frames that yield a pose reach the calibrator.
    ///
    /// # Errors
    ///
    /// Returns an error if landmark inference or the pose solver fails
    pub fn process(&mut self, frame: &Mat) -> Result<FrameOutcome> {
        let Some(landmarks) = self.landmark_provider.find_landmarks(frame)? else {
            return Ok(FrameOutcome::Skipped(SkipReason::NoFace));
        };

        let Some(key_points) = landmarks.key_points() else {
            return Ok(FrameOutcome::Skipped(SkipReason::MissingKeyPoints));
        };

        let Some(pose) = self.pose_estimator.estimate(frame.size()?, &key_points)? else {
            return Ok(FrameOutcome::Skipped(SkipReason::NoPose));
        };

        let was_calibrated = self.calibrator.is_calibrated();
        let intent = self.calibrator.observe(&pose);
        let completed_baseline = if was_calibrated { None } else { self.calibrator.baseline() };

        Ok(FrameOutcome::Tracked {
            pose,
            intent,
            completed_baseline,
        })
    }

    /// Calibration state
    pub const fn calibrator(&self) -> &Calibrator {
        &self.calibrator
    }
}

/// Main application struct
pub struct HeadScrollApp {
    config: Config,
    processor: FrameProcessor<FaceMeshDetector>,
    video_capture: VideoCapture,
    scroll_sink: Option<Box<dyn ScrollSink>>,
}

impl HeadScrollApp {
    /// Create the application: open the camera, load models, connect scroll output
    ///
    /// # Errors
    ///
    /// Returns an error if the camera cannot be opened or a model cannot be loaded
    pub fn new(config: Config) -> Result<Self> {
        info!("Initializing Head Scroller application");
        config.validate_parameters()?;

        let camera = &config.camera;
        info!("Opening camera {}", camera.index);
        let mut video_capture = VideoCapture::new(camera.index, videoio::CAP_ANY)?;
        if !video_capture.is_opened()? {
            return Err(Error::Capture("Could not open webcam".to_string()));
        }

        // Best effort: drivers may ignore or round these
        video_capture.set(CAP_PROP_FRAME_WIDTH, f64::from(camera.width))?;
        video_capture.set(CAP_PROP_FRAME_HEIGHT, f64::from(camera.height))?;
        video_capture.set(CAP_PROP_FPS, camera.fps)?;

        let detection = &config.face_detection;
        let face_detector = FaceDetector::new(
            &config.models.face_detector,
            detection.confidence_threshold,
            detection.nms_threshold,
        )?;
        let mesh_detector = FaceMeshDetector::new(
            &config.models.face_mesh,
            face_detector,
            detection.roi_expansion,
            detection.presence_threshold,
        )?;
        let processor = FrameProcessor::new(mesh_detector)?;

        let scroll_sink: Option<Box<dyn ScrollSink>> = if config.scroll.enabled {
            match X11ScrollController::new() {
                Ok(controller) => Some(Box::new(controller)),
                Err(e) => {
                    warn!("Failed to initialize scroll control: {}", e);
                    None
                }
            }
        } else {
            info!("Scroll injection disabled");
            None
        };

        if config.display.show_preview {
            highgui::named_window(WINDOW_NAME, highgui::WINDOW_AUTOSIZE)?;
        }

        Ok(Self {
            config,
            processor,
            video_capture,
            scroll_sink,
        })
    }

    /// Run the main loop until capture fails or the user quits, then release the camera
    ///
    /// `OpenCV` only delivers key presses to its own windows, so `q`/Escape
    /// quit only with the preview enabled; otherwise stop with Ctrl-C.
    ///
    /// # Errors
    ///
    /// Returns an error if an `OpenCV` capture, drawing or window call fails
    pub fn run(&mut self) -> Result<()> {
        println!("{BANNER}");
        println!("\nCalibrating facial orientation. Please keep your head steady and towards the screen...\n");

        info!("{}", quit_hint(&self.config.display));

        let result = self.capture_loop();

        info!("Releasing camera");
        let mut release_result = self.video_capture.release().map_err(Error::from);
        if self.config.display.show_preview {
            release_result = release_result.and(highgui::destroy_all_windows().map_err(Error::from));
        }

        combine_shutdown(result, release_result)
    }

    fn capture_loop(&mut self) -> Result<()> {
        let mut frame_count: u64 = 0;

        loop {
            let mut frame = Mat::default();
            if !self.video_capture.read(&mut frame)? || frame.empty() {
                info!("Frame capture failed, stopping");
                break;
            }
            frame_count += 1;

            if self.config.display.mirror {
                let captured = frame.clone();
                core::flip(&captured, &mut frame, 1)?;
            }

            match self.processor.process(&frame) {
                Ok(FrameOutcome::Tracked {
                    pose,
                    intent,
                    completed_baseline,
                }) => {
                    if let Some(baseline) = completed_baseline {
                        print_calibration(&baseline);
                    }
                    overlay::draw_pose(&mut frame, &pose)?;
                    overlay::draw_status(&mut frame, self.processor.calibrator(), intent)?;
                    self.apply_scroll(intent);
                }
                Ok(FrameOutcome::Skipped(reason)) => {
                    debug!("Frame {} skipped: {:?}", frame_count, reason);
                }
                Err(e) => {
                    debug!("Frame {} skipped after error: {}", frame_count, e);
                }
            }

            if self.config.display.show_preview {
                highgui::imshow(WINDOW_NAME, &frame)?;
            }

            let key = highgui::wait_key(1)?;
            if is_quit_key(key) {
                info!("Exit requested by user");
                break;
            }
        }

        info!("Processed {} frames", frame_count);
        Ok(())
    }

    /// Hand a scroll intent to the output sink
    fn apply_scroll(&mut self, intent: ScrollIntent) {
        let amount = intent.scroll_amount();
        if amount == 0.0 {
            return;
        }

        if let Some(sink) = &mut self.scroll_sink {
            if let Err(e) = sink.scroll(amount) {
                warn!("Scroll injection failed: {}", e);
            }
        }
    }
}

/// Print the one-time calibration report
fn print_calibration(baseline: &Baseline) {
    println!("Calibrated Pitch: {:.2}", baseline.pitch);
    println!("Calibrated Yaw: {:.2}", baseline.yaw);
    println!("Calibrated Roll: {:.2}", baseline.roll);
}

/// How the user can stop the loop with the given display settings
#[must_use]
pub const fn quit_hint(display: &DisplayConfig) -> &'static str {
    if display.show_preview {
        "Press 'q' or Esc in the preview window to quit"
    } else {
        "Preview disabled, quit keys need --preview; press Ctrl-C to quit"
    }
}

/// Merge the loop result with the shutdown result, reporting the loop error first
///
/// # Errors
///
/// Returns the loop error if there is one, otherwise the shutdown error
pub fn combine_shutdown(loop_result: Result<()>, shutdown_result: Result<()>) -> Result<()> {
    if let (Err(_), Err(e)) = (&loop_result, &shutdown_result) {
        warn!("Camera shutdown failed: {}", e);
    }
    loop_result.and(shutdown_result)
}

/// Whether a `wait_key` result asks to quit (`q` or Escape)
#[must_use]
pub fn is_quit_key(key: i32) -> bool {
    key >= 0 && (key & 0xFF == i32::from(b'q') || key & 0xFF == ESCAPE_KEY)
}
