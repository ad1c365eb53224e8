//! Text overlays drawn onto processed frames.

use crate::{
    calibration::{Calibrator, ScrollIntent},
    constants::CALIBRATION_SAMPLES,
    pose_estimation::HeadPose,
    Result,
};
use opencv::{
    core::{Mat, Point, Scalar},
    imgproc::{self, FONT_HERSHEY_SIMPLEX, LINE_8},
};

/// Left margin of every overlay line
const TEXT_X: i32 = 20;

/// Vertical distance between overlay lines
const LINE_SPACING: i32 = 50;

const FONT_SCALE: f64 = 0.75;
const THICKNESS: i32 = 2;

fn green() -> Scalar {
    Scalar::new(0.0, 255.0, 0.0, 0.0)
}

fn yellow() -> Scalar {
    Scalar::new(0.0, 255.0, 255.0, 0.0)
}

/// Baseline y coordinate of overlay line `index`, starting at 50
#[must_use]
pub const fn line_y(index: i32) -> i32 {
    LINE_SPACING * (index + 1)
}

fn put_line(frame: &mut Mat, text: &str, index: i32, color: Scalar) -> Result<()> {
    imgproc::put_text(
        frame,
        text,
        Point::new(TEXT_X, line_y(index)),
        FONT_HERSHEY_SIMPLEX,
        FONT_SCALE,
        color,
        THICKNESS,
        LINE_8,
        false,
    )?;
    Ok(())
}

/// Overlay lines describing a pose
#[must_use]
pub fn pose_lines(pose: &HeadPose) -> [String; 3] {
    [
        format!("Pitch: {:.2}", pose.pitch),
        format!("Yaw: {:.2}", pose.yaw),
        format!("Roll: {:.2}", pose.roll),
    ]
}

/// Status line: calibration progress, then the current scroll intent
#[must_use]
pub fn status_line(calibrator: &Calibrator, intent: ScrollIntent) -> String {
    if calibrator.is_calibrated() {
        format!("Scroll: {intent}")
    } else {
        format!("Calibrating {}/{}", calibrator.samples_collected(), CALIBRATION_SAMPLES)
    }
}

/// Draw pitch, yaw and roll on the first three lines
///
/// # Errors
///
/// Returns an error if `OpenCV` drawing fails
pub fn draw_pose(frame: &mut Mat, pose: &HeadPose) -> Result<()> {
    for (index, line) in (0..).zip(pose_lines(pose).iter()) {
        put_line(frame, line, index, green())?;
    }
    Ok(())
}

/// Draw the status line below the pose lines
///
/// # Errors
///
/// Returns an error if `OpenCV` drawing fails
pub fn draw_status(frame: &mut Mat, calibrator: &Calibrator, intent: ScrollIntent) -> Result<()> {
    put_line(frame, &status_line(calibrator, intent), 3, yellow())
}

#[cfg(test)]
mod tests {
    use super::*;
    use opencv::prelude::*;

    #[test]
    fn test_line_positions() {
        assert_eq!(line_y(0), 50);
        assert_eq!(line_y(1), 100);
        assert_eq!(line_y(2), 150);
    }

    #[test]
    fn test_pose_lines_format() {
        let lines = pose_lines(&HeadPose::new(181.234, 179.0, 200.005));
        assert_eq!(lines[0], "Pitch: 181.23");
        assert_eq!(lines[1], "Yaw: 179.00");
        assert!(lines[2].starts_with("Roll: 200.0"));
    }

    #[test]
    fn test_status_line_tracks_calibration() {
        let mut calibrator = Calibrator::new();
        assert_eq!(status_line(&calibrator, ScrollIntent::None), "Calibrating 0/120");

        for _ in 0..CALIBRATION_SAMPLES {
            calibrator.observe(&HeadPose::new(180.0, 180.0, 180.0));
        }
        assert_eq!(status_line(&calibrator, ScrollIntent::Down), "Scroll: Down");
    }

    #[test]
    fn test_draw_pose_on_blank_frame() {
        let mut frame = Mat::zeros(480, 640, opencv::core::CV_8UC3).unwrap().to_mat().unwrap();
        draw_pose(&mut frame, &HeadPose::new(180.0, 180.0, 180.0)).unwrap();

        let calibrator = Calibrator::new();
        draw_status(&mut frame, &calibrator, ScrollIntent::None).unwrap();
    }
}
