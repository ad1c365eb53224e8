//! Helper functions and utilities for tests

#![allow(dead_code)]

use head_scroller::{
    constants::{CANONICAL_FACE_MODEL, KEY_POINT_INDICES, NUM_FACE_MESH_LANDMARKS},
    landmarks::{FacialKeyPoints, LandmarkProvider, LandmarkSet},
    Result,
};
use nalgebra::{Rotation3, Vector3};
use opencv::core::{Mat, Point2f, Size, CV_8UC3};
use opencv::prelude::*;
use std::collections::VecDeque;

pub const FRAME_WIDTH: i32 = 640;
pub const FRAME_HEIGHT: i32 = 480;

/// Distance of the synthetic face from the camera, in model units
const FACE_DISTANCE: f64 = 2000.0;

pub fn frame_size() -> Size {
    Size::new(FRAME_WIDTH, FRAME_HEIGHT)
}

/// Create a black test frame
pub fn create_test_frame() -> Result<Mat> {
    Ok(Mat::zeros(FRAME_HEIGHT, FRAME_WIDTH, CV_8UC3)?.to_mat()?)
}

/// Rotation from angles in degrees, composed as Rz(yaw) * Ry(pitch) * Rx(roll)
pub fn rotation_from_degrees(pitch: f64, yaw: f64, roll: f64) -> Rotation3<f64> {
    Rotation3::from_euler_angles(roll.to_radians(), pitch.to_radians(), yaw.to_radians())
}

/// Project the canonical face model through the same pinhole camera the estimator assumes
#[allow(clippy::cast_possible_truncation)]
pub fn project_key_points(rotation: &Rotation3<f64>) -> FacialKeyPoints {
    let focal = f64::from(FRAME_WIDTH);
    let cx = f64::from(FRAME_WIDTH) / 2.0;
    let cy = f64::from(FRAME_HEIGHT) / 2.0;
    let translation = Vector3::new(0.0, 0.0, FACE_DISTANCE);

    let mut points = [Point2f::default(); 6];
    for (slot, model) in points.iter_mut().zip(CANONICAL_FACE_MODEL.iter()) {
        let camera = rotation * Vector3::new(model[0], model[1], model[2]) + translation;
        let u = focal * camera.x / camera.z + cx;
        let v = focal * camera.y / camera.z + cy;
        *slot = Point2f::new(u as f32, v as f32);
    }

    FacialKeyPoints::from_points(points)
}

/// Full-size mesh whose key indices hold the projected key points
pub fn mesh_with_key_points(key_points: &FacialKeyPoints) -> LandmarkSet {
    let mut mesh = vec![Point2f::new(320.0, 240.0); NUM_FACE_MESH_LANDMARKS];
    for (&index, &point) in KEY_POINT_INDICES.iter().zip(key_points.points().iter()) {
        mesh[index] = point;
    }
    LandmarkSet::new(mesh)
}

/// Landmark provider that replays a fixed script, one entry per frame
#[derive(Default)]
pub struct ScriptedProvider {
    frames: VecDeque<Option<LandmarkSet>>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a frame where a face posed by `rotation` is visible
    pub fn push_face(&mut self, rotation: &Rotation3<f64>) {
        let key_points = project_key_points(rotation);
        self.frames.push_back(Some(mesh_with_key_points(&key_points)));
    }

    /// Queue a frame without a face
    pub fn push_no_face(&mut self) {
        self.frames.push_back(None);
    }

    /// Queue an arbitrary landmark set
    pub fn push_landmarks(&mut self, landmarks: LandmarkSet) {
        self.frames.push_back(Some(landmarks));
    }
}

impl LandmarkProvider for ScriptedProvider {
    fn find_landmarks(&mut self, _frame: &Mat) -> Result<Option<LandmarkSet>> {
        Ok(self.frames.pop_front().flatten())
    }
}
