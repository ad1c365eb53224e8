use crate::{
    constants::{ANGLE_OFFSET_DEGREES, CAMERA_CENTER_FACTOR, CANONICAL_FACE_MODEL},
    landmarks::FacialKeyPoints,
    utils::safe_cast::usize_to_i32,
    Result,
};
use nalgebra::Matrix3;
use opencv::{
    calib3d,
    core::{Mat, Point2d, Point3d, Size, Vector, CV_64F},
    prelude::*,
};

/// Head orientation in degrees, each angle shifted by +180 into [0, 360)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeadPose {
    /// Rotation about the horizontal axis
    pub pitch: f64,
    /// Rotation about the vertical axis
    pub yaw: f64,
    /// Rotation about the depth axis
    pub roll: f64,
}

impl HeadPose {
    /// Create a pose from already-offset angles
    #[must_use]
    pub const fn new(pitch: f64, yaw: f64, roll: f64) -> Self {
        Self { pitch, yaw, roll }
    }

    /// Whether every angle is a finite number
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.pitch.is_finite() && self.yaw.is_finite() && self.roll.is_finite()
    }
}

/// Head pose estimator using the `PnP` algorithm on six facial key points
pub struct PoseEstimator {
    model_points: Vector<Point3d>,
    dist_coeffs: Mat,
}

impl PoseEstimator {
    /// Create a pose estimator over the canonical face model
    ///
    /// # Errors
    ///
    /// Returns an error if the distortion matrix cannot be allocated
    pub fn new() -> Result<Self> {
        log::info!("Initializing PoseEstimator with {} model points", CANONICAL_FACE_MODEL.len());
        let model_points = CANONICAL_FACE_MODEL
            .iter()
            .map(|&[x, y, z]| Point3d::new(x, y, z))
            .collect();

        // Assume no lens distortion
        let dist_coeffs = Mat::zeros(4, 1, CV_64F)?.to_mat()?;

        Ok(Self {
            model_points,
            dist_coeffs,
        })
    }

    /// Approximate intrinsics: focal length = frame width, principal point at the center
    ///
    /// # Errors
    ///
    /// Returns an error if the matrix cannot be built
    pub fn camera_matrix(frame_size: Size) -> Result<Mat> {
        let focal_length = f64::from(frame_size.width);
        let center = (
            f64::from(frame_size.width) / CAMERA_CENTER_FACTOR,
            f64::from(frame_size.height) / CAMERA_CENTER_FACTOR,
        );

        Ok(Mat::from_slice_2d(&[
            [focal_length, 0.0, center.0],
            [0.0, focal_length, center.1],
            [0.0, 0.0, 1.0],
        ])?)
    }

    /// Estimate head pose from the six key points of a frame
    ///
    /// Returns `Ok(None)` when the solver does not converge or the
    /// decomposition yields a non-finite angle.
    ///
    /// # Errors
    ///
    /// Returns an error if the frame size is not positive or an `OpenCV`
    /// operation fails.
    pub fn estimate(&self, frame_size: Size, key_points: &FacialKeyPoints) -> Result<Option<HeadPose>> {
        if frame_size.width <= 0 || frame_size.height <= 0 {
            return Err(crate::Error::InvalidInput(format!(
                "Frame size must be positive, got {}x{}",
                frame_size.width, frame_size.height
            )));
        }

        let camera_matrix = Self::camera_matrix(frame_size)?;
        let image_points: Vector<Point2d> = key_points
            .points()
            .iter()
            .map(|p| Point2d::new(f64::from(p.x), f64::from(p.y)))
            .collect();

        let mut rvec = Mat::default();
        let mut tvec = Mat::default();
        let converged = calib3d::solve_pnp(
            &self.model_points,
            &image_points,
            &camera_matrix,
            &self.dist_coeffs,
            &mut rvec,
            &mut tvec,
            false,
            calib3d::SOLVEPNP_ITERATIVE,
        )?;

        if !converged {
            log::debug!("PnP solver did not converge");
            return Ok(None);
        }

        let mut rotation = Mat::default();
        calib3d::rodrigues(&rvec, &mut rotation, &mut Mat::default())?;
        let rotation = Self::mat_to_matrix3(&rotation)?;

        let pose = Self::rotation_matrix_to_euler(&rotation);
        if !pose.is_finite() {
            log::debug!("Degenerate pose discarded: {:?}", pose);
            return Ok(None);
        }

        Ok(Some(pose))
    }

    /// Convert a rotation matrix to offset Euler angles in degrees
    ///
    /// Near gimbal lock (`cos(pitch)` close to zero) yaw and roll lose their
    /// meaning; the decomposition does not guard against it.
    #[must_use]
    pub fn rotation_matrix_to_euler(rotation: &Matrix3<f64>) -> HeadPose {
        let pitch = (-rotation[(2, 0)]).atan2((rotation[(0, 0)].powi(2) + rotation[(1, 0)].powi(2)).sqrt());
        let cos_pitch = pitch.cos();
        let yaw = (rotation[(1, 0)] / cos_pitch).atan2(rotation[(0, 0)] / cos_pitch);
        let roll = (rotation[(2, 1)] / cos_pitch).atan2(rotation[(2, 2)] / cos_pitch);

        HeadPose {
            pitch: pitch.to_degrees() + ANGLE_OFFSET_DEGREES,
            yaw: yaw.to_degrees() + ANGLE_OFFSET_DEGREES,
            roll: roll.to_degrees() + ANGLE_OFFSET_DEGREES,
        }
    }

    /// Copy a 3x3 `CV_64F` matrix into nalgebra
    fn mat_to_matrix3(mat: &Mat) -> Result<Matrix3<f64>> {
        if mat.rows() != 3 || mat.cols() != 3 {
            return Err(crate::Error::InvalidInput(format!(
                "Expected a 3x3 rotation matrix, got {}x{}",
                mat.rows(),
                mat.cols()
            )));
        }

        let mut rotation = Matrix3::zeros();
        for row in 0..3 {
            for col in 0..3 {
                rotation[(row, col)] = *mat.at_2d::<f64>(usize_to_i32(row)?, usize_to_i32(col)?)?;
            }
        }
        Ok(rotation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Rotation3;

    #[test]
    fn test_identity_rotation_reports_offset_only() {
        let pose = PoseEstimator::rotation_matrix_to_euler(&Matrix3::identity());

        assert_eq!(pose.pitch, 180.0);
        assert_eq!(pose.yaw, 180.0);
        assert_eq!(pose.roll, 180.0);
    }

    #[test]
    fn test_euler_extraction_recovers_angles() {
        let (roll, pitch, yaw) = (0.2_f64, -0.3_f64, 0.4_f64);
        let rotation = Rotation3::from_euler_angles(roll, pitch, yaw).into_inner();
        let pose = PoseEstimator::rotation_matrix_to_euler(&rotation);

        assert_relative_eq!(pose.pitch, pitch.to_degrees() + 180.0, epsilon = 1e-9);
        assert_relative_eq!(pose.yaw, yaw.to_degrees() + 180.0, epsilon = 1e-9);
        assert_relative_eq!(pose.roll, roll.to_degrees() + 180.0, epsilon = 1e-9);
    }

    #[test]
    fn test_offset_applies_to_negative_angles() {
        let rotation = Rotation3::from_euler_angles(-0.5, -0.25, -1.0).into_inner();
        let pose = PoseEstimator::rotation_matrix_to_euler(&rotation);

        assert!(pose.pitch < 180.0);
        assert!(pose.yaw < 180.0);
        assert!(pose.roll < 180.0);
        assert_relative_eq!(pose.roll, 180.0 - 0.5_f64.to_degrees(), epsilon = 1e-9);
    }

    #[test]
    fn test_camera_matrix_uses_frame_width() {
        let matrix = PoseEstimator::camera_matrix(Size::new(640, 480)).unwrap();

        assert_eq!(*matrix.at_2d::<f64>(0, 0).unwrap(), 640.0);
        assert_eq!(*matrix.at_2d::<f64>(1, 1).unwrap(), 640.0);
        assert_eq!(*matrix.at_2d::<f64>(0, 2).unwrap(), 320.0);
        assert_eq!(*matrix.at_2d::<f64>(1, 2).unwrap(), 240.0);
        assert_eq!(*matrix.at_2d::<f64>(2, 2).unwrap(), 1.0);
    }

    #[test]
    fn test_estimate_rejects_empty_frame() {
        let estimator = PoseEstimator::new().unwrap();
        let key_points = FacialKeyPoints::from_points([opencv::core::Point2f::default(); 6]);

        assert!(estimator.estimate(Size::new(0, 480), &key_points).is_err());
    }

    #[test]
    fn test_mat_to_matrix3_rejects_wrong_shape() {
        let mat = Mat::zeros(3, 1, CV_64F).unwrap().to_mat().unwrap();
        assert!(PoseEstimator::mat_to_matrix3(&mat).is_err());
    }

    #[test]
    fn test_mat_to_matrix3_copies_every_element() {
        let mat = Mat::from_slice_2d(&[[1.0, 2.0, 3.0], [4.0, 5.0, 6.0], [7.0, 8.0, 9.0]]).unwrap();
        let matrix = PoseEstimator::mat_to_matrix3(&mat).unwrap();

        assert_eq!(matrix, Matrix3::new(1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0));
    }
}
