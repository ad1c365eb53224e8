//! Facial landmark types and the provider seam.
//!
//! A [`LandmarkProvider`] turns a frame into at most one [`LandmarkSet`]. The
//! pose estimator only needs six of those points, which [`FacialKeyPoints`]
//! picks out by mesh index.

use crate::{constants::KEY_POINT_INDICES, Result};
use opencv::core::{Mat, Point2f};

/// 2D landmarks of a single face, in full-frame pixel coordinates
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LandmarkSet {
    points: Vec<Point2f>,
}

impl LandmarkSet {
    /// Wrap a list of landmark points
    #[must_use]
    pub fn new(points: Vec<Point2f>) -> Self {
        Self { points }
    }

    /// Number of landmarks in the set
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the set holds no points
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Landmark at `index`, if present
    #[must_use]
    pub fn get(&self, index: usize) -> Option<Point2f> {
        self.points.get(index).copied()
    }

    /// All landmarks
    #[must_use]
    pub fn points(&self) -> &[Point2f] {
        &self.points
    }

    /// Select the six pose key points
    ///
    /// Returns `None` when the set is too short to contain every key index.
    #[must_use]
    pub fn key_points(&self) -> Option<FacialKeyPoints> {
        let mut points = [Point2f::default(); 6];
        for (slot, &index) in points.iter_mut().zip(KEY_POINT_INDICES.iter()) {
            *slot = self.get(index)?;
        }
        Some(FacialKeyPoints { points })
    }
}

/// The six landmarks paired with the canonical face model
///
/// Order: nose tip, chin, left eye outer corner, right eye outer corner,
/// left mouth corner, right mouth corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FacialKeyPoints {
    points: [Point2f; 6],
}

impl FacialKeyPoints {
    /// Build key points directly, in canonical order
    #[must_use]
    pub const fn from_points(points: [Point2f; 6]) -> Self {
        Self { points }
    }

    /// Key points in canonical order
    #[must_use]
    pub const fn points(&self) -> &[Point2f; 6] {
        &self.points
    }

    /// Nose tip position
    #[must_use]
    pub const fn nose_tip(&self) -> Point2f {
        self.points[0]
    }
}

/// Source of facial landmarks for a frame
pub trait LandmarkProvider {
    /// Find the landmarks of at most one face in `frame`
    ///
    /// # Errors
    ///
    /// Returns an error if inference or image preprocessing fails. A frame
    /// without a face is `Ok(None)`, not an error.
    fn find_landmarks(&mut self, frame: &Mat) -> Result<Option<LandmarkSet>>;
}
