use crate::{
    constants::{FACE_MESH_INPUT_SIZE, FACE_MESH_VALUES_PER_POINT, NUM_FACE_MESH_LANDMARKS},
    face_detection::FaceDetector,
    landmarks::{LandmarkProvider, LandmarkSet},
    utils::{refine_box, safe_cast::usize_to_i32},
    Error, Result,
};
use ndarray::{Array4, CowArray};
use opencv::core::{Mat, Point2f, Rect, Size, Vec3f, CV_32F};
use opencv::imgproc::{self, InterpolationFlags};
use opencv::prelude::*;
use ort::{Environment, Session, Value};
use std::path::Path;
use std::sync::Arc;

/// Face mesh detector producing 468 landmarks for the most confident face
///
/// The SCRFD detector locates the face, the box is expanded into a square
/// region, and the mesh model regresses landmarks inside that region.
pub struct FaceMeshDetector {
    face_detector: FaceDetector,
    session: Session,
    roi_expansion: f32,
    presence_threshold: f32,
}

impl FaceMeshDetector {
    /// Create a mesh detector from its model file and a face detector
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The ONNX model file cannot be loaded
    /// - The ONNX runtime environment cannot be created
    /// - The model has no outputs
    pub fn new<P: AsRef<Path>>(
        model_path: P,
        face_detector: FaceDetector,
        roi_expansion: f32,
        presence_threshold: f32,
    ) -> Result<Self> {
        log::info!(
            "Initializing FaceMeshDetector with model: {}",
            model_path.as_ref().display()
        );
        let environment = Arc::new(
            Environment::builder()
                .with_name("face_mesh")
                .with_log_level(ort::LoggingLevel::Warning)
                .build()?,
        );

        let session = ort::SessionBuilder::new(&environment)?
            .with_optimization_level(ort::GraphOptimizationLevel::Level3)?
            .with_model_from_file(model_path)?;

        if session.outputs.is_empty() {
            return Err(Error::ModelError("Face mesh model has no outputs".to_string()));
        }

        Ok(Self {
            face_detector,
            session,
            roi_expansion,
            presence_threshold,
        })
    }

    /// Run the mesh model on one face region of `frame`
    ///
    /// # Errors
    ///
    /// Returns an error if preprocessing or inference fails, or the output is too short
    pub fn detect_in_region(&self, frame: &Mat, region: Rect) -> Result<Option<LandmarkSet>> {
        let face_roi = Mat::roi(frame, region)?;
        let face_image = face_roi.try_clone()?;

        let input = Self::preprocess(&face_image)?;
        let (mesh, presence) = self.forward(input)?;

        if let Some(logit) = presence {
            let probability = sigmoid(logit);
            if probability < self.presence_threshold {
                log::debug!("Face presence {:.2} below threshold", probability);
                return Ok(None);
            }
        }

        Ok(Some(Self::postprocess(&mesh, region)?))
    }

    /// Resize to the model input and normalize to [-1, 1] in NHWC order
    #[allow(clippy::cast_sign_loss)] // Input size is a positive constant
    fn preprocess(face_image: &Mat) -> Result<Array4<f32>> {
        let mut resized = Mat::default();
        imgproc::resize(
            face_image,
            &mut resized,
            Size::new(FACE_MESH_INPUT_SIZE, FACE_MESH_INPUT_SIZE),
            0.0,
            0.0,
            InterpolationFlags::INTER_LINEAR as i32,
        )?;

        let mut rgb_image = Mat::default();
        imgproc::cvt_color(&resized, &mut rgb_image, imgproc::COLOR_BGR2RGB, 0)?;

        let mut float_image = Mat::default();
        rgb_image.convert_to(&mut float_image, CV_32F, 1.0 / 127.5, -1.0)?;

        let size = FACE_MESH_INPUT_SIZE as usize;
        let mut array = Array4::<f32>::zeros((1, size, size, 3));
        for row in 0..size {
            for col in 0..size {
                let pixel = float_image.at_2d::<Vec3f>(usize_to_i32(row)?, usize_to_i32(col)?)?;
                for ch in 0..3 {
                    array[[0, row, col, ch]] = pixel[ch];
                }
            }
        }

        Ok(array)
    }

    /// Run inference, returning the flat mesh and the presence logit if the model has one
    fn forward(&self, input: Array4<f32>) -> Result<(Vec<f32>, Option<f32>)> {
        let cow_array = CowArray::from(input.into_dyn());
        let input_tensor = Value::from_array(self.session.allocator(), &cow_array)?;
        let outputs = self.session.run(vec![input_tensor])?;

        let mut outputs = outputs.into_iter();
        let mesh_output = outputs
            .next()
            .ok_or_else(|| Error::ModelOutputError("No output from face mesh model".to_string()))?;
        let mesh_tensor = mesh_output.try_extract::<f32>()?;
        let mesh = mesh_tensor.view().iter().copied().collect::<Vec<f32>>();

        let presence = match outputs.next() {
            Some(value) => value.try_extract::<f32>()?.view().iter().next().copied(),
            None => None,
        };

        Ok((mesh, presence))
    }

    /// Map mesh coordinates from model input space back into the frame
    #[allow(clippy::cast_precision_loss)] // Region sizes are small integers
    fn postprocess(mesh: &[f32], region: Rect) -> Result<LandmarkSet> {
        let expected = NUM_FACE_MESH_LANDMARKS * FACE_MESH_VALUES_PER_POINT;
        if mesh.len() < expected {
            return Err(Error::ModelDataFormatError(format!(
                "Expected {} mesh values, got {}",
                expected,
                mesh.len()
            )));
        }

        let scale_x = region.width as f32 / FACE_MESH_INPUT_SIZE as f32;
        let scale_y = region.height as f32 / FACE_MESH_INPUT_SIZE as f32;
        let points = mesh
            .chunks_exact(FACE_MESH_VALUES_PER_POINT)
            .take(NUM_FACE_MESH_LANDMARKS)
            .map(|p| Point2f::new(region.x as f32 + p[0] * scale_x, region.y as f32 + p[1] * scale_y))
            .collect();

        Ok(LandmarkSet::new(points))
    }
}

impl LandmarkProvider for FaceMeshDetector {
    fn find_landmarks(&mut self, frame: &Mat) -> Result<Option<LandmarkSet>> {
        let Some(face) = self.face_detector.detect_primary(frame)? else {
            return Ok(None);
        };

        let Some(region) = refine_box(face.bbox, frame.cols(), frame.rows(), self.roi_expansion) else {
            log::debug!("Face box {:?} does not fit the frame", face.bbox);
            return Ok(None);
        };

        self.detect_in_region(frame, region)
    }
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}
