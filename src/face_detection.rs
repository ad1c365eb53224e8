use crate::{
    constants::{DEFAULT_DETECTOR_INPUT_SIZE, IMAGE_NORMALIZATION_OFFSET, IMAGE_NORMALIZATION_SCALE},
    utils::safe_cast::usize_to_i32,
    Error, Result,
};
use ndarray::{Array4, CowArray};
use opencv::core::{Mat, Rect, Scalar, Size, Vec3f, CV_32F, CV_8UC3};
use opencv::imgproc::{self, InterpolationFlags};
use opencv::prelude::*;
use ort::{Environment, Session, Value};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// Face detection result, in original image coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceDetection {
    /// Bounding box of the detected face
    pub bbox: Rect,
    /// Confidence score of the detection
    pub score: f32,
}

/// Candidate box as (x1, y1, x2, y2) corners
type Corners = [f32; 4];

/// SCRFD face detector using `ONNX` Runtime
///
/// Only the score and box heads are read; keypoint heads, when the model has
/// them, are ignored since the face mesh supplies its own landmarks.
pub struct FaceDetector {
    session: Session,
    input_size: (i32, i32),
    conf_threshold: f32,
    nms_threshold: f32,
    num_anchors: usize,
    strides: Vec<i32>,
    anchor_cache: HashMap<(i32, i32, i32), Vec<(f32, f32)>>,
}

impl FaceDetector {
    /// Create a new face detector from an `ONNX` model file
    ///
    /// # Errors
    ///
    /// Returns an error if the model cannot be loaded or has no inputs
    pub fn new<P: AsRef<Path>>(model_path: P, conf_threshold: f32, nms_threshold: f32) -> Result<Self> {
        log::info!(
            "Initializing FaceDetector with model: {}",
            model_path.as_ref().display()
        );
        let environment = Arc::new(
            Environment::builder()
                .with_name("face_detector")
                .with_log_level(ort::LoggingLevel::Warning)
                .build()?,
        );

        let session = ort::SessionBuilder::new(&environment)?
            .with_optimization_level(ort::GraphOptimizationLevel::Level3)?
            .with_model_from_file(model_path)?;

        let input_meta = session
            .inputs
            .first()
            .ok_or_else(|| Error::ModelError("Face detector has no inputs".to_string()))?;

        // Input shape is [batch, channels, height, width]; dynamic axes fall back to the default
        let dims = &input_meta.dimensions;
        let dim = |i: usize| {
            dims.get(i)
                .copied()
                .flatten()
                .and_then(|d| i32::try_from(d).ok())
                .unwrap_or(DEFAULT_DETECTOR_INPUT_SIZE)
        };
        let input_size = (dim(3), dim(2));

        let (strides, num_anchors) = Self::layout_for_outputs(session.outputs.len());

        Ok(Self {
            session,
            input_size,
            conf_threshold,
            nms_threshold,
            num_anchors,
            strides,
            anchor_cache: HashMap::new(),
        })
    }

    /// Stride layout of the SCRFD variant, keyed by its output count
    fn layout_for_outputs(num_outputs: usize) -> (Vec<i32>, usize) {
        match num_outputs {
            6 | 9 => (vec![8, 16, 32], 2),
            10 | 15 => (vec![8, 16, 32, 64, 128], 1),
            n => {
                log::warn!("Unknown face detector layout with {} outputs, assuming 3 strides", n);
                (vec![8, 16, 32], 2)
            }
        }
    }

    /// Detect the single most confident face, if any
    ///
    /// # Errors
    ///
    /// Returns an error if preprocessing or inference fails
    pub fn detect_primary(&mut self, image: &Mat) -> Result<Option<FaceDetection>> {
        let faces = self.detect(image)?;
        Ok(faces.into_iter().next())
    }

    /// Detect faces, sorted by descending score after NMS
    ///
    /// # Errors
    ///
    /// Returns an error if preprocessing or inference fails
    pub fn detect(&mut self, image: &Mat) -> Result<Vec<FaceDetection>> {
        let img_height = image.rows();
        let img_width = image.cols();
        if img_width <= 0 || img_height <= 0 {
            return Ok(Vec::new());
        }

        // Letterbox into the model input, keeping the aspect ratio
        let (input_width, input_height) = self.input_size;
        let ratio_img = img_height as f32 / img_width as f32;
        let ratio_model = input_height as f32 / input_width as f32;
        let (new_width, new_height) = if ratio_img > ratio_model {
            ((input_height as f32 / ratio_img) as i32, input_height)
        } else {
            (input_width, (input_width as f32 * ratio_img) as i32)
        };
        let det_scale = new_height as f32 / img_height as f32;

        let mut resized = Mat::default();
        imgproc::resize(
            image,
            &mut resized,
            Size::new(new_width, new_height),
            0.0,
            0.0,
            InterpolationFlags::INTER_LINEAR as i32,
        )?;

        let mut det_img = Mat::new_rows_cols_with_default(input_height, input_width, CV_8UC3, Scalar::all(0.0))?;
        {
            let mut roi = det_img.roi_mut(Rect::new(0, 0, new_width, new_height))?;
            resized.copy_to(&mut roi)?;
        }

        let inputs = Self::preprocess(&det_img)?;
        let candidates = self.forward(inputs)?;

        let scaled = candidates
            .into_iter()
            .map(|(score, [x1, y1, x2, y2])| (score, [x1 / det_scale, y1 / det_scale, x2 / det_scale, y2 / det_scale]))
            .collect();

        let mut detections: Vec<FaceDetection> = Self::nms(scaled, self.nms_threshold)
            .into_iter()
            .map(|(score, [x1, y1, x2, y2])| FaceDetection {
                bbox: Rect::new(x1 as i32, y1 as i32, (x2 - x1) as i32, (y2 - y1) as i32),
                score,
            })
            .collect();

        detections.retain(|d| d.bbox.width > 0 && d.bbox.height > 0);
        log::debug!("Detected {} face(s)", detections.len());
        Ok(detections)
    }

    /// Normalize a BGR image into an NCHW tensor
    #[allow(clippy::cast_sign_loss)] // OpenCV dimensions are positive
    fn preprocess(image: &Mat) -> Result<Array4<f32>> {
        let mut rgb_image = Mat::default();
        imgproc::cvt_color(image, &mut rgb_image, imgproc::COLOR_BGR2RGB, 0)?;

        let mut float_image = Mat::default();
        rgb_image.convert_to(&mut float_image, CV_32F, 1.0, 0.0)?;

        let height = float_image.rows() as usize;
        let width = float_image.cols() as usize;
        let mut array = Array4::<f32>::zeros((1, 3, height, width));

        for row in 0..height {
            for col in 0..width {
                let pixel = float_image.at_2d::<Vec3f>(usize_to_i32(row)?, usize_to_i32(col)?)?;
                for ch in 0..3 {
                    array[[0, ch, row, col]] = (pixel[ch] - IMAGE_NORMALIZATION_OFFSET) / IMAGE_NORMALIZATION_SCALE;
                }
            }
        }

        Ok(array)
    }

    /// Run the model and decode every candidate above the confidence threshold
    fn forward(&mut self, inputs: Array4<f32>) -> Result<Vec<(f32, Corners)>> {
        let input_height = inputs.shape()[2] as i32;
        let input_width = inputs.shape()[3] as i32;

        let cow_array = CowArray::from(inputs.into_dyn());
        let input_tensor = Value::from_array(self.session.allocator(), &cow_array)?;
        let outputs = self.session.run(vec![input_tensor])?;

        let offset = self.strides.len();
        if outputs.len() < offset * 2 {
            return Err(Error::ModelOutputError(format!(
                "Expected at least {} detector outputs, got {}",
                offset * 2,
                outputs.len()
            )));
        }

        let mut candidates = Vec::new();
        let strides = self.strides.clone();
        for (idx, &stride) in strides.iter().enumerate() {
            let scores_tensor = outputs[idx].try_extract::<f32>()?;
            let scores_view = scores_tensor.view();
            let scores = scores_view
                .as_slice()
                .ok_or_else(|| Error::ModelOutputError("Non-contiguous score output".to_string()))?;

            let bbox_tensor = outputs[idx + offset].try_extract::<f32>()?;
            let bbox_view = bbox_tensor.view();
            let distances = bbox_view
                .as_slice()
                .ok_or_else(|| Error::ModelOutputError("Non-contiguous bbox output".to_string()))?;

            let anchors = self.anchor_centers(input_height / stride, input_width / stride, stride);
            if distances.len() < anchors.len() * 4 || scores.len() < anchors.len() {
                return Err(Error::ModelDataFormatError(format!(
                    "Stride {} output does not cover {} anchors",
                    stride,
                    anchors.len()
                )));
            }

            for (i, &(cx, cy)) in anchors.iter().enumerate() {
                let score = scores[i];
                if score < self.conf_threshold {
                    continue;
                }
                let d = &distances[i * 4..i * 4 + 4];
                let scale = stride as f32;
                let bbox = Self::distance_to_bbox((cx, cy), [d[0] * scale, d[1] * scale, d[2] * scale, d[3] * scale]);
                candidates.push((score, bbox));
            }
        }

        Ok(candidates)
    }

    /// Anchor centers for one stride, cached by feature map shape
    fn anchor_centers(&mut self, height: i32, width: i32, stride: i32) -> Vec<(f32, f32)> {
        let num_anchors = self.num_anchors;
        self.anchor_cache
            .entry((height, width, stride))
            .or_insert_with(|| {
                let mut centers = Vec::with_capacity((height * width).max(0) as usize * num_anchors);
                for y in 0..height {
                    for x in 0..width {
                        for _ in 0..num_anchors {
                            centers.push(((x * stride) as f32, (y * stride) as f32));
                        }
                    }
                }
                centers
            })
            .clone()
    }

    /// Convert left/top/right/bottom distances from an anchor into corners
    fn distance_to_bbox(center: (f32, f32), distances: [f32; 4]) -> Corners {
        let (cx, cy) = center;
        [cx - distances[0], cy - distances[1], cx + distances[2], cy + distances[3]]
    }

    /// Greedy non-maximum suppression, highest score first
    fn nms(mut candidates: Vec<(f32, Corners)>, iou_threshold: f32) -> Vec<(f32, Corners)> {
        candidates.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

        let mut keep: Vec<(f32, Corners)> = Vec::new();
        for candidate in candidates {
            if keep.iter().all(|kept| Self::iou(&kept.1, &candidate.1) <= iou_threshold) {
                keep.push(candidate);
            }
        }
        keep
    }

    /// Intersection over union, with the +1 pixel convention
    fn iou(a: &Corners, b: &Corners) -> f32 {
        let area = |c: &Corners| (c[2] - c[0] + 1.0) * (c[3] - c[1] + 1.0);
        let w = (a[2].min(b[2]) - a[0].max(b[0]) + 1.0).max(0.0);
        let h = (a[3].min(b[3]) - a[1].max(b[1]) + 1.0).max(0.0);
        let inter = w * h;
        inter / (area(a) + area(b) - inter)
    }
}
