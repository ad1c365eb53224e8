//! Frame processing from landmarks through calibration to scroll intents

mod test_helpers;

use head_scroller::{
    app::{FrameOutcome, FrameProcessor, SkipReason},
    calibration::ScrollIntent,
    constants::CALIBRATION_SAMPLES,
    landmarks::{FacialKeyPoints, LandmarkSet},
};
use opencv::core::Point2f;
use test_helpers::{create_test_frame, mesh_with_key_points, rotation_from_degrees, ScriptedProvider};

fn tracked_intent(outcome: FrameOutcome) -> ScrollIntent {
    match outcome {
        FrameOutcome::Tracked { intent, .. } => intent,
        FrameOutcome::Skipped(reason) => panic!("frame unexpectedly skipped: {reason:?}"),
    }
}

#[test]
fn test_calibrates_then_scrolls() {
    let level = rotation_from_degrees(0.0, 0.0, 0.0);
    let mut provider = ScriptedProvider::new();
    for _ in 0..CALIBRATION_SAMPLES {
        provider.push_face(&level);
    }
    provider.push_face(&rotation_from_degrees(0.0, 0.0, 15.0));
    provider.push_face(&rotation_from_degrees(0.0, 0.0, -15.0));
    provider.push_face(&level);

    let frame = create_test_frame().unwrap();
    let mut processor = FrameProcessor::new(provider).unwrap();

    for i in 1..=CALIBRATION_SAMPLES {
        match processor.process(&frame).unwrap() {
            FrameOutcome::Tracked {
                intent,
                completed_baseline,
                ..
            } => {
                assert_eq!(intent, ScrollIntent::None);
                assert_eq!(completed_baseline.is_some(), i == CALIBRATION_SAMPLES);
            }
            FrameOutcome::Skipped(reason) => panic!("frame {i} skipped: {reason:?}"),
        }
    }
    assert!(processor.calibrator().is_calibrated());

    assert_eq!(tracked_intent(processor.process(&frame).unwrap()), ScrollIntent::Down);
    assert_eq!(tracked_intent(processor.process(&frame).unwrap()), ScrollIntent::Up);
    assert_eq!(tracked_intent(processor.process(&frame).unwrap()), ScrollIntent::None);
}

#[test]
fn test_frames_without_face_do_not_count() {
    let mut provider = ScriptedProvider::new();
    provider.push_no_face();
    provider.push_face(&rotation_from_degrees(0.0, 0.0, 0.0));
    provider.push_no_face();

    let frame = create_test_frame().unwrap();
    let mut processor = FrameProcessor::new(provider).unwrap();

    assert_eq!(
        processor.process(&frame).unwrap(),
        FrameOutcome::Skipped(SkipReason::NoFace)
    );
    assert!(matches!(processor.process(&frame).unwrap(), FrameOutcome::Tracked { .. }));
    assert_eq!(
        processor.process(&frame).unwrap(),
        FrameOutcome::Skipped(SkipReason::NoFace)
    );

    assert_eq!(processor.calibrator().samples_collected(), 1);
}

#[test]
fn test_short_landmark_set_is_skipped() {
    let mut provider = ScriptedProvider::new();
    provider.push_landmarks(LandmarkSet::new(vec![Point2f::new(1.0, 1.0); 68]));

    let frame = create_test_frame().unwrap();
    let mut processor = FrameProcessor::new(provider).unwrap();

    assert_eq!(
        processor.process(&frame).unwrap(),
        FrameOutcome::Skipped(SkipReason::MissingKeyPoints)
    );
    assert_eq!(processor.calibrator().samples_collected(), 0);
}

#[test]
fn test_unsolvable_pose_does_not_count() {
    let collapsed = FacialKeyPoints::from_points([Point2f::new(320.0, 240.0); 6]);
    let mut provider = ScriptedProvider::new();
    provider.push_landmarks(mesh_with_key_points(&collapsed));
    provider.push_face(&rotation_from_degrees(0.0, 0.0, 0.0));

    let frame = create_test_frame().unwrap();
    let mut processor = FrameProcessor::new(provider).unwrap();

    // The solver may reject the points or fail outright; neither reaches calibration
    if let Ok(outcome) = processor.process(&frame) {
        assert_eq!(outcome, FrameOutcome::Skipped(SkipReason::NoPose));
    }
    assert_eq!(processor.calibrator().samples_collected(), 0);

    assert!(matches!(processor.process(&frame).unwrap(), FrameOutcome::Tracked { .. }));
    assert_eq!(processor.calibrator().samples_collected(), 1);
}

#[test]
fn test_baseline_ignores_interleaved_skipped_frames() {
    let scripted_rolls: Vec<f64> = (0..CALIBRATION_SAMPLES).map(|i| [-2.0, -1.0, 0.0, 1.0, 2.0][i % 5]).collect();

    let mut provider = ScriptedProvider::new();
    for &roll in &scripted_rolls {
        provider.push_face(&rotation_from_degrees(0.0, 0.0, roll));
        provider.push_no_face();
    }

    let frame = create_test_frame().unwrap();
    let mut processor = FrameProcessor::new(provider).unwrap();

    let mut tracked_rolls = Vec::new();
    let mut baseline = None;
    for _ in 0..(CALIBRATION_SAMPLES * 2) {
        match processor.process(&frame).unwrap() {
            FrameOutcome::Tracked {
                pose,
                intent,
                completed_baseline,
            } => {
                assert_eq!(intent, ScrollIntent::None);
                tracked_rolls.push(pose.roll);
                assert_eq!(completed_baseline.is_some(), tracked_rolls.len() == CALIBRATION_SAMPLES);
                if completed_baseline.is_some() {
                    baseline = completed_baseline;
                }
            }
            FrameOutcome::Skipped(reason) => assert_eq!(reason, SkipReason::NoFace),
        }
    }

    assert_eq!(tracked_rolls.len(), CALIBRATION_SAMPLES);
    let baseline = baseline.unwrap();

    #[allow(clippy::cast_precision_loss)]
    let tracked_mean = tracked_rolls.iter().sum::<f64>() / tracked_rolls.len() as f64;
    assert!((baseline.roll - tracked_mean).abs() < 1e-9);

    // Scripted rolls average to zero, so the baseline sits at the offset
    #[allow(clippy::cast_precision_loss)]
    let scripted_mean = scripted_rolls.iter().sum::<f64>() / scripted_rolls.len() as f64;
    assert!((baseline.roll - (180.0 + scripted_mean)).abs() < 0.5);
}

#[test]
#[ignore] // Requires the ONNX models in assets/
fn test_models_load() {
    use head_scroller::{config::Config, face_detection::FaceDetector, mesh_detection::FaceMeshDetector};

    let config = Config::default();
    let face_detector = FaceDetector::new(&config.models.face_detector, 0.5, 0.4).unwrap();
    let mesh = FaceMeshDetector::new(&config.models.face_mesh, face_detector, 0.25, 0.5).unwrap();

    // A blank frame has no face
    let mut processor = FrameProcessor::new(mesh).unwrap();
    let outcome = processor.process(&create_test_frame().unwrap()).unwrap();
    assert_eq!(outcome, FrameOutcome::Skipped(SkipReason::NoFace));
}
