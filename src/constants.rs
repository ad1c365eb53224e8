//! Constants used throughout the application

/// Number of points produced by the face mesh model
pub const NUM_FACE_MESH_LANDMARKS: usize = 468;

/// Side length of the square face mesh model input
pub const FACE_MESH_INPUT_SIZE: i32 = 192;

/// Values per mesh point in the model output (x, y, z)
pub const FACE_MESH_VALUES_PER_POINT: usize = 3;

/// Mesh indices of the pose key points: nose tip, chin, left eye outer corner,
/// right eye outer corner, left mouth corner, right mouth corner
pub const KEY_POINT_INDICES: [usize; 6] = [1, 152, 226, 350, 78, 308];

/// Canonical 3D face model, in the same order as [`KEY_POINT_INDICES`]
pub const CANONICAL_FACE_MODEL: [[f64; 3]; 6] = [
    [0.0, 0.0, 0.0],
    [0.0, -330.0, -65.0],
    [-225.0, 170.0, -135.0],
    [225.0, 170.0, -135.0],
    [-150.0, -150.0, -125.0],
    [150.0, -150.0, -125.0],
];

/// Offset added to every Euler angle, shifting (-180, 180] into [0, 360)
pub const ANGLE_OFFSET_DEGREES: f64 = 180.0;

/// Camera matrix center factor
pub const CAMERA_CENTER_FACTOR: f64 = 2.0;

/// Accepted pose samples averaged into the neutral baseline
pub const CALIBRATION_SAMPLES: usize = 120;

/// Roll deviation (degrees) tolerated around the baseline without scrolling
pub const DEAD_ZONE_DEGREES: f64 = 10.0;

/// Roll deviation above which the reading wrapped past the 0/360 seam
pub const WRAPAROUND_DEGREES: f64 = 300.0;

/// Wheel units injected per frame that qualifies for scrolling
pub const SCROLL_STEP: f64 = 0.3;

/// Requested capture size and rate
pub const DEFAULT_FRAME_WIDTH: i32 = 640;
pub const DEFAULT_FRAME_HEIGHT: i32 = 480;
pub const DEFAULT_FPS: f64 = 30.0;

/// Image normalization constants for face detection
pub const IMAGE_NORMALIZATION_OFFSET: f32 = 127.5;
pub const IMAGE_NORMALIZATION_SCALE: f32 = 128.0;

/// Default SCRFD input size when the model does not fix it
pub const DEFAULT_DETECTOR_INPUT_SIZE: i32 = 640;
