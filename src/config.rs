//! Tuning constants for the recognition pipeline and the commit scheduler.

/// Points per normalized path. Every template and every normalized stroke has
/// exactly this many points, which keeps path comparison index-wise.
pub const RESAMPLE_POINT_COUNT: usize = 64;

/// Side of the square the longer bounding-box dimension is scaled to.
pub const SCALE_BOX_SIZE: f32 = 200.0;

/// Symmetric mean window applied before resampling.
pub const SMOOTH_WINDOW: usize = 3;

/// Strokes below both of these are treated as accidental contact and dropped
/// before normalization: a scribble spanning less than this many units in both
/// dimensions, or carrying fewer than this many raw points.
pub const MIN_STROKE_SPAN: f32 = 6.0;
pub const MIN_STROKE_POINTS: usize = 8;

/// Fraction of the comparison-square diagonal at which the match score reaches
/// zero. Larger values tolerate sloppier strokes.
pub const SCORE_TOLERANCE_FACTOR: f32 = 0.35;

/// Minimum score at which a classification is accepted into the answer buffer.
pub const ACCEPT_SCORE: f32 = 0.15;

/// Confidence floor for the model-backed classifier. Guesses below this are
/// discarded before the acceptance gate even sees them.
pub const MODEL_MIN_CONFIDENCE: f32 = 0.3;

/// Accepted samples collected per digit during calibration.
pub const SAMPLES_PER_DIGIT: u8 = 2;

/// Calibration prompt order. Also the only labels a template may carry.
pub const DIGIT_LABELS: [char; 10] = ['0', '1', '2', '3', '4', '5', '6', '7', '8', '9'];

/// Inactivity window before a buffered stroke is committed. The interactive
/// value keeps single-digit entry snappy; the relaxed value gives the slower
/// model-backed profile room for multi-contact digits.
pub const INTERACTIVE_COMMIT_DELAY_MS: u64 = 500;
pub const RELAXED_COMMIT_DELAY_MS: u64 = 1_200;

/// Capture buffer capacity. A digit drawn over a full relaxed window at a
/// 8 ms sample cadence stays well under this; points past capacity are dropped.
pub const STROKE_BUFFER_CAPACITY: usize = 1024;

/// Key under which the user template collection is persisted.
pub const USER_TEMPLATES_KEY: &str = "user_templates_v1";
