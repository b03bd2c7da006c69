//! On-line single-digit handwriting recognition. Raw contact points are
//! normalized into a fixed-length path, matched against built-in and
//! user-calibrated digit templates, and scheduled for commit once the pen
//! has been inactive for a full window. `engine::StrokeEngine` is the
//! entry point; the host feeds it contact events and a millisecond clock.

pub mod calibrate;
pub mod classify;
pub mod config;
pub mod engine;
pub mod geom;
pub mod normalize;
pub mod store;
pub mod template;

pub use calibrate::{CalibrationDispatch, CalibrationPhase, CalibrationSession};
pub use classify::{
    Classifier, DigitModel, ModelClassifier, ModelGuess, Recognition, TemplateMatcher,
};
pub use engine::{EngineAction, EngineOutput, EngineProfile, StrokeEngine};
pub use geom::{BoundingBox, Point};
pub use normalize::{normalize, NormalizedPath};
pub use store::{MemoryStore, StoreError, TemplateStore};
pub use template::{Template, TemplateBank};
