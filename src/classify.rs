//! Digit classification over the template bank.
//!
//! `Classifier` is the seam between the two recognizer variants: the
//! geometric nearest-template matcher (the canonical default) and a
//! model-backed alternate that delegates to an external inference service.
//! The engine owns whichever one it was constructed with; nothing selects a
//! backend at runtime.

use log::debug;

use crate::config::{MODEL_MIN_CONFIDENCE, SCALE_BOX_SIZE, SCORE_TOLERANCE_FACTOR};
use crate::geom::{too_small, Point};
use crate::normalize::normalize;
use crate::template::TemplateBank;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Recognition {
    pub digit: char,
    pub score: f32,
}

/// Classification capability. Returns the best available match, which may
/// score below the acceptance threshold; accepting or discarding it is the
/// caller's decision. `None` means no usable recognition at all: a degenerate
/// stroke, an empty bank, or an absent model.
pub trait Classifier {
    fn classify(&mut self, stroke: &[Point], bank: &TemplateBank) -> Option<Recognition>;
}

/// 1-nearest-neighbor matcher over the bank: mean per-index distance between
/// the normalized stroke and each template, mapped to a score. Correctness
/// rests on normalization quality, not on metric sophistication.
#[derive(Clone, Copy, Debug, Default)]
pub struct TemplateMatcher;

impl Classifier for TemplateMatcher {
    fn classify(&mut self, stroke: &[Point], bank: &TemplateBank) -> Option<Recognition> {
        if too_small(stroke) {
            debug!("classify: stroke too small points={}", stroke.len());
            return None;
        }
        let path = normalize(stroke);
        // Score hits zero when the mean deviation reaches this share of the
        // comparison-square diagonal; it can go negative for wild strokes.
        let ceiling = SCORE_TOLERANCE_FACTOR * SCALE_BOX_SIZE.hypot(SCALE_BOX_SIZE);

        let mut best: Option<Recognition> = None;
        for template in bank.all() {
            let score = 1.0 - path.mean_distance_to(template.path()) / ceiling;
            let better = match best {
                Some(current) => score > current.score,
                None => true,
            };
            if better {
                best = Some(Recognition {
                    digit: template.label(),
                    score,
                });
            }
        }
        if let Some(hit) = best {
            debug!(
                "classify: best digit={} score={:.3} points={}",
                hit.digit,
                hit.score,
                stroke.len()
            );
        }
        best
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ModelGuess {
    pub digit: char,
    pub confidence: f32,
}

/// Port to an external inference service. The service itself (tensors,
/// network, whatever) stays outside the crate; `None` covers both "no answer"
/// and "model unavailable".
pub trait DigitModel {
    fn infer(&mut self, stroke: &[Point]) -> Option<ModelGuess>;
}

/// Alternate backend: same degeneracy precondition as the matcher, then
/// delegates to the model port and discards low-confidence guesses.
pub struct ModelClassifier {
    model: Box<dyn DigitModel>,
    min_confidence: f32,
}

impl ModelClassifier {
    pub fn new(model: Box<dyn DigitModel>) -> Self {
        Self {
            model,
            min_confidence: MODEL_MIN_CONFIDENCE,
        }
    }
}

impl Classifier for ModelClassifier {
    fn classify(&mut self, stroke: &[Point], _bank: &TemplateBank) -> Option<Recognition> {
        if too_small(stroke) {
            return None;
        }
        let guess = self.model.infer(stroke)?;
        if !guess.digit.is_ascii_digit() {
            debug!("classify: model produced non-digit {:?}", guess.digit);
            return None;
        }
        if guess.confidence < self.min_confidence {
            debug!(
                "classify: model guess below floor digit={} confidence={:.3}",
                guess.digit, guess.confidence
            );
            return None;
        }
        Some(Recognition {
            digit: guess.digit,
            score: guess.confidence,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::Template;

    fn segment(x1: f32, y1: f32, x2: f32, y2: f32, steps: usize) -> Vec<Point> {
        (0..=steps)
            .map(|i| {
                let t = i as f32 / steps as f32;
                Point::new(x1 + (x2 - x1) * t, y1 + (y2 - y1) * t)
            })
            .collect()
    }

    fn polyline(corners: &[(f32, f32)], steps: usize) -> Vec<Point> {
        let mut out = Vec::new();
        for pair in corners.windows(2) {
            out.extend(segment(pair[0].0, pair[0].1, pair[1].0, pair[1].1, steps));
        }
        out
    }

    #[test]
    fn vertical_stroke_classifies_as_one() {
        let mut matcher = TemplateMatcher;
        let bank = TemplateBank::builtin();
        let stroke = segment(50.0, 10.0, 50.0, 90.0, 20);
        let hit = matcher.classify(&stroke, &bank).unwrap();
        assert_eq!(hit.digit, '1');
        assert!(hit.score > 0.15, "score {}", hit.score);
    }

    #[test]
    fn degenerate_strokes_classify_as_none() {
        let mut matcher = TemplateMatcher;
        let bank = TemplateBank::builtin();

        let dot: Vec<Point> = (0..12)
            .map(|i| Point::new(50.0 + i as f32 * 0.2, 50.0 + i as f32 * 0.2))
            .collect();
        assert_eq!(matcher.classify(&dot, &bank), None);

        let sparse = segment(0.0, 0.0, 80.0, 80.0, 4);
        assert_eq!(matcher.classify(&sparse, &bank), None);
    }

    #[test]
    fn similarity_transforms_keep_the_label_and_score() {
        let mut matcher = TemplateMatcher;
        let bank = TemplateBank::builtin();
        let stroke = polyline(
            &[(10.0, 20.0), (90.0, 20.0), (50.0, 50.0), (10.0, 90.0), (90.0, 90.0)],
            12,
        );
        let base = matcher.classify(&stroke, &bank).unwrap();
        assert_eq!(base.digit, '2');

        let angle = 0.3_f32;
        let (sin, cos) = angle.sin_cos();
        let moved: Vec<Point> = stroke
            .iter()
            .map(|p| {
                let x = (p.x - 50.0) * cos - (p.y - 50.0) * sin;
                let y = (p.x - 50.0) * sin + (p.y - 50.0) * cos;
                Point::new(x * 1.7 + 140.0, y * 1.7 + 65.0)
            })
            .collect();
        let transformed = matcher.classify(&moved, &bank).unwrap();
        assert_eq!(transformed.digit, base.digit);
        assert!(transformed.score >= base.score * 0.9);
    }

    #[test]
    fn appended_user_template_wins_immediately() {
        let mut matcher = TemplateMatcher;
        let mut bank = TemplateBank::builtin();
        let zigzag = polyline(
            &[(10.0, 10.0), (90.0, 30.0), (10.0, 50.0), (90.0, 70.0), (10.0, 90.0)],
            10,
        );
        bank.append(Template::from_stroke('3', &zigzag).unwrap());

        let hit = matcher.classify(&zigzag, &bank).unwrap();
        assert_eq!(hit.digit, '3');
        assert!(hit.score > 0.9, "self match score {}", hit.score);
    }

    #[test]
    fn equal_scores_keep_the_first_template() {
        let mut matcher = TemplateMatcher;
        let mut bank = TemplateBank::builtin();
        let zigzag = polyline(
            &[(10.0, 10.0), (90.0, 30.0), (10.0, 50.0), (90.0, 70.0), (10.0, 90.0)],
            10,
        );
        bank.append(Template::from_stroke('2', &zigzag).unwrap());
        bank.append(Template::from_stroke('3', &zigzag).unwrap());

        let hit = matcher.classify(&zigzag, &bank).unwrap();
        assert_eq!(hit.digit, '2');
    }

    struct FakeModel {
        guess: Option<ModelGuess>,
    }

    impl DigitModel for FakeModel {
        fn infer(&mut self, _stroke: &[Point]) -> Option<ModelGuess> {
            self.guess
        }
    }

    #[test]
    fn model_backend_applies_the_confidence_floor() {
        let bank = TemplateBank::builtin();
        let stroke = segment(50.0, 10.0, 50.0, 90.0, 20);

        let mut weak = ModelClassifier::new(Box::new(FakeModel {
            guess: Some(ModelGuess {
                digit: '7',
                confidence: 0.2,
            }),
        }));
        assert_eq!(weak.classify(&stroke, &bank), None);

        let mut strong = ModelClassifier::new(Box::new(FakeModel {
            guess: Some(ModelGuess {
                digit: '7',
                confidence: 0.8,
            }),
        }));
        let hit = strong.classify(&stroke, &bank).unwrap();
        assert_eq!(hit.digit, '7');
        assert_eq!(hit.score, 0.8);
    }

    #[test]
    fn model_backend_rejects_degenerate_strokes() {
        let model = Box::new(FakeModel {
            guess: Some(ModelGuess {
                digit: '1',
                confidence: 0.9,
            }),
        });
        let mut classifier = ModelClassifier::new(model);
        let bank = TemplateBank::builtin();

        let tiny = [Point::new(1.0, 1.0), Point::new(2.0, 2.0)];
        assert_eq!(classifier.classify(&tiny, &bank), None);
    }

    #[test]
    fn absent_model_answer_is_no_recognition() {
        let mut classifier = ModelClassifier::new(Box::new(FakeModel { guess: None }));
        let bank = TemplateBank::builtin();
        let stroke = segment(50.0, 10.0, 50.0, 90.0, 20);
        assert_eq!(classifier.classify(&stroke, &bank), None);
    }
}
