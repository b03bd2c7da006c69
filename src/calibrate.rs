//! Guided calibration: walks the user through the ten digits in order,
//! collecting a fixed number of accepted samples per digit and appending each
//! as a personalized template. One owned session holds the only copy of the
//! progress counters.

use log::debug;

use crate::config::{DIGIT_LABELS, SAMPLES_PER_DIGIT};
use crate::geom::{too_small, Point};
use crate::template::{Template, TemplateBank};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CalibrationPhase {
    Idle,
    AwaitingSample,
    Complete,
}

/// What a `commit` did with the stroke it was handed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CalibrationDispatch {
    /// Not collecting: the session is idle or already complete.
    Inactive,
    /// Degenerate stroke; nothing stored, nothing advanced.
    Ignored,
    /// Sample stored; the current digit still needs more samples.
    Stored,
    /// Sample stored and the prompt moved on to the next digit.
    Advanced,
    /// Sample stored and every digit is done; the session is complete.
    Finished,
}

pub struct CalibrationSession {
    phase: CalibrationPhase,
    digit_index: u8,
    samples_collected: u8,
}

impl CalibrationSession {
    pub fn new() -> Self {
        Self {
            phase: CalibrationPhase::Idle,
            digit_index: 0,
            samples_collected: 0,
        }
    }

    /// Start collecting from digit 0, sample 0. A completed session stays
    /// complete; only `reset` re-opens it.
    pub fn begin(&mut self) {
        if self.phase == CalibrationPhase::Complete {
            return;
        }
        self.phase = CalibrationPhase::AwaitingSample;
        self.digit_index = 0;
        self.samples_collected = 0;
        debug!("calibration: begin digit={}", DIGIT_LABELS[0]);
    }

    /// Leave calibration mode without touching collected templates.
    pub fn cancel(&mut self) {
        if self.phase == CalibrationPhase::AwaitingSample {
            self.phase = CalibrationPhase::Idle;
        }
    }

    /// Feed one committed stroke into the session. Accepted samples become
    /// user templates immediately; the dispatch tells the caller how the
    /// prompt moved.
    pub fn commit(&mut self, stroke: &[Point], bank: &mut TemplateBank) -> CalibrationDispatch {
        if self.phase != CalibrationPhase::AwaitingSample {
            return CalibrationDispatch::Inactive;
        }
        if too_small(stroke) {
            debug!("calibration: sample ignored points={}", stroke.len());
            return CalibrationDispatch::Ignored;
        }

        let digit = DIGIT_LABELS[self.digit_index as usize];
        let Some(template) = Template::from_stroke(digit, stroke) else {
            return CalibrationDispatch::Ignored;
        };
        bank.append(template);
        self.samples_collected += 1;
        debug!(
            "calibration: stored digit={} sample={}",
            digit, self.samples_collected
        );

        if self.samples_collected < SAMPLES_PER_DIGIT {
            return CalibrationDispatch::Stored;
        }
        self.samples_collected = 0;
        self.digit_index += 1;
        if (self.digit_index as usize) < DIGIT_LABELS.len() {
            debug!(
                "calibration: next digit={}",
                DIGIT_LABELS[self.digit_index as usize]
            );
            return CalibrationDispatch::Advanced;
        }
        self.phase = CalibrationPhase::Complete;
        debug!("calibration: completed");
        CalibrationDispatch::Finished
    }

    /// Drop every user template and restart the prompts. An idle session
    /// stays idle; an active or completed one returns to digit 0, sample 0.
    pub fn reset(&mut self, bank: &mut TemplateBank) {
        bank.clear();
        self.digit_index = 0;
        self.samples_collected = 0;
        if self.phase != CalibrationPhase::Idle {
            self.phase = CalibrationPhase::AwaitingSample;
        }
        debug!("calibration: reset");
    }

    pub fn phase(&self) -> CalibrationPhase {
        self.phase
    }

    pub fn is_active(&self) -> bool {
        self.phase == CalibrationPhase::AwaitingSample
    }

    /// Digit the user should draw next, while the session is collecting.
    pub fn prompt(&self) -> Option<char> {
        if self.phase != CalibrationPhase::AwaitingSample {
            return None;
        }
        DIGIT_LABELS.get(self.digit_index as usize).copied()
    }

    /// (digit index, samples collected for it so far).
    pub fn progress(&self) -> (u8, u8) {
        (self.digit_index, self.samples_collected)
    }
}

impl Default for CalibrationSession {
    fn default() -> Self {
        Self::new()
    }
}
