//! Input scheduler: buffers contact points across strokes and commits the
//! buffer for recognition (or calibration) once the pen has been quiet for a
//! full inactivity window. The host feeds contact events plus a monotonic
//! millisecond clock and polls for deadlines; every call returns the actions
//! the host should perform.

use log::{debug, trace};
use statig::{blocking::IntoStateMachineExt as _, prelude::*};

use crate::calibrate::{CalibrationDispatch, CalibrationSession};
use crate::classify::{Classifier, TemplateMatcher};
use crate::config::{
    ACCEPT_SCORE, INTERACTIVE_COMMIT_DELAY_MS, RELAXED_COMMIT_DELAY_MS, SAMPLES_PER_DIGIT,
    STROKE_BUFFER_CAPACITY,
};
use crate::geom::Point;
use crate::template::TemplateBank;

type StrokeBuffer = heapless::Vec<Point, STROKE_BUFFER_CAPACITY>;

/// Commit-delay presets. `INTERACTIVE` suits direct template matching;
/// `RELAXED` leaves room for slower multi-stroke writing when recognition
/// itself is the expensive part.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EngineProfile {
    pub commit_delay_ms: u64,
}

impl EngineProfile {
    pub const INTERACTIVE: Self = Self {
        commit_delay_ms: INTERACTIVE_COMMIT_DELAY_MS,
    };
    pub const RELAXED: Self = Self {
        commit_delay_ms: RELAXED_COMMIT_DELAY_MS,
    };
}

impl Default for EngineProfile {
    fn default() -> Self {
        Self::INTERACTIVE
    }
}

/// Something the host should do in response to an engine call.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum EngineAction {
    /// The very first contact since construction (or full reset).
    FirstInput,
    /// A committed stroke was recognized and accepted.
    AppendDigit { digit: char, score: f32 },
    /// The answer accumulated so far should be submitted. Delivered on the
    /// call after the `AppendDigit` that earned it, never in the same output.
    SubmitAnswer,
    /// Calibration stored a sample for `digit` (1-based within the digit).
    SampleStored { digit: char, sample: u8 },
    /// Calibration moved on; `digit` is the next one to draw.
    DigitAdvanced { digit: char },
    /// Every digit has enough samples; calibration is done.
    CalibrationFinished,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct EngineOutput {
    pub actions: [Option<EngineAction>; 4],
}

#[derive(Debug, Default)]
struct DispatchContext {
    actions: [Option<EngineAction>; 4],
    commit: Option<StrokeBuffer>,
}

impl DispatchContext {
    fn emit(&mut self, action: EngineAction) {
        for slot in &mut self.actions {
            if slot.is_none() {
                *slot = Some(action);
                return;
            }
        }
    }

    fn finish(self) -> EngineOutput {
        EngineOutput {
            actions: self.actions,
        }
    }
}

#[derive(Clone, Copy, Debug)]
enum StrokeHsmEvent {
    Down { now_ms: u64, point: Point },
    Move { now_ms: u64, point: Point },
    Up { now_ms: u64 },
    Cancel { now_ms: u64 },
    Poll { now_ms: u64 },
    Flush,
}

/// Owns the whole recognition pipeline: the scheduler state machine, the
/// template bank, the classifier backend, and the calibration session.
pub struct StrokeEngine {
    profile: EngineProfile,
    machine: statig::blocking::StateMachine<StrokeHsm>,
    bank: TemplateBank,
    classifier: Box<dyn Classifier>,
    calibration: CalibrationSession,
    submit_pending: bool,
}

impl Default for StrokeEngine {
    fn default() -> Self {
        Self::new(
            EngineProfile::default(),
            TemplateBank::builtin(),
            Box::new(TemplateMatcher),
        )
    }
}

impl StrokeEngine {
    pub fn new(profile: EngineProfile, bank: TemplateBank, classifier: Box<dyn Classifier>) -> Self {
        Self {
            profile,
            machine: StrokeHsm::new(profile.commit_delay_ms).state_machine(),
            bank,
            classifier,
            calibration: CalibrationSession::new(),
            submit_pending: false,
        }
    }

    /// Contact went down at `point`.
    pub fn on_start(&mut self, now_ms: u64, point: Point) -> EngineOutput {
        self.dispatch(StrokeHsmEvent::Down { now_ms, point })
    }

    /// Contact moved to `point`.
    pub fn on_move(&mut self, now_ms: u64, point: Point) -> EngineOutput {
        self.dispatch(StrokeHsmEvent::Move { now_ms, point })
    }

    /// Contact lifted. The buffer is kept; a new contact inside the
    /// inactivity window extends the same glyph.
    pub fn on_end(&mut self, now_ms: u64) -> EngineOutput {
        self.dispatch(StrokeHsmEvent::Up { now_ms })
    }

    /// Contact was taken over or aborted by the host. Treated like a lift:
    /// points already buffered still count toward the pending glyph.
    pub fn on_cancel(&mut self, now_ms: u64) -> EngineOutput {
        self.dispatch(StrokeHsmEvent::Cancel { now_ms })
    }

    /// Clock tick. Commits the buffer once the armed deadline has passed;
    /// cheap no-op otherwise. Call this at whatever cadence the host has.
    pub fn poll(&mut self, now_ms: u64) -> EngineOutput {
        self.dispatch(StrokeHsmEvent::Poll { now_ms })
    }

    /// Enter calibration. Any in-flight stroke is dropped, not committed.
    pub fn begin_calibration(&mut self) -> EngineOutput {
        let output = self.dispatch(StrokeHsmEvent::Flush);
        self.calibration.begin();
        output
    }

    /// Leave calibration, keeping whatever samples were collected.
    pub fn end_calibration(&mut self) -> EngineOutput {
        let output = self.dispatch(StrokeHsmEvent::Flush);
        self.calibration.cancel();
        output
    }

    /// Drop every user template and restart the calibration prompts.
    pub fn reset_calibration(&mut self) -> EngineOutput {
        let output = self.dispatch(StrokeHsmEvent::Flush);
        self.calibration.reset(&mut self.bank);
        output
    }

    /// Back to the just-constructed state: empty buffer, no deadline, no
    /// pending submit, first-input re-armed. Templates are untouched.
    pub fn reset(&mut self) {
        self.machine = StrokeHsm::new(self.profile.commit_delay_ms).state_machine();
        self.calibration = CalibrationSession::new();
        self.submit_pending = false;
    }

    pub fn profile(&self) -> EngineProfile {
        self.profile
    }

    pub fn bank(&self) -> &TemplateBank {
        &self.bank
    }

    pub fn calibration(&self) -> &CalibrationSession {
        &self.calibration
    }

    pub fn into_bank(self) -> TemplateBank {
        self.bank
    }

    fn dispatch(&mut self, event: StrokeHsmEvent) -> EngineOutput {
        let mut context = DispatchContext::default();
        if self.submit_pending {
            self.submit_pending = false;
            context.emit(EngineAction::SubmitAnswer);
        }
        self.machine.handle_with_context(&event, &mut context);
        if let Some(stroke) = context.commit.take() {
            self.handle_commit(&stroke, &mut context);
        }
        context.finish()
    }

    fn handle_commit(&mut self, stroke: &[Point], context: &mut DispatchContext) {
        if self.calibration.is_active() {
            self.commit_calibration(stroke, context);
            return;
        }
        let Some(recognition) = self.classifier.classify(stroke, &self.bank) else {
            debug!("engine: stroke discarded points={}", stroke.len());
            return;
        };
        if recognition.score > ACCEPT_SCORE {
            debug!(
                "engine: accepted digit={} score={:.3}",
                recognition.digit, recognition.score
            );
            context.emit(EngineAction::AppendDigit {
                digit: recognition.digit,
                score: recognition.score,
            });
            self.submit_pending = true;
        } else {
            debug!(
                "engine: rejected digit={} score={:.3}",
                recognition.digit, recognition.score
            );
        }
    }

    fn commit_calibration(&mut self, stroke: &[Point], context: &mut DispatchContext) {
        let prompted = self.calibration.prompt();
        let collected = self.calibration.progress().1;
        match self.calibration.commit(stroke, &mut self.bank) {
            CalibrationDispatch::Stored => {
                if let Some(digit) = prompted {
                    context.emit(EngineAction::SampleStored {
                        digit,
                        sample: collected + 1,
                    });
                }
            }
            CalibrationDispatch::Advanced => {
                if let Some(digit) = prompted {
                    context.emit(EngineAction::SampleStored {
                        digit,
                        sample: SAMPLES_PER_DIGIT,
                    });
                }
                if let Some(next) = self.calibration.prompt() {
                    context.emit(EngineAction::DigitAdvanced { digit: next });
                }
            }
            CalibrationDispatch::Finished => {
                if let Some(digit) = prompted {
                    context.emit(EngineAction::SampleStored {
                        digit,
                        sample: SAMPLES_PER_DIGIT,
                    });
                }
                context.emit(EngineAction::CalibrationFinished);
            }
            CalibrationDispatch::Ignored | CalibrationDispatch::Inactive => {}
        }
    }
}

struct StrokeHsm {
    buffer: StrokeBuffer,
    deadline_ms: Option<u64>,
    commit_delay_ms: u64,
    started: bool,
}

impl StrokeHsm {
    fn new(commit_delay_ms: u64) -> Self {
        Self {
            buffer: StrokeBuffer::new(),
            deadline_ms: None,
            commit_delay_ms,
            started: false,
        }
    }

    fn note_input(&mut self, context: &mut DispatchContext) {
        if !self.started {
            self.started = true;
            context.emit(EngineAction::FirstInput);
        }
    }

    fn push_point(&mut self, point: Point) {
        // Full buffer drops the point rather than the glyph.
        if self.buffer.push(point).is_err() {
            return;
        }
        if self.buffer.len() % 10 == 0 {
            trace!("engine: stroke points={}", self.buffer.len());
        }
    }

    fn arm(&mut self, now_ms: u64) {
        self.deadline_ms = Some(now_ms.saturating_add(self.commit_delay_ms));
    }

    fn deadline_passed(&self, now_ms: u64) -> bool {
        self.deadline_ms.is_some_and(|deadline| now_ms >= deadline)
    }

    fn fire_commit(&mut self, context: &mut DispatchContext) {
        self.deadline_ms = None;
        context.commit = Some(std::mem::take(&mut self.buffer));
    }

    fn clear(&mut self) {
        self.buffer.clear();
        self.deadline_ms = None;
    }
}

#[state_machine(initial = "State::idle()")]
impl StrokeHsm {
    #[state]
    fn idle(&mut self, context: &mut DispatchContext, event: &StrokeHsmEvent) -> Outcome<State> {
        match event {
            StrokeHsmEvent::Down { now_ms, point } => {
                self.note_input(context);
                self.push_point(*point);
                self.arm(*now_ms);
                Transition(State::collecting())
            }
            StrokeHsmEvent::Move { now_ms, point } => {
                // Contact was already down when the previous commit fired.
                self.push_point(*point);
                self.arm(*now_ms);
                Transition(State::collecting())
            }
            StrokeHsmEvent::Up { now_ms } | StrokeHsmEvent::Cancel { now_ms } => {
                self.arm(*now_ms);
                Transition(State::settling())
            }
            StrokeHsmEvent::Poll { .. } => Handled,
            StrokeHsmEvent::Flush => {
                self.clear();
                Handled
            }
        }
    }

    #[state]
    fn collecting(
        &mut self,
        context: &mut DispatchContext,
        event: &StrokeHsmEvent,
    ) -> Outcome<State> {
        match event {
            StrokeHsmEvent::Down { now_ms, point } => {
                self.note_input(context);
                self.push_point(*point);
                self.arm(*now_ms);
                Handled
            }
            StrokeHsmEvent::Move { now_ms, point } => {
                self.push_point(*point);
                self.arm(*now_ms);
                Handled
            }
            StrokeHsmEvent::Up { now_ms } | StrokeHsmEvent::Cancel { now_ms } => {
                self.arm(*now_ms);
                Transition(State::settling())
            }
            StrokeHsmEvent::Poll { now_ms } => {
                // A held-still contact runs out the window just like a lift.
                if self.deadline_passed(*now_ms) {
                    self.fire_commit(context);
                    Transition(State::idle())
                } else {
                    Handled
                }
            }
            StrokeHsmEvent::Flush => {
                self.clear();
                Transition(State::idle())
            }
        }
    }

    #[state]
    fn settling(
        &mut self,
        context: &mut DispatchContext,
        event: &StrokeHsmEvent,
    ) -> Outcome<State> {
        match event {
            StrokeHsmEvent::Down { now_ms, point } => {
                self.note_input(context);
                self.push_point(*point);
                self.arm(*now_ms);
                Transition(State::collecting())
            }
            StrokeHsmEvent::Move { now_ms, point } => {
                self.push_point(*point);
                self.arm(*now_ms);
                Transition(State::collecting())
            }
            StrokeHsmEvent::Up { now_ms } | StrokeHsmEvent::Cancel { now_ms } => {
                self.arm(*now_ms);
                Handled
            }
            StrokeHsmEvent::Poll { now_ms } => {
                if self.deadline_passed(*now_ms) {
                    self.fire_commit(context);
                    Transition(State::idle())
                } else {
                    Handled
                }
            }
            StrokeHsmEvent::Flush => {
                self.clear();
                Transition(State::idle())
            }
        }
    }
}
