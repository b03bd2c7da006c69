//! Digit templates and the bank that holds them.
//!
//! The built-in set is synthesized once from idealized line/circle strokes
//! and is identical on every run. User templates collected during calibration
//! are appended behind it and persisted as a whole through the store port;
//! the in-memory set is the session's source of truth.

use log::debug;

use crate::geom::Point;
use crate::normalize::{normalize, NormalizedPath};
use crate::store::{self, MemoryStore, TemplateStore};

/// A normalized reference path labeled with the digit it represents.
/// Immutable after creation.
#[derive(Clone, Debug, PartialEq)]
pub struct Template {
    label: char,
    path: NormalizedPath,
}

impl Template {
    /// Normalize a captured stroke into a template. `None` for labels outside
    /// '0'..='9'. Degeneracy filtering is the caller's job.
    pub fn from_stroke(label: char, stroke: &[Point]) -> Option<Self> {
        if !label.is_ascii_digit() {
            return None;
        }
        Some(Self {
            label,
            path: normalize(stroke),
        })
    }

    /// Rebuild a template from already-normalized parts (the load path).
    pub(crate) fn from_parts(label: char, path: NormalizedPath) -> Option<Self> {
        if !label.is_ascii_digit() {
            return None;
        }
        Some(Self { label, path })
    }

    pub fn label(&self) -> char {
        self.label
    }

    pub fn path(&self) -> &NormalizedPath {
        &self.path
    }
}

/// Built-in templates unioned with the user set, iterated built-ins first.
pub struct TemplateBank {
    builtin: Vec<Template>,
    user: Vec<Template>,
    store: Box<dyn TemplateStore>,
}

impl TemplateBank {
    /// Bank backed by a fresh in-memory store: built-ins only, nothing
    /// durable. The usual constructor for tests and throwaway sessions.
    pub fn builtin() -> Self {
        Self::with_store(Box::new(MemoryStore::new()))
    }

    /// Bank backed by the caller's store. Loads the persisted user set
    /// immediately; unreadable data just means an empty user set.
    pub fn with_store(mut store: Box<dyn TemplateStore>) -> Self {
        let builtin = builtin_templates();
        let user = store::load_user_templates(store.as_mut());
        debug!(
            "templates: bank ready builtin={} user={}",
            builtin.len(),
            user.len()
        );
        Self {
            builtin,
            user,
            store,
        }
    }

    /// Append a user template and persist the whole user collection,
    /// fire-and-forget. The in-memory set is updated first, so the next
    /// classification sees the template even if the write fails.
    pub fn append(&mut self, template: Template) {
        self.user.push(template);
        store::save_user_templates(self.store.as_mut(), &self.user);
    }

    /// Drop all user templates and delete the persisted collection.
    /// Built-ins are untouched.
    pub fn clear(&mut self) {
        self.user.clear();
        store::delete_user_templates(self.store.as_mut());
    }

    pub fn all(&self) -> impl Iterator<Item = &Template> {
        self.builtin.iter().chain(self.user.iter())
    }

    pub fn builtin_len(&self) -> usize {
        self.builtin.len()
    }

    pub fn user_len(&self) -> usize {
        self.user.len()
    }

    pub fn user(&self) -> &[Template] {
        &self.user
    }
}

/// Straight segment as an evenly spaced point run.
fn line(x1: f32, y1: f32, x2: f32, y2: f32) -> Vec<Point> {
    const STEPS: usize = 20;
    (0..=STEPS)
        .map(|i| {
            let t = i as f32 / STEPS as f32;
            Point::new(x1 + (x2 - x1) * t, y1 + (y2 - y1) * t)
        })
        .collect()
}

/// Full circle starting at the rightmost point, counter-clockwise in screen
/// coordinates.
fn circle(cx: f32, cy: f32, r: f32) -> Vec<Point> {
    const STEPS: usize = 40;
    (0..=STEPS)
        .map(|i| {
            let t = i as f32 / STEPS as f32 * core::f32::consts::TAU;
            Point::new(cx + r * t.cos(), cy + r * t.sin())
        })
        .collect()
}

fn joined(parts: &[Vec<Point>]) -> Vec<Point> {
    parts.iter().flatten().copied().collect()
}

/// The fixed shape table, drawn on a nominal 0..100 canvas. Digits with
/// common stylistic variants ('1', '4', '7', '9') carry one template per
/// variant; everything is normalized before entering the bank.
fn builtin_templates() -> Vec<Template> {
    let shape = |label: char, points: Vec<Point>| Template {
        label,
        path: normalize(&points),
    };

    vec![
        shape('0', circle(50.0, 50.0, 40.0)),
        shape('1', line(50.0, 10.0, 50.0, 90.0)),
        shape(
            '1',
            vec![
                Point::new(30.0, 20.0),
                Point::new(50.0, 10.0),
                Point::new(50.0, 90.0),
            ],
        ),
        shape(
            '2',
            joined(&[
                line(10.0, 20.0, 90.0, 20.0),
                line(90.0, 20.0, 50.0, 50.0),
                line(50.0, 50.0, 10.0, 90.0),
                line(10.0, 90.0, 90.0, 90.0),
            ]),
        ),
        shape(
            '3',
            joined(&[
                line(20.0, 20.0, 80.0, 20.0),
                line(80.0, 20.0, 50.0, 50.0),
                line(50.0, 50.0, 80.0, 80.0),
                line(80.0, 80.0, 20.0, 80.0),
            ]),
        ),
        shape(
            '4',
            joined(&[
                line(70.0, 10.0, 70.0, 90.0),
                line(20.0, 50.0, 80.0, 50.0),
                line(20.0, 10.0, 70.0, 90.0),
            ]),
        ),
        shape(
            '4',
            joined(&[line(70.0, 10.0, 70.0, 90.0), line(20.0, 50.0, 80.0, 50.0)]),
        ),
        shape(
            '5',
            joined(&[
                line(80.0, 20.0, 20.0, 20.0),
                line(20.0, 20.0, 20.0, 50.0),
                line(20.0, 50.0, 80.0, 50.0),
                line(80.0, 50.0, 80.0, 90.0),
                line(80.0, 90.0, 20.0, 90.0),
            ]),
        ),
        shape(
            '6',
            joined(&[circle(55.0, 55.0, 35.0), line(55.0, 55.0, 20.0, 80.0)]),
        ),
        shape(
            '7',
            joined(&[line(10.0, 20.0, 90.0, 20.0), line(90.0, 20.0, 40.0, 90.0)]),
        ),
        shape(
            '7',
            joined(&[
                line(10.0, 20.0, 90.0, 20.0),
                line(90.0, 20.0, 60.0, 60.0),
                line(60.0, 60.0, 50.0, 90.0),
            ]),
        ),
        shape(
            '8',
            joined(&[circle(50.0, 35.0, 18.0), circle(50.0, 70.0, 22.0)]),
        ),
        shape(
            '9',
            joined(&[circle(50.0, 40.0, 25.0), line(60.0, 55.0, 70.0, 90.0)]),
        ),
        shape(
            '9',
            joined(&[circle(50.0, 40.0, 25.0), line(50.0, 55.0, 50.0, 90.0)]),
        ),
    ]
}
