//! Key-value persistence port for the user template collection.
//!
//! The library defines the port and the record codec; the embedding
//! application provides the durable adapter. Everything here fails soft:
//! unreadable bytes load as an empty set, write and delete errors are logged
//! and dropped, and nothing blocks recognition.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::config::USER_TEMPLATES_KEY;
use crate::geom::Point;
use crate::normalize::NormalizedPath;
use crate::template::Template;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreError {
    WriteFailed,
    DeleteFailed,
}

/// Byte store the bank persists through. Absence of a key is not an error.
pub trait TemplateStore {
    fn get(&mut self, key: &str) -> Option<Vec<u8>>;
    fn set(&mut self, key: &str, bytes: &[u8]) -> Result<(), StoreError>;
    fn delete(&mut self, key: &str) -> Result<(), StoreError>;
}

/// In-memory store for tests and volatile embeddings. Clones share one map,
/// so a handle kept by the caller observes what the bank wrote. Single
/// threaded by the library's own contract, hence `Rc`.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    entries: Rc<RefCell<HashMap<String, Vec<u8>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TemplateStore for MemoryStore {
    fn get(&mut self, key: &str) -> Option<Vec<u8>> {
        self.entries.borrow().get(key).cloned()
    }

    fn set(&mut self, key: &str, bytes: &[u8]) -> Result<(), StoreError> {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), bytes.to_vec());
        Ok(())
    }

    fn delete(&mut self, key: &str) -> Result<(), StoreError> {
        self.entries.borrow_mut().remove(key);
        Ok(())
    }
}

/// Wire shape of one persisted template: a single-character digit label and
/// exactly the fixed point count, as a JSON array under [`USER_TEMPLATES_KEY`].
#[derive(Serialize, Deserialize)]
struct StoredTemplate {
    label: String,
    points: Vec<StoredPoint>,
}

#[derive(Clone, Serialize, Deserialize)]
struct StoredPoint {
    x: f32,
    y: f32,
}

pub(crate) fn load_user_templates(store: &mut dyn TemplateStore) -> Vec<Template> {
    let Some(bytes) = store.get(USER_TEMPLATES_KEY) else {
        return Vec::new();
    };
    let records: Vec<StoredTemplate> = match serde_json::from_slice(&bytes) {
        Ok(records) => records,
        Err(err) => {
            warn!("store: user templates unreadable err={}", err);
            return Vec::new();
        }
    };
    let mut templates = Vec::with_capacity(records.len());
    for record in records {
        match decode_record(&record) {
            Some(template) => templates.push(template),
            None => warn!(
                "store: skipped invalid template record label={:?} points={}",
                record.label,
                record.points.len()
            ),
        }
    }
    templates
}

pub(crate) fn save_user_templates(store: &mut dyn TemplateStore, templates: &[Template]) {
    let records: Vec<StoredTemplate> = templates.iter().map(encode_record).collect();
    let bytes = match serde_json::to_vec(&records) {
        Ok(bytes) => bytes,
        Err(err) => {
            warn!("store: user templates encode failed err={}", err);
            return;
        }
    };
    if let Err(err) = store.set(USER_TEMPLATES_KEY, &bytes) {
        warn!(
            "store: user templates save failed err={:?} count={}",
            err,
            templates.len()
        );
    }
}

pub(crate) fn delete_user_templates(store: &mut dyn TemplateStore) {
    if let Err(err) = store.delete(USER_TEMPLATES_KEY) {
        warn!("store: user templates delete failed err={:?}", err);
    }
}

fn encode_record(template: &Template) -> StoredTemplate {
    StoredTemplate {
        label: template.label().to_string(),
        points: template
            .path()
            .points()
            .iter()
            .map(|p| StoredPoint { x: p.x, y: p.y })
            .collect(),
    }
}

fn decode_record(record: &StoredTemplate) -> Option<Template> {
    let mut chars = record.label.chars();
    let label = chars.next()?;
    if chars.next().is_some() {
        return None;
    }
    let points: Vec<Point> = record
        .points
        .iter()
        .map(|p| Point::new(p.x, p.y))
        .collect();
    let path = NormalizedPath::from_slice(&points)?;
    Template::from_parts(label, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RESAMPLE_POINT_COUNT;

    fn sample_template(label: char, tilt: f32) -> Template {
        let stroke: Vec<Point> = (0..20)
            .map(|i| Point::new(30.0 + i as f32 * tilt, 10.0 + i as f32 * 4.0))
            .collect();
        Template::from_stroke(label, &stroke).unwrap()
    }

    #[test]
    fn memory_store_round_trips_bytes() {
        let mut store = MemoryStore::new();
        assert_eq!(store.get("k"), None);
        store.set("k", b"abc").unwrap();
        assert_eq!(store.get("k").as_deref(), Some(b"abc".as_slice()));
        store.delete("k").unwrap();
        assert_eq!(store.get("k"), None);
    }

    #[test]
    fn memory_store_clones_share_entries() {
        let mut a = MemoryStore::new();
        let mut b = a.clone();
        a.set("k", b"xyz").unwrap();
        assert_eq!(b.get("k").as_deref(), Some(b"xyz".as_slice()));
    }

    #[test]
    fn save_then_load_round_trips_templates() {
        let mut store = MemoryStore::new();
        let templates = vec![sample_template('3', 1.5), sample_template('8', 0.4)];
        save_user_templates(&mut store, &templates);
        let loaded = load_user_templates(&mut store);
        assert_eq!(loaded, templates);
    }

    #[test]
    fn missing_key_loads_empty() {
        let mut store = MemoryStore::new();
        assert!(load_user_templates(&mut store).is_empty());
    }

    #[test]
    fn unreadable_bytes_load_empty() {
        let mut store = MemoryStore::new();
        store.set(USER_TEMPLATES_KEY, b"not json at all").unwrap();
        assert!(load_user_templates(&mut store).is_empty());
    }

    #[test]
    fn invalid_records_are_skipped_not_fatal() {
        let good = encode_record(&sample_template('5', 1.0));
        let bad_label = StoredTemplate {
            label: "55".to_string(),
            points: good.points.iter().map(|p| StoredPoint { x: p.x, y: p.y }).collect(),
        };
        let bad_count = StoredTemplate {
            label: "6".to_string(),
            points: vec![StoredPoint { x: 0.0, y: 0.0 }; RESAMPLE_POINT_COUNT - 3],
        };
        let bytes = serde_json::to_vec(&vec![good, bad_label, bad_count]).unwrap();
        let mut store = MemoryStore::new();
        store.set(USER_TEMPLATES_KEY, &bytes).unwrap();

        let loaded = load_user_templates(&mut store);
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].label(), '5');
    }
}
