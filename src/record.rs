use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use crate::crop::{NormalizedCrop, TransformState};

/// Per-image editing state for the session, keyed by path.
///
/// `crop` stays `None` until a default has been captured; `touched` flips
/// after one second of dwell on the image or on the first explicit edit.
/// Until then the record is not authoritative and display falls back to the
/// computed default crop. `hidden` excludes the image from export and from
/// normal navigation without removing it from the sequence.
#[derive(Clone, Debug)]
pub struct PerImageRecord {
    pub crop: Option<NormalizedCrop>,
    pub ratio_label: String,
    pub transform: TransformState,
    pub touched: bool,
    pub hidden: bool,
}

impl PerImageRecord {
    fn new(ratio_label: &str) -> Self {
        Self {
            crop: None,
            ratio_label: ratio_label.to_owned(),
            transform: TransformState::default(),
            touched: false,
            hidden: false,
        }
    }
}

#[derive(Debug, Default)]
pub struct RecordStore {
    records: HashMap<PathBuf, PerImageRecord>,
}

impl RecordStore {
    pub fn get(&self, path: &Path) -> Option<&PerImageRecord> {
        self.records.get(path)
    }

    pub fn get_mut(&mut self, path: &Path) -> Option<&mut PerImageRecord> {
        self.records.get_mut(path)
    }

    pub fn entry(&mut self, path: &Path, ratio_label: &str) -> &mut PerImageRecord {
        self.records
            .entry(path.to_path_buf())
            .or_insert_with(|| PerImageRecord::new(ratio_label))
    }

    pub fn remove(&mut self, path: &Path) {
        self.records.remove(path);
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    pub fn is_hidden(&self, path: &Path) -> bool {
        self.records.get(path).is_some_and(|r| r.hidden)
    }

    /// Toggle the hidden flag, creating the record if needed. Returns the
    /// new state.
    pub fn toggle_hidden(&mut self, path: &Path, ratio_label: &str) -> bool {
        let record = self.entry(path, ratio_label);
        record.hidden = !record.hidden;
        record.hidden
    }
}
