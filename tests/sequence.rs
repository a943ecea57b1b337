use std::path::{Path, PathBuf};

use batchcrop::crop::{NormalizedCrop, TransformState};
use batchcrop::record::RecordStore;
use batchcrop::sequence::Sequence;

fn paths(names: &[&str]) -> Vec<PathBuf> {
    names.iter().map(PathBuf::from).collect()
}

#[test]
fn sequence_derives_an_index_map() {
    let seq = Sequence::new(paths(&["a", "b", "c"]));
    assert_eq!(seq.len(), 3);
    assert_eq!(seq.index_of(Path::new("b")), Some(1));
    assert_eq!(seq.index_of(Path::new("zz")), None);
    assert_eq!(seq.get(2), Some(&PathBuf::from("c")));
}

#[test]
fn sequence_push_ignores_duplicates() {
    let mut seq = Sequence::new(paths(&["a", "b"]));
    seq.push(PathBuf::from("a"));
    assert_eq!(seq.len(), 2);
    seq.push(PathBuf::from("c"));
    assert_eq!(seq.len(), 3);
    assert_eq!(seq.index_of(Path::new("c")), Some(2));
}

#[test]
fn sequence_remove_rebuilds_indices() {
    let mut seq = Sequence::new(paths(&["a", "b", "c", "d"]));
    assert_eq!(seq.remove(Path::new("b")), Some(1));
    assert_eq!(seq.paths(), &paths(&["a", "c", "d"])[..]);
    assert_eq!(seq.index_of(Path::new("c")), Some(1));
    assert_eq!(seq.index_of(Path::new("d")), Some(2));
    assert_eq!(seq.remove(Path::new("b")), None);
}

#[test]
fn record_entry_starts_untouched_with_no_crop() {
    let mut store = RecordStore::default();
    let record = store.entry(Path::new("a"), "4:5");
    assert!(!record.touched);
    assert!(!record.hidden);
    assert!(record.crop.is_none());
    assert_eq!(record.ratio_label, "4:5");
    assert_eq!(record.transform, TransformState::default());
}

#[test]
fn record_entry_is_stable_across_calls() {
    let mut store = RecordStore::default();
    store.entry(Path::new("a"), "4:5").crop = Some(NormalizedCrop::new(0.1, 0.1, 0.5, 0.5));
    store.entry(Path::new("a"), "4:5").touched = true;
    let record = store.get(Path::new("a")).unwrap();
    assert!(record.touched);
    assert!(record.crop.is_some());
}

#[test]
fn toggle_hidden_flips_and_reports_state() {
    let mut store = RecordStore::default();
    assert!(!store.is_hidden(Path::new("a")));
    assert!(store.toggle_hidden(Path::new("a"), "4:5"));
    assert!(store.is_hidden(Path::new("a")));
    assert!(!store.toggle_hidden(Path::new("a"), "4:5"));
    assert!(!store.is_hidden(Path::new("a")));
}

#[test]
fn remove_forgets_the_record() {
    let mut store = RecordStore::default();
    store.toggle_hidden(Path::new("a"), "4:5");
    store.remove(Path::new("a"));
    assert!(store.get(Path::new("a")).is_none());
    assert!(!store.is_hidden(Path::new("a")));
}
