use std::collections::HashSet;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use batchcrop::navigator::{resolve_step, Navigator, NAV_DEBOUNCE};

fn paths(names: &[&str]) -> Vec<PathBuf> {
    names.iter().map(PathBuf::from).collect()
}

fn no_hidden(_: &std::path::Path) -> bool {
    false
}

#[test]
fn rapid_requests_coalesce_into_one_net_displacement() {
    let mut nav = Navigator::new(NAV_DEBOUNCE);
    let t0 = Instant::now();
    nav.request_step(1, t0);
    nav.request_step(1, t0 + Duration::from_millis(5));
    nav.request_step(1, t0 + Duration::from_millis(10));

    // debounce window still open relative to the last request
    assert_eq!(nav.poll(t0 + Duration::from_millis(15)), None);
    assert_eq!(nav.poll(t0 + Duration::from_millis(40)), Some(3));
    // resolved exactly once
    assert_eq!(nav.poll(t0 + Duration::from_millis(80)), None);
}

#[test]
fn opposite_requests_cancel_out() {
    let mut nav = Navigator::new(NAV_DEBOUNCE);
    let t0 = Instant::now();
    nav.request_step(1, t0);
    nav.request_step(-1, t0);
    assert_eq!(nav.poll(t0 + Duration::from_millis(40)), None);
    assert_eq!(nav.pending(), 0);
}

#[test]
fn each_request_restarts_the_debounce_window() {
    let mut nav = Navigator::new(NAV_DEBOUNCE);
    let t0 = Instant::now();
    nav.request_step(1, t0);
    nav.request_step(1, t0 + Duration::from_millis(15));
    // only 10ms after the second request
    assert_eq!(nav.poll(t0 + Duration::from_millis(25)), None);
    assert_eq!(nav.poll(t0 + Duration::from_millis(36)), Some(2));
}

#[test]
fn resolve_walks_visible_steps() {
    let seq = paths(&["a", "b", "c", "d", "e"]);
    assert_eq!(resolve_step(0, 3, &seq, no_hidden), Some(3));
    assert_eq!(resolve_step(4, -2, &seq, no_hidden), Some(2));
}

#[test]
fn resolve_wraps_around_the_sequence() {
    let seq = paths(&["a", "b", "c"]);
    assert_eq!(resolve_step(2, 1, &seq, no_hidden), Some(0));
    assert_eq!(resolve_step(0, -1, &seq, no_hidden), Some(2));
}

#[test]
fn resolve_skips_hidden_paths() {
    let seq = paths(&["a", "b", "c", "d"]);
    let hidden: HashSet<PathBuf> = [PathBuf::from("b"), PathBuf::from("c")].into();
    let is_hidden = |p: &std::path::Path| hidden.contains(p);
    assert_eq!(resolve_step(0, 1, &seq, is_hidden), Some(3));
    assert_eq!(resolve_step(3, -1, &seq, is_hidden), Some(0));
}

#[test]
fn resolve_takes_displacement_modulo_visible_count() {
    let seq = paths(&["a", "b", "c", "d", "e"]);
    // 7 steps over 5 visible images is 2 net steps
    assert_eq!(resolve_step(0, 7, &seq, no_hidden), Some(2));
    // a whole number of laps lands back where it started
    assert_eq!(resolve_step(0, 5, &seq, no_hidden), None);
    assert_eq!(resolve_step(1, -10, &seq, no_hidden), None);
}

#[test]
fn resolve_handles_degenerate_sequences() {
    assert_eq!(resolve_step(0, 1, &[], no_hidden), None);
    let seq = paths(&["a"]);
    assert_eq!(resolve_step(0, 1, &seq, no_hidden), None);
    // everything hidden: nowhere to go
    let seq = paths(&["a", "b"]);
    assert_eq!(resolve_step(0, 1, &seq, |_| true), None);
    assert_eq!(resolve_step(0, 0, &seq, no_hidden), None);
}
