use std::{
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

pub const NAV_DEBOUNCE: Duration = Duration::from_millis(20);

/// Coalesces bursts of next/previous requests into one net displacement.
///
/// Each `request_step` pushes the debounce deadline out; `poll` hands back
/// the accumulated displacement once the window has elapsed with no further
/// input, so a held-down key resolves to a single navigation.
#[derive(Debug)]
pub struct Navigator {
    pending: i64,
    deadline: Option<Instant>,
    debounce: Duration,
}

impl Navigator {
    pub fn new(debounce: Duration) -> Self {
        Self {
            pending: 0,
            deadline: None,
            debounce,
        }
    }

    pub fn request_step(&mut self, direction: i64, now: Instant) {
        if direction == 0 {
            return;
        }
        self.pending += direction;
        self.deadline = Some(now + self.debounce);
    }

    pub fn pending(&self) -> i64 {
        self.pending
    }

    pub fn poll(&mut self, now: Instant) -> Option<i64> {
        let deadline = self.deadline?;
        if now < deadline {
            return None;
        }
        self.deadline = None;
        let net = std::mem::take(&mut self.pending);
        (net != 0).then_some(net)
    }
}

/// Resolve a net displacement from `current` against the sequence, walking
/// one visible step at a time and skipping hidden paths. The displacement is
/// taken modulo the visible count, so a burst longer than the sequence never
/// loops. Returns `None` when the walk lands back on `current`.
pub fn resolve_step(
    current: usize,
    displacement: i64,
    paths: &[PathBuf],
    is_hidden: impl Fn(&Path) -> bool,
) -> Option<usize> {
    if paths.is_empty() || displacement == 0 {
        return None;
    }
    let visible = paths.iter().filter(|p| !is_hidden(p)).count();
    if visible == 0 {
        return None;
    }
    let mut steps = displacement.unsigned_abs() as usize % visible;
    if steps == 0 {
        return None;
    }
    let len = paths.len();
    let forward = displacement > 0;
    let mut target = current.min(len - 1);
    while steps > 0 {
        target = if forward {
            (target + 1) % len
        } else {
            (target + len - 1) % len
        };
        if !is_hidden(&paths[target]) {
            steps -= 1;
        }
    }
    (target != current).then_some(target)
}
