use std::{
    collections::{HashMap, HashSet},
    path::{Path, PathBuf},
    sync::mpsc::Sender,
};

use eframe::egui::ColorImage;
use tracing::{debug, warn};

pub const DEFAULT_PROXY_RADIUS: usize = 15;
pub const DEFAULT_PROXY_SIZE: u32 = 2560;

/// Requested load quality. `Proxy` loads are capped to the cache's proxy
/// dimension; `Full` loads decode at native resolution.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Tier {
    Proxy,
    Full,
}

#[derive(Clone, Debug)]
pub struct LoadRequest {
    pub path: PathBuf,
    /// `Some(limit)` for proxy loads, `None` for full loads.
    pub max_dim: Option<u32>,
    pub generation: u64,
}

pub struct LoadResult {
    pub path: PathBuf,
    pub requested_tier: Tier,
    pub generation: u64,
    /// Decoded bitmap plus whether it is full quality. A proxy request for a
    /// source already smaller than the proxy limit comes back full.
    pub result: anyhow::Result<(ColorImage, bool)>,
}

/// Event forwarded to the UI after a completed load was stored.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageReady {
    pub path: PathBuf,
    pub is_full: bool,
}

/// Two-tier cache of decoded images around the current sequence position.
///
/// Full-resolution entries are kept for the current image and its successor;
/// proxies for a window of `proxy_radius` neighbors on each side. Everything
/// else is evicted on `update_window`. The cache owns its bitmaps; `get`
/// hands out references that stay valid until the next mutation.
pub struct ImageCache {
    proxy_radius: usize,
    proxy_size: u32,
    proxies: HashMap<PathBuf, ColorImage>,
    fulls: HashMap<PathBuf, ColorImage>,
    in_flight: HashSet<(PathBuf, Tier)>,
    generation: u64,
    request_tx: Sender<LoadRequest>,
}

impl ImageCache {
    pub fn new(proxy_radius: usize, proxy_size: u32, request_tx: Sender<LoadRequest>) -> Self {
        Self {
            proxy_radius,
            proxy_size,
            proxies: HashMap::new(),
            fulls: HashMap::new(),
            in_flight: HashSet::new(),
            generation: 0,
            request_tx,
        }
    }

    /// Best cached bitmap for `path`: the full tier wins over the proxy
    /// tier. Pure lookup, no side effects.
    pub fn get(&self, path: &Path) -> Option<(&ColorImage, bool)> {
        if let Some(image) = self.fulls.get(path) {
            return Some((image, true));
        }
        self.proxies.get(path).map(|image| (image, false))
    }

    /// Recompute the resident window around `current`, evict entries that
    /// fell out of it, and request whatever is missing. Requests already in
    /// flight for the same `(path, tier)` are not re-issued.
    pub fn update_window(&mut self, current: &Path, all_paths: &[PathBuf]) {
        let Some(idx) = all_paths.iter().position(|p| p == current) else {
            return;
        };

        let current = &all_paths[idx];
        let next = all_paths.get(idx + 1);

        let mut full_needed: HashSet<&PathBuf> = HashSet::new();
        full_needed.insert(current);
        if let Some(next) = next {
            full_needed.insert(next);
        }

        let start = idx.saturating_sub(self.proxy_radius);
        let end = (idx + self.proxy_radius + 1).min(all_paths.len());
        let proxy_window = &all_paths[start..end];
        let proxy_needed: HashSet<&PathBuf> = proxy_window.iter().collect();

        self.fulls.retain(|p, _| full_needed.contains(p));
        self.proxies.retain(|p, _| proxy_needed.contains(p));

        // current image first, then its successor
        if !self.fulls.contains_key(current) {
            self.request(current, Tier::Full);
        }
        if let Some(next) = next {
            if !self.fulls.contains_key(next) {
                self.request(next, Tier::Full);
            }
        }
        for path in proxy_window {
            if !self.proxies.contains_key(path) && !self.fulls.contains_key(path) {
                self.request(path, Tier::Proxy);
            }
        }
    }

    fn request(&mut self, path: &Path, tier: Tier) {
        let key = (path.to_path_buf(), tier);
        if self.in_flight.contains(&key) {
            return;
        }
        let max_dim = match tier {
            Tier::Proxy => Some(self.proxy_size),
            Tier::Full => None,
        };
        let request = LoadRequest {
            path: key.0.clone(),
            max_dim,
            generation: self.generation,
        };
        if self.request_tx.send(request).is_ok() {
            self.in_flight.insert(key);
        }
    }

    /// Fold a worker completion into the cache. Results from a generation
    /// before the last `clear()` are discarded. Successful loads are stored
    /// in the tier matching what actually came back; failures only clear
    /// the in-flight marker.
    pub fn on_load_result(&mut self, result: LoadResult) -> Option<ImageReady> {
        if result.generation != self.generation {
            debug!(path = %result.path.display(), "discarding stale load result");
            return None;
        }
        self.in_flight
            .remove(&(result.path.clone(), result.requested_tier));
        match result.result {
            Ok((image, is_full)) => {
                if is_full {
                    self.fulls.insert(result.path.clone(), image);
                } else {
                    self.proxies.insert(result.path.clone(), image);
                }
                Some(ImageReady {
                    path: result.path,
                    is_full,
                })
            }
            Err(err) => {
                warn!(path = %result.path.display(), "image load failed: {err:#}");
                None
            }
        }
    }

    /// Drop a single path from both tiers, e.g. when it leaves the sequence.
    pub fn remove(&mut self, path: &Path) {
        self.fulls.remove(path);
        self.proxies.remove(path);
    }

    /// Drop everything. Dispatched loads are not cancelled; bumping the
    /// generation makes their eventual completions discardable.
    pub fn clear(&mut self) {
        self.generation += 1;
        self.proxies.clear();
        self.fulls.clear();
        self.in_flight.clear();
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_in_flight(&self, path: &Path, tier: Tier) -> bool {
        self.in_flight.contains(&(path.to_path_buf(), tier))
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    pub fn cached_proxy_paths(&self) -> impl Iterator<Item = &PathBuf> {
        self.proxies.keys()
    }

    pub fn cached_full_paths(&self) -> impl Iterator<Item = &PathBuf> {
        self.fulls.keys()
    }
}
