pub mod app;
pub mod cache;
pub mod crop;
pub mod export;
pub mod fs_utils;
pub mod geometry;
pub mod loader;
pub mod navigator;
pub mod record;
pub mod sequence;
pub mod ui;
