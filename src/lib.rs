pub mod config;
pub mod db;
pub mod export;
pub mod features;
pub mod linker;
pub mod loader;
pub mod models;
pub mod normalize;
pub mod pipeline;
pub mod records;
pub mod search;

/// Application name for XDG paths
pub const APP_NAME: &str = "tunegraph";
