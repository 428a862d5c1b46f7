//! Mission and catalog data loading for homestead.
//!
//! Reads level-editor records from RON, JSON or TOML and adapts them into
//! `homestead_core` setup types.

pub mod adapter;
pub mod loader;
pub mod schema;

pub use adapter::{
    catalog, load_catalog, load_mission, load_mission_level, mission_from_str, mission_setup,
};
pub use loader::{DataLoadError, Format};
