pub mod color;
pub mod config;
pub mod engine;
pub mod error;
pub mod export;
pub mod filter;
pub mod hierarchy;
pub mod human;
pub mod input;
pub mod interaction;
pub mod label;
pub mod model;
pub mod render;
pub mod search;
pub mod tooltip;
pub mod treemap;
pub mod zoom;

pub use config::EngineConfig;
pub use engine::{Breadcrumb, EngineEvent, TreemapEngine};
pub use error::{Result, TreemapError};
pub use filter::{FilterState, ValueRange};
pub use model::*;
pub use treemap::Padding;
pub use zoom::ZoomState;
