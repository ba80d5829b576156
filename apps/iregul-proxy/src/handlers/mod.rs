//! Handlers 模块

pub mod data;
pub mod health;
pub mod index;
pub mod metrics;
pub mod sessions;

pub use data::*;
pub use health::*;
pub use index::*;
pub use metrics::*;
pub use sessions::*;
