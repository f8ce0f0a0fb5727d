//! # LabelKit Core
//!
//! Core types, soft-failure outcomes, and the error taxonomy shared by the
//! LabelKit crates. Provides the fundamental abstractions for points, image
//! dimensions, the view transform, and redraw notification.

pub mod constants;
pub mod error;
pub mod listener;
pub mod outcome;
pub mod types;

pub use error::{Error, GeometryWarning, Result};
pub use listener::{ListenerHandle, RedrawListener};
pub use outcome::Outcome;
pub use types::{Point, Size, Transform};
