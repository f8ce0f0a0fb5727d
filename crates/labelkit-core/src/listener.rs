//! Redraw listener interface
//!
//! The rendering collaborator implements [`RedrawListener`] to be told when
//! the view transform changed and the canvas needs repainting.

use crate::types::Transform;

/// Handle for a registered redraw listener.
///
/// Uniquely identifies a listener subscription. Can be used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerHandle(pub u64);

/// Listener trait for transform changes
///
/// Called synchronously from inside `TransformState::set`. Implementations
/// must not call back into `set`, or the stability counter is reset by the
/// re-entrant update.
pub trait RedrawListener {
    /// Called after the live transform changed
    fn on_transform_changed(&self, transform: &Transform);
}

impl<F> RedrawListener for F
where
    F: Fn(&Transform),
{
    fn on_transform_changed(&self, transform: &Transform) {
        self(transform)
    }
}
