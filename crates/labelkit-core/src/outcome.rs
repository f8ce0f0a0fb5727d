//! Best-effort results for the render path.
//!
//! Geometry functions run inside interactive redraws, where aborting would
//! freeze the canvas. Instead of `Result`, they return an [`Outcome`]: a
//! usable value that may carry a [`GeometryWarning`] explaining which
//! fallback was substituted.

use crate::error::GeometryWarning;

/// A value plus an optional soft-failure warning.
#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub struct Outcome<T> {
    value: T,
    warning: Option<GeometryWarning>,
}

impl<T> Outcome<T> {
    /// Wraps a value computed without any fallback.
    pub fn clean(value: T) -> Self {
        Self {
            value,
            warning: None,
        }
    }

    /// Wraps a fallback value and logs the warning that caused it.
    pub fn warned(value: T, warning: GeometryWarning) -> Self {
        tracing::warn!(target: "labelkit::geometry", "{}", warning);
        Self {
            value,
            warning: Some(warning),
        }
    }

    /// Borrows the value.
    pub fn value(&self) -> &T {
        &self.value
    }

    /// Discards the warning and returns the value.
    pub fn into_value(self) -> T {
        self.value
    }

    /// Returns the warning, if a fallback was used.
    pub fn warning(&self) -> Option<&GeometryWarning> {
        self.warning.as_ref()
    }

    /// True when no fallback was substituted.
    pub fn is_clean(&self) -> bool {
        self.warning.is_none()
    }

    /// Reassembles an outcome from [`into_parts`](Self::into_parts) output.
    /// The warning is not logged again.
    pub fn from_parts(value: T, warning: Option<GeometryWarning>) -> Self {
        Self { value, warning }
    }

    /// Splits into value and warning.
    pub fn into_parts(self) -> (T, Option<GeometryWarning>) {
        (self.value, self.warning)
    }

    /// Maps the value, keeping the warning.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        Outcome {
            value: f(self.value),
            warning: self.warning,
        }
    }

    /// Chains a second fallible step. The earliest warning wins, since it
    /// names the root cause.
    pub fn and_then<U>(self, f: impl FnOnce(T) -> Outcome<U>) -> Outcome<U> {
        let next = f(self.value);
        Outcome {
            value: next.value,
            warning: self.warning.or(next.warning),
        }
    }

    /// Pushes the warning (if any) into a collector and returns the value.
    pub fn collect_into(self, warnings: &mut Vec<GeometryWarning>) -> T {
        if let Some(warning) = self.warning {
            warnings.push(warning);
        }
        self.value
    }
}

impl<T> From<T> for Outcome<T> {
    fn from(value: T) -> Self {
        Self::clean(value)
    }
}
