//! Error handling for LabelKit
//!
//! Two kinds of failure exist in this workspace:
//! - [`GeometryWarning`]: soft failures on the render path. They never abort a
//!   computation; they travel alongside a best-effort value in an
//!   [`Outcome`](crate::Outcome).
//! - [`Error`]: hard failures at the store and document boundary (malformed
//!   offset records, unknown images, I/O).
//!
//! All error types use `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Soft geometry failure
///
/// Reported next to a safe fallback value; callers decide whether to surface,
/// count, or ignore it.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryWarning {
    /// A point carried a NaN or infinite coordinate
    #[error("Invalid point ({x}, {y})")]
    InvalidPoint {
        /// The offending x coordinate.
        x: f64,
        /// The offending y coordinate.
        y: f64,
    },

    /// The view transform cannot map points (zero or non-finite scale)
    #[error("Invalid transform: {reason}")]
    InvalidTransform {
        /// Why the transform was rejected.
        reason: String,
    },

    /// A field of a transform update was rejected and left unchanged
    #[error("Rejected transform field '{field}' = {value}")]
    RejectedTransformField {
        /// The field name.
        field: &'static str,
        /// The rejected value.
        value: f64,
    },

    /// A normalization reference was missing, zero-sized, or non-finite
    #[error("Invalid normalization reference {w}x{h}")]
    InvalidReference {
        /// Reference width.
        w: f64,
        /// Reference height.
        h: f64,
    },

    /// A stroke had no usable points
    #[error("Degenerate stroke with {points} usable point(s)")]
    DegenerateStroke {
        /// Number of finite points found.
        points: usize,
    },

    /// An image has no known natural dimensions
    #[error("Missing natural dimensions for image '{image}'")]
    MissingDimensions {
        /// The image label.
        image: String,
    },

    /// A label beyond a corner of its path cannot be expressed exactly as a
    /// distance along the path normal
    #[error("Label is {residual:.2}px off the path normal; relative position is approximate")]
    ApproximateRelativePosition {
        /// Length of the offset component along the path tangent.
        residual: f64,
    },

    /// A rotation that is not a multiple of 90 degrees was requested
    #[error("Unsupported rotation of {degrees} degrees")]
    UnsupportedRotation {
        /// The requested angle.
        degrees: f64,
    },
}

/// Main error type for LabelKit
#[derive(Error, Debug)]
pub enum Error {
    /// A stored offset record could not be interpreted
    #[error("Invalid offset record: {reason}")]
    InvalidOffset {
        /// Why the record was rejected.
        reason: String,
    },

    /// The annotation store has no image with this label
    #[error("Unknown image '{image}'")]
    UnknownImage {
        /// The image label.
        image: String,
    },

    /// The image has no stroke with this label
    #[error("Unknown stroke '{stroke}' on image '{image}'")]
    UnknownStroke {
        /// The image label.
        image: String,
        /// The stroke label.
        stroke: String,
    },

    /// Standard I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create an invalid-offset error
    pub fn invalid_offset(reason: impl Into<String>) -> Self {
        Error::InvalidOffset {
            reason: reason.into(),
        }
    }

    /// Check if this error refers to a missing image or stroke
    pub fn is_lookup_error(&self) -> bool {
        matches!(self, Error::UnknownImage { .. } | Error::UnknownStroke { .. })
    }
}

/// Result type for LabelKit operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warning_display() {
        let warning = GeometryWarning::InvalidReference { w: 0.0, h: 600.0 };
        assert_eq!(warning.to_string(), "Invalid normalization reference 0x600");

        let warning = GeometryWarning::DegenerateStroke { points: 1 };
        assert_eq!(
            warning.to_string(),
            "Degenerate stroke with 1 usable point(s)"
        );

        let warning = GeometryWarning::RejectedTransformField {
            field: "dpr",
            value: -1.0,
        };
        assert_eq!(warning.to_string(), "Rejected transform field 'dpr' = -1");

        let warning = GeometryWarning::ApproximateRelativePosition { residual: 3.5 };
        assert_eq!(
            warning.to_string(),
            "Label is 3.50px off the path normal; relative position is approximate"
        );
    }

    #[test]
    fn test_error_display() {
        let err = Error::UnknownStroke {
            image: "front".to_string(),
            stroke: "A1".to_string(),
        };
        assert_eq!(err.to_string(), "Unknown stroke 'A1' on image 'front'");
        assert!(err.is_lookup_error());

        let err = Error::invalid_offset("missing x and y");
        assert_eq!(err.to_string(), "Invalid offset record: missing x and y");
        assert!(!err.is_lookup_error());
    }

    #[test]
    fn test_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));

        let json_err = serde_json::from_str::<u32>("nope").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Json(_)));
    }
}
