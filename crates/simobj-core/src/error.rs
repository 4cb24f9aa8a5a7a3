//! Error types for field resolution.
//!
//! [`FieldError`] covers every failure that can occur while turning a
//! field name into a stored [`Value`](crate::Value): unknown names,
//! missing or cyclic mask definitions, unit and shape mismatches,
//! transform-stack misuse, and failures reported by the field source.

use std::error::Error;
use std::fmt;

use crate::value::Unit;

/// Errors from field resolution, masking, and coordinate transforms.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldError {
    /// The field source does not recognize this field name.
    UnknownField {
        /// The requested field name.
        name: String,
    },
    /// No mask function is configured for the keytype.
    NoMaskDefined {
        /// The keytype that lacks a mask function.
        keytype: String,
    },
    /// A mask function requested, directly or transitively, the selector
    /// of a keytype that is still being computed.
    MaskCycle {
        /// Keytypes on the resolution path, ending with the repeated one.
        chain: Vec<String>,
    },
    /// Arithmetic between values with incompatible physical units.
    UnitMismatch {
        /// Unit of the value being modified.
        expected: Unit,
        /// Unit of the offending operand.
        found: Unit,
    },
    /// A mask function could not compute its selector.
    MaskFailed {
        /// Description of the failure.
        reason: String,
    },
    /// A transform could not be built or is not a proper rotation.
    InvalidTransform {
        /// Description of the problem.
        reason: String,
    },
    /// `unrotate()` was called but the last transform is not a rotation.
    NotARotation,
    /// A selector, chunk, or operand does not fit the value's shape.
    ShapeMismatch {
        /// Description of the mismatch.
        reason: String,
    },
    /// The field source failed to load or classify a field.
    Source {
        /// Description reported by the source.
        reason: String,
    },
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownField { name } => write!(f, "field source unaware of '{name}'"),
            Self::NoMaskDefined { keytype } => {
                write!(f, "no mask function defined for keytype '{keytype}'")
            }
            Self::MaskCycle { chain } => {
                write!(f, "mask dependency cycle: {}", chain.join(" -> "))
            }
            Self::UnitMismatch { expected, found } => {
                write!(f, "unit mismatch: expected {expected}, found {found}")
            }
            Self::MaskFailed { reason } => write!(f, "mask function failed: {reason}"),
            Self::InvalidTransform { reason } => write!(f, "invalid transform: {reason}"),
            Self::NotARotation => write!(f, "last transform is not a rotation"),
            Self::ShapeMismatch { reason } => write!(f, "shape mismatch: {reason}"),
            Self::Source { reason } => write!(f, "field source error: {reason}"),
        }
    }
}

impl Error for FieldError {}
