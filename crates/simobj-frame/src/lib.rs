//! Coordinate-frame bookkeeping for simobj.
//!
//! A [`TransformStack`] records every translation and rotation applied to
//! an object's coordinate fields. Fields loaded later replay the stack in
//! order so they land in the same frame as fields loaded earlier.
//!
//! [`kernel`] holds the in-place array operations and [`rotation`] the
//! matrix helpers (axis-angle, angular-momentum alignment).

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod kernel;
pub mod op;
pub mod rotation;
pub mod stack;

pub use op::{Matrix3, Offset, TransformOp};
pub use stack::TransformStack;
