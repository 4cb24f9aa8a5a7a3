//! Core types and traits for simobj.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the vocabulary shared by the rest of the workspace: unit-tagged
//! [`Value`] arrays, [`Selector`]s describing which rows belong to an
//! object, identifiers, field metadata, the [`FieldSource`] trait that
//! external snapshot readers implement, and the [`FieldError`] taxonomy.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod id;
pub mod selector;
pub mod source;
pub mod value;

pub use error::FieldError;
pub use id::{CoordClass, FieldMeta, FieldName, Identifier, KeyType, MaskArgs, Param};
pub use selector::{Interval, Selector};
pub use source::FieldSource;
pub use value::{wrap_periodic, Shape, Unit, Value};
