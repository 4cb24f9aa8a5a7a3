//! Row selection for simobj.
//!
//! Turns per-keytype mask functions into memoized [`Selector`]s and uses
//! them to read only the rows of a field that belong to one object:
//!
//! - [`MaskRegistry`] resolves a keytype's selector at most once, loading
//!   and releasing the auxiliary fields each mask function declares and
//!   detecting dependency cycles between keytypes.
//! - [`group_intervals`] turns a boolean mask into a short list of
//!   contiguous read intervals.
//! - [`fetch_selected`] reads a field through a selector, partially when
//!   the source allows it.
//! - [`masks`] holds reusable mask function builders.
//!
//! [`Selector`]: simobj_core::Selector

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod fetch;
pub mod interval;
pub mod masks;
pub mod registry;

pub use fetch::fetch_selected;
pub use interval::{group_intervals, rows_covered, true_runs};
pub use registry::{MaskChoice, MaskContext, MaskFn, MaskRegistry, MaskSpec};
