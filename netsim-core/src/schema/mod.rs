//! Wire schema types.
//!
//! A protocol declares its layout as a list of [`FieldDescriptor`]s, each
//! with a [`DataKind`] that knows how to parse, serialize and display one
//! value.
//!
//! # Example
//!
//! ```rust
//! use netsim_core::schema::{DataKind, FieldDescriptor};
//!
//! static FIELDS: [FieldDescriptor; 2] = [
//!     FieldDescriptor::new("version", DataKind::UInt8),
//!     FieldDescriptor::new("flags", DataKind::Hex16).with_label("Flags"),
//! ];
//! assert_eq!(FIELDS[1].kind.fixed_size(), Some(2));
//! ```

mod field;
mod kind;

pub use field::FieldDescriptor;
pub use kind::{DataKind, LengthFn};
