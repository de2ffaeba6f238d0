//! Reading Apple Health exports.
//!
//! An export is either the `export.xml` written by the Health app or the
//! `export.zip` it is shipped in. Only `<Record>` elements are read; each
//! report converts the ones it cares about into its own sample type.

pub mod extractor;
pub mod types;
