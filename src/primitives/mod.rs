//! Low-level primitives shared by the page layout code.

/// Byte-level utilities and encoding/decoding.
///
/// Fixed-width little-endian accessors over raw page bytes.
pub mod bytes;
