//! Bounds-checked binary cursor and writer.
//!
//! Every byte a package parser touches goes through [`Cursor`]: typed
//! little-endian primitive reads, length-prefixed strings, name references,
//! signed package indices, and exact `skip`s. All reads are bounds-checked
//! and return [`StreamError::UnexpectedEof`] with the failing offset instead
//! of panicking, so a truncated file is an error value, never a crash.
//!
//! [`Writer`] is the mirror image, used by the package builder and by tests
//! to fabricate byte-exact fixtures.

pub mod cursor;
pub mod error;
pub mod writer;

pub use cursor::Cursor;
pub use error::{StreamError, StreamResult};
pub use writer::Writer;
