//! Filesystem primitives for Debian packaging editors
//!
//! Provides atomic file replacement and content checksums used to detect
//! files that changed underneath an open editor.

pub mod checksum;
pub mod error;
pub mod io;

pub use checksum::{compute_content_checksum, compute_file_checksum};
pub use error::{Error, Result};
pub use io::{read_text, read_text_if_exists, remove_if_exists, write_atomic};
