//! EPUB to Markdown conversion.
//!
//! [`epub`] reads the archive, [`extract`] turns it into one Markdown
//! document with front matter, a linked table of contents and extracted
//! images.

pub mod epub;
pub mod error;
pub mod extract;
pub mod util;
