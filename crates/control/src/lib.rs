//! Control paragraph parsing.
//!
//! Archive indexes (`Sources`, `Packages`) are sequences of paragraphs
//! separated by blank lines, each paragraph a list of `Field: value` pairs
//! where a value may continue over following lines that start with
//! whitespace. [`Paragraphs`] streams them from any [`BufRead`](std::io::BufRead)
//! one paragraph at a time, so a decompressing reader can be plugged straight
//! in without buffering the whole document.

pub mod error;
mod paragraph;
mod reader;

pub use crate::paragraph::Paragraph;
pub use crate::reader::Paragraphs;
