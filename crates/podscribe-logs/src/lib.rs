//! Log sinks for podscribe
//!
//! This crate provides the destinations collected log streams are written
//! to, plus a parser that extracts timestamps, levels and JSON fields.

mod directory;
mod json;
mod lines;
mod parser;
mod text;

#[cfg(test)]
mod test_support;

pub use directory::DirectorySink;
pub use json::JsonSink;
pub use parser::{LogLevel, LogParser, ParsedLine};
pub use text::TextSink;
