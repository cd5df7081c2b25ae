//! # annotation-finder
//!
//! Scans a tar.gz of JAR files and prints the values of one method annotation
//! (by default `@io.airlift.configuration.Config`) found in their class files.
//!
//! ## Architecture
//!
//! - **reader**: Bounds-checked big-endian cursor over class-file bytes
//! - **mutf8**: Modified UTF-8 decoding for constant-pool strings
//! - **constant_pool**: Constant pool decoding and typed lookups
//! - **class_file**: Structural walk from the header to the method table
//! - **annotation**: Runtime (in)visible annotation attribute decoding
//! - **matcher**: Target-descriptor matching and the lazy scan over entries
//! - **archive**: tar.gz / tar / jar traversal yielding class-file entries
//! - **config**: Target descriptor and walk options resolution
//! - **cli**: Command-line definition

pub mod annotation;
pub mod archive;
pub mod class_file;
pub mod cli;
pub mod config;
pub mod constant_pool;
pub mod error;
pub mod matcher;
pub mod mutf8;
pub mod reader;

#[cfg(test)]
mod test_support;

pub use annotation::AnnotationValue;
pub use error::ClassFileError;
pub use matcher::{ClassEntry, Extractor, Finding};
