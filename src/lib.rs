//! Conformance harness for TOML parsers and encoders.
//!
//! Drives an external parser subprocess through a curated corpus of test
//! cases and produces pass/fail/skip verdicts. This crate owns selection,
//! execution, and comparison; a caller owns argument parsing, corpus
//! packaging, and report rendering.
//!
//! # Usage
//!
//! ```ignore
//! let corpus = toml_conformance::FsCorpus::load("tests")?;
//! let parser = toml_conformance::SubprocessParser::new(vec!["my-toml-parser".into()]);
//! let config = toml_conformance::RunConfig::default().with_version("1.0.0");
//! let report = toml_conformance::Runner::new(&corpus, &parser, config).run().await?;
//! assert!(report.is_success());
//! ```

pub mod case;
pub mod corpus;
pub mod encoder_value;
pub mod error;
pub mod expected_errors;
pub mod parser;
pub mod runner;
pub mod select;
pub mod value;
pub mod version;

pub use self::case::*;
pub use self::corpus::*;
pub use self::error::*;
pub use self::expected_errors::*;
pub use self::parser::*;
pub use self::runner::*;
pub use self::select::*;
pub use self::value::{TaggedValue, TaggedValueError, TomlType};
pub use self::version::*;
