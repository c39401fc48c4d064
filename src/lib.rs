#![deny(clippy::all, clippy::perf, clippy::suspicious)] // Catch correctness + perf + suspicious patterns early.
#![deny(clippy::unwrap_used, clippy::expect_used)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

//! Derived `Encodable`/`Decodable` conformances over a declaration arena.
//!
//! [`driver::CodableDeriver`] walks a [`decl::DeclArena`], validates or
//! synthesizes each type's coding-key enumerations, and attaches
//! `encode(to:)` / `init(from:)` witnesses whose bodies are generated lazily.
//! Failures surface as [`diagnostics::Diagnostic`]s; [`eval::Evaluator`] runs
//! the generated bodies against JSON values.

pub mod body;
pub mod codable;
pub mod config;
pub mod conformance;
pub mod decl;
pub mod diagnostics;
pub mod driver;
pub mod error;
pub mod eval;
pub mod logging;

pub use config::{SynthesisConfig, UncoveredCasePolicy};
pub use conformance::{ConformanceOracle, ConformanceTable, KnownProtocol};
pub use driver::{CodableDeriver, DerivationReport};
pub use error::{Error, Result};
pub use eval::{EvalError, Evaluator, Value};
