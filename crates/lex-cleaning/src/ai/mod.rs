//! AI module for LLM-backed instruction interpretation.
//!
//! This module provides a trait-based abstraction for the external
//! language-understanding service the rule compiler consults first.
//!
//! # Feature Flag
//!
//! The concrete HTTP providers require the `ai` feature flag. The
//! [`AIProvider`] trait and the prompt helpers are always available, so a
//! custom or offline provider can be plugged in without it.
//!
//! ```toml
//! # Enable AI support (default)
//! lex-cleaning = { version = "0.1", features = ["ai"] }
//!
//! # Pattern matching only, smaller binary
//! lex-cleaning = { version = "0.1", default-features = false }
//! ```
//!
//! # Contract
//!
//! A provider receives the instruction and the schema (column names and
//! types, never cell values) and returns [`CandidateOperation`]s. Nothing a
//! provider returns is trusted: the compiler filters every candidate.
//!
//! # Example
//!
//! ```rust,ignore
//! use lex_cleaning::ai::GeminiProvider;
//! use lex_cleaning::Pipeline;
//! use std::sync::Arc;
//!
//! let provider = Arc::new(GeminiProvider::new("your-api-key")?);
//! let pipeline = Pipeline::builder().ai_provider(provider).build()?;
//! ```

// Provider trait is always available (for custom implementations)
mod provider;
pub mod prompt;

pub use provider::{AIProvider, CandidateOperation};

// Concrete providers require the "ai" feature
#[cfg(feature = "ai")]
mod gemini;
#[cfg(feature = "ai")]
mod openrouter;
#[cfg(feature = "ai")]
mod service;

#[cfg(feature = "ai")]
pub use gemini::GeminiProvider;
#[cfg(feature = "ai")]
pub use openrouter::OpenRouterProvider;
#[cfg(feature = "ai")]
pub use service::ServiceConfig;
