//! Document upload and LLM analysis
//!
//! Validates uploaded legal documents and drives the Gemini
//! `generateContent` API for structured analysis, readback synthesis, and
//! citation verification.

pub mod client;
pub mod document;

pub use client::{parse_analysis, AnalysisResult, GeminiClient};
pub use document::{DocumentFile, MAX_DOCUMENT_BYTES, PDF_MIME};
