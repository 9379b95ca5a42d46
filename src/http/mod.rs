//! HTTP API server for the presentation layer
//!
//! This module provides the REST boundary the dashboard talks to:
//! - POST /documents/analyze - Analyze an uploaded PDF
//! - POST /consultation/start - Start the live voice consultation
//! - POST /consultation/stop - Stop it and return the transcript
//! - GET /consultation/status - Session status + speaking flag
//! - GET /consultation/transcript - Accumulated transcript
//! - POST /speech - Readback synthesis
//! - POST /citations/verify - Citation verification
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
