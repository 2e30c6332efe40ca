//! Narration HTTP service for Suara
//!
//! A thin service wrapping the on-device TTS engine so clients get
//! natural-sounding narration over HTTP: synthesize on demand, cache by
//! content hash, serve the generated audio files, and clean up after
//! itself. Permissive CORS because the widget is served from a different
//! origin during development.

pub mod routes;
pub mod service;

pub use routes::router;
pub use service::{EspeakBackend, SpeechBackend, TtsService};

/// Service name reported by the health endpoint.
pub const SERVICE_NAME: &str = "Suara Narration Service";

/// Longest text accepted by the synthesis endpoints.
pub const MAX_TEXT_LENGTH: usize = 5000;
