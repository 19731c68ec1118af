//! Pipeline stages for document analysis.
//!
//! Each submodule implements exactly one step, so each can be tested alone
//! and the model backend can change without touching the others.
//!
//! ## Data Flow
//!
//! ```text
//!              ┌─▶ extract (PDF text) ─┐
//! input ──────▶┤                        ├──▶ llm ──▶ postprocess
//! (upload/path)└─▶ encode  (base64)  ──┘   (model)   (line ends)
//! ```
//!
//! 1. [`input`]: classify an upload or resolve a path/URL into memory
//! 2. [`extract`]: concatenate the text of every PDF page; runs in
//!    `spawn_blocking` because parsing is CPU-bound
//! 3. [`encode`]: validate a PNG/JPEG and base64-wrap it for the request
//! 4. [`llm`]: one `(content, prompt) -> text` call; the only stage with
//!    network I/O
//! 5. [`postprocess`]: normalise the answer's line endings

pub mod encode;
pub mod extract;
pub mod input;
pub mod llm;
pub mod postprocess;
