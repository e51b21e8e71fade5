//! Classification subsystem.
//!
//! # Data Flow
//! ```text
//! raw text
//!     → dispatcher.rs (pin current catalog generation)
//!     → recognizers in registration order (recognizer.rs trait)
//!     → first match, or the heuristic fallback
//!     → DispatchResult
//! ```

pub mod dispatcher;
pub mod recognizer;
pub mod recognizers;

pub use dispatcher::{ChainError, DispatchResult, Dispatcher, RecognizerChain};
pub use recognizer::{
    Attempt, FallbackRecognizer, LineItem, ParsedItems, RecognitionError, Recognizer,
};
