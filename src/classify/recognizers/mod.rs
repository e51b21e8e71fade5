//! Built-in recognizers and the registration order.
//!
//! Stricter formats come first so a loose recognizer cannot shadow them.
//! The fallback is always appended last.

pub mod assets;
pub mod heuristic;
pub mod listing;

use crate::classify::dispatcher::{ChainError, RecognizerChain};
use crate::classify::recognizer::Recognizer;

pub use assets::AssetsRecognizer;
pub use heuristic::HeuristicRecognizer;
pub use listing::ListingRecognizer;

/// Default registration order, strictest first.
pub const STANDARD_ORDER: &[&str] = &["assets", "listing"];

/// Identity of the fallback recognizer.
pub const FALLBACK_NAME: &str = "heuristic";

/// Every registrable recognizer name.
pub fn recognizer_names() -> &'static [&'static str] {
    STANDARD_ORDER
}

/// Construct a recognizer by name.
pub fn recognizer_by_name(name: &str) -> Option<Box<dyn Recognizer>> {
    match name {
        "assets" => Some(Box::new(AssetsRecognizer)),
        "listing" => Some(Box::new(ListingRecognizer)),
        _ => None,
    }
}

/// Build a chain from an explicit order with the heuristic fallback last.
pub fn chain_from_order<S: AsRef<str>>(order: &[S]) -> Result<RecognizerChain, ChainError> {
    let mut chain = RecognizerChain::new(Box::new(HeuristicRecognizer));
    for name in order {
        let name = name.as_ref();
        let recognizer =
            recognizer_by_name(name).ok_or_else(|| ChainError::Unknown(name.to_string()))?;
        chain = chain.register(recognizer)?;
    }
    Ok(chain)
}

/// The default chain.
pub fn standard_chain() -> RecognizerChain {
    let mut chain = RecognizerChain::new(Box::new(HeuristicRecognizer));
    chain.push_unchecked(Box::new(AssetsRecognizer));
    chain.push_unchecked(Box::new(ListingRecognizer));
    chain
}
