//! Ordered-chain classification.
//!
//! # Responsibilities
//! - Hold the recognizer sequence, fixed after startup
//! - Pin one catalog generation per call
//! - Return the first recognizer that matches, else the fallback
//!
//! # Design Decisions
//! - First match wins (registration order, strictest first)
//! - A failing or panicking recognizer counts as declined
//! - The fallback never declines, so every input gets an interpretation

use std::any::Any;
use std::collections::HashSet;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use thiserror::Error;

use crate::catalog::{HotSwapController, ReferenceSnapshot};
use crate::classify::recognizer::{
    Attempt, FallbackRecognizer, ParsedItems, RecognitionError, Recognizer,
};
use crate::observability::metrics;

/// Errors building a recognizer chain.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    #[error("unknown recognizer '{0}'")]
    Unknown(String),

    #[error("recognizer '{0}' registered twice")]
    Duplicate(String),
}

/// The ordered recognizer sequence plus its fallback.
pub struct RecognizerChain {
    recognizers: Vec<Box<dyn Recognizer>>,
    fallback: Box<dyn FallbackRecognizer>,
}

impl RecognizerChain {
    /// An empty chain that only has the fallback.
    pub fn new(fallback: Box<dyn FallbackRecognizer>) -> Self {
        Self {
            recognizers: Vec::new(),
            fallback,
        }
    }

    /// Append a recognizer after those already registered.
    pub fn register(mut self, recognizer: Box<dyn Recognizer>) -> Result<Self, ChainError> {
        let names: HashSet<&str> = self.recognizers.iter().map(|r| r.name()).collect();
        if names.contains(recognizer.name()) || recognizer.name() == self.fallback.name() {
            return Err(ChainError::Duplicate(recognizer.name().to_string()));
        }
        self.recognizers.push(recognizer);
        Ok(self)
    }

    pub(crate) fn push_unchecked(&mut self, recognizer: Box<dyn Recognizer>) {
        self.recognizers.push(recognizer);
    }

    /// Registered names in dispatch order, fallback excluded.
    pub fn names(&self) -> Vec<&'static str> {
        self.recognizers.iter().map(|r| r.name()).collect()
    }

    pub fn fallback_name(&self) -> &'static str {
        self.fallback.name()
    }
}

/// Outcome of one classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchResult {
    Recognized {
        items: ParsedItems,
        recognizer: &'static str,
        generation: u64,
    },
    Unrecognized {
        generation: u64,
    },
}

impl DispatchResult {
    /// The catalog generation the call observed.
    pub fn generation(&self) -> u64 {
        match self {
            DispatchResult::Recognized { generation, .. } => *generation,
            DispatchResult::Unrecognized { generation } => *generation,
        }
    }

    pub fn recognizer(&self) -> Option<&'static str> {
        match self {
            DispatchResult::Recognized { recognizer, .. } => Some(recognizer),
            DispatchResult::Unrecognized { .. } => None,
        }
    }
}

/// Classifies raw text against the current catalog generation.
#[derive(Clone)]
pub struct Dispatcher {
    chain: Arc<RecognizerChain>,
    catalog: Arc<HotSwapController>,
}

impl Dispatcher {
    pub fn new(chain: RecognizerChain, catalog: Arc<HotSwapController>) -> Self {
        Self {
            chain: Arc::new(chain),
            catalog,
        }
    }

    pub fn catalog(&self) -> &Arc<HotSwapController> {
        &self.catalog
    }

    pub fn recognizer_names(&self) -> Vec<&'static str> {
        self.chain.names()
    }

    /// Classify against the generation current at the start of the call.
    pub fn classify(&self, text: &str) -> DispatchResult {
        let snapshot = self.catalog.current();
        self.classify_with(text, &snapshot)
    }

    /// Classify against an explicitly pinned generation.
    pub fn classify_with(&self, text: &str, snapshot: &ReferenceSnapshot) -> DispatchResult {
        let generation = snapshot.generation();

        for recognizer in &self.chain.recognizers {
            let name = recognizer.name();
            let outcome = catch_unwind(AssertUnwindSafe(|| recognizer.attempt(text, snapshot)))
                .unwrap_or_else(|payload| Err(RecognitionError::Panicked(panic_message(payload))));

            match outcome {
                Ok(Attempt::Recognized(items)) => {
                    metrics::record_classification(name);
                    return DispatchResult::Recognized {
                        items,
                        recognizer: name,
                        generation,
                    };
                }
                Ok(Attempt::Declined) => {}
                Err(e) => {
                    tracing::warn!(recognizer = name, error = %e, "Recognizer failed, treating as declined");
                    metrics::record_recognizer_failure(name);
                }
            }
        }

        let fallback = &self.chain.fallback;
        match catch_unwind(AssertUnwindSafe(|| fallback.interpret(text, snapshot))) {
            Ok(items) => {
                metrics::record_classification(fallback.name());
                DispatchResult::Recognized {
                    items,
                    recognizer: fallback.name(),
                    generation,
                }
            }
            Err(payload) => {
                tracing::error!(
                    recognizer = fallback.name(),
                    error = %panic_message(payload),
                    "Fallback recognizer panicked"
                );
                metrics::record_recognizer_failure(fallback.name());
                metrics::record_classification("none");
                DispatchResult::Unrecognized { generation }
            }
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ItemMeta;
    use crate::classify::recognizer::LineItem;
    use crate::classify::recognizers::{standard_chain, HeuristicRecognizer};

    struct Always(&'static str, u64);

    impl Recognizer for Always {
        fn name(&self) -> &'static str {
            self.0
        }

        fn attempt(&self, _text: &str, _snapshot: &ReferenceSnapshot) -> Result<Attempt, RecognitionError> {
            Ok(Attempt::Recognized(ParsedItems {
                items: vec![LineItem::new(Some(self.1), self.0, 1)],
                unparsed_lines: Vec::new(),
            }))
        }
    }

    struct Failing;

    impl Recognizer for Failing {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn attempt(&self, _text: &str, _snapshot: &ReferenceSnapshot) -> Result<Attempt, RecognitionError> {
            Err(RecognitionError::Malformed {
                line: 0,
                reason: "boom".into(),
            })
        }
    }

    struct Panicking;

    impl Recognizer for Panicking {
        fn name(&self) -> &'static str {
            "panicking"
        }

        fn attempt(&self, _text: &str, _snapshot: &ReferenceSnapshot) -> Result<Attempt, RecognitionError> {
            panic!("recognizer bug")
        }
    }

    struct PanickingFallback;

    impl FallbackRecognizer for PanickingFallback {
        fn name(&self) -> &'static str {
            "broken"
        }

        fn interpret(&self, _text: &str, _snapshot: &ReferenceSnapshot) -> ParsedItems {
            panic!("fallback bug")
        }
    }

    fn catalog() -> Arc<HotSwapController> {
        let snapshot = ReferenceSnapshot::build(
            7,
            vec![ItemMeta::new(34, "Tritanium"), ItemMeta::new(587, "Rifter")],
        )
        .unwrap();
        Arc::new(HotSwapController::with_initial(snapshot))
    }

    fn fallback_only() -> RecognizerChain {
        RecognizerChain::new(Box::new(HeuristicRecognizer))
    }

    #[test]
    fn earlier_registration_wins() {
        let chain = fallback_only()
            .register(Box::new(Always("first", 1)))
            .unwrap()
            .register(Box::new(Always("second", 2)))
            .unwrap();
        let dispatcher = Dispatcher::new(chain, catalog());

        match dispatcher.classify("anything") {
            DispatchResult::Recognized { items, recognizer, generation } => {
                assert_eq!(recognizer, "first");
                assert_eq!(items.items[0].type_id, Some(1));
                assert_eq!(generation, 7);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn fallback_matches_with_no_recognizers() {
        let dispatcher = Dispatcher::new(fallback_only(), catalog());
        for input in ["anything", "", "   \n\t  "] {
            let result = dispatcher.classify(input);
            assert_eq!(result.recognizer(), Some("heuristic"), "input {:?}", input);
        }
    }

    #[test]
    fn failures_are_contained() {
        let chain = fallback_only()
            .register(Box::new(Failing))
            .unwrap()
            .register(Box::new(Panicking))
            .unwrap()
            .register(Box::new(Always("last", 3)))
            .unwrap();
        let dispatcher = Dispatcher::new(chain, catalog());
        assert_eq!(dispatcher.classify("x").recognizer(), Some("last"));
    }

    #[test]
    fn panicking_fallback_is_unrecognized() {
        let dispatcher = Dispatcher::new(RecognizerChain::new(Box::new(PanickingFallback)), catalog());
        assert_eq!(
            dispatcher.classify("x"),
            DispatchResult::Unrecognized { generation: 7 }
        );
    }

    #[test]
    fn deterministic_for_same_generation() {
        let dispatcher = Dispatcher::new(standard_chain(), catalog());
        let text = "10 Tritanium\nRifter x2\nsomething else";
        let first = dispatcher.classify(text);
        for _ in 0..10 {
            assert_eq!(dispatcher.classify(text), first);
        }
        assert_eq!(first.recognizer(), Some("listing"));
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let err = fallback_only()
            .register(Box::new(Always("a", 1)))
            .unwrap()
            .register(Box::new(Always("a", 2)))
            .err()
            .unwrap();
        assert_eq!(err, ChainError::Duplicate("a".into()));
    }

    #[test]
    fn standard_chain_prefers_strict_format() {
        let dispatcher = Dispatcher::new(standard_chain(), catalog());
        let result = dispatcher.classify("Tritanium\t10\nRifter\t1");
        assert_eq!(result.recognizer(), Some("assets"));
    }
}
