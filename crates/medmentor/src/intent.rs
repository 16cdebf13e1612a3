//! Rule-based intent classification.
//!
//! An explicit ordered rule table keeps the behavior reproducible: keyword
//! sets overlap (e.g. "progress" vs "practice"), so evaluation order is part
//! of the contract. First match wins; `GeneralQuery` is the total default.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    PerformanceQuery,
    Greeting,
    TrainingRequest,
    GeneralQuery,
}

/// Priority-ordered rules. Do not reorder: PerformanceQuery must be tested
/// before Greeting and TrainingRequest.
static RULES: &[(Intent, &[&str])] = &[
    (
        Intent::PerformanceQuery,
        &[
            "performance",
            "progress",
            "stats",
            "score",
            "simulation",
            "surgery",
            "feedback",
            "weak",
            "how many",
            "completion",
            "done",
            "attempted",
            "my results",
            "how am i doing",
        ],
    ),
    (Intent::Greeting, &["hi", "hello", "hey", "namaste"]),
    (
        Intent::TrainingRequest,
        &["train", "practice", "improve", "weakness"],
    ),
];

/// Classify a message into an intent category. Pure and deterministic —
/// lowercase the message, then test substring membership against each rule's
/// keyword set in priority order.
pub fn classify(message: &str) -> Intent {
    let normalized = message.to_lowercase();
    for (intent, keywords) in RULES {
        if keywords.iter().any(|kw| normalized.contains(kw)) {
            return *intent;
        }
    }
    Intent::GeneralQuery
}
