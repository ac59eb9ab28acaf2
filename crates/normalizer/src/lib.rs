//! # reqforge normalizer
//!
//! Deterministic normalization of LLM replies into typed security-testing reports.
//!
//! Models asked for JSON rarely return only JSON: replies arrive wrapped in reasoning blocks,
//! markdown fences, chatty preambles, or cut off mid-array. This crate turns any such reply into
//! exactly one [`Outcome`] and never fails on malformed input.
//!
//! ## Architecture
//!
//! ```text
//! raw model reply
//!     │
//!     ├──> Sanitizer      strip <think> blocks and outer code fences
//!     │
//!     ├──> Locator        isolate the single most likely JSON object
//!     │
//!     ├──> Repair chain   direct parse, then ordered repairs until one parses
//!     │    ├─> escape cleanup        (\' → ')
//!     │    ├─> inline-example collapse (GET(...) inside strings)
//!     │    ├─> truncation repair     (close open arrays/objects)
//!     │    └─> balanced extraction   (first complete object only)
//!     │
//!     └──> Classifier     field presence → Outcome variant (+ warnings)
//! ```
//!
//! ## Example
//!
//! ```rust
//! use reqforge_normalizer::{normalize, Outcome};
//!
//! let reply = "<think>the id param looks numeric</think>\n```json\n{\"payloads\": [\"1'\", \"1 OR 1=1\"\n```";
//! let normalized = normalize(reply);
//!
//! match &normalized.outcome {
//!     Outcome::PayloadReport { payloads, .. } => assert_eq!(payloads.len(), 2),
//!     other => panic!("unexpected outcome: {other:?}"),
//! }
//! assert!(normalized.warning().is_some());
//! ```

mod classify;
mod error;
mod locate;
mod outcome;
mod repair;
mod sanitize;

pub use classify::{classify, PAYLOAD_ADVISORY_THRESHOLD};
pub use error::ParseFailure;
pub use locate::locate;
pub use outcome::{Confidence, InjectionPoint, Normalized, Outcome, Risk, Verdict};
pub use repair::{parse_with_repair, Repair, Repaired};
pub use sanitize::sanitize;

/// Hint attached to [`Outcome::FreeText`] when no JSON object could be recovered.
pub const UNPARSED_HINT: &str = "The model did not return structured JSON, so its reply is shown as plain text. Ask again or request JSON output explicitly.";

/// Run the full pipeline over one model reply.
///
/// The input is only borrowed; the returned value owns all of its data.
pub fn normalize(raw: &str) -> Normalized {
    let sanitized = sanitize(raw);
    let candidate = locate(&sanitized);

    match parse_with_repair(&candidate) {
        Ok(repaired) => {
            let normalized = classify(&repaired.value, raw, repaired.repair.map(Repair::warning));
            log::debug!(
                "Normalized model reply as {} (repair: {:?})",
                normalized.outcome.kind(),
                repaired.repair
            );
            normalized
        }
        Err(failure) => {
            log::debug!("Model reply is not JSON, falling back to free text: {failure}");
            Normalized {
                outcome: Outcome::FreeText {
                    message: raw.to_string(),
                    parse_error: Some(failure.message),
                    hint: Some(UNPARSED_HINT.to_string()),
                },
                warnings: Vec::new(),
            }
        }
    }
}
