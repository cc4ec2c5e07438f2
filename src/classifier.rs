//! Complaint classification.
//!
//! One invocation walks `invoke -> extract -> normalize`; any failure along
//! the way (deadline, unparseable reply, transport error, panic) is replaced
//! by the deterministic [`fallback`] record. The public entry point is
//! therefore total: it always returns a record that satisfies the category,
//! severity and summary bounds.

use std::num::IntErrorKind;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, LazyLock};
use std::thread;
use std::time::Duration;

use futures::FutureExt;
use regex::Regex;
use serde_json::{Map, Value};
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::ai::{OllamaClient, TextGenerator};
use crate::core::config::ClassifierConfig;
use crate::core::models::{
    Category, ClassificationResult, DEFAULT_SEVERITY, MAX_SEVERITY, MAX_SUMMARY_CHARS,
    MAX_SUMMARY_WORDS, MIN_SEVERITY,
};
use crate::errors::ClassifyError;
use crate::prompt::render_prompt;

const FALLBACK_PREFIX: &str = "Reported issue: ";
const FALLBACK_PREVIEW_CHARS: usize = 200;
const ELLIPSIS: &str = "...";

/// Leftmost `{` through the last `}` after it.
static JSON_OBJECT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\{.*\}").expect("static regex compile"));

/// Turns complaint text into a [`ClassificationResult`] using a text
/// generator bounded by a fixed deadline.
///
/// Holds no per-call state, so a single instance can be shared across
/// concurrent requests behind an `Arc`.
pub struct Classifier {
    generator: Arc<dyn TextGenerator>,
    timeout: Duration,
}

impl Classifier {
    /// Classifier backed by an [`OllamaClient`] built from `config`.
    #[must_use]
    pub fn new(config: &ClassifierConfig) -> Self {
        let client = OllamaClient::new(config.base_url.clone(), config.model.clone());
        Self::with_generator(Arc::new(client), config.timeout)
    }

    #[must_use]
    pub fn with_generator(generator: Arc<dyn TextGenerator>, timeout: Duration) -> Self {
        Self { generator, timeout }
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Classify and summarize one complaint.
    ///
    /// Never fails and never waits on the model for longer than the
    /// configured deadline. When the model path cannot produce a record the
    /// deterministic fallback is returned instead; the two are
    /// indistinguishable to the caller apart from their field values.
    pub async fn classify_and_summarize(&self, complaint: &str) -> ClassificationResult {
        let started = Instant::now();
        let complaint_chars = complaint.chars().count();

        let outcome = AssertUnwindSafe(self.run_pipeline(complaint))
            .catch_unwind()
            .await;

        match outcome {
            Ok(Ok(result)) => {
                info!(
                    category = %result.category,
                    severity = result.severity,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Complaint classified by model"
                );
                result
            }
            Ok(Err(e)) if e.is_degradation() => {
                warn!(
                    error = %e,
                    complaint_chars,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Using fallback classification"
                );
                fallback(complaint)
            }
            Ok(Err(e)) => {
                error!(
                    error = %e,
                    complaint_chars,
                    "Classification failed unexpectedly; using fallback"
                );
                fallback(complaint)
            }
            Err(_) => {
                error!(complaint_chars, "Classification panicked; using fallback");
                fallback(complaint)
            }
        }
    }

    async fn run_pipeline(&self, complaint: &str) -> Result<ClassificationResult, ClassifyError> {
        let reply = self.invoke(render_prompt(complaint)).await?;
        let fields = extract_json(&reply).ok_or(ClassifyError::UnparseableReply)?;
        Ok(normalize(&fields, complaint))
    }

    /// Run the generator on its own OS thread and wait at most `self.timeout`.
    ///
    /// The worker drives the generator with the caller's runtime handle, so
    /// async clients still work, while a generator that blocks its thread
    /// cannot starve the deadline.
    async fn invoke(&self, prompt: String) -> Result<String, ClassifyError> {
        let generator = Arc::clone(&self.generator);
        let runtime = Handle::current();
        let (tx, rx) = oneshot::channel();

        thread::Builder::new()
            .name("model-call".to_string())
            .spawn(move || {
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                    runtime.block_on(generator.generate(&prompt))
                }))
                .unwrap_or_else(|_| {
                    Err(ClassifyError::Unexpected("model worker panicked".to_string()))
                });
                // The receiver is gone once the caller has timed out.
                let _ = tx.send(outcome);
            })
            .map_err(|e| ClassifyError::Unexpected(format!("failed to start model worker: {e}")))?;

        // On timeout the receiver is dropped and the thread is left to finish
        // on its own. Whatever it eventually returns is discarded.
        match tokio::time::timeout(self.timeout, rx).await {
            Ok(Ok(reply)) => reply,
            Ok(Err(_)) => Err(ClassifyError::Unexpected(
                "model worker exited without a reply".to_string(),
            )),
            Err(_) => Err(ClassifyError::Timeout(self.timeout)),
        }
    }
}

/// Find the JSON object embedded in a model reply.
///
/// Tries a strict parse of the first `{ ... }` span, then a second parse with
/// single quotes swapped for double quotes. Returns `None` when neither works
/// or when the object has no keys at all.
#[must_use]
pub fn extract_json(raw: &str) -> Option<Map<String, Value>> {
    let candidate = JSON_OBJECT_RE.find(raw)?.as_str().trim();

    parse_object(candidate)
        .or_else(|| parse_object(&candidate.replace('\'', "\"")))
        .filter(|fields| !fields.is_empty())
}

fn parse_object(text: &str) -> Option<Map<String, Value>> {
    serde_json::from_str(text).ok()
}

/// Coerce loosely-typed model fields into a valid record.
///
/// Unknown keys are ignored. Bad individual fields are defaulted, never
/// rejected; an empty summary is replaced by the fallback summary of
/// `complaint`.
#[must_use]
pub fn normalize(fields: &Map<String, Value>, complaint: &str) -> ClassificationResult {
    ClassificationResult {
        category: normalize_category(fields.get("category")),
        severity: normalize_severity(fields.get("severity")),
        summary: normalize_summary(fields.get("summary"), complaint),
    }
}

fn normalize_category(value: Option<&Value>) -> Category {
    let label = match value {
        Some(Value::String(s)) => s.trim().to_lowercase(),
        Some(other) => {
            note_invalid("category", format!("expected a string, got {other}"));
            String::new()
        }
        None => String::new(),
    };

    Category::from_label(&label).unwrap_or(Category::Other)
}

fn normalize_severity(value: Option<&Value>) -> u8 {
    let coerced = match value {
        None => Some(i64::from(DEFAULT_SEVERITY)),
        Some(v) => coerce_int(v),
    };

    let severity = coerced.unwrap_or_else(|| {
        note_invalid("severity", format!("not an integer: {value:?}"));
        i64::from(DEFAULT_SEVERITY)
    });

    let clamped = severity.clamp(i64::from(MIN_SEVERITY), i64::from(MAX_SEVERITY));
    u8::try_from(clamped).unwrap_or(DEFAULT_SEVERITY)
}

/// Integer coercion: integers as-is, finite floats truncated, decimal
/// strings parsed (saturating on overflow), booleans as 0/1.
fn coerce_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_u64().map(|_| i64::MAX))
            .or_else(|| {
                n.as_f64()
                    .filter(|f| f.is_finite())
                    .map(|f| f.trunc() as i64)
            }),
        Value::String(s) => match s.trim().parse::<i64>() {
            Ok(n) => Some(n),
            Err(e) => match e.kind() {
                IntErrorKind::PosOverflow => Some(i64::MAX),
                IntErrorKind::NegOverflow => Some(i64::MIN),
                _ => None,
            },
        },
        Value::Bool(b) => Some(i64::from(*b)),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

fn normalize_summary(value: Option<&Value>, complaint: &str) -> String {
    let summary = match value {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string().trim().to_string(),
    };

    if summary.is_empty() {
        note_invalid("summary", "missing or empty".to_string());
        return cap_summary(&fallback_summary(complaint));
    }

    cap_summary(&summary)
}

fn note_invalid(field: &'static str, reason: String) {
    let error = ClassifyError::InvalidField { field, reason };
    debug!(error = %error, "Defaulting model field");
}

/// First [`MAX_SUMMARY_WORDS`] whitespace-separated words joined by single
/// spaces, then cut to [`MAX_SUMMARY_CHARS`] characters.
#[must_use]
pub fn cap_summary(summary: &str) -> String {
    let words = summary
        .split_whitespace()
        .take(MAX_SUMMARY_WORDS)
        .collect::<Vec<_>>()
        .join(" ");

    words.chars().take(MAX_SUMMARY_CHARS).collect()
}

/// Deterministic record derived from the complaint text alone.
#[must_use]
pub fn fallback(complaint: &str) -> ClassificationResult {
    ClassificationResult {
        category: Category::Other,
        severity: DEFAULT_SEVERITY,
        summary: fallback_summary(complaint),
    }
}

fn fallback_summary(complaint: &str) -> String {
    let mut chars = complaint.trim().chars();

    let mut summary = String::from(FALLBACK_PREFIX);
    summary.extend(chars.by_ref().take(FALLBACK_PREVIEW_CHARS));
    if chars.next().is_some() {
        summary.push_str(ELLIPSIS);
    }

    // Only reachable when the preview is made of very short tokens.
    if summary.split_whitespace().count() > MAX_SUMMARY_WORDS {
        return cap_summary(&summary);
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn extracts_object_wrapped_in_prose() {
        let raw = "Sure! Here is the JSON you asked for:\n\
                   {\"category\": \"noise\", \"severity\": 2, \"summary\": \"loud music\"}\n\
                   Let me know if you need anything else.";
        let map = extract_json(raw).unwrap();
        assert_eq!(map["category"], "noise");
        assert_eq!(map["severity"], 2);
    }

    #[test]
    fn repairs_single_quoted_object() {
        let single = extract_json("{'category': 'noise', 'severity': 2, 'summary': 'loud music'}");
        let double =
            extract_json(r#"{"category": "noise", "severity": 2, "summary": "loud music"}"#);
        assert!(single.is_some());
        assert_eq!(single, double);
    }

    #[test]
    fn strict_parse_keeps_apostrophes() {
        let map = extract_json(r#"{"summary": "tenant's door was kicked in"}"#).unwrap();
        assert_eq!(map["summary"], "tenant's door was kicked in");
    }

    #[test]
    fn extract_handles_nested_braces() {
        let raw = r#"{"category": "access", "meta": {"floor": 3}, "severity": 4, "summary": "lift broken"}"#;
        let map = extract_json(raw).unwrap();
        assert_eq!(map["meta"]["floor"], 3);
    }

    #[test]
    fn extract_returns_none_without_object() {
        assert!(extract_json("").is_none());
        assert!(extract_json("I cannot help with that.").is_none());
        assert!(extract_json("} backwards {").is_none());
        assert!(extract_json("{ unterminated").is_none());
        assert!(extract_json("{not json at all}").is_none());
    }

    #[test]
    fn extract_treats_empty_object_as_missing() {
        assert!(extract_json("result: {}").is_none());
    }

    // Greedy span: two separate objects are read as one invalid candidate.
    // This pins current behaviour; it is not a guarantee.
    #[test]
    fn extract_spans_first_to_last_brace() {
        let raw = r#"{"category": "noise"} or maybe {"category": "access"}"#;
        assert!(extract_json(raw).is_none());
    }

    #[test]
    fn category_is_trimmed_and_lowercased() {
        let result = normalize(&fields(json!({"category": "  Property_Damage "})), "x");
        assert_eq!(result.category, Category::PropertyDamage);
    }

    #[test]
    fn unknown_or_non_string_category_is_other() {
        for value in [json!("plumbing"), json!(""), json!(7), json!(null), json!(["noise"])] {
            let result = normalize(&fields(json!({ "category": value })), "x");
            assert_eq!(result.category, Category::Other);
        }
        assert_eq!(normalize(&Map::new(), "x").category, Category::Other);
    }

    #[test]
    fn severity_is_coerced_and_clamped() {
        let cases = [
            (json!(-5), 1),
            (json!(0), 1),
            (json!(1), 1),
            (json!(4), 4),
            (json!(6), 5),
            (json!(9), 5),
            (json!("high"), 3),
            (json!(" 4 "), 4),
            (json!("+2"), 2),
            (json!("4.5"), 3),
            (json!(3.7), 3),
            (json!(-0.5), 1),
            (json!(null), 3),
            (json!([4]), 3),
            (json!({"level": 4}), 3),
            (json!(true), 1),
            (json!("99999999999999999999999"), 5),
            (json!("-99999999999999999999999"), 1),
            (json!(18446744073709551615_u64), 5),
            (json!(1e300), 5),
        ];

        for (value, expected) in cases {
            let result = normalize(&fields(json!({ "severity": value.clone() })), "x");
            assert_eq!(result.severity, expected, "severity for {value}");
        }
    }

    #[test]
    fn absent_severity_defaults_to_midpoint() {
        let result = normalize(&fields(json!({"category": "noise"})), "x");
        assert_eq!(result.severity, DEFAULT_SEVERITY);
    }

    #[test]
    fn empty_summary_uses_fallback_summary_of_complaint() {
        let complaint = "Water leaking from ceiling";
        for value in [json!(""), json!("   "), json!(null)] {
            let result = normalize(&fields(json!({ "summary": value })), complaint);
            assert_eq!(result.summary, "Reported issue: Water leaking from ceiling");
        }
        let result = normalize(&fields(json!({"category": "noise"})), complaint);
        assert_eq!(result.summary, "Reported issue: Water leaking from ceiling");
    }

    #[test]
    fn non_string_summary_is_rendered() {
        let result = normalize(&fields(json!({"summary": 42})), "x");
        assert_eq!(result.summary, "42");
    }

    #[test]
    fn summary_is_word_capped_before_char_cap() {
        let words: Vec<String> = (0..120).map(|i| format!("w{i}")).collect();
        let result = normalize(&fields(json!({"summary": words.join(" ")})), "x");
        assert_eq!(result.summary, words[..60].join(" "));
    }

    #[test]
    fn summary_char_cap_applies_to_long_words() {
        let summary = format!("{} tail", "x".repeat(900));
        let capped = cap_summary(&summary);
        assert_eq!(capped.chars().count(), MAX_SUMMARY_CHARS);
        assert!(capped.chars().all(|c| c == 'x'));
    }

    #[test]
    fn summary_whitespace_is_collapsed() {
        assert_eq!(cap_summary("  loud\n\nmusic \t at night "), "loud music at night");
    }

    #[test]
    fn cap_summary_counts_characters_not_bytes() {
        let capped = cap_summary(&"ü".repeat(600));
        assert_eq!(capped.chars().count(), MAX_SUMMARY_CHARS);
    }

    #[test]
    fn fallback_summary_shape() {
        let long = "a".repeat(250);
        let record = fallback(&long);
        assert_eq!(record.category, Category::Other);
        assert_eq!(record.severity, 3);
        assert_eq!(record.summary, format!("Reported issue: {}...", "a".repeat(200)));

        let exact = "b".repeat(200);
        assert_eq!(fallback(&exact).summary, format!("Reported issue: {exact}"));

        assert_eq!(fallback("  no heat  ").summary, "Reported issue: no heat");
        assert_eq!(fallback("").summary, "Reported issue: ");
    }

    #[test]
    fn fallback_truncates_by_characters() {
        let text = "é".repeat(201);
        let summary = fallback(&text).summary;
        assert_eq!(summary, format!("Reported issue: {}...", "é".repeat(200)));
    }

    #[test]
    fn fallback_respects_word_cap_for_tiny_tokens() {
        let text = "a ".repeat(150);
        let summary = fallback(&text).summary;
        assert!(summary.split_whitespace().count() <= MAX_SUMMARY_WORDS);
        assert!(summary.starts_with("Reported issue:"));
    }

    #[test]
    fn fallback_word_cap_applies_to_two_letter_tokens() {
        let summary = fallback(&"ab ".repeat(70)).summary;
        assert_eq!(summary.split_whitespace().count(), MAX_SUMMARY_WORDS);
        assert_eq!(summary, format!("Reported issue: {}", ["ab"; 58].join(" ")));
    }
}
