//! Model candidate ordering and sequential fallback.
//!
//! - Candidates are `[current] ++ fallbacks`, deduplicated with first
//!   occurrence winning.
//! - [`select_working_model`] tries candidates strictly one after another and
//!   reports which model produced the value. It does not persist anything;
//!   callers decide what to do with the returned selection.
//!
//! # Example
//! ```
//! use ai_llm_service::model_selection::dedup_preserving_order;
//!
//! let order = dedup_preserving_order(["A", "B", "A", "C"]);
//! assert_eq!(order, vec!["A", "B", "C"]);
//! ```

use std::{collections::HashSet, future::Future};

use tracing::{debug, info, warn};

use crate::error_handler::AiLlmError;

/// Path prefix the API uses in fully qualified model names.
const MODELS_PREFIX: &str = "models/";

/// Strips a leading `models/` from a model identifier.
pub fn bare_model_id(id: &str) -> &str {
    let id = id.trim();
    id.strip_prefix(MODELS_PREFIX).unwrap_or(id)
}

/// Deduplicates identifiers preserving first-occurrence order.
///
/// Blank identifiers are dropped.
pub fn dedup_preserving_order<I, S>(ids: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    ids.into_iter()
        .map(|s| s.as_ref().trim().to_string())
        .filter(|s| !s.is_empty())
        .filter(|s| seen.insert(s.clone()))
        .collect()
}

/// Builds the ordered attempt list: the current model first, then fallbacks.
///
/// Identifiers are normalized with [`bare_model_id`] before deduplication,
/// so `models/x` and `x` count as the same candidate.
pub fn candidate_models<S: AsRef<str>>(current: Option<&str>, fallbacks: &[S]) -> Vec<String> {
    let ordered = current
        .into_iter()
        .chain(fallbacks.iter().map(|s| s.as_ref()))
        .map(bare_model_id);
    dedup_preserving_order(ordered)
}

/// Outcome of a successful [`select_working_model`] run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selected<T> {
    /// Value produced by the winning attempt.
    pub value: T,
    /// Model identifier that produced `value`.
    pub model: String,
    /// Number of attempts made, including the successful one.
    pub attempts: usize,
}

/// Tries `candidates` in order until `try_fn` succeeds.
///
/// Attempts are sequential: the next candidate is only tried after the
/// previous one failed. Every failure kind moves on to the next candidate.
///
/// # Errors
/// - [`AiLlmError::NoModelCandidates`] if `candidates` is empty
/// - the error of the last attempted candidate when all of them fail
pub async fn select_working_model<T, F, Fut>(
    candidates: &[String],
    mut try_fn: F,
) -> Result<Selected<T>, AiLlmError>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<T, AiLlmError>>,
{
    let mut last_error = None;

    for (idx, model) in candidates.iter().enumerate() {
        debug!(model = %model, attempt = idx + 1, total = candidates.len(), "trying model");
        match try_fn(model.clone()).await {
            Ok(value) => {
                info!(model = %model, attempts = idx + 1, "model answered");
                return Ok(Selected {
                    value,
                    model: model.clone(),
                    attempts: idx + 1,
                });
            }
            Err(err) => {
                warn!(model = %model, kind = ?err.kind(), error = %err, "model attempt failed");
                last_error = Some(err);
            }
        }
    }

    Err(last_error.unwrap_or(AiLlmError::NoModelCandidates))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error_handler::{ErrorKind, HttpError};
    use reqwest::StatusCode;
    use std::cell::RefCell;

    fn unavailable(model: &str) -> AiLlmError {
        AiLlmError::ModelUnavailable {
            model: model.to_string(),
            source: HttpError {
                status: StatusCode::NOT_FOUND,
                url: format!("https://x/v1beta/models/{model}:generateContent"),
                message: "not found".into(),
            },
        }
    }

    #[test]
    fn dedup_keeps_first_occurrence() {
        assert_eq!(
            dedup_preserving_order(["A", "B", "A", "C"]),
            vec!["A", "B", "C"]
        );
        assert_eq!(dedup_preserving_order(["", " ", "A"]), vec!["A"]);
    }

    #[test]
    fn candidates_start_with_current_and_normalize_prefix() {
        let fallbacks = ["gemini-1.5-flash", "gemini-1.5-pro", "models/gemini-1.5-flash"];
        assert_eq!(
            candidate_models(Some("models/gemini-1.5-pro"), &fallbacks),
            vec!["gemini-1.5-pro", "gemini-1.5-flash"]
        );
        assert_eq!(
            candidate_models(None, &fallbacks),
            vec!["gemini-1.5-flash", "gemini-1.5-pro"]
        );
    }

    #[test]
    fn bare_id_strips_only_leading_prefix() {
        assert_eq!(bare_model_id("models/gemini-pro"), "gemini-pro");
        assert_eq!(bare_model_id("gemini-pro"), "gemini-pro");
    }

    #[tokio::test]
    async fn first_success_stops_iteration() {
        let calls = RefCell::new(Vec::new());
        let candidates = vec!["a".to_string(), "b".to_string()];

        let sel = select_working_model(&candidates, |m| {
            calls.borrow_mut().push(m.clone());
            async move { Ok::<_, AiLlmError>(format!("answer from {m}")) }
        })
        .await
        .unwrap();

        assert_eq!(sel.model, "a");
        assert_eq!(sel.attempts, 1);
        assert_eq!(*calls.borrow(), vec!["a"]);
    }

    #[tokio::test]
    async fn falls_through_to_next_candidate() {
        let candidates = vec!["a".to_string(), "b".to_string(), "c".to_string()];

        let sel = select_working_model(&candidates, |m| async move {
            if m == "a" { Err(unavailable(&m)) } else { Ok(m.to_uppercase()) }
        })
        .await
        .unwrap();

        assert_eq!(sel.value, "B");
        assert_eq!(sel.model, "b");
        assert_eq!(sel.attempts, 2);
    }

    #[tokio::test]
    async fn exhaustion_returns_last_error() {
        let calls = RefCell::new(0usize);
        let candidates = vec!["a".to_string(), "b".to_string()];

        let err = select_working_model(&candidates, |m| {
            *calls.borrow_mut() += 1;
            async move { Err::<String, _>(unavailable(&m)) }
        })
        .await
        .unwrap_err();

        assert_eq!(*calls.borrow(), 2);
        assert_eq!(err.kind(), ErrorKind::ModelUnavailable);
        assert!(matches!(err, AiLlmError::ModelUnavailable { model, .. } if model == "b"));
    }

    #[tokio::test]
    async fn empty_candidate_list() {
        let err = select_working_model::<String, _, _>(&[], |_| async {
            Ok("unreachable".to_string())
        })
        .await
        .unwrap_err();
        assert!(matches!(err, AiLlmError::NoModelCandidates));
    }
}
