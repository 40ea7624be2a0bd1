//! Deterministic rules for objective question types.

/// Exact match against the option key; no normalization.
pub(crate) fn multiple_choice_is_correct(correct_option: &str, response: &str) -> bool {
    response == correct_option
}

/// Surrounding whitespace is ignored and letters compare case-insensitively.
pub(crate) fn short_answer_is_correct(correct_answer: &str, response: &str) -> bool {
    response.trim().to_lowercase() == correct_answer.trim().to_lowercase()
}

pub(crate) fn clamp_score(score: f64, points: f64) -> f64 {
    if score.is_nan() {
        return 0.0;
    }
    score.clamp(0.0, points)
}

pub(crate) fn is_blank(response: Option<&str>) -> bool {
    response.map_or(true, |value| value.trim().is_empty())
}
