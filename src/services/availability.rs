use serde::Serialize;
use time::PrimitiveDateTime;

use crate::core::time::format_primitive;
use crate::db::models::QuizDefinition;

/// What the engine knows about a learner's past attempts on one quiz.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct AttemptHistory {
    pub(crate) submitted_attempts: i64,
    pub(crate) has_unsubmitted_attempt: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct Availability {
    pub(crate) can_start: bool,
    pub(crate) reason: Option<String>,
    pub(crate) remaining_attempts: Option<i64>,
}

/// Decides whether a new attempt may start. Rules are checked in order and the
/// first failing one supplies the reason.
pub(crate) fn evaluate(
    quiz: &QuizDefinition,
    history: AttemptHistory,
    now: PrimitiveDateTime,
) -> Availability {
    let remaining_attempts = quiz
        .max_attempts
        .map(|max| (i64::from(max) - history.submitted_attempts).max(0));

    let reason = blocking_reason(quiz, history, now);

    Availability { can_start: reason.is_none(), reason, remaining_attempts }
}

fn blocking_reason(
    quiz: &QuizDefinition,
    history: AttemptHistory,
    now: PrimitiveDateTime,
) -> Option<String> {
    if let Some(from) = quiz.available_from {
        if now < from {
            return Some(format!("Quiz is not available until {}", format_primitive(from)));
        }
    }

    if let Some(to) = quiz.available_to {
        if now > to {
            return Some(format!("Quiz closed at {}", format_primitive(to)));
        }
    }

    if let Some(max) = quiz.max_attempts {
        if history.submitted_attempts >= i64::from(max) {
            return Some(format!("You have reached the maximum number of attempts ({max})"));
        }
    }

    if history.has_unsubmitted_attempt {
        return Some(
            "You already have an unfinished attempt; finish it or let the pending attempt expire"
                .to_string(),
        );
    }

    None
}
