use std::collections::{HashMap, HashSet};

use thiserror::Error;

use crate::db::models::Question;

/// Marker for a question the learner left blank.
pub(crate) const UNANSWERED: i32 = -1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SubmittedAnswer {
    pub(crate) question_id: String,
    pub(crate) selected_answer_index: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct QuestionResult {
    pub(crate) question_id: String,
    pub(crate) selected_answer_index: i32,
    pub(crate) correct_answer_index: i32,
    pub(crate) is_correct: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ScoreSheet {
    pub(crate) correct_answers: usize,
    pub(crate) total_questions: usize,
    pub(crate) score: i32,
    pub(crate) results: Vec<QuestionResult>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub(crate) enum ScoringError {
    #[error("answer references unknown question '{0}'")]
    UnknownQuestion(String),
    #[error("question '{0}' was answered more than once")]
    DuplicateAnswer(String),
    #[error("option {index} does not exist for question '{question_id}'")]
    InvalidOption { question_id: String, index: i32 },
}

/// Scores `answers` against the answer key. Questions without an answer count
/// as `UNANSWERED` and are always wrong. Results follow question order.
pub(crate) fn score(
    questions: &[Question],
    answers: &[SubmittedAnswer],
) -> Result<ScoreSheet, ScoringError> {
    let selected = index_answers(questions, answers)?;

    let results: Vec<QuestionResult> = questions
        .iter()
        .map(|question| {
            let selected_answer_index =
                selected.get(question.id.as_str()).copied().unwrap_or(UNANSWERED);
            QuestionResult {
                question_id: question.id.clone(),
                selected_answer_index,
                correct_answer_index: question.correct_answer_index,
                is_correct: selected_answer_index == question.correct_answer_index,
            }
        })
        .collect();

    let correct_answers = results.iter().filter(|result| result.is_correct).count();
    let total_questions = questions.len();

    Ok(ScoreSheet {
        correct_answers,
        total_questions,
        score: percentage(correct_answers, total_questions),
        results,
    })
}

fn index_answers<'a>(
    questions: &'a [Question],
    answers: &'a [SubmittedAnswer],
) -> Result<HashMap<&'a str, i32>, ScoringError> {
    let option_counts: HashMap<&str, usize> =
        questions.iter().map(|question| (question.id.as_str(), question.options.len())).collect();

    let mut seen = HashSet::new();
    let mut selected = HashMap::with_capacity(answers.len());

    for answer in answers {
        let Some(option_count) = option_counts.get(answer.question_id.as_str()) else {
            return Err(ScoringError::UnknownQuestion(answer.question_id.clone()));
        };
        if !seen.insert(answer.question_id.as_str()) {
            return Err(ScoringError::DuplicateAnswer(answer.question_id.clone()));
        }

        let index = answer.selected_answer_index;
        let in_range = usize::try_from(index).map(|idx| idx < *option_count).unwrap_or(false);
        if index != UNANSWERED && !in_range {
            return Err(ScoringError::InvalidOption {
                question_id: answer.question_id.clone(),
                index,
            });
        }

        selected.insert(answer.question_id.as_str(), index);
    }

    Ok(selected)
}

/// `round(correct / total * 100)` with halves rounded up. An empty quiz scores 0.
pub(crate) fn percentage(correct: usize, total: usize) -> i32 {
    if total == 0 {
        return 0;
    }
    let correct = correct.min(total) as u64;
    let total = total as u64;
    ((200 * correct + total) / (2 * total)) as i32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::quiz_fixture;

    fn answer(question_id: &str, index: i32) -> SubmittedAnswer {
        SubmittedAnswer { question_id: question_id.to_string(), selected_answer_index: index }
    }

    #[test]
    fn percentage_rounds_half_up() {
        assert_eq!(percentage(2, 3), 67);
        assert_eq!(percentage(1, 3), 33);
        assert_eq!(percentage(1, 8), 13);
        assert_eq!(percentage(1, 200), 1);
        assert_eq!(percentage(0, 5), 0);
        assert_eq!(percentage(5, 5), 100);
        assert_eq!(percentage(0, 0), 0);
    }

    #[test]
    fn percentage_stays_in_bounds() {
        for total in 1..=40 {
            for correct in 0..=total {
                let value = percentage(correct, total);
                assert!((0..=100).contains(&value), "{correct}/{total} -> {value}");
            }
        }
    }

    #[test]
    fn blank_question_counts_as_wrong() {
        let quiz = quiz_fixture("quiz-1", "course-1", &[0, 1, 2]);
        let sheet =
            score(&quiz.questions, &[answer("q1", 0), answer("q2", 1)]).expect("score sheet");

        assert_eq!(sheet.correct_answers, 2);
        assert_eq!(sheet.total_questions, 3);
        assert_eq!(sheet.score, 67);
        assert_eq!(
            sheet.results[2],
            QuestionResult {
                question_id: "q3".to_string(),
                selected_answer_index: UNANSWERED,
                correct_answer_index: 2,
                is_correct: false,
            }
        );
    }

    #[test]
    fn explicit_unanswered_is_accepted() {
        let quiz = quiz_fixture("quiz-1", "course-1", &[1]);
        let sheet = score(&quiz.questions, &[answer("q1", UNANSWERED)]).expect("score sheet");
        assert_eq!(sheet.score, 0);
        assert!(!sheet.results[0].is_correct);
    }

    #[test]
    fn results_follow_question_order_regardless_of_answer_order() {
        let quiz = quiz_fixture("quiz-1", "course-1", &[0, 1, 2]);
        let forward = score(&quiz.questions, &[answer("q1", 0), answer("q2", 3), answer("q3", 2)])
            .expect("forward");
        let reversed = score(&quiz.questions, &[answer("q3", 2), answer("q2", 3), answer("q1", 0)])
            .expect("reversed");

        assert_eq!(forward, reversed);
        let ids: Vec<_> = forward.results.iter().map(|r| r.question_id.as_str()).collect();
        assert_eq!(ids, ["q1", "q2", "q3"]);
    }

    #[test]
    fn unknown_question_is_rejected() {
        let quiz = quiz_fixture("quiz-1", "course-1", &[0]);
        let err = score(&quiz.questions, &[answer("nope", 0)]).unwrap_err();
        assert_eq!(err, ScoringError::UnknownQuestion("nope".to_string()));
    }

    #[test]
    fn duplicate_answers_are_rejected() {
        let quiz = quiz_fixture("quiz-1", "course-1", &[0]);
        let err = score(&quiz.questions, &[answer("q1", 0), answer("q1", 1)]).unwrap_err();
        assert_eq!(err, ScoringError::DuplicateAnswer("q1".to_string()));
    }

    #[test]
    fn out_of_range_option_is_rejected() {
        let quiz = quiz_fixture("quiz-1", "course-1", &[0]);
        assert!(matches!(
            score(&quiz.questions, &[answer("q1", 4)]),
            Err(ScoringError::InvalidOption { index: 4, .. })
        ));
        assert!(matches!(
            score(&quiz.questions, &[answer("q1", -2)]),
            Err(ScoringError::InvalidOption { index: -2, .. })
        ));
    }

    #[test]
    fn empty_quiz_scores_zero() {
        let sheet = score(&[], &[]).expect("score sheet");
        assert_eq!(sheet.score, 0);
        assert!(sheet.results.is_empty());
    }
}
