use rand::seq::SliceRandom;
use rand::Rng;

use crate::core::time::format_primitive;
use crate::db::models::{PresentationOrder, PresentedQuestion, QuizDefinition};
use crate::schemas::quiz::{QuestionView, QuizView};

/// Draws a fresh question/option order for `quiz`, honouring its shuffle flags.
pub(crate) fn shuffle_order<R: Rng + ?Sized>(
    quiz: &QuizDefinition,
    rng: &mut R,
) -> PresentationOrder {
    let mut questions: Vec<PresentedQuestion> = quiz
        .questions
        .iter()
        .map(|question| {
            let mut option_order: Vec<usize> = (0..question.options.len()).collect();
            if quiz.shuffle_options {
                option_order.shuffle(rng);
            }
            PresentedQuestion { question_id: question.id.clone(), option_order }
        })
        .collect();

    if quiz.shuffle_questions {
        questions.shuffle(rng);
    }

    PresentationOrder { questions }
}

pub(crate) fn identity_order(quiz: &QuizDefinition) -> PresentationOrder {
    PresentationOrder {
        questions: quiz
            .questions
            .iter()
            .map(|question| PresentedQuestion {
                question_id: question.id.clone(),
                option_order: (0..question.options.len()).collect(),
            })
            .collect(),
    }
}

/// Builds the learner-facing view. Correct answers never leave this function.
pub(crate) fn render(quiz: &QuizDefinition, order: &PresentationOrder) -> QuizView {
    let questions = order
        .questions
        .iter()
        .filter_map(|presented| {
            let question = quiz.questions.iter().find(|q| q.id == presented.question_id)?;
            let options = presented
                .option_order
                .iter()
                .filter_map(|original| question.options.get(*original).cloned())
                .collect();
            Some(QuestionView { id: question.id.clone(), text: question.text.clone(), options })
        })
        .collect();

    QuizView {
        id: quiz.id.clone(),
        course_id: quiz.course_id.clone(),
        chapter_id: quiz.chapter_id.clone(),
        title: quiz.title.clone(),
        time_limit_minutes: quiz.time_limit_minutes,
        passing_score: quiz.passing_score,
        max_attempts: quiz.max_attempts,
        available_from: quiz.available_from.map(format_primitive),
        available_to: quiz.available_to.map(format_primitive),
        show_correct_answers: quiz.show_correct_answers,
        questions,
    }
}

pub(crate) fn present<R: Rng + ?Sized>(
    quiz: &QuizDefinition,
    rng: &mut R,
) -> (QuizView, PresentationOrder) {
    let order = shuffle_order(quiz, rng);
    (render(quiz, &order), order)
}

impl PresentationOrder {
    fn option_order(&self, question_id: &str) -> Option<&[usize]> {
        self.questions
            .iter()
            .find(|presented| presented.question_id == question_id)
            .map(|presented| presented.option_order.as_slice())
    }

    /// Maps an index the learner saw to the stored option index. Blanks and
    /// out-of-range values pass through unchanged for the scorer to judge.
    pub(crate) fn to_original(&self, question_id: &str, displayed: i32) -> i32 {
        let Some(order) = self.option_order(question_id) else {
            return displayed;
        };
        usize::try_from(displayed)
            .ok()
            .and_then(|index| order.get(index))
            .and_then(|original| i32::try_from(*original).ok())
            .unwrap_or(displayed)
    }

    pub(crate) fn to_displayed(&self, question_id: &str, original: i32) -> i32 {
        let (Some(order), Ok(index)) = (self.option_order(question_id), usize::try_from(original))
        else {
            return original;
        };
        order
            .iter()
            .position(|candidate| *candidate == index)
            .and_then(|position| i32::try_from(position).ok())
            .unwrap_or(original)
    }
}
