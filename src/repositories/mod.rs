pub(crate) mod attempts;
pub(crate) mod courses;
pub(crate) mod health;
pub(crate) mod quizzes;
