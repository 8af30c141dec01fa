use thiserror::Error;

use crate::evaluator::EvaluateError;
use crate::model::QuestionError;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Question(#[from] QuestionError),
    #[error(transparent)]
    Evaluate(#[from] EvaluateError),
}
