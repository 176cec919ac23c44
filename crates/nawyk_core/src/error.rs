//! Engine error taxonomy. Cascade failures inside sweeps and best-effort
//! progress recomputes are logged where they happen and never surface here.

use thiserror::Error;

use nawyk_domain::schedule::GateError;

use crate::model::{GoalId, HabitId, Status};
use crate::store::StoreError;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Error {
    #[error("goal {0} not found")]
    GoalNotFound(GoalId),
    #[error("habit {0} not found")]
    HabitNotFound(HabitId),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error(transparent)]
    Gate(#[from] GateError),
    #[error("habit is {status:?}, completions are only allowed while active")]
    HabitNotActive { status: Status },
    #[error("goal is {status:?}, it can no longer be edited")]
    GoalNotActive { status: Status },
}

impl From<GateError> for Error {
    fn from(err: GateError) -> Self {
        Error::Validation(ValidationError::Gate(err))
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
