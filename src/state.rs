use crate::errors::RepositoryError;

/// Outcome of a backend lookup or mutation.
///
/// `Empty` means the record legitimately does not exist, `Failure` means the
/// call itself went wrong. Callers are expected to match all three arms.
#[derive(Debug)]
pub enum DataState<T> {
    Success(T),
    Empty,
    Failure(RepositoryError),
}

impl<T> DataState<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, DataState::Success(_))
    }

    pub fn success(self) -> Option<T> {
        match self {
            DataState::Success(data) => Some(data),
            _ => None,
        }
    }
}

/// Conversation position of a chat.
///
/// Never stored: it is re-derived every turn from what the backend returns,
/// and only reported by the transition table for logging and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlowState {
    #[default]
    NoUser,
    AwaitingLanguageChoice,
    AwaitingCategoryChoice,
    AwaitingStartDecision,
    InQuiz,
    AwaitingNextTest,
    Unchanged,
}
