//! The quiz conversation as a pure function.
//!
//! The controller asks [`lookup_for`] which backend record a command depends
//! on, fetches it, and hands the result to [`decide`]. No I/O happens here.

use tracing::warn;

use crate::commands::Command;
use crate::errors::RepositoryError;
use crate::repository::{Category, Language, User};
use crate::state::{DataState, FlowState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    Nothing,
    User,
    Language(i64),
    Category(i64),
}

#[derive(Debug)]
pub enum Snapshot {
    Nothing,
    User(DataState<User>),
    Language(DataState<Language>),
    Category(DataState<Category>),
}

#[derive(Debug)]
pub enum Action {
    AskLanguage,
    AskStartQuiz,
    ConfirmLanguage(Language),
    RejectLanguage(Option<RepositoryError>),
    RegisterUser(Category),
    CategoryNotFound,
    StartQuiz,
    ShowStartHelp,
    SendNextWord,
    RecordAnswer { word_id: i64, correct: bool },
    ReportWait(User),
    UserNotFound,
    DeleteUser,
    /// Log and tell the user something went wrong.
    ReportFailure {
        operation: &'static str,
        error: RepositoryError,
    },
    /// Log only; used where nobody is waiting for an answer.
    LogFailure {
        operation: &'static str,
        error: RepositoryError,
    },
    Ignore,
}

/// `next` is where the chat ends up once `action` is done. Actions that go
/// through "send next word" report `InQuiz`; the controller downgrades it to
/// `AwaitingNextTest` when no word is left.
#[derive(Debug)]
pub struct Transition {
    pub action: Action,
    pub next: FlowState,
}

fn to(action: Action, next: FlowState) -> Transition {
    Transition { action, next }
}

pub fn lookup_for(command: &Command) -> Lookup {
    match command {
        Command::Start | Command::TimeToNextTest => Lookup::User,
        Command::SetLanguage { language_id } => Lookup::Language(*language_id),
        Command::SetCategory { category_id } => Lookup::Category(*category_id),
        _ => Lookup::Nothing,
    }
}

pub fn decide(command: &Command, snapshot: Snapshot) -> Transition {
    use FlowState::*;

    match (command, snapshot) {
        (Command::Start, Snapshot::User(user)) => match user {
            DataState::Empty => to(Action::AskLanguage, AwaitingLanguageChoice),
            DataState::Success(_) => to(Action::AskStartQuiz, AwaitingStartDecision),
            DataState::Failure(error) => to(
                Action::ReportFailure {
                    operation: "get_user_by_chat_id",
                    error,
                },
                NoUser,
            ),
        },
        (Command::SetLanguage { .. }, Snapshot::Language(language)) => match language {
            DataState::Success(language) => {
                to(Action::ConfirmLanguage(language), AwaitingCategoryChoice)
            }
            DataState::Empty => to(Action::RejectLanguage(None), AwaitingLanguageChoice),
            DataState::Failure(error) => {
                to(Action::RejectLanguage(Some(error)), AwaitingLanguageChoice)
            }
        },
        (Command::SetCategory { .. }, Snapshot::Category(category)) => match category {
            DataState::Success(category) => {
                to(Action::RegisterUser(category), AwaitingStartDecision)
            }
            DataState::Empty => to(Action::CategoryNotFound, Unchanged),
            DataState::Failure(error) => to(
                Action::ReportFailure {
                    operation: "get_category",
                    error,
                },
                Unchanged,
            ),
        },
        (Command::StartQuiz { start: true }, _) => to(Action::StartQuiz, InQuiz),
        (Command::StartQuiz { start: false }, _) => {
            to(Action::ShowStartHelp, AwaitingStartDecision)
        }
        (Command::GetQuizTest, _) => to(Action::SendNextWord, InQuiz),
        (Command::CorrectAnswer { word_id }, _) => to(
            Action::RecordAnswer {
                word_id: *word_id,
                correct: true,
            },
            InQuiz,
        ),
        (Command::IncorrectAnswer { word_id }, _) => to(
            Action::RecordAnswer {
                word_id: *word_id,
                correct: false,
            },
            InQuiz,
        ),
        (Command::TimeToNextTest, Snapshot::User(user)) => match user {
            DataState::Success(user) => to(Action::ReportWait(user), Unchanged),
            DataState::Empty => to(Action::UserNotFound, NoUser),
            DataState::Failure(error) => to(
                Action::ReportFailure {
                    operation: "get_user_by_chat_id",
                    error,
                },
                Unchanged,
            ),
        },
        (Command::Stop, _) => to(Action::DeleteUser, NoUser),
        (Command::AskExam { .. } | Command::Unknown, _) => to(Action::Ignore, Unchanged),
        (command, snapshot) => {
            warn!(?command, ?snapshot, "Snapshot does not match command");
            to(Action::Ignore, Unchanged)
        }
    }
}

/// What a re-engagement wake-up does for the chat's current user record.
pub fn resume(user: DataState<User>) -> Transition {
    match user {
        DataState::Empty => to(Action::AskLanguage, FlowState::AwaitingLanguageChoice),
        DataState::Success(_) => to(Action::AskStartQuiz, FlowState::AwaitingStartDecision),
        DataState::Failure(error) => to(
            Action::LogFailure {
                operation: "get_user_by_chat_id",
                error,
            },
            FlowState::Unchanged,
        ),
    }
}
