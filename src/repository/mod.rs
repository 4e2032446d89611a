//! Capabilities the quiz flow needs from the backend.
//!
//! Every lookup answers with a [`DataState`]; plain mutations answer with
//! whether the backend accepted them.

use async_trait::async_trait;

use crate::errors::RepositoryError;
use crate::state::DataState;

pub mod http;
pub mod models;

pub use models::{Category, Language, QuizWord, QuizWordStats, User};

pub type MutationResult = Result<bool, RepositoryError>;

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn get_user_by_chat_id(&self, chat_id: i64) -> DataState<User>;

    async fn add_user(&self, chat_id: i64, category_id: i64, language_id: i64) -> DataState<User>;

    async fn delete_user(&self, chat_id: i64) -> MutationResult;
}

#[async_trait]
pub trait QuizRepository: Send + Sync {
    async fn get_next_quiz_word(&self, chat_id: i64) -> DataState<QuizWord>;

    async fn create_quiz_words(&self, chat_id: i64) -> MutationResult;

    async fn set_answer(
        &self,
        chat_id: i64,
        word_id: i64,
        is_correct: bool,
    ) -> DataState<QuizWordStats>;

    async fn reset_quiz(&self, chat_id: i64) -> MutationResult;

    async fn reset_quiz_word_number(&self, chat_id: i64) -> MutationResult;
}

#[async_trait]
pub trait CategoryRepository: Send + Sync {
    async fn get_category(&self, id: i64) -> DataState<Category>;

    async fn get_categories_by_language(&self, language_id: i64) -> DataState<Vec<Category>>;
}

#[async_trait]
pub trait LanguageRepository: Send + Sync {
    async fn get_language_by_id(&self, id: i64) -> DataState<Language>;

    async fn get_available_languages(&self) -> DataState<Vec<Language>>;
}
