use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{debug, error, info, instrument, warn};

use crate::commands::{help_text, Command, RequestData};
use crate::dispatch::{Job, JobHandler};
use crate::errors::RepositoryError;
use crate::messages;
use crate::repository::{
    Category, CategoryRepository, Language, LanguageRepository, QuizRepository, QuizWord,
    UserRepository,
};
use crate::response::{Response, ResponseSink};
use crate::scheduler::Scheduler;
use crate::state::{DataState, FlowState};
use crate::transition::{self, Action, Lookup, Snapshot, Transition};

#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub quiz: Arc<dyn QuizRepository>,
    pub categories: Arc<dyn CategoryRepository>,
    pub languages: Arc<dyn LanguageRepository>,
}

impl Repositories {
    /// All four capabilities served by one backend client.
    pub fn from_backend<B>(backend: Arc<B>) -> Self
    where
        B: UserRepository + QuizRepository + CategoryRepository + LanguageRepository + 'static,
    {
        Self {
            users: backend.clone(),
            quiz: backend.clone(),
            categories: backend.clone(),
            languages: backend,
        }
    }
}

/// Drives the quiz conversation. Holds no per-chat state: every turn starts
/// from what the backend says.
pub struct QuizFlow {
    repos: Repositories,
    sink: Arc<dyn ResponseSink>,
    scheduler: Scheduler,
}

impl QuizFlow {
    pub fn new(repos: Repositories, sink: Arc<dyn ResponseSink>, scheduler: Scheduler) -> Self {
        Self {
            repos,
            sink,
            scheduler,
        }
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Runs one command to completion and returns where the chat ended up.
    #[instrument(level = "info", skip(self), fields(chat_id = request.chat_id))]
    pub async fn handle(&self, request: RequestData) -> FlowState {
        let RequestData {
            chat_id,
            message_id,
            command,
        } = request;

        let snapshot = self
            .snapshot(transition::lookup_for(&command), chat_id)
            .await;
        let Transition { action, next } = transition::decide(&command, snapshot);
        debug!(?command, ?action, ?next, "Transition");

        self.perform(chat_id, message_id, action, next).await
    }

    /// Re-engagement entry point, called when a scheduled wake-up fires.
    #[instrument(level = "info", skip(self))]
    pub async fn resume(&self, chat_id: i64) -> FlowState {
        let user = self.repos.users.get_user_by_chat_id(chat_id).await;
        let Transition { action, next } = transition::resume(user);

        match action {
            Action::AskLanguage => self.ask_language(chat_id).await,
            Action::AskStartQuiz => self.ask_start_quiz(chat_id).await,
            Action::LogFailure { operation, error } => {
                error!(chat_id, operation, error = %error, "[ERROR] wake-up failed");
            }
            other => warn!(chat_id, ?other, "Unexpected wake-up action"),
        }

        next
    }

    async fn snapshot(&self, lookup: Lookup, chat_id: i64) -> Snapshot {
        match lookup {
            Lookup::Nothing => Snapshot::Nothing,
            Lookup::User => Snapshot::User(self.repos.users.get_user_by_chat_id(chat_id).await),
            Lookup::Language(id) => {
                Snapshot::Language(self.repos.languages.get_language_by_id(id).await)
            }
            Lookup::Category(id) => {
                Snapshot::Category(self.repos.categories.get_category(id).await)
            }
        }
    }

    async fn perform(
        &self,
        chat_id: i64,
        message_id: i32,
        action: Action,
        next: FlowState,
    ) -> FlowState {
        match action {
            Action::AskLanguage => {
                self.ask_language(chat_id).await;
                next
            }
            Action::AskStartQuiz => {
                self.ask_start_quiz(chat_id).await;
                next
            }
            Action::ConfirmLanguage(language) => {
                self.confirm_language(chat_id, message_id, language).await;
                next
            }
            Action::RejectLanguage(error) => {
                if let Some(error) = error {
                    error!(chat_id, operation = "get_language_by_id", error = %error, "[ERROR] language lookup failed");
                }
                self.edit(chat_id, message_id, messages::LANGUAGE_NOT_FOUND)
                    .await;
                self.ask_language(chat_id).await;
                next
            }
            Action::RegisterUser(category) => {
                self.register_user(chat_id, message_id, category).await
            }
            Action::CategoryNotFound => {
                self.send(chat_id, messages::CATEGORY_NOT_FOUND).await;
                next
            }
            Action::StartQuiz => self.start_quiz(chat_id, message_id).await,
            Action::ShowStartHelp => {
                self.edit(chat_id, message_id, messages::start_quiz_help(&help_text()))
                    .await;
                next
            }
            Action::SendNextWord => self.send_next_word(chat_id).await,
            Action::RecordAnswer { word_id, correct } => {
                self.record_answer(chat_id, message_id, word_id, correct)
                    .await
            }
            Action::ReportWait(user) => {
                let wait = self
                    .scheduler
                    .remaining(chat_id)
                    .unwrap_or(Duration::from_millis(user.break_time_in_millis));
                self.send(chat_id, messages::time_to_next_test(wait)).await;
                next
            }
            Action::UserNotFound => {
                warn!(chat_id, "[WARN] User not found");
                self.send(chat_id, messages::USER_NOT_FOUND).await;
                next
            }
            Action::DeleteUser => self.stop(chat_id).await,
            Action::ReportFailure { operation, error } => {
                self.report_failure(chat_id, operation, error).await;
                next
            }
            Action::LogFailure { operation, error } => {
                error!(chat_id, operation, error = %error, "[ERROR] unexpected error");
                next
            }
            Action::Ignore => {
                debug!(chat_id, "Nothing to do");
                next
            }
        }
    }

    async fn send(&self, chat_id: i64, text: impl Into<String>) {
        self.sink
            .deliver(Response::builder(chat_id).message(text).build())
            .await;
    }

    async fn edit(&self, chat_id: i64, message_id: i32, text: impl Into<String>) {
        self.sink
            .deliver(
                Response::builder(chat_id)
                    .edit_current(message_id)
                    .message(text)
                    .build(),
            )
            .await;
    }

    async fn report_failure(&self, chat_id: i64, operation: &'static str, error: RepositoryError) {
        error!(chat_id, operation, error = %error, "[ERROR] unexpected error");
        self.send(chat_id, messages::UNEXPECTED_ERROR).await;
    }

    async fn ask_language(&self, chat_id: i64) {
        let response = match self.repos.languages.get_available_languages().await {
            DataState::Success(languages) if !languages.is_empty() => Response::builder(chat_id)
                .message(messages::CHOOSE_LANGUAGE)
                .buttons(languages.into_iter().map(|language| {
                    let command = Command::SetLanguage {
                        language_id: language.id,
                    };
                    (language.to_string(), command)
                }))
                .build(),
            DataState::Success(_) | DataState::Empty => {
                warn!(chat_id, "No languages to offer");
                Response::builder(chat_id)
                    .message(messages::NO_LANGUAGES)
                    .build()
            }
            DataState::Failure(error) => {
                return self
                    .report_failure(chat_id, "get_available_languages", error)
                    .await
            }
        };

        self.sink.deliver(response).await;
    }

    async fn confirm_language(&self, chat_id: i64, message_id: i32, language: Language) {
        self.edit(
            chat_id,
            message_id,
            messages::language_chosen(&language.to_string()),
        )
        .await;

        let response = match self
            .repos
            .categories
            .get_categories_by_language(language.id)
            .await
        {
            DataState::Success(categories) if !categories.is_empty() => {
                Response::builder(chat_id)
                    .message(messages::CHOOSE_CATEGORY)
                    .buttons(categories.into_iter().map(|category| {
                        let command = Command::SetCategory {
                            category_id: category.id,
                        };
                        (category.to_string(), command)
                    }))
                    .build()
            }
            DataState::Success(_) | DataState::Empty => Response::builder(chat_id)
                .message(messages::NO_CATEGORIES)
                .build(),
            DataState::Failure(error) => {
                return self
                    .report_failure(chat_id, "get_categories_by_language", error)
                    .await
            }
        };

        self.sink.deliver(response).await;
    }

    async fn register_user(&self, chat_id: i64, message_id: i32, category: Category) -> FlowState {
        match self
            .repos
            .users
            .add_user(chat_id, category.id, category.language_id)
            .await
        {
            DataState::Success(_) => {
                info!(chat_id, category_id = category.id, "User registered");
                self.edit(
                    chat_id,
                    message_id,
                    messages::category_chosen(&category.to_string()),
                )
                .await;
                self.ask_start_quiz(chat_id).await;
                FlowState::AwaitingStartDecision
            }
            DataState::Empty => {
                warn!(chat_id, "Backend accepted no user record");
                self.send(chat_id, messages::UNEXPECTED_ERROR).await;
                FlowState::Unchanged
            }
            DataState::Failure(error) => {
                self.report_failure(chat_id, "add_user", error).await;
                FlowState::Unchanged
            }
        }
    }

    async fn ask_start_quiz(&self, chat_id: i64) {
        self.send_current_user_settings(chat_id).await;

        let response = match self.repos.quiz.get_next_quiz_word(chat_id).await {
            DataState::Empty => Response::builder(chat_id)
                .message(messages::QUIZ_START_QUESTION)
                .button(messages::YES, &Command::StartQuiz { start: true })
                .button(messages::NO, &Command::StartQuiz { start: false })
                .build(),
            DataState::Success(_) => Response::builder(chat_id)
                .message(messages::QUIZ_CONTINUE_QUESTION)
                .button(messages::YES, &Command::GetQuizTest)
                .button(messages::NO, &Command::StartQuiz { start: false })
                .button(messages::START_AGAIN, &Command::StartQuiz { start: true })
                .build(),
            DataState::Failure(error) => {
                return self
                    .report_failure(chat_id, "get_next_quiz_word", error)
                    .await
            }
        };

        self.sink.deliver(response).await;
    }

    /// Echoes the user's language and category. Any miss degrades into one
    /// generic error message; the caller carries on regardless.
    async fn send_current_user_settings(&self, chat_id: i64) {
        let user = match self.repos.users.get_user_by_chat_id(chat_id).await {
            DataState::Success(user) => user,
            DataState::Empty => {
                warn!(chat_id, "User vanished before settings echo");
                return self.send(chat_id, messages::UNEXPECTED_ERROR).await;
            }
            DataState::Failure(error) => {
                return self
                    .report_failure(chat_id, "get_user_by_chat_id", error)
                    .await
            }
        };

        let (category, language) = tokio::join!(
            self.repos.categories.get_category(user.category_id),
            self.repos.languages.get_language_by_id(user.language_id),
        );

        let text = match (category, language) {
            (DataState::Success(category), DataState::Success(language)) => {
                messages::user_settings(&language.to_string(), &category.to_string())
            }
            (category, language) => {
                error!(chat_id, ?category, ?language, "[ERROR] Category or language not found");
                messages::UNEXPECTED_ERROR.to_owned()
            }
        };

        self.send(chat_id, text).await;
    }

    async fn start_quiz(&self, chat_id: i64, message_id: i32) -> FlowState {
        match self.repos.quiz.create_quiz_words(chat_id).await {
            Ok(true) => debug!(chat_id, "Quiz words created"),
            Ok(false) => warn!(chat_id, "Backend refused to create quiz words"),
            Err(error) => {
                error!(chat_id, operation = "create_quiz_words", error = %error, "[ERROR] quiz creation failed")
            }
        }

        self.edit(chat_id, message_id, messages::START_QUIZ).await;
        self.send_next_word(chat_id).await
    }

    async fn record_answer(
        &self,
        chat_id: i64,
        message_id: i32,
        word_id: i64,
        correct: bool,
    ) -> FlowState {
        match self
            .repos
            .quiz
            .set_answer(chat_id, word_id, correct)
            .await
        {
            DataState::Success(stats) => debug!(chat_id, ?stats, "Answer recorded"),
            DataState::Empty => debug!(chat_id, word_id, "Word is no longer part of the quiz"),
            DataState::Failure(error) => {
                warn!(chat_id, word_id, error = %error, "Could not record answer")
            }
        }

        let text = if correct {
            messages::RIGHT_ANSWER
        } else {
            messages::WRONG_ANSWER
        };
        self.edit(chat_id, message_id, text).await;
        self.send_next_word(chat_id).await
    }

    async fn send_next_word(&self, chat_id: i64) -> FlowState {
        match self.repos.quiz.get_next_quiz_word(chat_id).await {
            DataState::Success(word) => {
                let response = quiz_response(chat_id, &word, &mut rand::thread_rng());
                debug!(chat_id, word_id = word.id, "Sending quiz word");
                self.sink.deliver(response).await;
                FlowState::InQuiz
            }
            DataState::Empty => self.end_session(chat_id).await,
            DataState::Failure(error) => {
                self.report_failure(chat_id, "get_next_quiz_word", error)
                    .await;
                FlowState::Unchanged
            }
        }
    }

    async fn end_session(&self, chat_id: i64) -> FlowState {
        match self.repos.users.get_user_by_chat_id(chat_id).await {
            DataState::Success(user) => {
                let wait = Duration::from_millis(user.break_time_in_millis);
                self.send(chat_id, messages::next_test_notify(wait)).await;
                self.scheduler.schedule(chat_id, wait);
                info!(chat_id, wait_ms = user.break_time_in_millis, "Next test scheduled");
                FlowState::AwaitingNextTest
            }
            DataState::Empty => {
                self.send(chat_id, messages::USER_NOT_FOUND).await;
                FlowState::NoUser
            }
            DataState::Failure(error) => {
                self.report_failure(chat_id, "get_user_by_chat_id", error)
                    .await;
                FlowState::Unchanged
            }
        }
    }

    async fn stop(&self, chat_id: i64) -> FlowState {
        match self.repos.users.delete_user(chat_id).await {
            Ok(existed) => {
                let cancelled = self.scheduler.cancel(chat_id);
                info!(chat_id, existed, cancelled, "User stopped the bot");
                self.send(chat_id, messages::STOPPED).await;
                FlowState::NoUser
            }
            Err(error) => {
                // the user is still registered, so the wake-up stays armed
                self.report_failure(chat_id, "delete_user", error).await;
                FlowState::Unchanged
            }
        }
    }
}

#[async_trait]
impl JobHandler for QuizFlow {
    async fn handle_job(&self, job: Job) {
        let state = match job {
            Job::Request(request) => self.handle(request).await,
            Job::Resume(chat_id) => self.resume(chat_id).await,
        };
        debug!(?state, "Job done");
    }
}

/// The word as a new message with one button per translation, in random order.
pub fn quiz_response<R: Rng + ?Sized>(chat_id: i64, word: &QuizWord, rng: &mut R) -> Response {
    let mut options: Vec<(String, Command)> = Vec::with_capacity(word.option_count());
    options.extend(word.wrong_translations.iter().map(|translation| {
        (
            translation.clone(),
            Command::IncorrectAnswer { word_id: word.id },
        )
    }));
    options.push((
        word.correct_translation.clone(),
        Command::CorrectAnswer { word_id: word.id },
    ));
    options.shuffle(rng);

    Response::builder(chat_id)
        .message(messages::quiz_text(&word.original_word))
        .buttons(options)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn word() -> QuizWord {
        QuizWord {
            id: 12,
            original_word: "Hund".into(),
            correct_translation: "dog".into(),
            wrong_translations: vec!["cat".into(), "cow".into(), "fox".into()],
        }
    }

    #[test]
    fn quiz_response_has_one_correct_option() {
        let response = quiz_response(5, &word(), &mut StdRng::seed_from_u64(7));

        assert_eq!(response.chat_id, 5);
        assert!(!response.is_edit());
        assert!(response.text.contains("Hund"));
        assert_eq!(response.buttons.len(), word().option_count());

        let correct: Vec<_> = response
            .buttons
            .iter()
            .filter(|b| b.callback_data == "correct:12")
            .collect();
        assert_eq!(correct.len(), 1);
        assert_eq!(correct[0].label, "dog");
        assert!(response
            .buttons
            .iter()
            .filter(|b| b.label != "dog")
            .all(|b| b.callback_data == "incorrect:12"));
    }

    #[test]
    fn options_get_shuffled() {
        let orders: std::collections::HashSet<Vec<String>> = (0..20)
            .map(|seed| {
                quiz_response(5, &word(), &mut StdRng::seed_from_u64(seed))
                    .buttons
                    .into_iter()
                    .map(|b| b.label)
                    .collect()
            })
            .collect();

        assert!(orders.len() > 1);
    }
}
