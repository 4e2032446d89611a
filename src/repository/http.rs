use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use url::Url;

use super::models::NewUser;
use super::{
    Category, CategoryRepository, Language, LanguageRepository, MutationResult, QuizRepository,
    QuizWord, QuizWordStats, User, UserRepository,
};
use crate::errors::RepositoryError;
use crate::state::DataState;

/// REST client for the quiz backend; implements every repository trait.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base: Url,
}

impl HttpBackend {
    pub fn new(base: Url, timeout: Duration) -> Result<Self, RepositoryError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base: with_trailing_slash(base),
        })
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, RepositoryError> {
        let url = self.base.join(path)?;
        debug!(%method, %url, "Backend request");
        Ok(self.client.request(method, url))
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        request: Result<RequestBuilder, RepositoryError>,
    ) -> DataState<T> {
        match Self::try_fetch(request).await {
            Ok(Some(data)) => DataState::Success(data),
            Ok(None) => DataState::Empty,
            Err(e) => DataState::Failure(e),
        }
    }

    async fn try_fetch<T: DeserializeOwned>(
        request: Result<RequestBuilder, RepositoryError>,
    ) -> Result<Option<T>, RepositoryError> {
        let response = request?.send().await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND || status == StatusCode::NO_CONTENT {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(RepositoryError::Status(status));
        }

        let body = response.bytes().await?;
        if body.is_empty() {
            return Ok(None);
        }

        // A literal `null` body is how the backend says "nothing there".
        Ok(serde_json::from_slice::<Option<T>>(&body)?)
    }

    async fn mutate(&self, request: Result<RequestBuilder, RepositoryError>) -> MutationResult {
        let status = request?.send().await?.status();

        if status.is_success() {
            Ok(true)
        } else if status == StatusCode::NOT_FOUND {
            Ok(false)
        } else {
            Err(RepositoryError::Status(status))
        }
    }
}

fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

#[async_trait]
impl UserRepository for HttpBackend {
    #[instrument(level = "debug", skip(self))]
    async fn get_user_by_chat_id(&self, chat_id: i64) -> DataState<User> {
        self.fetch(self.request(Method::GET, &format!("users/{chat_id}")))
            .await
    }

    #[instrument(level = "debug", skip(self))]
    async fn add_user(&self, chat_id: i64, category_id: i64, language_id: i64) -> DataState<User> {
        let body = NewUser {
            chat_id,
            category_id,
            language_id,
        };
        self.fetch(
            self.request(Method::POST, "users")
                .map(|request| request.json(&body)),
        )
        .await
    }

    #[instrument(level = "debug", skip(self))]
    async fn delete_user(&self, chat_id: i64) -> MutationResult {
        self.mutate(self.request(Method::DELETE, &format!("users/{chat_id}")))
            .await
    }
}

#[async_trait]
impl QuizRepository for HttpBackend {
    #[instrument(level = "debug", skip(self))]
    async fn get_next_quiz_word(&self, chat_id: i64) -> DataState<QuizWord> {
        self.fetch(self.request(Method::GET, &format!("quiz/{chat_id}/next")))
            .await
    }

    #[instrument(level = "debug", skip(self))]
    async fn create_quiz_words(&self, chat_id: i64) -> MutationResult {
        self.mutate(self.request(Method::POST, &format!("quiz/{chat_id}")))
            .await
    }

    #[instrument(level = "debug", skip(self))]
    async fn set_answer(
        &self,
        chat_id: i64,
        word_id: i64,
        is_correct: bool,
    ) -> DataState<QuizWordStats> {
        self.fetch(
            self.request(Method::POST, &format!("quiz/{chat_id}/words/{word_id}"))
                .map(|request| request.query(&[("correct", is_correct)])),
        )
        .await
    }

    #[instrument(level = "debug", skip(self))]
    async fn reset_quiz(&self, chat_id: i64) -> MutationResult {
        self.mutate(self.request(Method::DELETE, &format!("quiz/{chat_id}")))
            .await
    }

    #[instrument(level = "debug", skip(self))]
    async fn reset_quiz_word_number(&self, chat_id: i64) -> MutationResult {
        self.mutate(self.request(Method::POST, &format!("quiz/{chat_id}/reset")))
            .await
    }
}

#[async_trait]
impl CategoryRepository for HttpBackend {
    #[instrument(level = "debug", skip(self))]
    async fn get_category(&self, id: i64) -> DataState<Category> {
        self.fetch(self.request(Method::GET, &format!("categories/{id}")))
            .await
    }

    #[instrument(level = "debug", skip(self))]
    async fn get_categories_by_language(&self, language_id: i64) -> DataState<Vec<Category>> {
        self.fetch(self.request(Method::GET, &format!("languages/{language_id}/categories")))
            .await
    }
}

#[async_trait]
impl LanguageRepository for HttpBackend {
    #[instrument(level = "debug", skip(self))]
    async fn get_language_by_id(&self, id: i64) -> DataState<Language> {
        self.fetch(self.request(Method::GET, &format!("languages/{id}")))
            .await
    }

    #[instrument(level = "debug", skip(self))]
    async fn get_available_languages(&self) -> DataState<Vec<Language>> {
        self.fetch(self.request(Method::GET, "languages")).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn backend(server: &MockServer) -> HttpBackend {
        let base = Url::parse(&format!("{}/api", server.uri())).unwrap();
        HttpBackend::new(base, Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn base_url_gets_a_trailing_slash() {
        let url = with_trailing_slash(Url::parse("http://backend:8080/api").unwrap());
        assert_eq!(url.as_str(), "http://backend:8080/api/");
        assert_eq!(url.join("users/1").unwrap().path(), "/api/users/1");
    }

    #[tokio::test]
    async fn user_lookup_maps_body_to_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/users/42"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "chatId": 42,
                "categoryId": 3,
                "languageId": 1,
                "breakTimeInMillis": 60000
            })))
            .mount(&server)
            .await;

        let user = backend(&server).await.get_user_by_chat_id(42).await;

        match user {
            DataState::Success(user) => {
                assert_eq!(user.chat_id, 42);
                assert_eq!(user.break_time_in_millis, 60000);
            }
            other => panic!("expected success, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn not_found_and_null_are_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/users/1"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/quiz/1/next"))
            .respond_with(ResponseTemplate::new(200).set_body_string("null"))
            .mount(&server)
            .await;

        let backend = backend(&server).await;

        assert!(matches!(backend.get_user_by_chat_id(1).await, DataState::Empty));
        assert!(matches!(backend.get_next_quiz_word(1).await, DataState::Empty));
    }

    #[tokio::test]
    async fn server_errors_and_garbage_are_failures() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/languages"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/categories/9"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{not json"))
            .mount(&server)
            .await;

        let backend = backend(&server).await;

        assert!(matches!(
            backend.get_available_languages().await,
            DataState::Failure(RepositoryError::Status(StatusCode::INTERNAL_SERVER_ERROR))
        ));
        assert!(matches!(
            backend.get_category(9).await,
            DataState::Failure(RepositoryError::Decode(_))
        ));
    }

    #[tokio::test]
    async fn answers_are_posted_with_correctness() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/quiz/5/words/77"))
            .and(query_param("correct", "false"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "wordId": 77,
                "correctAnswers": 1,
                "incorrectAnswers": 2
            })))
            .expect(1)
            .mount(&server)
            .await;

        let stats = backend(&server).await.set_answer(5, 77, false).await;

        assert_eq!(stats.success().map(|s| s.incorrect_answers), Some(2));
    }

    #[tokio::test]
    async fn mutations_report_acceptance() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/quiz/5"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/api/users/5"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/quiz/5/reset"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let backend = backend(&server).await;

        assert!(backend.create_quiz_words(5).await.unwrap());
        assert!(!backend.delete_user(5).await.unwrap());
        assert!(matches!(
            backend.reset_quiz_word_number(5).await,
            Err(RepositoryError::Status(StatusCode::SERVICE_UNAVAILABLE))
        ));
    }

    #[tokio::test]
    async fn add_user_sends_the_registration_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/users"))
            .and(wiremock::matchers::body_json(serde_json::json!({
                "chatId": 8,
                "categoryId": 2,
                "languageId": 1
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "chatId": 8,
                "categoryId": 2,
                "languageId": 1,
                "breakTimeInMillis": 1000
            })))
            .expect(1)
            .mount(&server)
            .await;

        let user = backend(&server).await.add_user(8, 2, 1).await;

        assert!(user.is_success());
    }
}
