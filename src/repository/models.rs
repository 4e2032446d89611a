use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub chat_id: i64,
    pub category_id: i64,
    pub language_id: i64,
    pub break_time_in_millis: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizWord {
    pub id: i64,
    pub original_word: String,
    pub correct_translation: String,
    #[serde(default)]
    pub wrong_translations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizWordStats {
    pub word_id: i64,
    #[serde(default)]
    pub correct_answers: u32,
    #[serde(default)]
    pub incorrect_answers: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: i64,
    pub category_name: String,
    pub language_id: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Language {
    pub id: i64,
    pub language_name: String,
}

/// Body of `POST users`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct NewUser {
    pub chat_id: i64,
    pub category_id: i64,
    pub language_id: i64,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.category_name)
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.language_name)
    }
}

impl QuizWord {
    /// Number of answer options this word renders to.
    pub fn option_count(&self) -> usize {
        self.wrong_translations.len() + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiz_word_reads_camel_case() {
        let word: QuizWord = serde_json::from_str(
            r#"{"id":3,"originalWord":"Hund","correctTranslation":"dog","wrongTranslations":["cat","cow"]}"#,
        )
        .unwrap();

        assert_eq!(word.original_word, "Hund");
        assert_eq!(word.wrong_translations, vec!["cat", "cow"]);
        assert_eq!(word.option_count(), 3);
    }

    #[test]
    fn missing_wrong_translations_default_to_empty() {
        let word: QuizWord = serde_json::from_str(
            r#"{"id":3,"originalWord":"Hund","correctTranslation":"dog"}"#,
        )
        .unwrap();

        assert!(word.wrong_translations.is_empty());
    }

    #[test]
    fn new_user_writes_camel_case() {
        let body = serde_json::to_value(NewUser {
            chat_id: 1,
            category_id: 2,
            language_id: 3,
        })
        .unwrap();

        assert_eq!(
            body,
            serde_json::json!({"chatId": 1, "categoryId": 2, "languageId": 3})
        );
    }
}
