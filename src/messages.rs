use std::time::Duration;

pub const UNEXPECTED_ERROR: &str = "Something went wrong on our side. Please try again a bit later.";
pub const USER_NOT_FOUND: &str = "I don't know you yet. Send /start to register.";
pub const CHOOSE_LANGUAGE: &str = "Which language do you want to learn?";
pub const NO_LANGUAGES: &str = "There are no languages available yet.";
pub const LANGUAGE_NOT_FOUND: &str = "That language is not available anymore.";
pub const CHOOSE_CATEGORY: &str = "Pick a word category:";
pub const NO_CATEGORIES: &str = "There are no categories for this language yet.";
pub const CATEGORY_NOT_FOUND: &str = "Category is not found.";
pub const QUIZ_START_QUESTION: &str = "Shall we start a quiz?";
pub const QUIZ_CONTINUE_QUESTION: &str = "You have an unfinished quiz. Continue?";
pub const START_QUIZ: &str = "Quiz started! Pick the right translation.";
pub const RIGHT_ANSWER: &str = "Right answer ✅";
pub const WRONG_ANSWER: &str = "Wrong answer ❌";
pub const STOPPED: &str = "Done. Your progress was removed, send /start to begin again.";
pub const YES: &str = "Yes✔️";
pub const NO: &str = "No❌";
pub const START_AGAIN: &str = "Start again🔄";

pub fn start_quiz_help(commands: &str) -> String {
    format!("OK, no quiz for now. Whenever you are ready:\n{commands}")
}

pub fn language_chosen(language: &str) -> String {
    format!("Language: {language}")
}

pub fn category_chosen(category: &str) -> String {
    format!("Category: {category}")
}

pub fn user_settings(language: &str, category: &str) -> String {
    format!("Your settings:\nlanguage: {language}\ncategory: {category}")
}

pub fn quiz_text(original_word: &str) -> String {
    format!("Translate the word: {original_word}")
}

pub fn next_test_notify(wait: Duration) -> String {
    format!(
        "That's all words for now. The next test starts in {}.",
        human_duration(wait)
    )
}

pub fn time_to_next_test(wait: Duration) -> String {
    format!("The next test starts in {}.", human_duration(wait))
}

/// `1h 5m`, `12m 30s`, `45s`; below a second reads as `less than a second`.
pub fn human_duration(duration: Duration) -> String {
    let total = duration.as_secs();
    if total == 0 {
        return "less than a second".to_owned();
    }

    let (hours, minutes, seconds) = (total / 3600, total % 3600 / 60, total % 60);
    let parts: Vec<String> = [(hours, "h"), (minutes, "m"), (seconds, "s")]
        .into_iter()
        .filter(|(value, _)| *value > 0)
        .map(|(value, unit)| format!("{value}{unit}"))
        .collect();

    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn durations_read_naturally() {
        assert_eq!(human_duration(Duration::from_millis(400)), "less than a second");
        assert_eq!(human_duration(Duration::from_secs(45)), "45s");
        assert_eq!(human_duration(Duration::from_secs(750)), "12m 30s");
        assert_eq!(human_duration(Duration::from_secs(3900)), "1h 5m");
    }

    #[test]
    fn notification_mentions_the_wait() {
        let text = next_test_notify(Duration::from_secs(3600));
        assert!(text.ends_with("in 1h."));
    }
}
