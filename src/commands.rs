use teloxide::utils::command::BotCommands;

/// Slash commands a user can type.
#[derive(Debug, Clone, PartialEq, BotCommands)]
#[command(rename_rule = "lowercase")]
pub enum TextCommand {
    #[command(description = "start or continue the quiz.")]
    Start,
    #[command(description = "forget me and stop the quiz.")]
    Stop,
    #[command(description = "get the next word.")]
    Test,
    #[command(description = "show the time until the next test.")]
    Next,
}

/// One parsed user action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Stop,
    GetQuizTest,
    TimeToNextTest,
    CorrectAnswer { word_id: i64 },
    IncorrectAnswer { word_id: i64 },
    StartQuiz { start: bool },
    SetCategory { category_id: i64 },
    SetLanguage { language_id: i64 },
    AskExam { accepted: bool },
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestData {
    pub chat_id: i64,
    pub message_id: i32,
    pub command: Command,
}

const CORRECT: &str = "correct";
const INCORRECT: &str = "incorrect";
const START_QUIZ: &str = "start_quiz";
const CATEGORY: &str = "category";
const LANGUAGE: &str = "language";
const EXAM: &str = "exam";
const NEXT_WORD: &str = "next_word";

impl Command {
    /// Payload attached to an inline button that triggers this command.
    ///
    /// Returns `None` for commands that only arrive as typed text.
    pub fn callback_data(&self) -> Option<String> {
        let data = match self {
            Command::CorrectAnswer { word_id } => format!("{CORRECT}:{word_id}"),
            Command::IncorrectAnswer { word_id } => format!("{INCORRECT}:{word_id}"),
            Command::StartQuiz { start } => format!("{START_QUIZ}:{start}"),
            Command::SetCategory { category_id } => format!("{CATEGORY}:{category_id}"),
            Command::SetLanguage { language_id } => format!("{LANGUAGE}:{language_id}"),
            Command::AskExam { accepted } => format!("{EXAM}:{accepted}"),
            Command::GetQuizTest => NEXT_WORD.to_owned(),
            Command::Start | Command::Stop | Command::TimeToNextTest | Command::Unknown => {
                return None
            }
        };
        Some(data)
    }

    /// Inverse of [`Command::callback_data`]; anything unrecognised is `Unknown`.
    pub fn from_callback_data(data: &str) -> Command {
        if data == NEXT_WORD {
            return Command::GetQuizTest;
        }

        let Some((kind, value)) = data.split_once(':') else {
            return Command::Unknown;
        };

        let parsed = match kind {
            CORRECT => value.parse().ok().map(|word_id| Command::CorrectAnswer { word_id }),
            INCORRECT => value
                .parse()
                .ok()
                .map(|word_id| Command::IncorrectAnswer { word_id }),
            START_QUIZ => value.parse().ok().map(|start| Command::StartQuiz { start }),
            CATEGORY => value
                .parse()
                .ok()
                .map(|category_id| Command::SetCategory { category_id }),
            LANGUAGE => value
                .parse()
                .ok()
                .map(|language_id| Command::SetLanguage { language_id }),
            EXAM => value.parse().ok().map(|accepted| Command::AskExam { accepted }),
            _ => None,
        };

        parsed.unwrap_or(Command::Unknown)
    }
}

impl From<TextCommand> for Command {
    fn from(command: TextCommand) -> Self {
        match command {
            TextCommand::Start => Command::Start,
            TextCommand::Stop => Command::Stop,
            TextCommand::Test => Command::GetQuizTest,
            TextCommand::Next => Command::TimeToNextTest,
        }
    }
}

/// Usage text listing the slash commands.
pub fn help_text() -> String {
    TextCommand::descriptions().to_string()
}
