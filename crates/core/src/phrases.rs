//! What the robot says, per language, and the rotation through each category.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    English,
    French,
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "english" => Ok(Language::English),
            "french" => Ok(Language::French),
            other => Err(format!("unsupported language '{other}'")),
        }
    }
}

/// Rotating phrase categories. Each has its own counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PhraseCategory {
    DemonstrationResponse,
    AskingAfterFeedback,
    AskingAfterWord,
    WordResponse,
    WordAgainResponse,
}

impl PhraseCategory {
    const COUNT: usize = 5;

    fn slot(&self) -> usize {
        match self {
            PhraseCategory::DemonstrationResponse => 0,
            PhraseCategory::AskingAfterFeedback => 1,
            PhraseCategory::AskingAfterWord => 2,
            PhraseCategory::WordResponse => 3,
            PhraseCategory::WordAgainResponse => 4,
        }
    }
}

/// All phrases for one language. `{}` marks where the subject goes.
#[derive(Debug, Clone)]
pub struct PhraseBook {
    pub intro: String,
    pub test: String,
    pub thank_you: String,
    pub feedback_acknowledged: String,
    /// Spoken before working on a letter; `{}` is the letter.
    pub working_on: String,
    categories: [Vec<String>; PhraseCategory::COUNT],
}

fn owned(phrases: &[&str]) -> Vec<String> {
    phrases.iter().map(|p| p.to_string()).collect()
}

impl PhraseBook {
    pub fn for_language(language: Language) -> Self {
        match language {
            Language::English => Self {
                intro: "Hello! I'm Nao. Can you teach me how to write?".into(),
                test: "Ok, test time. I'll try my best.".into(),
                thank_you: "Thank you for helping me!".into(),
                feedback_acknowledged: "Ok, thanks for helping me".into(),
                working_on: "Ok, I'll work on the {}".into(),
                categories: [
                    owned(&[
                        "Ok, I'll try it like you",
                        "So that's how you write {}",
                        "That's a nice {}",
                        "Thanks, I'll practise my {}",
                    ]),
                    owned(&["How about now?", "Is this better?", "What do you think of this {}?"]),
                    owned(&[
                        "What do you think of my {}?",
                        "Is that how you write {}?",
                        "Here is my try at {}. How is it?",
                    ]),
                    owned(&["Ok, {}. Let me try", "{}? I'll do my best", "Let's write {}"]),
                    owned(&["{} again? Sure", "I remember {}, let me try again"]),
                ],
            },
            Language::French => Self {
                intro: "Bonjour ! Je suis Nao. Tu veux bien m'apprendre à écrire ?".into(),
                test: "D'accord, c'est l'heure du test. Je vais faire de mon mieux.".into(),
                thank_you: "Merci de m'avoir aidé !".into(),
                feedback_acknowledged: "D'accord, merci de m'aider".into(),
                working_on: "D'accord, je vais travailler le {}".into(),
                categories: [
                    owned(&[
                        "D'accord, je vais essayer comme toi",
                        "Alors c'est comme ça qu'on écrit {}",
                        "C'est un joli {}",
                    ]),
                    owned(&["Et maintenant ?", "C'est mieux ?"]),
                    owned(&[
                        "Qu'est-ce que tu penses de mon {} ?",
                        "C'est comme ça qu'on écrit {} ?",
                    ]),
                    owned(&["D'accord, {}. J'essaie", "{} ? Je vais faire de mon mieux"]),
                    owned(&["Encore {} ? D'accord", "Je me souviens de {}, j'essaie encore"]),
                ],
            },
        }
    }

    pub fn category(&self, category: PhraseCategory) -> &[String] {
        &self.categories[category.slot()]
    }
}

/// Fills `{}` with `subject`; phrases without a placeholder are spoken as is.
pub fn format_phrase(template: &str, subject: &str) -> String {
    if template.contains("{}") {
        template.replacen("{}", subject, 1)
    } else {
        template.to_string()
    }
}

/// One counter per category, advanced with wraparound each time a phrase of
/// that category is used. Invariant: `counter < len(category)`.
#[derive(Debug, Clone, Default)]
pub struct PhraseRotation {
    counters: [usize; PhraseCategory::COUNT],
}

impl PhraseRotation {
    pub fn counter(&self, category: PhraseCategory) -> usize {
        self.counters[category.slot()]
    }

    /// Picks the current phrase of `category`, formats it and advances the counter.
    pub fn next(&mut self, book: &PhraseBook, category: PhraseCategory, subject: &str) -> String {
        let phrases = book.category(category);
        if phrases.is_empty() {
            return String::new();
        }
        let counter = &mut self.counters[category.slot()];
        let phrase = format_phrase(&phrases[*counter % phrases.len()], subject);
        *counter = (*counter + 1) % phrases.len();
        phrase
    }
}
