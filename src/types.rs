// src/types.rs
// Domain types shared by the formatter, the studio and the persisted state.
//
// Enum values serialize as the display strings the web client has always
// written ("General Assistant", "Short (Concise)", ...) so stored data stays
// readable across both front ends.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Error returned when a label does not name a known variant
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: '{value}'")]
pub struct ParseLabelError {
    pub kind: &'static str,
    pub value: String,
}

impl ParseLabelError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

/// Normalise a user supplied label for loose matching ("growth-marketer" == "Growth Marketer")
fn normalise(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

// ============================================================================
// Tone
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Tone {
    #[default]
    Professional,
    Casual,
    Academic,
    Creative,
    Persuasive,
}

impl Tone {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tone::Professional => "Professional",
            Tone::Casual => "Casual",
            Tone::Academic => "Academic",
            Tone::Creative => "Creative",
            Tone::Persuasive => "Persuasive",
        }
    }

    pub fn all() -> Vec<Tone> {
        vec![
            Tone::Professional,
            Tone::Casual,
            Tone::Academic,
            Tone::Creative,
            Tone::Persuasive,
        ]
    }
}

impl fmt::Display for Tone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tone {
    type Err = ParseLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = normalise(s);
        Tone::all()
            .into_iter()
            .find(|t| normalise(t.as_str()) == wanted)
            .ok_or_else(|| ParseLabelError::new("tone", s))
    }
}

// ============================================================================
// Persona
// ============================================================================

/// Role label the generated prompt instructs the model to assume
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Persona {
    #[default]
    #[serde(rename = "General Assistant")]
    General,
    #[serde(rename = "Growth Marketer")]
    Marketer,
    #[serde(rename = "Legal Consultant")]
    Lawyer,
    #[serde(rename = "Senior Developer")]
    Developer,
    #[serde(rename = "Academic Tutor")]
    Tutor,
    #[serde(rename = "Startup CEO")]
    Ceo,
    #[serde(rename = "Creative Copywriter")]
    Copywriter,
}

impl Persona {
    pub fn as_str(&self) -> &'static str {
        match self {
            Persona::General => "General Assistant",
            Persona::Marketer => "Growth Marketer",
            Persona::Lawyer => "Legal Consultant",
            Persona::Developer => "Senior Developer",
            Persona::Tutor => "Academic Tutor",
            Persona::Ceo => "Startup CEO",
            Persona::Copywriter => "Creative Copywriter",
        }
    }

    pub fn all() -> Vec<Persona> {
        vec![
            Persona::General,
            Persona::Marketer,
            Persona::Lawyer,
            Persona::Developer,
            Persona::Tutor,
            Persona::Ceo,
            Persona::Copywriter,
        ]
    }

    pub fn is_default(&self) -> bool {
        *self == Persona::General
    }

    /// Tone preselected when the persona is picked
    pub fn default_tone(&self) -> Tone {
        match self {
            Persona::Marketer => Tone::Persuasive,
            Persona::Tutor => Tone::Academic,
            Persona::Copywriter => Tone::Creative,
            Persona::General | Persona::Lawyer | Persona::Developer | Persona::Ceo => {
                Tone::Professional
            }
        }
    }
}

impl fmt::Display for Persona {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Persona {
    type Err = ParseLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = normalise(s);
        // Accept the short aliases used on the command line as well
        let alias = match wanted.as_str() {
            "general" | "assistant" => Some(Persona::General),
            "marketer" => Some(Persona::Marketer),
            "lawyer" | "legal" => Some(Persona::Lawyer),
            "dev" | "developer" => Some(Persona::Developer),
            "tutor" | "academic" => Some(Persona::Tutor),
            "ceo" => Some(Persona::Ceo),
            "copywriter" => Some(Persona::Copywriter),
            _ => None,
        };
        alias
            .or_else(|| {
                Persona::all()
                    .into_iter()
                    .find(|p| normalise(p.as_str()) == wanted)
            })
            .ok_or_else(|| ParseLabelError::new("persona", s))
    }
}

// ============================================================================
// ModelLength
// ============================================================================

/// Desired detail level of the generated prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ModelLength {
    #[serde(rename = "Short (Concise)")]
    Short,
    #[default]
    #[serde(rename = "Medium (Standard)")]
    Medium,
    #[serde(rename = "Long (Detailed)")]
    Long,
}

impl ModelLength {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelLength::Short => "Short (Concise)",
            ModelLength::Medium => "Medium (Standard)",
            ModelLength::Long => "Long (Detailed)",
        }
    }

    pub fn all() -> Vec<ModelLength> {
        vec![ModelLength::Short, ModelLength::Medium, ModelLength::Long]
    }
}

impl fmt::Display for ModelLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelLength {
    type Err = ParseLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = normalise(s);
        ModelLength::all()
            .into_iter()
            .find(|l| {
                let full = normalise(l.as_str());
                full == wanted || full.starts_with(&wanted) && !wanted.is_empty()
            })
            .ok_or_else(|| ParseLabelError::new("length", s))
    }
}

// ============================================================================
// PromptMode
// ============================================================================

/// Generate a new prompt from an intent, or rewrite an existing draft
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PromptMode {
    #[default]
    Generate,
    Improve,
}

impl PromptMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PromptMode::Generate => "Generate",
            PromptMode::Improve => "Improve",
        }
    }
}

impl fmt::Display for PromptMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PromptMode {
    type Err = ParseLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalise(s).as_str() {
            "generate" => Ok(PromptMode::Generate),
            "improve" => Ok(PromptMode::Improve),
            _ => Err(ParseLabelError::new("mode", s)),
        }
    }
}

// ============================================================================
// Theme
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Dark => "dark",
            Theme::Light => "light",
        }
    }

    pub fn toggled(&self) -> Theme {
        match self {
            Theme::Dark => Theme::Light,
            Theme::Light => Theme::Dark,
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = ParseLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalise(s).as_str() {
            "dark" => Ok(Theme::Dark),
            "light" => Ok(Theme::Light),
            _ => Err(ParseLabelError::new("theme", s)),
        }
    }
}

// ============================================================================
// Records
// ============================================================================

/// User supplied input / ideal output pair used for few-shot conditioning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingExample {
    pub id: String,
    pub input: String,
    pub output: String,
}

/// One successful generation, as shown in the history sidebar
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryItem {
    pub id: String,
    pub intent: String,
    pub generated_prompt: String,
    /// Epoch milliseconds
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persona: Option<Persona>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tone: Option<Tone>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<ModelLength>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<PromptMode>,
}

/// Everything the formatter needs for one submission
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PromptRequest {
    pub intent: String,
    pub tone: Tone,
    pub length: ModelLength,
    pub persona: Persona,
    pub mode: PromptMode,
    pub examples: Vec<TrainingExample>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthProvider {
    Google,
    Github,
    Email,
}

impl AuthProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthProvider::Google => "google",
            AuthProvider::Github => "github",
            AuthProvider::Email => "email",
        }
    }
}

impl fmt::Display for AuthProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Signed-in user as returned by the auth gateway
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    pub provider: AuthProvider,
}
