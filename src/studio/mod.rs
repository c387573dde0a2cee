//! Studio: the client composition layer
//!
//! Owns the form state (intent, persona, tone, length, mode), the last
//! result, and the persisted collections. Every mutation of history,
//! examples, user or theme is written through to the `StateSync`.
//!
//! Generations are identified by tickets. Starting a new generation
//! supersedes the one in flight; a completion carrying an older ticket is
//! dropped without touching the result or the history.

mod ticket;

pub use ticket::{Completion, GenerationTicket};

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::llm::{generate_optimized_prompt, GenerationError, GenerationProvider, GeneratedPrompt};
use crate::state::{StateSync, StoreError};
use crate::types::{
    HistoryItem, ModelLength, Persona, PromptMode, PromptRequest, Theme, Tone, TrainingExample,
    User,
};

#[derive(Debug, thiserror::Error)]
pub enum StudioError {
    #[error("Intent is empty")]
    EmptyIntent,

    #[error("Example input and output are both required")]
    IncompleteExample,

    #[error("No history item with id '{0}'")]
    HistoryNotFound(String),

    #[error("Failed to persist state: {0}")]
    Store(#[from] StoreError),
}

/// What the result panel shows
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StudioResult {
    Prompt(String),
    Failed(String),
}

impl StudioResult {
    pub fn text(&self) -> &str {
        match self {
            StudioResult::Prompt(text) | StudioResult::Failed(text) => text,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, StudioResult::Failed(_))
    }
}

pub struct Studio {
    sync: StateSync,

    intent: String,
    tone: Tone,
    length: ModelLength,
    persona: Persona,
    mode: PromptMode,
    result: Option<StudioResult>,

    history: Vec<HistoryItem>,
    examples: Vec<TrainingExample>,
    user: Option<User>,
    theme: Theme,

    last_ticket: u64,
    in_flight: Option<u64>,
}

impl Studio {
    /// Restore persisted state and start with a blank form
    pub fn open(sync: StateSync) -> Self {
        let persisted = sync.load();
        debug!(
            history = persisted.history.len(),
            examples = persisted.examples.len(),
            signed_in = persisted.user.is_some(),
            "Studio state loaded"
        );

        Self {
            sync,
            intent: String::new(),
            tone: Tone::default(),
            length: ModelLength::default(),
            persona: Persona::default(),
            mode: PromptMode::default(),
            result: None,
            history: persisted.history,
            examples: persisted.examples,
            user: persisted.user,
            theme: persisted.theme,
            last_ticket: 0,
            in_flight: None,
        }
    }

    // ── Form state ─────────────────────────────────────────────────────────

    pub fn intent(&self) -> &str {
        &self.intent
    }

    pub fn set_intent(&mut self, intent: impl Into<String>) {
        self.intent = intent.into();
    }

    pub fn tone(&self) -> Tone {
        self.tone
    }

    pub fn set_tone(&mut self, tone: Tone) {
        self.tone = tone;
    }

    pub fn length(&self) -> ModelLength {
        self.length
    }

    pub fn set_length(&mut self, length: ModelLength) {
        self.length = length;
    }

    pub fn mode(&self) -> PromptMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: PromptMode) {
        self.mode = mode;
    }

    pub fn persona(&self) -> Persona {
        self.persona
    }

    /// Pick a persona; the tone follows the persona's default
    pub fn set_persona(&mut self, persona: Persona) {
        self.persona = persona;
        self.tone = persona.default_tone();
    }

    pub fn result(&self) -> Option<&StudioResult> {
        self.result.as_ref()
    }

    pub fn build_request(&self) -> PromptRequest {
        PromptRequest {
            intent: self.intent.clone(),
            tone: self.tone,
            length: self.length,
            persona: self.persona,
            mode: self.mode,
            examples: self.examples.clone(),
        }
    }

    // ── Generation ─────────────────────────────────────────────────────────

    pub fn is_generating(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Snapshot the form into a ticketed request. Any generation already in
    /// flight is superseded.
    pub fn begin_generation(&mut self) -> Result<GenerationTicket, StudioError> {
        if self.intent.trim().is_empty() {
            return Err(StudioError::EmptyIntent);
        }

        if let Some(previous) = self.in_flight {
            warn!(previous, "Superseding generation still in flight");
        }

        self.last_ticket += 1;
        self.in_flight = Some(self.last_ticket);
        self.result = None;

        Ok(GenerationTicket::new(self.last_ticket, self.build_request()))
    }

    /// Apply the outcome of a ticketed generation
    pub fn complete_generation(
        &mut self,
        ticket: GenerationTicket,
        outcome: Result<GeneratedPrompt, GenerationError>,
    ) -> Result<Completion, StudioError> {
        if self.in_flight != Some(ticket.id()) {
            debug!(ticket = ticket.id(), "Discarding stale generation result");
            return Ok(Completion::Stale);
        }
        self.in_flight = None;

        match outcome {
            Ok(generated) => {
                let item = self.record_history(ticket.into_request(), generated.text.clone())?;
                self.result = Some(StudioResult::Prompt(generated.text));
                info!(id = %item.id, "Generation stored in history");
                Ok(Completion::Stored(item))
            }
            Err(e) => {
                self.result = Some(StudioResult::Failed(e.user_message()));
                Ok(Completion::Failed(e))
            }
        }
    }

    /// Run one full generation against the provider
    pub async fn generate(
        &mut self,
        provider: &dyn GenerationProvider,
    ) -> Result<Completion, StudioError> {
        let ticket = self.begin_generation()?;
        let outcome = generate_optimized_prompt(provider, ticket.request()).await;
        self.complete_generation(ticket, outcome)
    }

    fn record_history(
        &mut self,
        request: PromptRequest,
        generated_prompt: String,
    ) -> Result<HistoryItem, StudioError> {
        // Keep ids unique and strictly newest-first even within one millisecond
        let mut timestamp = Utc::now().timestamp_millis();
        if let Some(head) = self.history.first() {
            timestamp = timestamp.max(head.timestamp.saturating_add(1));
        }

        // A corrupted head at i64::MAX pins the clock; fall back to a random id
        let mut id = timestamp.to_string();
        if self.history.iter().any(|h| h.id == id) {
            id = uuid::Uuid::new_v4().to_string();
        }

        let item = HistoryItem {
            id,
            intent: request.intent,
            generated_prompt,
            timestamp,
            persona: Some(request.persona),
            tone: Some(request.tone),
            length: Some(request.length),
            mode: Some(request.mode),
        };

        self.history.insert(0, item.clone());
        self.sync.save_history(&self.history)?;
        Ok(item)
    }

    // ── History ────────────────────────────────────────────────────────────

    /// Most recent first
    pub fn history(&self) -> &[HistoryItem] {
        &self.history
    }

    /// Restore a past generation into the form
    pub fn load_history_item(&mut self, id: &str) -> Result<(), StudioError> {
        let item = self
            .history
            .iter()
            .find(|h| h.id == id)
            .cloned()
            .ok_or_else(|| StudioError::HistoryNotFound(id.to_string()))?;

        self.intent = item.intent;
        self.result = Some(StudioResult::Prompt(item.generated_prompt));
        if let Some(persona) = item.persona {
            self.persona = persona;
        }
        if let Some(tone) = item.tone {
            self.tone = tone;
        }
        if let Some(length) = item.length {
            self.length = length;
        }
        if let Some(mode) = item.mode {
            self.mode = mode;
        }
        Ok(())
    }

    pub fn clear_history(&mut self) -> Result<(), StudioError> {
        self.history.clear();
        self.sync.save_history(&self.history)?;
        Ok(())
    }

    // ── Training examples ──────────────────────────────────────────────────

    pub fn examples(&self) -> &[TrainingExample] {
        &self.examples
    }

    pub fn add_example(
        &mut self,
        input: impl Into<String>,
        output: impl Into<String>,
    ) -> Result<TrainingExample, StudioError> {
        let input = input.into();
        let output = output.into();
        if input.trim().is_empty() || output.trim().is_empty() {
            return Err(StudioError::IncompleteExample);
        }

        let example = TrainingExample {
            id: uuid::Uuid::new_v4().to_string(),
            input,
            output,
        };
        self.examples.push(example.clone());
        self.sync.save_examples(&self.examples)?;
        Ok(example)
    }

    /// Returns false when no example had that id
    pub fn delete_example(&mut self, id: &str) -> Result<bool, StudioError> {
        let before = self.examples.len();
        self.examples.retain(|ex| ex.id != id);
        if self.examples.len() == before {
            return Ok(false);
        }
        self.sync.save_examples(&self.examples)?;
        Ok(true)
    }

    /// Replace the whole list, as the training editor does on save
    pub fn save_examples(&mut self, examples: Vec<TrainingExample>) -> Result<(), StudioError> {
        self.examples = examples;
        self.sync.save_examples(&self.examples)?;
        Ok(())
    }

    // ── User ───────────────────────────────────────────────────────────────

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    /// Replace any previous user
    pub fn login(&mut self, user: User) -> Result<(), StudioError> {
        self.sync.save_user(Some(&user))?;
        self.user = Some(user);
        Ok(())
    }

    pub fn logout(&mut self) -> Result<(), StudioError> {
        self.user = None;
        self.sync.save_user(None)?;
        Ok(())
    }

    // ── Theme ──────────────────────────────────────────────────────────────

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn set_theme(&mut self, theme: Theme) -> Result<(), StudioError> {
        self.theme = theme;
        self.sync.save_theme(theme)?;
        Ok(())
    }

    pub fn toggle_theme(&mut self) -> Result<Theme, StudioError> {
        let next = self.theme.toggled();
        self.set_theme(next)?;
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::RenderedPrompt;
    use crate::state::{KeyValueStore, MemoryStore, HISTORY_KEY};
    use crate::types::AuthProvider;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Provider that echoes a canned answer and records what it was sent
    struct FakeProvider {
        reply: Result<String, u16>,
        seen: Mutex<Vec<RenderedPrompt>>,
    }

    impl FakeProvider {
        fn ok(text: &str) -> Self {
            Self {
                reply: Ok(text.to_string()),
                seen: Mutex::new(vec![]),
            }
        }

        fn failing(status: u16) -> Self {
            Self {
                reply: Err(status),
                seen: Mutex::new(vec![]),
            }
        }
    }

    #[async_trait]
    impl GenerationProvider for FakeProvider {
        fn name(&self) -> &'static str {
            "fake"
        }

        async fn generate(&self, prompt: &RenderedPrompt) -> Result<GeneratedPrompt, GenerationError> {
            self.seen.lock().unwrap().push(prompt.clone());
            match &self.reply {
                Ok(text) => Ok(GeneratedPrompt {
                    text: text.clone(),
                    model: "fake".to_string(),
                }),
                Err(status) => Err(GenerationError::Api {
                    status: *status,
                    message: "quota exceeded".to_string(),
                }),
            }
        }
    }

    fn studio() -> (Studio, MemoryStore) {
        let store = MemoryStore::new();
        (Studio::open(StateSync::new(store.clone())), store)
    }

    #[tokio::test]
    async fn test_k_generations_most_recent_first() {
        let (mut studio, store) = studio();
        let provider = FakeProvider::ok("engineered prompt");

        for i in 0..3 {
            studio.set_intent(format!("intent {}", i));
            let completion = studio.generate(&provider).await.unwrap();
            assert!(matches!(completion, Completion::Stored(_)));
        }

        let intents: Vec<&str> = studio.history().iter().map(|h| h.intent.as_str()).collect();
        assert_eq!(intents, vec!["intent 2", "intent 1", "intent 0"]);
        assert!(studio.history()[0].timestamp > studio.history()[1].timestamp);

        // Persisted copy matches
        let reopened = Studio::open(StateSync::new(store.clone()));
        assert_eq!(reopened.history(), studio.history());

        studio.clear_history().unwrap();
        assert!(studio.history().is_empty());
        assert!(Studio::open(StateSync::new(store)).history().is_empty());
    }

    #[tokio::test]
    async fn test_history_head_at_max_timestamp() {
        let store = MemoryStore::new();
        let pinned = HistoryItem {
            id: i64::MAX.to_string(),
            intent: "from the future".to_string(),
            generated_prompt: "..".to_string(),
            timestamp: i64::MAX,
            persona: None,
            tone: None,
            length: None,
            mode: None,
        };
        StateSync::new(store.clone()).save_history(&[pinned]).unwrap();

        let mut studio = Studio::open(StateSync::new(store));
        assert_eq!(studio.history().len(), 1);

        studio.set_intent("next");
        let completion = studio
            .generate(&FakeProvider::ok("engineered prompt"))
            .await
            .unwrap();
        assert!(matches!(completion, Completion::Stored(_)));

        let history = studio.history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].intent, "next");
        assert_eq!(history[0].timestamp, i64::MAX);
        assert_ne!(history[0].id, history[1].id);
    }

    #[tokio::test]
    async fn test_blank_intent_is_rejected_without_calling_provider() {
        let (mut studio, _) = studio();
        let provider = FakeProvider::ok("unused");
        studio.set_intent("   ");

        let err = studio.generate(&provider).await.unwrap_err();
        assert!(matches!(err, StudioError::EmptyIntent));
        assert!(provider.seen.lock().unwrap().is_empty());
        assert!(!studio.is_generating());
    }

    #[tokio::test]
    async fn test_failure_is_shown_but_not_recorded() {
        let (mut studio, store) = studio();
        let provider = FakeProvider::failing(429);
        studio.set_intent("write a tweet about AI");

        let completion = studio.generate(&provider).await.unwrap();
        assert!(matches!(completion, Completion::Failed(GenerationError::Api { status: 429, .. })));

        let result = studio.result().unwrap();
        assert!(result.is_failure());
        assert!(result.text().starts_with("Error: "));
        assert!(studio.history().is_empty());
        assert!(store.get(HISTORY_KEY).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_request_carries_form_and_examples() {
        let (mut studio, _) = studio();
        let provider = FakeProvider::ok("ok");

        studio.add_example("short input", "ideal output").unwrap();
        studio.set_intent("write a tweet about AI");
        studio.set_persona(Persona::Marketer);
        studio.set_mode(PromptMode::Improve);
        studio.generate(&provider).await.unwrap();

        let seen = provider.seen.lock().unwrap();
        let message = &seen[0].user_message;
        assert!(message.starts_with("EXISTING DRAFT PROMPT: \"write a tweet about AI\""));
        assert!(message.contains("\"Growth Marketer\""));
        assert!(message.contains("Desired Tone: Persuasive"));
        assert!(message.contains("USER INPUT: \"short input\""));

        let item = &studio.history()[0];
        assert_eq!(item.mode, Some(PromptMode::Improve));
        assert_eq!(item.persona, Some(Persona::Marketer));
        assert_eq!(item.tone, Some(Tone::Persuasive));
    }

    #[test]
    fn test_superseded_ticket_is_discarded() {
        let (mut studio, _) = studio();
        studio.set_intent("first");
        let first = studio.begin_generation().unwrap();
        studio.set_intent("second");
        let second = studio.begin_generation().unwrap();
        assert!(second.id() > first.id());

        let generated = |text: &str| {
            Ok(GeneratedPrompt {
                text: text.to_string(),
                model: "fake".to_string(),
            })
        };

        // The newer request lands first, then the stale one arrives
        let done = studio.complete_generation(second, generated("from second")).unwrap();
        assert!(matches!(done, Completion::Stored(_)));
        let stale = studio.complete_generation(first, generated("from first")).unwrap();
        assert!(matches!(stale, Completion::Stale));

        assert_eq!(studio.history().len(), 1);
        assert_eq!(studio.history()[0].intent, "second");
        assert_eq!(studio.result(), Some(&StudioResult::Prompt("from second".to_string())));
        assert!(!studio.is_generating());
    }

    #[test]
    fn test_stale_ticket_discarded_while_newer_in_flight() {
        let (mut studio, _) = studio();
        studio.set_intent("one");
        let first = studio.begin_generation().unwrap();
        let _second = studio.begin_generation().unwrap();

        let stale = studio
            .complete_generation(first, Err(GenerationError::EmptyResponse))
            .unwrap();
        assert!(matches!(stale, Completion::Stale));
        assert!(studio.is_generating());
        assert!(studio.result().is_none());
    }

    #[test]
    fn test_persona_change_sets_tone() {
        let (mut studio, _) = studio();
        studio.set_persona(Persona::Tutor);
        assert_eq!(studio.tone(), Tone::Academic);
        studio.set_tone(Tone::Casual);
        studio.set_persona(Persona::General);
        assert_eq!(studio.tone(), Tone::Professional);
    }

    #[test]
    fn test_load_history_item_restores_form() {
        let (mut studio, _) = studio();
        studio.set_intent("draft");
        studio.set_persona(Persona::Lawyer);
        studio.set_length(ModelLength::Long);
        let ticket = studio.begin_generation().unwrap();
        let item = match studio
            .complete_generation(
                ticket,
                Ok(GeneratedPrompt {
                    text: "legal prompt".to_string(),
                    model: "fake".to_string(),
                }),
            )
            .unwrap()
        {
            Completion::Stored(item) => item,
            other => panic!("unexpected completion: {:?}", other),
        };

        studio.set_intent("something else");
        studio.set_persona(Persona::General);
        studio.set_length(ModelLength::Short);

        studio.load_history_item(&item.id).unwrap();
        assert_eq!(studio.intent(), "draft");
        assert_eq!(studio.persona(), Persona::Lawyer);
        assert_eq!(studio.length(), ModelLength::Long);
        assert_eq!(studio.result().unwrap().text(), "legal prompt");

        assert!(matches!(
            studio.load_history_item("missing"),
            Err(StudioError::HistoryNotFound(_))
        ));
    }

    #[test]
    fn test_examples_add_and_delete() {
        let (mut studio, store) = studio();

        assert!(matches!(
            studio.add_example("input", "  "),
            Err(StudioError::IncompleteExample)
        ));

        let a = studio.add_example("a in", "a out").unwrap();
        let b = studio.add_example("b in", "b out").unwrap();
        assert_ne!(a.id, b.id);

        assert!(studio.delete_example(&a.id).unwrap());
        assert!(!studio.delete_example(&a.id).unwrap());

        let reopened = Studio::open(StateSync::new(store));
        assert_eq!(reopened.examples(), &[b]);
    }

    #[test]
    fn test_login_logout_and_theme_persist() {
        let (mut studio, store) = studio();
        let user = User {
            id: "email_1".to_string(),
            name: "ada".to_string(),
            email: "ada@example.com".to_string(),
            avatar: None,
            provider: AuthProvider::Email,
        };

        studio.login(user.clone()).unwrap();
        assert_eq!(studio.toggle_theme().unwrap(), Theme::Light);

        let reopened = Studio::open(StateSync::new(store.clone()));
        assert_eq!(reopened.user(), Some(&user));
        assert_eq!(reopened.theme(), Theme::Light);

        studio.logout().unwrap();
        assert!(Studio::open(StateSync::new(store)).user().is_none());
    }
}
