// tests/studio_flow.rs
// Studio -> formatter -> Gemini client -> persisted history, end to end

use axum::{extract::Query, routing::post, Json, Router};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

use prompt_forge::llm::gemini::DEFAULT_MODEL;
use prompt_forge::llm::GeminiClient;
use prompt_forge::prompt::{GENERATE_SYSTEM_INSTRUCTION, IMPROVE_SYSTEM_INSTRUCTION};
use prompt_forge::state::{FileStore, StateSync};
use prompt_forge::studio::{Completion, Studio};
use prompt_forge::types::{Persona, PromptMode, Theme, Tone};

type Captured = Arc<Mutex<Vec<Value>>>;

/// Local generateContent stand-in that records each request body
async fn spawn_fake_gemini(reply: &'static str) -> (String, Captured) {
    let captured: Captured = Arc::new(Mutex::new(Vec::new()));
    let sink = captured.clone();

    let router = Router::new().route(
        &format!("/models/{}:generateContent", DEFAULT_MODEL),
        post(
            move |Query(q): Query<HashMap<String, String>>, Json(body): Json<Value>| {
                let sink = sink.clone();
                async move {
                    assert_eq!(q.get("key").map(String::as_str), Some("test-key"));
                    sink.lock().unwrap().push(body);
                    Json(json!({
                        "candidates": [{ "content": { "parts": [{ "text": reply }] } }]
                    }))
                }
            },
        ),
    );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    (format!("http://{}", addr), captured)
}

fn open_studio(dir: &TempDir) -> Studio {
    Studio::open(StateSync::new(FileStore::open(dir.path()).unwrap()))
}

fn user_message(body: &Value) -> String {
    body["contents"][0]["parts"][0]["text"]
        .as_str()
        .unwrap()
        .to_string()
}

#[tokio::test]
async fn test_general_assistant_scenario() {
    let (base, captured) = spawn_fake_gemini("You are a social media strategist...").await;
    let client = GeminiClient::with_options(Some("test-key".to_string()), &base, DEFAULT_MODEL, 5).unwrap();
    let dir = TempDir::new().unwrap();
    let mut studio = open_studio(&dir);

    studio.set_intent("write a tweet about AI");
    let completion = studio.generate(&client).await.unwrap();
    assert!(matches!(completion, Completion::Stored(_)));

    let bodies = captured.lock().unwrap();
    assert_eq!(bodies.len(), 1);
    let body = &bodies[0];
    assert_eq!(
        body["systemInstruction"]["parts"][0]["text"],
        GENERATE_SYSTEM_INSTRUCTION
    );

    let message = user_message(body);
    assert!(message.contains("USER INTENT: \"write a tweet about AI\""));
    assert!(message.contains("Target Persona: General Assistant"));
    assert!(message.contains("Desired Tone: Professional"));
    assert!(message.contains("Desired Detail Level: Medium (Standard)"));
    assert!(!message.contains("IMPORTANT:"));
    assert!(!message.contains("--- EXAMPLE"));

    assert_eq!(
        studio.result().unwrap().text(),
        "You are a social media strategist..."
    );
}

#[tokio::test]
async fn test_growth_marketer_scenario_with_examples() {
    let (base, captured) = spawn_fake_gemini("Role: Growth Marketer").await;
    let client = GeminiClient::with_options(Some("test-key".to_string()), &base, DEFAULT_MODEL, 5).unwrap();
    let dir = TempDir::new().unwrap();
    let mut studio = open_studio(&dir);

    studio.add_example("launch post", "Role: Launch strategist...").unwrap();
    studio.add_example("newsletter", "Role: Editor...").unwrap();
    studio.set_intent("write a tweet about AI");
    studio.set_persona(Persona::Marketer);
    studio.generate(&client).await.unwrap();

    let message = user_message(&captured.lock().unwrap()[0]);
    assert!(message.contains("\"Growth Marketer\""));
    assert!(message.contains("Desired Tone: Persuasive"));
    assert_eq!(message.matches("--- EXAMPLE ").count(), 2);
    let first = message.find("--- EXAMPLE 1 ---").unwrap();
    let second = message.find("--- EXAMPLE 2 ---").unwrap();
    assert!(first < second);
    assert!(message.contains("USER INPUT: \"launch post\""));
}

#[tokio::test]
async fn test_improve_mode_uses_draft_label() {
    let (base, captured) = spawn_fake_gemini("Improved.").await;
    let client = GeminiClient::with_options(Some("test-key".to_string()), &base, DEFAULT_MODEL, 5).unwrap();
    let dir = TempDir::new().unwrap();
    let mut studio = open_studio(&dir);

    studio.set_intent("summarize this article");
    studio.set_mode(PromptMode::Improve);
    studio.generate(&client).await.unwrap();

    let body = &captured.lock().unwrap()[0];
    assert_eq!(
        body["systemInstruction"]["parts"][0]["text"],
        IMPROVE_SYSTEM_INSTRUCTION
    );
    let message = user_message(body);
    assert!(message.starts_with("EXISTING DRAFT PROMPT: \"summarize this article\""));
    assert!(!message.contains("USER INTENT"));
}

#[tokio::test]
async fn test_state_survives_restart() {
    let (base, _captured) = spawn_fake_gemini("prompt text").await;
    let client = GeminiClient::with_options(Some("test-key".to_string()), &base, DEFAULT_MODEL, 5).unwrap();
    let dir = TempDir::new().unwrap();

    {
        let mut studio = open_studio(&dir);
        studio.set_intent("first");
        studio.generate(&client).await.unwrap();
        studio.set_intent("second");
        studio.set_persona(Persona::Developer);
        studio.set_tone(Tone::Casual);
        studio.generate(&client).await.unwrap();
        studio.add_example("in", "out").unwrap();
        studio.set_theme(Theme::Light).unwrap();
    }

    let studio = open_studio(&dir);
    let intents: Vec<&str> = studio.history().iter().map(|h| h.intent.as_str()).collect();
    assert_eq!(intents, vec!["second", "first"]);
    assert_eq!(studio.history()[0].persona, Some(Persona::Developer));
    assert_eq!(studio.history()[0].tone, Some(Tone::Casual));
    assert_eq!(studio.examples().len(), 1);
    assert_eq!(studio.theme(), Theme::Light);
}

#[tokio::test]
async fn test_missing_key_shows_error_and_records_nothing() {
    let dir = TempDir::new().unwrap();
    let mut studio = open_studio(&dir);
    let client = GeminiClient::new(None).unwrap();

    studio.set_intent("write a tweet about AI");
    let completion = studio.generate(&client).await.unwrap();
    assert!(matches!(completion, Completion::Failed(_)));

    let result = studio.result().unwrap();
    assert!(result.is_failure());
    assert!(result.text().contains("Please check your API key and connection."));
    assert!(studio.history().is_empty());
    assert!(open_studio(&dir).history().is_empty());
}
