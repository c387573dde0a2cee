// src/prompt/mod.rs
// Request formatting: PromptRequest -> (system instruction, user message)

pub mod builder;

pub use builder::{build_user_message, format_examples, persona_instruction, render};

use crate::types::PromptMode;

/// System instruction for building a prompt from a raw intent
pub const GENERATE_SYSTEM_INSTRUCTION: &str = "\
You are a world-class Prompt Engineer and LLM Architect.
Your goal is to transform a user's raw, simple intent into a highly engineered, sophisticated prompt optimized for advanced Large Language Models (like Gemini 1.5 Pro, GPT-4, Claude 3.5).

Follow this framework for the output prompt:
1. **Role/Persona**: Define who the AI should be.
2. **Context**: Background information needed.
3. **Task**: The specific instruction.
4. **Constraints**: What to avoid or adhere to.
5. **Output Format**: How the response should look.
6. **Example (Optional)**: If helpful.

Do not output chatty conversational text. Output ONLY the engineered prompt.
";

/// System instruction for critiquing and rewriting an existing draft
pub const IMPROVE_SYSTEM_INSTRUCTION: &str = "\
You are an expert Prompt Doctor and Optimization Specialist.
Your goal is to take an EXISTING prompt provided by the user, analyze its weaknesses (ambiguity, lack of structure, weak constraints), and REWRITE it into a professional-grade prompt.

1. Analyze the user's draft.
2. Identify the core intent.
3. Re-structure it using advanced prompting techniques (Chain of Thought, Persona adoption, Delimiters).
4. Apply the requested Tone and Persona settings to the rewritten version.

Output ONLY the improved, rewritten prompt. Do not output the analysis or chatty text.
";

/// Marker opening every rendered few-shot example block
pub const EXAMPLE_BLOCK_PREFIX: &str = "--- EXAMPLE ";

/// The two strings sent to the model for one submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPrompt {
    pub system_instruction: String,
    pub user_message: String,
}

pub fn system_instruction(mode: PromptMode) -> &'static str {
    match mode {
        PromptMode::Generate => GENERATE_SYSTEM_INSTRUCTION,
        PromptMode::Improve => IMPROVE_SYSTEM_INSTRUCTION,
    }
}

/// Label placed in front of the quoted intent
pub fn intent_label(mode: PromptMode) -> &'static str {
    match mode {
        PromptMode::Generate => "USER INTENT",
        PromptMode::Improve => "EXISTING DRAFT PROMPT",
    }
}
