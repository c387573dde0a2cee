use crate::types::{Persona, PromptMode, PromptRequest, TrainingExample};

use super::{intent_label, system_instruction, RenderedPrompt, EXAMPLE_BLOCK_PREFIX};

const EXAMPLE_BLOCK_RULE: &str = "------------------------";

/// Render a request into the system instruction and user message sent to the model
pub fn render(request: &PromptRequest) -> RenderedPrompt {
    RenderedPrompt {
        system_instruction: system_instruction(request.mode).to_string(),
        user_message: build_user_message(request),
    }
}

/// Clause forcing the generated prompt's role to the chosen persona.
/// Returns None for the default persona.
pub fn persona_instruction(persona: Persona) -> Option<String> {
    if persona.is_default() {
        return None;
    }

    Some(format!(
        "IMPORTANT: The \"Role/Persona\" section of the generated prompt MUST be explicitly defined as a \"{}\". \
         Ensure the vocabulary and perspective align with this persona.",
        persona.as_str()
    ))
}

/// Few-shot section. Empty string when there are no examples.
pub fn format_examples(examples: &[TrainingExample]) -> String {
    if examples.is_empty() {
        return String::new();
    }

    let mut section = String::new();
    section.push_str("Below are FEW-SHOT EXAMPLES provided by the user.\n");
    section.push_str(
        "You MUST follow the style, structure, and depth of these examples when generating the final prompt.\n",
    );

    for (i, example) in examples.iter().enumerate() {
        section.push('\n');
        section.push_str(&format!("{}{} ---\n", EXAMPLE_BLOCK_PREFIX, i + 1));
        section.push_str(&format!("USER INPUT: \"{}\"\n", example.input));
        section.push_str("IDEAL OUTPUT:\n");
        section.push_str(&example.output);
        section.push('\n');
        section.push_str(EXAMPLE_BLOCK_RULE);
        section.push('\n');
    }

    section
}

pub fn build_user_message(request: &PromptRequest) -> String {
    let (task, adjective) = match request.mode {
        PromptMode::Generate => ("Generate a full prompt from this intent.", "optimized"),
        PromptMode::Improve => (
            "Critique and Rewrite this prompt to be production-ready.",
            "improved",
        ),
    };

    let mut message = String::new();
    message.push_str(&format!(
        "{}: \"{}\"\n\n",
        intent_label(request.mode),
        request.intent
    ));
    message.push_str(&format!("Task: {}\n\n", task));
    message.push_str(&format!("Target Persona: {}\n", request.persona));
    message.push_str(&format!("Desired Tone: {}\n", request.tone));
    message.push_str(&format!("Desired Detail Level: {}\n", request.length));

    if let Some(clause) = persona_instruction(request.persona) {
        message.push('\n');
        message.push_str(&clause);
        message.push('\n');
    }

    let examples = format_examples(&request.examples);
    if !examples.is_empty() {
        message.push('\n');
        message.push_str(&examples);
    }

    message.push_str(&format!("\nPlease write the {} prompt now.\n", adjective));
    message
}
