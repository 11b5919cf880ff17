//! Prompt assembly.
//!
//! The prompt is the persona instruction, then [`SEPARATOR`], then every
//! stored turn's text joined by [`TURN_DELIMITER`] in insertion order, then
//! one more [`TURN_DELIMITER`] and the new input:
//!
//! ```text
//! <persona> <sep> <turn 1> <turn> <turn 2> <turn> <new input>
//! ```
//!
//! The delimiters are structural markers the backend model was trained on.
//! They are inserted verbatim and are not configurable.
//!
//! # Determinism
//!
//! Assembly is a pure function of its inputs. No random or time-dependent
//! logic is involved.

use sera_core::session::Turn;

/// Marks the end of the persona instruction.
pub const SEPARATOR: &str = " <sep> ";

/// Marks the boundary between two utterances.
pub const TURN_DELIMITER: &str = " <turn> ";

/// Build the prompt for one exchange.
///
/// Turns enter the prompt as bare text. Speaker labels (`User:`, `Sera:`)
/// exist only in the rendered transcript, never in the prompt.
pub fn assemble(persona_instruction: &str, history: &[Turn], new_input: &str) -> String {
    let history_len: usize = history
        .iter()
        .map(|t| t.text().len() + TURN_DELIMITER.len())
        .sum();
    let mut prompt = String::with_capacity(
        persona_instruction.len() + SEPARATOR.len() + history_len + new_input.len(),
    );

    prompt.push_str(persona_instruction);
    prompt.push_str(SEPARATOR);
    for (i, turn) in history.iter().enumerate() {
        if i > 0 {
            prompt.push_str(TURN_DELIMITER);
        }
        prompt.push_str(turn.text());
    }
    prompt.push_str(TURN_DELIMITER);
    prompt.push_str(new_input);
    prompt
}

/// Holds the persona instruction. Create one and reuse it.
#[derive(Debug, Clone)]
pub struct PromptAssembler {
    persona_instruction: String,
}

impl PromptAssembler {
    pub fn new(persona_instruction: impl Into<String>) -> Self {
        Self {
            persona_instruction: persona_instruction.into(),
        }
    }

    pub fn persona_instruction(&self) -> &str {
        &self.persona_instruction
    }

    pub fn assemble(&self, history: &[Turn], new_input: &str) -> String {
        assemble(&self.persona_instruction, history, new_input)
    }
}
