// Prompt construction and the text-generation client

pub mod client;
pub mod prompt;

pub use client::{GeminiClient, GenerationError, TextGenerator};
pub use prompt::{PromptPair, build_edit_prompt, build_generation_prompt};
