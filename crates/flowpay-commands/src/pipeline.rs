use serde_json::Value;
use tracing::{info, warn};

use crate::command::{Action, Command};
use crate::dispatch::{ActionDispatcher, ActionOutput};
use crate::error::CommandError;
use crate::generator::{CommandGenerator, GeneratorError};
use crate::validate::validate_command;

pub const INVALID_GENERATED_COMMAND_MESSAGE: &str = "AI generated invalid command";
pub const INVALID_COMMAND_MESSAGE: &str = "Invalid command";

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Missing or invalid 'prompt' field")]
    InvalidPrompt,
    /// `command` is set when the rejected command came from the model.
    #[error("{message}")]
    Validation {
        message: &'static str,
        errors: Vec<String>,
        command: Option<Value>,
    },
    #[error(transparent)]
    Generation(#[from] GeneratorError),
    #[error(transparent)]
    Execution(#[from] CommandError),
}

impl PipelineError {
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::InvalidPrompt | Self::Validation { .. } => 400,
            Self::Generation(_) => 500,
            Self::Execution(error) => error.status_code(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PromptOutcome {
    pub prompt: String,
    pub command: Value,
    pub action: Action,
    pub output: ActionOutput,
}

/// Runs prompts and raw commands through generation, validation and dispatch.
#[derive(Clone)]
pub struct CommandPipeline {
    generator: CommandGenerator,
    dispatcher: ActionDispatcher,
}

impl CommandPipeline {
    #[must_use]
    pub const fn new(generator: CommandGenerator, dispatcher: ActionDispatcher) -> Self {
        Self {
            generator,
            dispatcher,
        }
    }

    #[must_use]
    pub const fn dispatcher(&self) -> &ActionDispatcher {
        &self.dispatcher
    }

    /// Handles a `{prompt}` request body.
    pub async fn run_prompt_request(&self, body: &Value) -> Result<PromptOutcome, PipelineError> {
        let prompt = body
            .get("prompt")
            .and_then(Value::as_str)
            .filter(|prompt| !prompt.trim().is_empty())
            .ok_or(PipelineError::InvalidPrompt)?;
        self.run_prompt(prompt).await
    }

    pub async fn run_prompt(&self, prompt: &str) -> Result<PromptOutcome, PipelineError> {
        info!(prompt_chars = prompt.chars().count(), "processing prompt");
        let candidate = self.generator.generate(prompt).await?;

        let report = validate_command(&candidate);
        if !report.valid {
            warn!(errors = ?report.errors, "generated command failed validation");
            return Err(PipelineError::Validation {
                message: INVALID_GENERATED_COMMAND_MESSAGE,
                errors: report.errors,
                command: Some(candidate),
            });
        }

        let command = Command::from_value(&candidate)?;
        let output = self.dispatcher.execute(&command).await?;
        Ok(PromptOutcome {
            prompt: prompt.to_string(),
            command: candidate,
            action: command.action,
            output,
        })
    }

    /// Handles an already formed command, skipping the model.
    pub async fn run_command(&self, candidate: &Value) -> Result<ActionOutput, PipelineError> {
        let report = validate_command(candidate);
        if !report.valid {
            return Err(PipelineError::Validation {
                message: INVALID_COMMAND_MESSAGE,
                errors: report.errors,
                command: None,
            });
        }
        Ok(self.dispatcher.execute_value(candidate).await?)
    }
}
