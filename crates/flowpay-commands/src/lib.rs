//! Command pipeline for the FlowPay agent: free text or a structured command in,
//! a handled action against the record store out.

pub mod clock;
pub mod command;
pub mod dispatch;
pub mod error;
pub mod generator;
pub mod handlers;
pub mod llm;
pub mod pipeline;
pub mod preconditions;
pub mod records;
pub mod store;
pub mod validate;

pub use clock::{Clock, FixedClock, SystemClock};
pub use command::{Action, ActionDescriptor, Command, action_catalog};
pub use dispatch::{ActionDispatcher, ActionOutput};
pub use error::CommandError;
pub use generator::{CommandGenerator, GeneratorError, parse_command_reply, system_prompt};
pub use llm::{
    CompletionClient, CompletionError, CompletionRequest, LlmSettings, OpenAiCompatClient,
};
pub use pipeline::{CommandPipeline, PipelineError, PromptOutcome};
pub use records::{
    ClientRecord, PaymentRecord, PaymentStatus, ReminderRecord, ReminderStatus,
};
pub use store::{RecordStore, RecordStoreError, StoreStats};
pub use validate::{ValidationReport, validate_command};
