//! Task pipeline
//!
//! One linear pass per accepted task: decode attachments, fetch prior code,
//! generate, commit, publish and report to the callback URL.

pub mod attachments;
mod callback;
mod error;
mod orchestrator;

pub use callback::{CallbackNotifier, DeliveryReport, CALLBACK_ATTEMPTS};
pub use error::PipelineError;
pub use orchestrator::{TaskOutcome, TaskPipeline, DEFAULT_TASK_TIMEOUT};
