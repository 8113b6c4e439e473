//! Turn handling: the public entry point of the crate.

pub mod pipeline;
pub mod types;

pub use pipeline::ChatPipeline;
pub use types::{ResponseSource, TimeContext, TurnRequest, TurnResponse};
