//! Analysis engine: the HTTP client and the supervisor of its process.

mod client;
mod http;
mod supervisor;

pub use client::{AnalyzeResult, EngineClient};
pub use supervisor::EngineSupervisor;
