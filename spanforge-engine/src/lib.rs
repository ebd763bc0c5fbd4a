pub mod context;
pub mod engine;
pub mod error;
pub mod select;
pub mod worker;

pub use context::{ContextEntry, ContextStore};
pub use engine::TraceEngine;
pub use error::{EngineError, TraceError};
pub use select::ScenarioSelector;
pub use worker::{GeneratorHandle, GeneratorStatus, TraceGenerator, WorkerConfig};
