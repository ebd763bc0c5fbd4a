pub mod document;
pub mod loader;
pub mod model;
pub mod resolver;
pub mod template;

pub use loader::{load_scenarios, LoadError, ValidationIssue};
pub use model::{
    AttrTemplate, ErrorCondition, EventSpec, Scenario, ScenarioSet, SpanNode,
};
pub use resolver::{Env, ResolveError, ValueResolver};
pub use template::{Template, TemplateError};
