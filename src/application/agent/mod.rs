mod decision;
mod errors;
mod extract;
mod models;
mod prompt;
mod resolver;
mod runner;


pub use decision::Decision;
pub use errors::AgentError;
pub use extract::extract_candidate;
pub use models::{AgentOptions, TurnEvent, TurnOutcome};
pub use prompt::compose_system_prompt;
pub use resolver::DecisionResolver;
pub use runner::Agent;
