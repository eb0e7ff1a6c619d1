const INTERACTIVE_MAX_ITERATIONS: usize = 4;
const SERVING_MAX_ITERATIONS: usize = 5;

/// Iteration bound and per-variant behavior for the agent loop.
#[derive(Debug, Clone, Copy)]
pub struct AgentOptions {
    pub max_iterations: usize,
    pub reflect: bool,
}

impl AgentOptions {
    /// Interactive prompt: small safety bound, one-shot reflection on
    /// final answers.
    pub fn interactive() -> Self {
        Self {
            max_iterations: INTERACTIVE_MAX_ITERATIONS,
            reflect: true,
        }
    }

    /// Networked endpoint: slightly larger bound, no reflection.
    pub fn serving() -> Self {
        Self {
            max_iterations: SERVING_MAX_ITERATIONS,
            reflect: false,
        }
    }
}

/// Terminal outcome of one user turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    Answered(String),
    /// The iteration bound ran out before a final answer was reached.
    Exhausted,
}

/// Progress notifications emitted while a turn is running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnEvent {
    Thinking,
    CallingTool { name: String },
}
