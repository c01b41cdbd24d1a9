// src/agent/events.rs
// Progress events streamed while a run is in flight

/// Events representing the stages of one analysis run
#[derive(Debug, Clone, PartialEq)]
pub enum RunEvent {
    Started,
    /// Assistant text, emitted as soon as its turn arrives
    Text(String),
    ToolStarted {
        id: String,
        name: String,
    },
    ToolFinished {
        id: String,
        name: String,
        /// Engine JSON on success, the error message otherwise
        output: String,
        is_error: bool,
    },
    RoundLimitReached {
        rounds: u32,
    },
    Completed,
}
