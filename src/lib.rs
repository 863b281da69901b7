use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("SerializationError: {0}")]
    SerializationError(#[source] serde_json::Error),

    #[error("Invalid ConditionSet: {0}")]
    InvalidConditionSet(String),

    #[error("Terminal Condition: {0} belongs to the condition set and cannot be cleared")]
    TerminalCondition(String),

    #[error("Conflicting Kind: {0}")]
    ConflictingKind(String),

    #[error("Scheme already installed")]
    SchemeAlreadyInstalled,

    #[error(transparent)]
    Conformance(#[from] duck::ConformanceError),
}
pub type Result<T, E = Error> = std::result::Result<T, E>;

pub mod apis;
pub mod duck;
pub mod scheme;
pub mod serving;

/// Log and trace integrations
pub mod telemetry;
