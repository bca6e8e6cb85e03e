use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    MissingInput(String),

    #[error("{0}")]
    InvalidInput(String),

    #[error("Uploaded file exceeds the {limit_bytes} byte limit")]
    PayloadTooLarge { limit_bytes: usize },

    #[error("File upload failed: {0}")]
    StageWrite(String),

    #[error("Error processing file: {stderr_excerpt}")]
    AnalysisFailed {
        exit_code: Option<i32>,
        stderr_excerpt: String,
    },

    #[error("Analysis did not finish within {timeout_secs}s")]
    AnalysisTimeout { timeout_secs: u64 },

    #[error("Invalid response from analysis unit: {snippet}")]
    Decode { snippet: String },

    #[error("Invalid response from analysis unit: {0}")]
    Schema(String),

    #[error("FSM error: {0}")]
    Fsm(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Address parse error: {0}")]
    AddrParse(#[from] std::net::AddrParseError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn missing_input(msg: impl Into<String>) -> Self {
        Self::MissingInput(msg.into())
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn stage_write(msg: impl Into<String>) -> Self {
        Self::StageWrite(msg.into())
    }

    pub fn schema(msg: impl Into<String>) -> Self {
        Self::Schema(msg.into())
    }

    pub fn fsm(msg: impl Into<String>) -> Self {
        Self::Fsm(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Stable name of the failure kind, used in logs and error bodies.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingInput(_) => ErrorKind::MissingInput,
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::PayloadTooLarge { .. } => ErrorKind::PayloadTooLarge,
            Self::StageWrite(_) => ErrorKind::StageWriteError,
            Self::AnalysisFailed { .. } => ErrorKind::AnalysisFailed,
            Self::AnalysisTimeout { .. } => ErrorKind::AnalysisTimeout,
            Self::Decode { .. } => ErrorKind::DecodeError,
            Self::Schema(_) => ErrorKind::SchemaError,
            Self::Config(_) | Self::Yaml(_) => ErrorKind::Config,
            Self::Fsm(_)
            | Self::Serialization(_)
            | Self::Io(_)
            | Self::AddrParse(_)
            | Self::Internal(_) => ErrorKind::Internal,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    MissingInput,
    InvalidInput,
    PayloadTooLarge,
    StageWriteError,
    AnalysisFailed,
    AnalysisTimeout,
    DecodeError,
    SchemaError,
    Config,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingInput => "MissingInput",
            Self::InvalidInput => "InvalidInput",
            Self::PayloadTooLarge => "PayloadTooLarge",
            Self::StageWriteError => "StageWriteError",
            Self::AnalysisFailed => "AnalysisFailed",
            Self::AnalysisTimeout => "AnalysisTimeout",
            Self::DecodeError => "DecodeError",
            Self::SchemaError => "SchemaError",
            Self::Config => "Config",
            Self::Internal => "Internal",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
