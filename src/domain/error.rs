//! Domain error types.

/// Top-level error type for quantsim.
#[derive(Debug, thiserror::Error)]
pub enum QuantsimError {
    #[error("invalid data for {instrument} at bar {index}: {reason}")]
    InvalidData {
        instrument: String,
        index: usize,
        reason: String,
    },

    #[error("insufficient data for {indicator}: have {seen} values, need {required}")]
    InsufficientData {
        indicator: String,
        seen: usize,
        required: usize,
    },

    #[error("insufficient funds for {instrument}: order needs {required:.2}, cash is {available:.2}")]
    InsufficientFunds {
        instrument: String,
        required: f64,
        available: f64,
    },

    #[error("configuration error [{key}]: {reason}")]
    Configuration { key: String, reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("data source error: {reason}")]
    DataSource { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl QuantsimError {
    pub fn configuration(key: impl Into<String>, reason: impl Into<String>) -> Self {
        QuantsimError::Configuration {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Short name of the error kind, used as the prefix of terminal messages.
    pub fn kind(&self) -> &'static str {
        match self {
            QuantsimError::InvalidData { .. } => "InvalidDataError",
            QuantsimError::InsufficientData { .. } => "InsufficientDataError",
            QuantsimError::InsufficientFunds { .. } => "InsufficientFundsError",
            QuantsimError::Configuration { .. } | QuantsimError::ConfigParse { .. } => {
                "ConfigurationError"
            }
            QuantsimError::DataSource { .. } => "DataSourceError",
            QuantsimError::Io(_) => "IoError",
        }
    }

    /// Fatal errors abort a run; the rest are recovered bar-by-bar.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            QuantsimError::InsufficientData { .. } | QuantsimError::InsufficientFunds { .. }
        )
    }
}

impl From<&QuantsimError> for std::process::ExitCode {
    fn from(err: &QuantsimError) -> Self {
        let code: u8 = match err {
            QuantsimError::Io(_) => 1,
            QuantsimError::Configuration { .. } | QuantsimError::ConfigParse { .. } => 2,
            QuantsimError::DataSource { .. } => 3,
            QuantsimError::InvalidData { .. } => 4,
            QuantsimError::InsufficientData { .. } | QuantsimError::InsufficientFunds { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
