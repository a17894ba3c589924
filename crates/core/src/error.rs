use std::fmt;

#[derive(Debug)]
pub enum PipelineError {
    /// External input could not be read as tabular data. Fatal to the run.
    SourceRead(String),
    /// A required column could not be located by fuzzy match.
    Schema {
        dataset: String,
        column: String,
        discovered: Vec<String>,
    },
    /// Required grouping columns missing at aggregation time.
    Aggregation {
        column: String,
        discovered: Vec<String>,
    },
    /// A seller display name resolved to no known tax id.
    UnknownSeller(String),
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (bad limit, empty token, etc.).
    ConfigValidation(String),
    /// Dataset store failure (read, write, or decode).
    Store(String),
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SourceRead(msg) => write!(f, "cannot read source data: {msg}"),
            Self::Schema { dataset, column, discovered } => write!(
                f,
                "{dataset} dataset: column '{column}' not found (available: {})",
                discovered.join(", ")
            ),
            Self::Aggregation { column, discovered } => write!(
                f,
                "cannot aggregate: column '{column}' missing (available: {})",
                discovered.join(", ")
            ),
            Self::UnknownSeller(name) => write!(f, "unknown seller: {name}"),
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::Store(msg) => write!(f, "dataset store error: {msg}"),
        }
    }
}

impl std::error::Error for PipelineError {}
