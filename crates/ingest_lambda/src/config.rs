use ingest_core::contract::DEFAULT_ORIGIN_LABEL;

pub const TABLE_NAME_VAR: &str = "TABLE_NAME";
pub const ORIGIN_LABEL_VAR: &str = "INGEST_ORIGIN_LABEL";
/// Set by the Lambda host for every function.
pub const MEMORY_SIZE_VAR: &str = "AWS_LAMBDA_FUNCTION_MEMORY_SIZE";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestConfig {
    pub table_name: String,
    /// Implementation tag stamped into records and singleton responses.
    pub origin_label: String,
    /// Configured function memory, absent outside the Lambda host.
    pub memory_mb: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be configured")]
    Missing(&'static str),
}

impl IngestConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let table_name = lookup(TABLE_NAME_VAR)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .ok_or(ConfigError::Missing(TABLE_NAME_VAR))?;
        let origin_label = lookup(ORIGIN_LABEL_VAR)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_ORIGIN_LABEL.to_string());
        let memory_mb = lookup(MEMORY_SIZE_VAR).and_then(|value| value.trim().parse().ok());

        Ok(Self {
            table_name,
            origin_label,
            memory_mb,
        })
    }
}
