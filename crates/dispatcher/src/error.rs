use thiserror::Error;

#[derive(Debug, Error)]
pub enum DispatcherError {
    /// A configured sink could not be opened (bad params, unwritable path, bind failure)
    #[error("failed to create sink '{name}': {message}")]
    SinkCreation { name: String, message: String },

    /// Two sinks share a name, so their metrics could not be told apart
    #[error("duplicate sink name '{0}'")]
    DuplicateSink(String),

    #[error(transparent)]
    Contract(#[from] contracts::ContractError),
}

impl DispatcherError {
    pub fn sink_creation(name: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::SinkCreation {
            name: name.into(),
            message: err.to_string(),
        }
    }
}
