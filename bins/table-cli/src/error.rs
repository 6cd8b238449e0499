use data_service::ServiceError;

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("{0}")]
    Service(#[from] ServiceError),

    #[error("store: {0}")]
    Store(#[from] table_api::StoreError),

    #[error("storage '{0}' not supported by the CLI (expected \"dynamodb\"; \"memory\" does not outlive the process)")]
    UnknownStorage(String),

    #[error("storage config ({storage}): {detail}")]
    StorageConfig { storage: String, detail: String },

    #[error("invalid {what}: {detail}")]
    Input { what: &'static str, detail: String },

    #[error("output: {0}")]
    Io(#[from] std::io::Error),
}
