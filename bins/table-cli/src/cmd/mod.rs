pub mod put;
pub mod query;
pub mod scan;

use std::io::Write;
use std::sync::Arc;

use data_service::{DataService, ServiceConfig};
use storage_dynamodb::{DynamoDbConfig, DynamoDbTableStore};
use table_api::{Record, TableStore};

use crate::error::CliError;

/// Загрузить конфиг, поднять storage backend и собрать DataService.
pub async fn connect(config_path: &str) -> Result<DataService, CliError> {
    let config = ServiceConfig::load(config_path)?;
    tracing::info!(config = %config_path, storage = %config.storage, "loaded config");

    let store = open_store(&config).await?;
    let service = DataService::from_config(&config, store)?;
    tracing::info!(
        table = %service.table(),
        segments = config.segments,
        "data service ready"
    );
    Ok(service)
}

/// Каждый запуск CLI — отдельный процесс, поэтому здесь только backend'ы,
/// которые переживают процесс. In-memory store живёт в тестах и
/// встраивается кодом напрямую.
async fn open_store(config: &ServiceConfig) -> Result<Arc<dyn TableStore>, CliError> {
    let config_json = config.storage_config_json()?;
    let bad_config = |e: serde_json::Error| CliError::StorageConfig {
        storage: config.storage.clone(),
        detail: e.to_string(),
    };

    match config.storage.as_str() {
        "dynamodb" => {
            let ddb_cfg: DynamoDbConfig = serde_json::from_str(&config_json).map_err(bad_config)?;
            Ok(Arc::new(DynamoDbTableStore::connect(&ddb_cfg, config.request_timeout()).await))
        }
        other => Err(CliError::UnknownStorage(other.to_string())),
    }
}

/// Записи в stdout, одна JSON строка на запись.
pub fn write_records(records: &[Record]) -> Result<(), CliError> {
    let stdout = std::io::stdout();
    let mut out = std::io::BufWriter::new(stdout.lock());
    for record in records {
        serde_json::to_writer(&mut out, record).map_err(std::io::Error::from)?;
        out.write_all(b"\n")?;
    }
    out.flush()?;
    Ok(())
}
