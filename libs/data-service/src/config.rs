use std::time::Duration;

use serde::Deserialize;

use crate::scan::DEFAULT_SEGMENTS;
use crate::table::TableName;
use crate::ServiceError;

// ═══════════════════════════════════════════════════════════════
//  Service Config
// ═══════════════════════════════════════════════════════════════

/// Конфигурация фасада: таблица, scan и storage backend.
#[derive(Debug, Deserialize)]
pub struct ServiceConfig {
    /// Логический prefix имени таблицы (e.g., "Product_VehicleState_").
    pub table_prefix: String,
    /// Deployment stage. Без указания — `$SERVERLESS_STAGE`.
    #[serde(default)]
    pub stage: Option<String>,
    /// Число сегментов parallel scan'а.
    #[serde(default = "default_segments")]
    pub segments: u32,
    /// Таймаут одного запроса к store. С запасом под большие таблицы.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Storage backend. Сейчас только "dynamodb".
    #[serde(default = "default_storage")]
    pub storage: String,
    /// Конфигурация storage backend'а.
    #[serde(default)]
    pub storage_config: Option<toml::Value>,
}

fn default_segments() -> u32 {
    DEFAULT_SEGMENTS
}
fn default_request_timeout_secs() -> u64 {
    300
}
fn default_storage() -> String {
    "dynamodb".into()
}

impl ServiceConfig {
    pub fn load(path: &str) -> Result<Self, ServiceError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ServiceError::Config(format!("read '{path}': {e}")))?;
        Self::parse(&content).map_err(|e| match e {
            ServiceError::Config(detail) => ServiceError::Config(format!("'{path}': {detail}")),
            other => other,
        })
    }

    pub fn parse(content: &str) -> Result<Self, ServiceError> {
        let config: Self = toml::from_str(content)
            .map_err(|e| ServiceError::Config(format!("parse: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ServiceError> {
        if self.table_prefix.is_empty() {
            return Err(ServiceError::Config("table_prefix is empty".into()));
        }
        if self.segments == 0 {
            return Err(ServiceError::Config("segments must be at least 1".into()));
        }
        if self.request_timeout_secs == 0 {
            return Err(ServiceError::Config("request_timeout_secs must be positive".into()));
        }
        Ok(())
    }

    pub fn table_name(&self) -> Result<TableName, ServiceError> {
        TableName::resolve(self.table_prefix.clone(), self.stage.as_deref())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// storage_config как JSON-строка (или "{}").
    pub fn storage_config_json(&self) -> Result<String, ServiceError> {
        config_json_or_empty(&self.storage_config)
    }
}

/// Сериализовать Option<toml::Value> в JSON-строку (или "{}").
pub fn config_json_or_empty(val: &Option<toml::Value>) -> Result<String, ServiceError> {
    match val {
        Some(v) => serde_json::to_string(v)
            .map_err(|e| ServiceError::Config(format!("serialize storage config: {e}"))),
        None => Ok("{}".to_string()),
    }
}
