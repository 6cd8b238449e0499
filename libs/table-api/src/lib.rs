mod types;

use std::future::Future;
use std::pin::Pin;

pub use types::*;

// ════════════════════════════════════════════════════════════════
//  Table Store
// ════════════════════════════════════════════════════════════════

/// Boxed future, возвращаемый всеми методами TableStore.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + Send + 'a>>;

/// Удалённое key-value/document хранилище таблиц.
///
/// Каждый метод — один request/response цикл. Retry, если есть,
/// живёт внутри клиента конкретного backend'а, не здесь.
pub trait TableStore: Send + Sync {
    /// Upsert записи целиком. Запись с тем же ключом перезаписывается.
    fn put(&self, request: PutRequest) -> StoreFuture<'_, ()>;

    /// Equality lookup по полю, опционально strongly-consistent.
    fn query(&self, request: QueryRequest) -> StoreFuture<'_, Vec<Record>>;

    /// Одна страница одного сегмента full-table scan'а.
    fn scan_segment(&self, request: ScanRequest) -> StoreFuture<'_, ScanPage>;
}

// ════════════════════════════════════════════════════════════════
//  Store Error
// ════════════════════════════════════════════════════════════════

/// Что именно пошло не так при обращении к таблице.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Store отклонил запрос: неверные параметры, сегмент, cursor.
    Request,
    /// Store недоступен или не ответил: сеть, throttling, таймаут.
    Remote,
    /// Запись или значение не конвертируется в/из Record.
    Record,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::Request => f.write_str("rejected request"),
            ErrorKind::Remote => f.write_str("store unavailable"),
            ErrorKind::Record => f.write_str("malformed record"),
        }
    }
}

/// Ошибка любого метода `TableStore`.
///
/// Backend сам решает, какой `ErrorKind` поставить; выше по стеку
/// ошибка не переинтерпретируется, только оборачивается.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct StoreError {
    kind: ErrorKind,
    message: String,
}

impl StoreError {
    pub fn request(msg: impl Into<String>) -> Self {
        Self { kind: ErrorKind::Request, message: msg.into() }
    }

    pub fn remote(msg: impl Into<String>) -> Self {
        Self { kind: ErrorKind::Remote, message: msg.into() }
    }

    pub fn record(msg: impl Into<String>) -> Self {
        Self { kind: ErrorKind::Record, message: msg.into() }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

// ════════════════════════════════════════════════════════════════
//  Utilities
// ════════════════════════════════════════════════════════════════

/// Строковое представление значения ключа: строки как есть,
/// остальное — компактный JSON.
pub fn key_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_names_the_kind() {
        let err = StoreError::remote("DynamoDB Scan: throttled");
        assert_eq!(err.kind(), ErrorKind::Remote);
        assert_eq!(err.message(), "DynamoDB Scan: throttled");
        assert_eq!(err.to_string(), "store unavailable: DynamoDB Scan: throttled");

        assert_eq!(StoreError::request("x").to_string(), "rejected request: x");
        assert_eq!(StoreError::record("x").to_string(), "malformed record: x");
    }

    #[test]
    fn key_string_keeps_strings_bare() {
        assert_eq!(key_string(&serde_json::json!("v-1")), "v-1");
        assert_eq!(key_string(&serde_json::json!(42)), "42");
    }
}
