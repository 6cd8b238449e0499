use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::StoreError;

// ════════════════════════════════════════════════════════════════
//  Record
// ════════════════════════════════════════════════════════════════

/// Запись таблицы: field name → JSON value. Схема на этом уровне
/// не проверяется — store хранит то, что ему передали.
pub type Record = serde_json::Map<String, serde_json::Value>;

/// Достать из `Value` объект-запись. Ошибка если это не JSON object.
pub fn record_from_value(value: serde_json::Value) -> Result<Record, StoreError> {
    match value {
        serde_json::Value::Object(map) => Ok(map),
        other => Err(StoreError::record(format!(
            "expected JSON object record, got {}",
            value_kind(&other)
        ))),
    }
}

fn value_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

// ════════════════════════════════════════════════════════════════
//  Segment
// ════════════════════════════════════════════════════════════════

/// Статическое назначение партиции full-table scan'а: сегмент `index`
/// из `total`. Никогда не ребалансируется.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Segment {
    index: u32,
    total: u32,
}

impl Segment {
    /// Ошибка если `total == 0` или `index >= total`.
    pub fn new(index: u32, total: u32) -> Result<Self, StoreError> {
        if total == 0 {
            return Err(StoreError::request("total segments must be at least 1"));
        }
        if index >= total {
            return Err(StoreError::request(format!(
                "segment index {index} out of range for {total} segments"
            )));
        }
        Ok(Self { index, total })
    }

    /// Все сегменты `0..total`.
    pub fn all(total: u32) -> Result<Vec<Self>, StoreError> {
        (0..total).map(|index| Self::new(index, total)).collect()
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn total(&self) -> u32 {
        self.total
    }
}

impl std::fmt::Display for Segment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.index, self.total)
    }
}

// ════════════════════════════════════════════════════════════════
//  Cursor
// ════════════════════════════════════════════════════════════════

/// Непрозрачный continuation token, который store возвращает после
/// страницы. Для DynamoDB это `LastEvaluatedKey`, для memory store —
/// ключ последней отданной записи.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cursor(Record);

impl Cursor {
    pub fn new(key: Record) -> Self {
        Self(key)
    }

    pub fn as_record(&self) -> &Record {
        &self.0
    }

    pub fn into_record(self) -> Record {
        self.0
    }
}

// ════════════════════════════════════════════════════════════════
//  Projection
// ════════════════════════════════════════════════════════════════

/// Подмножество полей, запрашиваемых у store. Непустое, без дублей,
/// порядок — как передал caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Projection {
    columns: Vec<String>,
}

impl Projection {
    pub fn new<I, S>(columns: I) -> Result<Self, StoreError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut out: Vec<String> = Vec::new();
        for column in columns {
            let column = column.into();
            if column.is_empty() {
                return Err(StoreError::request("projection column name is empty"));
            }
            if !out.contains(&column) {
                out.push(column);
            }
        }
        if out.is_empty() {
            return Err(StoreError::request("projection must name at least one column"));
        }
        Ok(Self { columns: out })
    }

    /// Добавить колонку, если её ещё нет.
    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        let column = column.into();
        if !column.is_empty() && !self.contains(&column) {
            self.columns.push(column);
        }
        self
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn contains(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    /// `#a,#b` — projection expression в нативном виде store.
    pub fn expression(&self) -> String {
        self.columns
            .iter()
            .map(|c| format!("#{c}"))
            .collect::<Vec<_>>()
            .join(",")
    }

    /// `#a → a`, `#b → b` — expression attribute names для expression().
    pub fn attribute_names(&self) -> BTreeMap<String, String> {
        self.columns
            .iter()
            .map(|c| (format!("#{c}"), c.clone()))
            .collect()
    }

    /// Оставить в записи только поля проекции.
    pub fn apply(&self, record: &Record) -> Record {
        record
            .iter()
            .filter(|(k, _)| self.contains(k))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

// ════════════════════════════════════════════════════════════════
//  Requests
// ════════════════════════════════════════════════════════════════

/// Upsert записи целиком.
#[derive(Debug, Clone)]
pub struct PutRequest {
    pub table: String,
    pub item: Record,
}

/// Equality lookup по одному полю.
#[derive(Debug, Clone)]
pub struct QueryRequest {
    pub table: String,
    pub field: String,
    pub value: serde_json::Value,
    /// Strongly-consistent read.
    pub consistent_read: bool,
}

/// Placeholder имени поля в key condition.
pub const FIELD_NAME_PLACEHOLDER: &str = "#fieldName";

impl QueryRequest {
    /// `#fieldName = :<field>`.
    pub fn key_condition(&self) -> String {
        format!("{FIELD_NAME_PLACEHOLDER} = {}", self.value_placeholder())
    }

    /// `:<field>` — placeholder значения в key condition.
    pub fn value_placeholder(&self) -> String {
        format!(":{}", self.field)
    }
}

/// Одна страница одного сегмента scan'а.
#[derive(Debug, Clone)]
pub struct ScanRequest {
    pub table: String,
    pub projection: Option<Projection>,
    pub segment: Segment,
    /// `None` — первая страница сегмента.
    pub cursor: Option<Cursor>,
}

/// Ответ store на ScanRequest.
#[derive(Debug, Clone, Default)]
pub struct ScanPage {
    pub items: Vec<Record>,
    /// `Some` — в сегменте есть ещё данные.
    pub cursor: Option<Cursor>,
}
