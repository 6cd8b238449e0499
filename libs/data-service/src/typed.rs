//! Типизированный фасад: тип записи и тип проекции известны компилятору.
//!
//! Таблица привязана к типу записи через [`TableItem::TABLE_PREFIX`],
//! поля — через перечисление [`TableItem::Field`], а проекция — отдельный
//! тип, который может назвать только поля своей записи:
//!
//! ```ignore
//! #[derive(Serialize, Deserialize)]
//! struct Vehicle { id: String, windows: u32, name: String, can_fly: bool }
//!
//! #[derive(Deserialize)]
//! struct FlyingOnly { can_fly: bool }
//!
//! impl ItemSubset for FlyingOnly {
//!     type Item = Vehicle;
//!     fn columns() -> &'static [VehicleField] { &[VehicleField::CanFly] }
//! }
//!
//! let subsets: Vec<FlyingOnly> = vehicles.get_all_projected().await?;
//! ```

use std::marker::PhantomData;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use table_api::{record_from_value, Projection, Record, TableStore};

use crate::service::DataService;
use crate::table::TableName;
use crate::ServiceError;

/// Имя поля записи.
pub trait TableField: Copy + Send + Sync + 'static {
    fn name(self) -> &'static str;
}

/// Тип записи конкретной таблицы.
pub trait TableItem: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Prefix физического имени таблицы (stage добавляется отдельно).
    const TABLE_PREFIX: &'static str;

    type Field: TableField;
}

/// Подмножество полей записи `Item`, запрашиваемое scan'ом.
pub trait ItemSubset: DeserializeOwned {
    type Item: TableItem;

    fn columns() -> &'static [<Self::Item as TableItem>::Field];
}

/// Фасад над таблицей записей типа `T`.
pub struct TypedDataService<T: TableItem> {
    inner: DataService,
    _item: PhantomData<fn() -> T>,
}

impl<T: TableItem> Clone for TypedDataService<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            _item: PhantomData,
        }
    }
}

impl<T: TableItem> TypedDataService<T> {
    pub fn new(stage: impl Into<String>, store: Arc<dyn TableStore>) -> Self {
        Self::from_service(DataService::new(TableName::new(T::TABLE_PREFIX, stage), store))
    }

    /// Обернуть готовый DataService. Caller отвечает за то, что таблица
    /// действительно хранит `T`.
    pub fn from_service(inner: DataService) -> Self {
        Self {
            inner,
            _item: PhantomData,
        }
    }

    pub fn untyped(&self) -> &DataService {
        &self.inner
    }

    pub async fn put_item(&self, item: &T) -> Result<(), ServiceError> {
        let value = serde_json::to_value(item).map_err(|e| self.codec_error(e))?;
        let record = record_from_value(value).map_err(|e| self.codec_error(e))?;
        self.inner.put_item(record).await
    }

    pub async fn get_items_by_field(
        &self,
        field: T::Field,
        value: impl Into<serde_json::Value>,
    ) -> Result<Vec<T>, ServiceError> {
        let records = self.inner.get_items_by_field(field.name(), value).await?;
        self.decode_all(records)
    }

    pub async fn get_item_by_field(
        &self,
        field: T::Field,
        value: impl Into<serde_json::Value>,
    ) -> Result<Option<T>, ServiceError> {
        match self.inner.get_item_by_field(field.name(), value).await? {
            Some(record) => Ok(self.decode_all(vec![record])?.pop()),
            None => Ok(None),
        }
    }

    pub async fn wait_for_item_by_field_to_be_consistent(
        &self,
        field: T::Field,
        value: impl Into<serde_json::Value>,
    ) -> Result<(), ServiceError> {
        self.inner
            .wait_for_item_by_field_to_be_consistent(field.name(), value)
            .await
    }

    pub async fn get_all(&self) -> Result<Vec<T>, ServiceError> {
        let records = self.inner.get_all(None).await?;
        self.decode_all(records)
    }

    /// Scan только по колонкам `P`, каждая запись декодируется в `P`.
    pub async fn get_all_projected<P>(&self) -> Result<Vec<P>, ServiceError>
    where
        P: ItemSubset<Item = T>,
    {
        let projection = Projection::new(P::columns().iter().map(|f| f.name()))?;
        let records = self.inner.get_all(Some(&projection)).await?;
        self.decode_all(records)
    }

    fn decode_all<D: DeserializeOwned>(&self, records: Vec<Record>) -> Result<Vec<D>, ServiceError> {
        records
            .into_iter()
            .map(|r| serde_json::from_value(serde_json::Value::Object(r)).map_err(|e| self.codec_error(e)))
            .collect()
    }

    fn codec_error(&self, e: impl std::fmt::Display) -> ServiceError {
        ServiceError::Codec {
            table: self.inner.table().physical(),
            detail: e.to_string(),
        }
    }
}
