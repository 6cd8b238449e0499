use std::collections::HashSet;
use std::sync::Arc;

use table_api::{key_string, Projection, PutRequest, QueryRequest, Record, TableStore};

use crate::config::ServiceConfig;
use crate::scan::ParallelScanner;
use crate::table::TableName;
use crate::ServiceError;

// ═══════════════════════════════════════════════════════════════
//  DataService
// ═══════════════════════════════════════════════════════════════

/// CRUD-фасад над одной таблицей store.
///
/// Записи непрозрачны: фасад ничего не знает о схеме и не проверяет
/// форму данных. Ошибки store пробрасываются как есть.
#[derive(Clone)]
pub struct DataService {
    table: TableName,
    store: Arc<dyn TableStore>,
    scanner: ParallelScanner,
}

impl DataService {
    pub fn new(table: TableName, store: Arc<dyn TableStore>) -> Self {
        let scanner = ParallelScanner::new(Arc::clone(&store));
        Self { table, store, scanner }
    }

    pub fn with_segments(
        table: TableName,
        store: Arc<dyn TableStore>,
        segments: u32,
    ) -> Result<Self, ServiceError> {
        let scanner = ParallelScanner::with_segments(Arc::clone(&store), segments)?;
        Ok(Self { table, store, scanner })
    }

    /// Имя таблицы и число сегментов берутся из конфига.
    pub fn from_config(config: &ServiceConfig, store: Arc<dyn TableStore>) -> Result<Self, ServiceError> {
        Self::with_segments(config.table_name()?, store, config.segments)
    }

    pub fn table(&self) -> &TableName {
        &self.table
    }

    /// Upsert записи целиком.
    pub async fn put_item(&self, item: Record) -> Result<(), ServiceError> {
        tracing::debug!(table = %self.table, fields = item.len(), "put item");
        self.store
            .put(PutRequest {
                table: self.table.physical(),
                item,
            })
            .await?;
        Ok(())
    }

    /// Все записи, у которых `field == value`.
    pub async fn get_items_by_field(
        &self,
        field: &str,
        value: impl Into<serde_json::Value>,
    ) -> Result<Vec<Record>, ServiceError> {
        self.query(field, value.into(), false).await
    }

    /// Первая запись с `field == value`, обычно lookup по partition key.
    /// Порядок при нескольких совпадениях — тот, что отдал store.
    pub async fn get_item_by_field(
        &self,
        field: &str,
        value: impl Into<serde_json::Value>,
    ) -> Result<Option<Record>, ServiceError> {
        let found = self.query(field, value.into(), false).await?;
        Ok(found.into_iter().next())
    }

    /// Тот же lookup, но strongly-consistent. Возвращается как только
    /// store ответил; если запись нужна «когда появится» — цикл на
    /// стороне caller'а.
    pub async fn wait_for_item_by_field_to_be_consistent(
        &self,
        field: &str,
        value: impl Into<serde_json::Value>,
    ) -> Result<(), ServiceError> {
        self.query(field, value.into(), true).await?;
        Ok(())
    }

    /// Strongly-consistent lookup, возвращающий найденные записи.
    pub async fn get_items_by_field_consistent(
        &self,
        field: &str,
        value: impl Into<serde_json::Value>,
    ) -> Result<Vec<Record>, ServiceError> {
        self.query(field, value.into(), true).await
    }

    async fn query(
        &self,
        field: &str,
        value: serde_json::Value,
        consistent_read: bool,
    ) -> Result<Vec<Record>, ServiceError> {
        let request = QueryRequest {
            table: self.table.physical(),
            field: field.to_string(),
            value,
            consistent_read,
        };
        tracing::debug!(
            table = %self.table,
            condition = %request.key_condition(),
            consistent_read,
            "query"
        );
        Ok(self.store.query(request).await?)
    }

    /// Full-table scan. С проекцией store отдаёт только её поля.
    pub async fn get_all(&self, columns: Option<&Projection>) -> Result<Vec<Record>, ServiceError> {
        self.scanner.scan(&self.table.physical(), columns).await
    }

    /// Scan с одной записью на каждое значение `key_field`: остаётся
    /// первая увиденная, записи без поля отбрасываются. Если есть
    /// проекция, `key_field` к ней добавляется.
    pub async fn get_all_distinct(
        &self,
        key_field: &str,
        columns: Option<&Projection>,
    ) -> Result<Vec<Record>, ServiceError> {
        let projection = columns.map(|p| p.clone().with_column(key_field));
        let records = self.get_all(projection.as_ref()).await?;

        let scanned = records.len();
        let mut seen = HashSet::new();
        let distinct: Vec<Record> = records
            .into_iter()
            .filter(|r| r.get(key_field).is_some_and(|v| seen.insert(key_string(v))))
            .collect();

        tracing::debug!(
            table = %self.table,
            key_field,
            scanned,
            distinct = distinct.len(),
            "distinct scan"
        );
        Ok(distinct)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use storage_memory::MemoryTableStore;
    use table_api::record_from_value;

    use super::*;

    fn record(value: serde_json::Value) -> Record {
        record_from_value(value).unwrap()
    }

    fn service(page_size: usize) -> (DataService, Arc<MemoryTableStore>) {
        let store = Arc::new(MemoryTableStore::new("vehicleInventoryId", page_size));
        let svc = DataService::new(TableName::new("Product_VehicleState_", "test"), store.clone());
        (svc, store)
    }

    fn vehicle(i: usize) -> Record {
        record(json!({
            "vehicleInventoryId": format!("v-{i}"),
            "windows": i % 5,
            "name": format!("car {i}"),
            "canFly": i % 2 == 0,
        }))
    }

    #[tokio::test]
    async fn get_all_returns_every_item_once() {
        let (svc, _) = service(7);
        for i in 0..137 {
            svc.put_item(vehicle(i)).await.unwrap();
        }

        let all = svc.get_all(None).await.unwrap();
        assert_eq!(all.len(), 137);
        let ids: HashSet<String> = all
            .iter()
            .map(|r| key_string(&r["vehicleInventoryId"]))
            .collect();
        assert_eq!(ids.len(), 137);
    }

    #[tokio::test]
    async fn get_all_without_projection_keeps_put_fields() {
        let (svc, _) = service(10);
        svc.put_item(vehicle(1)).await.unwrap();
        let all = svc.get_all(None).await.unwrap();
        assert_eq!(all, vec![vehicle(1)]);
    }

    #[tokio::test]
    async fn get_all_with_projection_returns_only_those_fields() {
        let (svc, _) = service(4);
        for i in 0..20 {
            svc.put_item(vehicle(i)).await.unwrap();
        }
        let p = Projection::new(["canFly", "name"]).unwrap();
        let all = svc.get_all(Some(&p)).await.unwrap();
        assert_eq!(all.len(), 20);
        for r in &all {
            let mut fields: Vec<&str> = r.keys().map(String::as_str).collect();
            fields.sort_unstable();
            assert_eq!(fields, vec!["canFly", "name"]);
        }
    }

    #[tokio::test]
    async fn get_all_on_empty_table_is_empty() {
        let (svc, store) = service(10);
        let all = svc.get_all(None).await.unwrap();
        assert!(all.is_empty());
        assert_eq!(store.stats().scans, 8);
    }

    #[tokio::test]
    async fn put_then_consistent_query_sees_record() {
        let (svc, store) = service(10);
        svc.put_item(vehicle(42)).await.unwrap();

        svc.wait_for_item_by_field_to_be_consistent("vehicleInventoryId", "v-42")
            .await
            .unwrap();
        let found = svc
            .get_items_by_field_consistent("vehicleInventoryId", "v-42")
            .await
            .unwrap();
        assert_eq!(found, vec![vehicle(42)]);
        assert_eq!(store.stats().queries, 2);
    }

    #[tokio::test]
    async fn single_item_lookup_by_key() {
        let (svc, _) = service(10);
        for i in 0..5 {
            svc.put_item(vehicle(i)).await.unwrap();
        }

        let found = svc.get_item_by_field("vehicleInventoryId", "v-3").await.unwrap();
        assert_eq!(found, Some(vehicle(3)));

        let missing = svc.get_item_by_field("vehicleInventoryId", "v-404").await.unwrap();
        assert_eq!(missing, None);
    }

    #[tokio::test]
    async fn put_overwrites_wholesale() {
        let (svc, _) = service(10);
        svc.put_item(vehicle(1)).await.unwrap();
        svc.put_item(record(json!({"vehicleInventoryId": "v-1", "takes": "absolutely"})))
            .await
            .unwrap();
        let found = svc.get_items_by_field("vehicleInventoryId", "v-1").await.unwrap();
        assert_eq!(found, vec![record(json!({"vehicleInventoryId": "v-1", "takes": "absolutely"}))]);
    }

    #[tokio::test]
    async fn query_by_non_key_field_may_match_many() {
        let (svc, _) = service(10);
        for i in 0..10 {
            svc.put_item(vehicle(i)).await.unwrap();
        }
        let fliers = svc.get_items_by_field("canFly", true).await.unwrap();
        assert_eq!(fliers.len(), 5);
        let none = svc.get_items_by_field("numberOfWings", "3").await.unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn distinct_keeps_one_record_per_key() {
        let store = Arc::new(MemoryTableStore::new("id", 3));
        let svc = DataService::new(TableName::new("cap_", "test"), store);
        for i in 0..12 {
            svc.put_item(record(json!({"id": i, "capId": i % 4}))).await.unwrap();
        }
        svc.put_item(record(json!({"id": 99}))).await.unwrap();

        let by_cap = svc.get_all_distinct("capId", None).await.unwrap();
        assert_eq!(by_cap.len(), 4);

        let p = Projection::new(["id"]).unwrap();
        let projected = svc.get_all_distinct("capId", Some(&p)).await.unwrap();
        assert_eq!(projected.len(), 4);
        assert!(projected.iter().all(|r| r.len() == 2));
    }
}
