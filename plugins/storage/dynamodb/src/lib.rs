pub mod convert;

use std::time::Duration;

use aws_config::timeout::TimeoutConfig;
use aws_config::BehaviorVersion;
use aws_sdk_dynamodb::config::Region;
use aws_sdk_dynamodb::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_dynamodb::Client;

use table_api::{
    Cursor, PutRequest, QueryRequest, Record, ScanPage, ScanRequest, StoreError, StoreFuture,
    TableStore, FIELD_NAME_PLACEHOLDER,
};

use convert::{from_item, key_from_cursor, key_to_cursor, to_attribute, to_item, Item};

// ═══════════════════════════════════════════════════════════════
//  DynamoDbConfig
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct DynamoDbConfig {
    /// Регион. Без указания — из окружения / профиля AWS.
    #[serde(default)]
    pub region: Option<String>,
    /// Endpoint override (DynamoDB Local, LocalStack).
    #[serde(default)]
    pub endpoint_url: Option<String>,
}

// ═══════════════════════════════════════════════════════════════
//  DynamoDbTableStore
// ═══════════════════════════════════════════════════════════════

/// TableStore поверх `aws-sdk-dynamodb`.
///
/// Retry и backoff — только те, что делает сам SDK.
///
/// Query отдаёт только первую страницу ответа (до 1 MB). Если DynamoDB
/// вернул `LastEvaluatedKey`, остаток не дочитывается: это пишется в лог
/// на `debug`, а вызывающий получает усечённый результат. Полное чтение
/// таблицы — только через scan.
pub struct DynamoDbTableStore {
    client: Client,
}

impl DynamoDbTableStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Собрать клиент из цепочки AWS credentials/region с общим
    /// таймаутом на операцию.
    pub async fn connect(config: &DynamoDbConfig, request_timeout: Duration) -> Self {
        let timeouts = TimeoutConfig::builder()
            .operation_timeout(request_timeout)
            .build();
        let mut loader = aws_config::defaults(BehaviorVersion::latest()).timeout_config(timeouts);
        if let Some(region) = &config.region {
            loader = loader.region(Region::new(region.clone()));
        }
        if let Some(url) = &config.endpoint_url {
            loader = loader.endpoint_url(url);
        }
        let sdk = loader.load().await;
        tracing::info!(
            region = ?sdk.region(),
            endpoint = ?config.endpoint_url,
            timeout_secs = request_timeout.as_secs(),
            "DynamoDB client ready"
        );
        Self::new(Client::new(&sdk))
    }
}

fn store_error<E, R>(operation: &'static str, e: SdkError<E, R>) -> StoreError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    let detail = format!("DynamoDB {operation}: {}", DisplayErrorContext(&e));
    match e.code() {
        Some("ValidationException") => StoreError::request(detail),
        _ => StoreError::remote(detail),
    }
}

/// Query ответил не всем: есть `LastEvaluatedKey`.
fn query_truncated(last_evaluated_key: Option<&Item>) -> bool {
    last_evaluated_key.is_some_and(|key| !key.is_empty())
}

fn segment_number(n: u32) -> Result<i32, StoreError> {
    i32::try_from(n).map_err(|_| StoreError::request(format!("segment number {n} out of range")))
}

impl TableStore for DynamoDbTableStore {
    fn put(&self, request: PutRequest) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            self.client
                .put_item()
                .table_name(request.table)
                .set_item(Some(to_item(&request.item)))
                .send()
                .await
                .map_err(|e| store_error("PutItem", e))?;
            Ok(())
        })
    }

    fn query(&self, request: QueryRequest) -> StoreFuture<'_, Vec<Record>> {
        Box::pin(async move {
            let out = self
                .client
                .query()
                .table_name(&request.table)
                .key_condition_expression(request.key_condition())
                .expression_attribute_names(FIELD_NAME_PLACEHOLDER, &request.field)
                .expression_attribute_values(request.value_placeholder(), to_attribute(&request.value))
                .consistent_read(request.consistent_read)
                .send()
                .await
                .map_err(|e| store_error("Query", e))?;

            if query_truncated(out.last_evaluated_key.as_ref()) {
                tracing::debug!(
                    table = %request.table,
                    field = %request.field,
                    returned = out.items.as_ref().map_or(0, Vec::len),
                    "DynamoDB query truncated, remaining pages are not read"
                );
            }

            out.items
                .unwrap_or_default()
                .into_iter()
                .map(from_item)
                .collect()
        })
    }

    fn scan_segment(&self, request: ScanRequest) -> StoreFuture<'_, ScanPage> {
        Box::pin(async move {
            let start_key = request
                .cursor
                .map(|c| key_from_cursor(c.into_record()))
                .transpose()?;
            let mut scan = self
                .client
                .scan()
                .table_name(&request.table)
                .segment(segment_number(request.segment.index())?)
                .total_segments(segment_number(request.segment.total())?)
                .set_exclusive_start_key(start_key);

            if let Some(projection) = &request.projection {
                scan = scan
                    .projection_expression(projection.expression())
                    .set_expression_attribute_names(Some(
                        projection.attribute_names().into_iter().collect(),
                    ));
            }

            let out = scan.send().await.map_err(|e| store_error("Scan", e))?;

            let items = out
                .items
                .unwrap_or_default()
                .into_iter()
                .map(from_item)
                .collect::<Result<Vec<_>, _>>()?;
            let cursor = out
                .last_evaluated_key
                .filter(|key| !key.is_empty())
                .map(key_to_cursor)
                .transpose()?
                .map(Cursor::new);

            tracing::trace!(
                table = %request.table,
                segment = %request.segment,
                items = items.len(),
                more = cursor.is_some(),
                "DynamoDB scan page"
            );
            Ok(ScanPage { items, cursor })
        })
    }
}

#[cfg(test)]
mod tests {
    use aws_sdk_dynamodb::types::AttributeValue;

    use super::*;

    #[test]
    fn query_with_last_evaluated_key_is_truncated() {
        let mut key = Item::new();
        key.insert("vehicleInventoryId".into(), AttributeValue::S("v-9".into()));

        assert!(query_truncated(Some(&key)));
        assert!(!query_truncated(Some(&Item::new())));
        assert!(!query_truncated(None));
    }

    #[test]
    fn segment_number_rejects_overflow() {
        assert_eq!(segment_number(7).unwrap(), 7);
        assert!(segment_number(u32::MAX).is_err());
    }
}
