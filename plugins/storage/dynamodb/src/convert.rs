//! JSON record ↔ DynamoDB `AttributeValue`.
//!
//! Числа уходят как `N` (строкой), вложенные объекты как `M`, массивы
//! как `L`. Обратно: `N` парсится в i64 / u64 / f64, set-типы
//! становятся массивами, бинарные `B`/`Bs` — base64 строками.
//!
//! Это преобразование не обратимо (`B` → строка, длинный `N` → f64),
//! поэтому ключ пагинации идёт отдельным путём: [`key_to_cursor`] и
//! [`key_from_cursor`] хранят его в DynamoDB-JSON форме.

use std::collections::HashMap;

use aws_sdk_dynamodb::primitives::Blob;
use aws_sdk_dynamodb::types::AttributeValue;
use base64::Engine;
use serde_json::Value;

use table_api::{Record, StoreError};

pub type Item = HashMap<String, AttributeValue>;

pub fn to_attribute(value: &Value) -> AttributeValue {
    match value {
        Value::Null => AttributeValue::Null(true),
        Value::Bool(b) => AttributeValue::Bool(*b),
        Value::Number(n) => AttributeValue::N(n.to_string()),
        Value::String(s) => AttributeValue::S(s.clone()),
        Value::Array(items) => AttributeValue::L(items.iter().map(to_attribute).collect()),
        Value::Object(map) => AttributeValue::M(
            map.iter().map(|(k, v)| (k.clone(), to_attribute(v))).collect(),
        ),
    }
}

pub fn to_item(record: &Record) -> Item {
    record.iter().map(|(k, v)| (k.clone(), to_attribute(v))).collect()
}

pub fn from_attribute(value: &AttributeValue) -> Result<Value, StoreError> {
    Ok(match value {
        AttributeValue::S(s) => Value::String(s.clone()),
        AttributeValue::N(n) => parse_number(n)?,
        AttributeValue::Bool(b) => Value::Bool(*b),
        AttributeValue::Null(_) => Value::Null,
        AttributeValue::L(items) => Value::Array(
            items.iter().map(from_attribute).collect::<Result<_, _>>()?,
        ),
        AttributeValue::M(map) => Value::Object(
            map.iter()
                .map(|(k, v)| Ok((k.clone(), from_attribute(v)?)))
                .collect::<Result<_, StoreError>>()?,
        ),
        AttributeValue::Ss(items) => Value::Array(items.iter().cloned().map(Value::String).collect()),
        AttributeValue::Ns(items) => Value::Array(
            items.iter().map(|n| parse_number(n)).collect::<Result<_, _>>()?,
        ),
        AttributeValue::B(blob) => Value::String(encode_blob(blob.as_ref())),
        AttributeValue::Bs(blobs) => Value::Array(
            blobs.iter().map(|b| Value::String(encode_blob(b.as_ref()))).collect(),
        ),
        other => {
            return Err(StoreError::record(format!(
                "unsupported DynamoDB attribute type: {other:?}"
            )));
        }
    })
}

pub fn from_item(item: Item) -> Result<Record, StoreError> {
    item.iter()
        .map(|(k, v)| Ok((k.clone(), from_attribute(v)?)))
        .collect()
}

/// `LastEvaluatedKey` → cursor record. Каждый атрибут ключа хранится
/// с тегом типа: `{"S": "..."}`, `{"N": "..."}`, `{"B": "<base64>"}`.
pub fn key_to_cursor(key: Item) -> Result<Record, StoreError> {
    key.into_iter()
        .map(|(name, value)| {
            let (tag, text) = match value {
                AttributeValue::S(s) => ("S", s),
                AttributeValue::N(n) => ("N", n),
                AttributeValue::B(blob) => ("B", encode_blob(blob.as_ref())),
                other => {
                    return Err(StoreError::record(format!(
                        "key attribute '{name}' has non-key type: {other:?}"
                    )));
                }
            };
            let mut tagged = Record::new();
            tagged.insert(tag.to_string(), Value::String(text));
            Ok((name, Value::Object(tagged)))
        })
        .collect()
}

/// Cursor record → `ExclusiveStartKey`, ровно тот ключ, что вернул store.
pub fn key_from_cursor(cursor: Record) -> Result<Item, StoreError> {
    cursor
        .into_iter()
        .map(|(name, value)| {
            let malformed = || StoreError::request(format!("malformed cursor attribute '{name}'"));
            let Value::Object(tagged) = value else {
                return Err(malformed());
            };
            if tagged.len() != 1 {
                return Err(malformed());
            }
            let attr = match tagged.iter().next() {
                Some((tag, Value::String(text))) => match tag.as_str() {
                    "S" => AttributeValue::S(text.clone()),
                    "N" => AttributeValue::N(text.clone()),
                    "B" => AttributeValue::B(Blob::new(
                        base64::engine::general_purpose::STANDARD
                            .decode(text)
                            .map_err(|_| malformed())?,
                    )),
                    _ => return Err(malformed()),
                },
                _ => return Err(malformed()),
            };
            Ok((name, attr))
        })
        .collect()
}

fn parse_number(n: &str) -> Result<Value, StoreError> {
    if let Ok(i) = n.parse::<i64>() {
        return Ok(Value::from(i));
    }
    if let Ok(u) = n.parse::<u64>() {
        return Ok(Value::from(u));
    }
    n.parse::<f64>()
        .ok()
        .and_then(serde_json::Number::from_f64)
        .map(Value::Number)
        .ok_or_else(|| StoreError::record(format!("invalid DynamoDB number '{n}'")))
}

fn encode_blob(bytes: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn nested_record_survives_conversion() {
        let record = table_api::record_from_value(json!({
            "vehicleInventoryId": "v-1",
            "windows": 3,
            "price": 1999.5,
            "canFly": false,
            "owner": null,
            "tags": ["red", 2],
            "cap": {"capId": 42, "registrationDate": "2020-01-01"}
        }))
        .unwrap();

        let item = to_item(&record);
        assert_eq!(item["windows"], AttributeValue::N("3".into()));
        assert_eq!(item["owner"], AttributeValue::Null(true));

        let back = from_item(item).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn sets_and_blobs_become_arrays_and_strings() {
        let mut item = Item::new();
        item.insert("ss".into(), AttributeValue::Ss(vec!["a".into(), "b".into()]));
        item.insert("ns".into(), AttributeValue::Ns(vec!["1".into(), "2.5".into()]));
        item.insert("b".into(), AttributeValue::B(Blob::new(b"hi".to_vec())));

        let record = from_item(item).unwrap();
        assert_eq!(record["ss"], json!(["a", "b"]));
        assert_eq!(record["ns"], json!([1, 2.5]));
        assert_eq!(record["b"], json!("aGk="));
    }

    #[test]
    fn pagination_key_survives_cursor_exactly() {
        let mut key = Item::new();
        key.insert("pk".into(), AttributeValue::B(Blob::new(vec![1, 2, 3])));
        key.insert("sk".into(), AttributeValue::S("v-1".into()));
        key.insert(
            "seq".into(),
            AttributeValue::N("12345678901234567890123456789012345678".into()),
        );

        let cursor = key_to_cursor(key.clone()).unwrap();
        assert_eq!(cursor["pk"], json!({"B": "AQID"}));
        assert_eq!(cursor["seq"], json!({"N": "12345678901234567890123456789012345678"}));

        assert_eq!(key_from_cursor(cursor).unwrap(), key);
    }

    #[test]
    fn malformed_cursor_is_request_error() {
        let cursor = table_api::record_from_value(json!({"pk": "plain"})).unwrap();
        let err = key_from_cursor(cursor).unwrap_err();
        assert_eq!(err.kind(), table_api::ErrorKind::Request);

        let cursor = table_api::record_from_value(json!({"pk": {"B": "%%%"}})).unwrap();
        assert!(key_from_cursor(cursor).is_err());
    }

    #[test]
    fn non_key_attribute_cannot_become_cursor() {
        let mut key = Item::new();
        key.insert("pk".into(), AttributeValue::Bool(true));
        assert!(key_to_cursor(key).is_err());
    }

    #[test]
    fn bad_number_is_record_error() {
        let err = from_attribute(&AttributeValue::N("twelve".into())).unwrap_err();
        assert_eq!(err.kind(), table_api::ErrorKind::Record);
    }
}
