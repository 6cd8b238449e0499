use crate::config::QueryArgs;
use crate::error::CliError;

pub async fn run(config_path: &str, args: QueryArgs) -> Result<(), CliError> {
    let value = if args.json {
        serde_json::from_str(&args.value).map_err(|e| CliError::Input {
            what: "value",
            detail: e.to_string(),
        })?
    } else {
        serde_json::Value::String(args.value)
    };

    let service = super::connect(config_path).await?;
    let records = if args.consistent {
        service.get_items_by_field_consistent(&args.field, value).await?
    } else {
        service.get_items_by_field(&args.field, value).await?
    };
    tracing::info!(field = %args.field, found = records.len(), "query done");
    super::write_records(&records)
}
