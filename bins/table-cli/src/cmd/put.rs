use table_api::record_from_value;

use crate::config::PutArgs;
use crate::error::CliError;

pub async fn run(config_path: &str, args: PutArgs) -> Result<(), CliError> {
    let value: serde_json::Value = serde_json::from_str(&args.item).map_err(|e| CliError::Input {
        what: "item",
        detail: e.to_string(),
    })?;
    let item = record_from_value(value)?;

    let service = super::connect(config_path).await?;
    service.put_item(item).await?;
    tracing::info!(table = %service.table(), "item written");
    Ok(())
}
