use table_api::Projection;

use crate::config::ScanArgs;
use crate::error::CliError;

pub async fn run(config_path: &str, args: ScanArgs) -> Result<(), CliError> {
    let projection = if args.columns.is_empty() {
        None
    } else {
        Some(Projection::new(args.columns)?)
    };

    let service = super::connect(config_path).await?;
    let records = match &args.distinct_by {
        Some(key_field) => service.get_all_distinct(key_field, projection.as_ref()).await?,
        None => service.get_all(projection.as_ref()).await?,
    };
    super::write_records(&records)
}
