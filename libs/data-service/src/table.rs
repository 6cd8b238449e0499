use crate::ServiceError;

/// Переменная окружения с deployment stage.
pub const STAGE_ENV: &str = "SERVERLESS_STAGE";

/// Физическое имя таблицы: логический prefix + deployment stage.
///
/// `Product_VehicleState_` + `dev` → `Product_VehicleState_dev`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableName {
    prefix: String,
    stage: String,
}

impl TableName {
    pub fn new(prefix: impl Into<String>, stage: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            stage: stage.into(),
        }
    }

    /// Явный stage побеждает окружение.
    pub fn resolve(prefix: impl Into<String>, stage: Option<&str>) -> Result<Self, ServiceError> {
        Self::resolve_with(prefix, stage, |key| std::env::var(key).ok())
    }

    pub(crate) fn resolve_with(
        prefix: impl Into<String>,
        stage: Option<&str>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ServiceError> {
        let stage = match stage {
            Some(s) => s.to_string(),
            None => lookup(STAGE_ENV).ok_or_else(|| {
                ServiceError::Config(format!("deployment stage not set (config 'stage' or ${STAGE_ENV})"))
            })?,
        };
        if stage.is_empty() {
            return Err(ServiceError::Config("deployment stage is empty".into()));
        }
        Ok(Self::new(prefix, stage))
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn stage(&self) -> &str {
        &self.stage
    }

    pub fn physical(&self) -> String {
        format!("{}{}", self.prefix, self.stage)
    }
}

impl std::fmt::Display for TableName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.prefix, self.stage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn composes_prefix_and_stage() {
        let name = TableName::new("Product_VehicleState_", "dev");
        assert_eq!(name.physical(), "Product_VehicleState_dev");
        assert_eq!(name.to_string(), "Product_VehicleState_dev");
    }

    #[test]
    fn stage_from_environment_lookup() {
        let name = TableName::resolve_with("vehicles_", None, |key| {
            (key == STAGE_ENV).then(|| "prod".to_string())
        })
        .unwrap();
        assert_eq!(name.physical(), "vehicles_prod");
    }

    #[test]
    fn explicit_stage_wins() {
        let name = TableName::resolve_with("vehicles_", Some("qa"), |_| Some("prod".into())).unwrap();
        assert_eq!(name.prefix(), "vehicles_");
        assert_eq!(name.stage(), "qa");
    }

    #[test]
    fn missing_stage_is_config_error() {
        let err = TableName::resolve_with("vehicles_", None, |_| None).unwrap_err();
        assert!(matches!(err, ServiceError::Config(_)));
    }
}
