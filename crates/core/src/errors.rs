use thiserror::Error;

use crate::config::ConfigError;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("purchase record is missing an item name")]
    MissingItemName,
    #[error("purchase record for `{item}` has no purchase date")]
    MissingPurchaseDate { item: String },
    #[error("purchase record for `{item}` has an unparsable purchase date `{value}`")]
    MalformedPurchaseDate { item: String, value: String },
    #[error("purchase record for `{item}` has a zero quantity")]
    ZeroQuantity { item: String },
    #[error("purchase record for `{item}` has a negative price `{price}`")]
    NegativePrice { item: String, price: String },
}

impl DomainError {
    /// Short machine-readable reason, used in ingest reports and log fields.
    pub fn reason_code(&self) -> &'static str {
        match self {
            Self::MissingItemName => "missing_name",
            Self::MissingPurchaseDate { .. } => "missing_date",
            Self::MalformedPurchaseDate { .. } => "malformed_date",
            Self::ZeroQuantity { .. } => "zero_quantity",
            Self::NegativePrice { .. } => "negative_price",
        }
    }
}

#[derive(Debug, Error)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Configuration(#[from] ConfigError),
    #[error("input failure: {0}")]
    Input(String),
    #[error("output failure: {0}")]
    Output(String),
}

impl ApplicationError {
    /// Stable class used by operator tooling to bucket failures.
    pub fn error_class(&self) -> &'static str {
        match self {
            Self::Domain(_) => "domain_validation",
            Self::Configuration(_) => "config_validation",
            Self::Input(_) => "input",
            Self::Output(_) => "output",
        }
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Configuration(_) => 2,
            Self::Domain(_) | Self::Input(_) => 3,
            Self::Output(_) => 4,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::config::ConfigError;
    use crate::errors::{ApplicationError, DomainError};

    #[test]
    fn domain_errors_expose_stable_reason_codes() {
        assert_eq!(DomainError::MissingItemName.reason_code(), "missing_name");
        assert_eq!(
            DomainError::MalformedPurchaseDate { item: "milk".into(), value: "soon".into() }
                .reason_code(),
            "malformed_date"
        );
    }

    #[test]
    fn configuration_error_maps_to_config_class_and_exit_code() {
        let error = ApplicationError::from(ConfigError::Validation("bad".to_owned()));

        assert_eq!(error.error_class(), "config_validation");
        assert_eq!(error.exit_code(), 2);
    }

    #[test]
    fn domain_error_maps_to_input_exit_code() {
        let error = ApplicationError::from(DomainError::MissingItemName);

        assert_eq!(error.error_class(), "domain_validation");
        assert_eq!(error.exit_code(), 3);
        assert_eq!(error.to_string(), "purchase record is missing an item name");
    }
}
