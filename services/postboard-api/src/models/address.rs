use std::fmt;

use postboard::repository::{Entity, FilterValue, Metadata, SqlEntity};

/// Postal address owned by exactly one account
#[derive(Debug, Clone, Default, PartialEq, sqlx::FromRow)]
pub struct Address {
    #[sqlx(flatten)]
    pub metadata: Metadata,
    pub account_id: String,
    pub street: String,
    pub city: String,
    pub state: String,
    pub zipcode: String,
}

impl Address {
    pub fn new(
        street: impl Into<String>,
        city: impl Into<String>,
        state: impl Into<String>,
        zipcode: impl Into<String>,
    ) -> Self {
        Self {
            street: street.into(),
            city: city.into(),
            state: state.into(),
            zipcode: zipcode.into(),
            ..Self::default()
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}, {}, {}", self.street, self.city, self.state, self.zipcode)
    }
}

impl Entity for Address {
    const NAME: &'static str = "Address";

    fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    fn metadata_mut(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

impl SqlEntity for Address {
    const TABLE: &'static str = "addresses";
    const COLUMNS: &'static [&'static str] = &["account_id", "street", "city", "state", "zipcode"];

    fn values(&self) -> Vec<FilterValue> {
        vec![
            self.account_id.clone().into(),
            self.street.clone().into(),
            self.city.clone().into(),
            self.state.clone().into(),
            self.zipcode.clone().into(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_joins_fields() {
        let address = Address::new("1 Main St", "Springfield", "IL", "62701");
        assert_eq!(address.to_string(), "1 Main St, Springfield, IL, 62701");
    }

    #[test]
    fn test_values_follow_columns() {
        let mut address = Address::new("a", "b", "c", "d");
        address.account_id = "acct".into();
        assert_eq!(address.values().len(), Address::COLUMNS.len());
        assert_eq!(address.values()[0], FilterValue::String("acct".into()));
    }
}
