use app_data::{Entity, Value};
use chrono::{DateTime, Utc};
use sqlx::FromRow;

pub const ID: &str = "id";
pub const LEGAL_NAME: &str = "legal_name";
pub const TAX_ID: &str = "tax_id";
pub const CUSTOMER_TYPE: &str = "customer_type";
pub const LEGAL_REPRESENTATIVE: &str = "legal_representative";
pub const CONTACT_EMAIL: &str = "contact_email";
pub const CONTACT_PHONE: &str = "contact_phone";
pub const ADDRESS: &str = "address";
pub const CITY: &str = "city";
pub const COUNTRY: &str = "country";
pub const WEBSITE: &str = "website";
pub const NOTES: &str = "notes";
pub const ACTIVE: &str = "active";
pub const REGISTERED_AT: &str = "registered_at";

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct Customer {
    pub id: i64,
    pub legal_name: String,
    pub tax_id: String,
    pub customer_type: String,
    pub legal_representative: String,
    pub contact_email: String,
    pub contact_phone: String,
    pub address: String,
    pub city: String,
    pub country: String,
    pub website: Option<String>,
    pub notes: Option<String>,
    pub active: bool,
    pub registered_at: DateTime<Utc>,
}

impl Customer {
    /// Idempotent DDL for `app.customers`.
    #[inline]
    pub fn create_table() -> &'static str {
        include_str!("../../../SQL/customer/create_table.sql")
    }
}

impl Entity for Customer {
    fn table_name() -> &'static str {
        "app.customers"
    }

    fn columns() -> &'static [&'static str] {
        &[
            LEGAL_NAME,
            TAX_ID,
            CUSTOMER_TYPE,
            LEGAL_REPRESENTATIVE,
            CONTACT_EMAIL,
            CONTACT_PHONE,
            ADDRESS,
            CITY,
            COUNTRY,
            WEBSITE,
            NOTES,
            ACTIVE,
            REGISTERED_AT,
        ]
    }

    fn immutable_columns() -> &'static [&'static str] {
        &[REGISTERED_AT]
    }

    fn unique_columns() -> &'static [&'static str] {
        &[TAX_ID, CONTACT_EMAIL]
    }

    fn id(&self) -> i64 {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = id;
    }

    fn values(&self) -> Vec<Value> {
        vec![
            Value::from(&self.legal_name),
            Value::from(&self.tax_id),
            Value::from(&self.customer_type),
            Value::from(&self.legal_representative),
            Value::from(&self.contact_email),
            Value::from(&self.contact_phone),
            Value::from(&self.address),
            Value::from(&self.city),
            Value::from(&self.country),
            Value::from(self.website.clone()),
            Value::from(self.notes.clone()),
            Value::from(self.active),
            Value::from(self.registered_at),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_follow_column_order() {
        let customer = Customer {
            id: 4,
            legal_name: "Acme SA".into(),
            tax_id: "TX-1".into(),
            customer_type: "Legal".into(),
            legal_representative: "Ana Ruiz".into(),
            contact_email: "ops@acme.test".into(),
            contact_phone: "555-0100".into(),
            address: "1 Main St".into(),
            city: "Lima".into(),
            country: "Peru".into(),
            website: None,
            notes: Some("vip".into()),
            active: true,
            registered_at: Utc::now(),
        };
        assert_eq!(Customer::columns().len(), customer.values().len());
        assert_eq!(customer.value(TAX_ID), Some(Value::from("TX-1")));
        assert_eq!(customer.value(WEBSITE), Some(Value::Null));
        assert_eq!(customer.value(ID), Some(Value::Int(4)));
    }

    #[test]
    fn ddl_declares_unique_constraints() {
        let ddl = Customer::create_table();
        assert!(ddl.contains("UNIQUE (tax_id)"));
        assert!(ddl.contains("UNIQUE (contact_email)"));
    }
}
