use app_data::Projection;
use app_schema::customer::{CONTACT_EMAIL, Customer, ID, LEGAL_NAME};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::{Validate, ValidationError};

/// Customer as exchanged with clients.
///
/// Every field has a serde default so a partial body reaches validation and
/// reports one error per missing field instead of failing to parse.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase", default)]
pub struct CustomerDto {
    pub id: i64,
    #[validate(
        custom(function = "not_blank", message = "Legal name is required"),
        length(max = 150, message = "Legal name is limited to 150 characters")
    )]
    pub legal_name: String,
    #[validate(
        custom(function = "not_blank", message = "Tax id is required"),
        length(max = 50, message = "Tax id is limited to 50 characters")
    )]
    pub tax_id: String,
    #[validate(
        custom(function = "not_blank", message = "Customer type is required"),
        length(max = 50, message = "Customer type is limited to 50 characters")
    )]
    pub customer_type: String,
    #[validate(
        custom(function = "not_blank", message = "Legal representative is required"),
        length(max = 150, message = "Legal representative is limited to 150 characters")
    )]
    pub legal_representative: String,
    #[validate(
        email(message = "Contact email is not a valid address"),
        length(max = 150, message = "Contact email is limited to 150 characters")
    )]
    pub contact_email: String,
    #[validate(
        custom(function = "not_blank", message = "Contact phone is required"),
        length(max = 50, message = "Contact phone is limited to 50 characters")
    )]
    pub contact_phone: String,
    #[validate(
        custom(function = "not_blank", message = "Address is required"),
        length(max = 250, message = "Address is limited to 250 characters")
    )]
    pub address: String,
    #[validate(
        custom(function = "not_blank", message = "City is required"),
        length(max = 100, message = "City is limited to 100 characters")
    )]
    pub city: String,
    #[validate(
        custom(function = "not_blank", message = "Country is required"),
        length(max = 100, message = "Country is limited to 100 characters")
    )]
    pub country: String,
    #[validate(length(max = 200, message = "Website is limited to 200 characters"))]
    pub website: Option<String>,
    pub notes: Option<String>,
    pub active: bool,
    pub registered_at: Option<DateTime<Utc>>,
}

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_ref()
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
}

impl CustomerDto {
    /// New entity for insertion; the key is left for storage to assign.
    pub fn to_entity(&self, registered_at: DateTime<Utc>) -> Customer {
        let mut customer = Customer {
            id: 0,
            legal_name: String::new(),
            tax_id: String::new(),
            customer_type: String::new(),
            legal_representative: String::new(),
            contact_email: String::new(),
            contact_phone: String::new(),
            address: String::new(),
            city: String::new(),
            country: String::new(),
            website: None,
            notes: None,
            active: false,
            registered_at,
        };
        self.apply_to(&mut customer);
        customer
    }

    /// Copies the editable fields onto `customer`; `id` and `registered_at`
    /// are left alone.
    pub fn apply_to(&self, customer: &mut Customer) {
        customer.legal_name = self.legal_name.clone();
        customer.tax_id = self.tax_id.clone();
        customer.customer_type = self.customer_type.clone();
        customer.legal_representative = self.legal_representative.clone();
        customer.contact_email = self.contact_email.clone();
        customer.contact_phone = self.contact_phone.clone();
        customer.address = self.address.clone();
        customer.city = self.city.clone();
        customer.country = self.country.clone();
        customer.website = non_blank(&self.website);
        customer.notes = non_blank(&self.notes);
        customer.active = self.active;
    }

    /// Echo of a request carrying the server-assigned values.
    pub fn assigned(mut self, id: i64, registered_at: DateTime<Utc>) -> Self {
        self.id = id;
        self.registered_at = Some(registered_at);
        self
    }
}

impl From<Customer> for CustomerDto {
    fn from(customer: Customer) -> Self {
        Self {
            id: customer.id,
            legal_name: customer.legal_name,
            tax_id: customer.tax_id,
            customer_type: customer.customer_type,
            legal_representative: customer.legal_representative,
            contact_email: customer.contact_email,
            contact_phone: customer.contact_phone,
            address: customer.address,
            city: customer.city,
            country: customer.country,
            website: customer.website,
            notes: customer.notes,
            active: customer.active,
            registered_at: Some(customer.registered_at),
        }
    }
}

/// Reduced read-only view of a customer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CustomerSummary {
    pub id: i64,
    pub legal_name: String,
    pub contact_email: String,
}

impl Projection<Customer> for CustomerSummary {
    fn columns() -> &'static [&'static str] {
        &[ID, LEGAL_NAME, CONTACT_EMAIL]
    }

    fn project(customer: &Customer) -> Self {
        Self {
            id: customer.id,
            legal_name: customer.legal_name.clone(),
            contact_email: customer.contact_email.clone(),
        }
    }
}

/// Optional criteria combined with AND by the search endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerSearch {
    pub legal_name: Option<String>,
    pub tax_id: Option<String>,
    pub contact_email: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub customer_type: Option<String>,
    pub active: Option<bool>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NameQuery {
    #[serde(default)]
    pub q: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegisteredRange {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxIdCheck {
    pub tax_id: String,
    pub exclude_id: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailCheck {
    pub email: String,
    pub exclude_id: Option<i64>,
}
