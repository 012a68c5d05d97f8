use app_data::{DataError, Filter, Record, Repository};
use app_schema::customer::{
    ACTIVE, CITY, CONTACT_EMAIL, COUNTRY, CUSTOMER_TYPE, Customer, LEGAL_NAME, REGISTERED_AT,
    TAX_ID,
};
use chrono::{DateTime, Utc};
use std::future::Future;

/// Customer lookups, each one a single-predicate read over the session.
///
/// Every `Repository<Customer>` gets these for free.
pub trait CustomerRepository: Repository<Customer> {
    fn find_by_tax_id(
        &mut self,
        tax_id: &str,
    ) -> impl Future<Output = Result<Option<Customer>, DataError>> + Send {
        let filter = Filter::eq(TAX_ID, tax_id);
        async move { Ok(self.get_one(Some(filter), false).await?.map(Record::into_inner)) }
    }

    fn find_by_email(
        &mut self,
        email: &str,
    ) -> impl Future<Output = Result<Option<Customer>, DataError>> + Send {
        let filter = Filter::eq(CONTACT_EMAIL, email);
        async move { Ok(self.get_one(Some(filter), false).await?.map(Record::into_inner)) }
    }

    fn find_by_city(
        &mut self,
        city: &str,
    ) -> impl Future<Output = Result<Vec<Customer>, DataError>> + Send {
        self.get_all(Some(Filter::eq(CITY, city)))
    }

    fn find_by_country(
        &mut self,
        country: &str,
    ) -> impl Future<Output = Result<Vec<Customer>, DataError>> + Send {
        self.get_all(Some(Filter::eq(COUNTRY, country)))
    }

    fn find_by_type(
        &mut self,
        customer_type: &str,
    ) -> impl Future<Output = Result<Vec<Customer>, DataError>> + Send {
        self.get_all(Some(Filter::eq(CUSTOMER_TYPE, customer_type)))
    }

    fn find_active(&mut self) -> impl Future<Output = Result<Vec<Customer>, DataError>> + Send {
        self.get_all(Some(Filter::eq(ACTIVE, true)))
    }

    /// Case-sensitive substring match on the legal name.
    fn search_by_legal_name(
        &mut self,
        fragment: &str,
    ) -> impl Future<Output = Result<Vec<Customer>, DataError>> + Send {
        self.get_all(Some(Filter::contains(LEGAL_NAME, fragment)))
    }

    /// Inclusive on both bounds.
    fn find_registered_between(
        &mut self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> impl Future<Output = Result<Vec<Customer>, DataError>> + Send {
        self.get_all(Some(Filter::between(REGISTERED_AT, from, to)))
    }

    fn exists_by_tax_id(
        &mut self,
        tax_id: &str,
    ) -> impl Future<Output = Result<bool, DataError>> + Send {
        self.exists(Filter::eq(TAX_ID, tax_id))
    }

    fn exists_by_email(
        &mut self,
        email: &str,
    ) -> impl Future<Output = Result<bool, DataError>> + Send {
        self.exists(Filter::eq(CONTACT_EMAIL, email))
    }
}

impl<R: Repository<Customer>> CustomerRepository for R {}
