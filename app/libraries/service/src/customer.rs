use app_data::{DataError, Filter, Order, Repository};
use app_dto::{
    customer::{CustomerDto, CustomerSearch, CustomerSummary},
    response::{ApiResponse, ResponseCode, validation_messages},
};
use app_error::AppError;
use app_repository::CustomerRepository;
use app_schema::customer::{
    ACTIVE, CITY, CONTACT_EMAIL, COUNTRY, CUSTOMER_TYPE, Customer, ID, LEGAL_NAME, REGISTERED_AT,
    TAX_ID,
};
use chrono::{DateTime, SubsecRound, Utc};
use futures::{StreamExt, stream::BoxStream};
use tracing::*;
use validator::Validate;

type Outcome<T> = Result<ApiResponse<T>, AppError>;

const NOT_FOUND: &str = "Customer not found";
const INVALID_DATA: &str = "Invalid customer data";
const INVALID_RANGE: &str = "The start date must not be after the end date";
const DUPLICATE_TAX_ID: &str = "A customer with this tax id already exists";
const DUPLICATE_EMAIL: &str = "A customer with this email already exists";
const OTHER_TAX_ID: &str = "Another customer already uses this tax id";
const OTHER_EMAIL: &str = "Another customer already uses this email";

/// Customer use cases over one data-access session.
///
/// User-facing outcomes (validation, missing rows, storage faults) are
/// envelopes; `Err` only carries programming faults such as committing
/// without a transaction.
pub struct CustomerService<R> {
    repo: R,
    trace_id: Option<String>,
}

impl<R: Repository<Customer>> CustomerService<R> {
    pub fn new(repo: R) -> Self {
        Self {
            repo,
            trace_id: None,
        }
    }

    /// Stamps every envelope produced by this service with `trace_id`.
    pub fn with_trace_id(mut self, trace_id: Option<String>) -> Self {
        self.trace_id = trace_id;
        self
    }

    fn respond<T>(&self, response: ApiResponse<T>) -> Outcome<T> {
        Ok(response.traced(self.trace_id.clone()))
    }

    fn fault<T>(&self, message: &str, err: DataError) -> Outcome<T> {
        if err.is_invalid_state() {
            error!("{message}: {err}");
            return Err(err.into());
        }
        warn!("{message}: {err}");
        self.respond(
            ApiResponse::error(ResponseCode::InternalServerError, message)
                .with_errors(vec![err.to_string()]),
        )
    }

    fn listed(
        &self,
        rows: Result<Vec<Customer>, DataError>,
        message: &str,
        failure: &str,
    ) -> Outcome<Vec<CustomerDto>> {
        match rows {
            Ok(rows) => {
                debug!("{} customers", rows.len());
                let data = rows.into_iter().map(CustomerDto::from).collect();
                self.respond(ApiResponse::success(data, message))
            }
            Err(e) => self.fault(failure, e),
        }
    }

    fn found(
        &self,
        row: Result<Option<Customer>, DataError>,
        message: &str,
        failure: &str,
    ) -> Outcome<CustomerDto> {
        match row {
            Ok(Some(customer)) => {
                self.respond(ApiResponse::success(CustomerDto::from(customer), message))
            }
            Ok(None) => self.respond(ApiResponse::not_found(NOT_FOUND)),
            Err(e) => self.fault(failure, e),
        }
    }

    fn invalid<T>(&self, dto: &CustomerDto) -> Option<Outcome<T>> {
        dto.validate().err().map(|errors| {
            self.respond(ApiResponse::bad_request(INVALID_DATA).with_errors(validation_messages(&errors)))
        })
    }

    /// Commits a successful outcome, rolls back anything else.
    async fn finish<T>(
        &mut self,
        outcome: Result<ApiResponse<T>, DataError>,
        failure: &str,
    ) -> Outcome<T> {
        match outcome {
            Ok(response) if response.is_success => match self.repo.commit().await {
                Ok(()) => self.respond(response),
                Err(e) => {
                    self.discard().await;
                    self.fault(failure, e)
                }
            },
            Ok(response) => {
                self.discard().await;
                self.respond(response)
            }
            Err(e) => {
                self.discard().await;
                self.fault(failure, e)
            }
        }
    }

    async fn discard(&mut self) {
        if self.repo.in_transaction() {
            if let Err(e) = self.repo.rollback().await {
                warn!("rollback failed: {e}");
            }
        }
    }

    pub async fn create(&mut self, dto: CustomerDto) -> Outcome<CustomerDto> {
        const FAILURE: &str = "Error creating the customer";
        if let Some(rejected) = self.invalid(&dto) {
            return rejected;
        }
        if let Err(e) = self.repo.begin_transaction().await {
            return self.fault(FAILURE, e);
        }
        let outcome = self.insert(dto).await;
        self.finish(outcome, FAILURE).await
    }

    async fn insert(&mut self, dto: CustomerDto) -> Result<ApiResponse<CustomerDto>, DataError> {
        if self.repo.exists_by_tax_id(&dto.tax_id).await? {
            return Ok(ApiResponse::bad_request(DUPLICATE_TAX_ID));
        }
        if self.repo.exists_by_email(&dto.contact_email).await? {
            return Ok(ApiResponse::bad_request(DUPLICATE_EMAIL));
        }
        let created = self
            .repo
            .create(dto.to_entity(Utc::now().trunc_subsecs(6)))
            .await?;
        info!("customer #{} created", created.id);
        Ok(ApiResponse::success(
            dto.assigned(created.id, created.registered_at),
            "Customer created successfully",
        ))
    }

    pub async fn list(&mut self) -> Outcome<Vec<CustomerDto>> {
        let query = self.repo.query(false).order_by(ID, Order::Asc);
        let rows: Result<Vec<Customer>, DataError> = self
            .repo
            .fetch(query)
            .await
            .map(|records| records.into_iter().map(|r| r.into_inner()).collect());
        self.listed(rows, "Customers retrieved successfully", "Error retrieving customers")
    }

    pub async fn get_by_id(&mut self, id: i64) -> Outcome<CustomerDto> {
        let row = self
            .repo
            .get_one(Some(Filter::eq(ID, id)), false)
            .await
            .map(|found| found.map(|r| r.into_inner()));
        self.found(row, "Customer retrieved successfully", "Error retrieving the customer")
    }

    /// Applies `dto` to customer `id` through a tracked read; the key and
    /// the registration date are never written.
    pub async fn update(&mut self, id: i64, dto: CustomerDto) -> Outcome<CustomerDto> {
        const FAILURE: &str = "Error updating the customer";
        if let Some(rejected) = self.invalid(&dto) {
            return rejected;
        }
        if let Err(e) = self.repo.begin_transaction().await {
            return self.fault(FAILURE, e);
        }
        let outcome = self.modify(id, dto).await;
        self.finish(outcome, FAILURE).await
    }

    async fn modify(
        &mut self,
        id: i64,
        dto: CustomerDto,
    ) -> Result<ApiResponse<CustomerDto>, DataError> {
        let Some(record) = self.repo.get_one(Some(Filter::eq(ID, id)), true).await? else {
            return Ok(ApiResponse::not_found(NOT_FOUND));
        };
        let owner = self.repo.find_by_tax_id(&dto.tax_id).await?;
        if owner.is_some_and(|other| other.id != id) {
            return Ok(ApiResponse::bad_request(OTHER_TAX_ID));
        }
        let owner = self.repo.find_by_email(&dto.contact_email).await?;
        if owner.is_some_and(|other| other.id != id) {
            return Ok(ApiResponse::bad_request(OTHER_EMAIL));
        }
        record.update(|customer| dto.apply_to(customer));
        let written = self.repo.save().await?;
        debug!("customer #{id}: {written} row(s) written");
        let registered_at = record.get().registered_at;
        Ok(ApiResponse::success(
            dto.assigned(id, registered_at),
            "Customer updated successfully",
        ))
    }

    pub async fn delete(&mut self, id: i64) -> Outcome<bool> {
        const FAILURE: &str = "Error deleting the customer";
        let found = match self.repo.get_one(Some(Filter::eq(ID, id)), false).await {
            Ok(found) => found,
            Err(e) => return self.fault(FAILURE, e),
        };
        let Some(record) = found else {
            return self.respond(ApiResponse::not_found(NOT_FOUND));
        };
        match self.repo.remove(&record.get()).await {
            Ok(()) => {
                info!("customer #{id} deleted");
                self.respond(ApiResponse::success(true, "Customer deleted successfully"))
            }
            Err(e) => self.fault(FAILURE, e),
        }
    }

    pub async fn summary(&mut self, id: i64) -> Outcome<CustomerSummary> {
        match self
            .repo
            .get_projected::<CustomerSummary>(Filter::eq(ID, id))
            .await
        {
            Ok(Some(summary)) => self.respond(ApiResponse::success(
                summary,
                "Customer retrieved successfully",
            )),
            Ok(None) => self.respond(ApiResponse::not_found(NOT_FOUND)),
            Err(e) => self.fault("Error retrieving the customer", e),
        }
    }

    pub async fn summaries(&mut self) -> Outcome<Vec<CustomerSummary>> {
        match self.repo.get_all_projected::<CustomerSummary>(None).await {
            Ok(mut summaries) => {
                summaries.sort_by_key(|s| s.id);
                self.respond(ApiResponse::success(
                    summaries,
                    "Customers retrieved successfully",
                ))
            }
            Err(e) => self.fault("Error retrieving customers", e),
        }
    }

    pub async fn by_tax_id(&mut self, tax_id: &str) -> Outcome<CustomerDto> {
        let row = self.repo.find_by_tax_id(tax_id).await;
        self.found(row, "Customer retrieved successfully", "Error retrieving the customer")
    }

    pub async fn by_email(&mut self, email: &str) -> Outcome<CustomerDto> {
        let row = self.repo.find_by_email(email).await;
        self.found(row, "Customer retrieved successfully", "Error retrieving the customer")
    }

    pub async fn active(&mut self) -> Outcome<Vec<CustomerDto>> {
        let rows = self.repo.find_active().await;
        self.listed(
            rows,
            "Active customers retrieved successfully",
            "Error retrieving active customers",
        )
    }

    pub async fn by_city(&mut self, city: &str) -> Outcome<Vec<CustomerDto>> {
        let rows = self.repo.find_by_city(city).await;
        self.listed(
            rows,
            "Customers retrieved successfully",
            "Error retrieving customers by city",
        )
    }

    pub async fn by_country(&mut self, country: &str) -> Outcome<Vec<CustomerDto>> {
        let rows = self.repo.find_by_country(country).await;
        self.listed(
            rows,
            "Customers retrieved successfully",
            "Error retrieving customers by country",
        )
    }

    pub async fn by_type(&mut self, customer_type: &str) -> Outcome<Vec<CustomerDto>> {
        let rows = self.repo.find_by_type(customer_type).await;
        self.listed(
            rows,
            "Customers retrieved successfully",
            "Error retrieving customers by type",
        )
    }

    pub async fn search_by_name(&mut self, fragment: &str) -> Outcome<Vec<CustomerDto>> {
        let rows = self.repo.search_by_legal_name(fragment).await;
        self.listed(rows, "Customers retrieved successfully", "Error searching customers")
    }

    pub async fn by_registration_range(
        &mut self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Outcome<Vec<CustomerDto>> {
        if from > to {
            return self.respond(ApiResponse::bad_request(INVALID_RANGE));
        }
        let rows = self.repo.find_registered_between(from, to).await;
        self.listed(
            rows,
            "Customers retrieved successfully",
            "Error retrieving customers by registration date",
        )
    }

    /// Conjunction of whichever criteria are present, ordered by id.
    pub async fn search(&mut self, criteria: CustomerSearch) -> Outcome<Vec<CustomerDto>> {
        if let (Some(from), Some(to)) = (criteria.from, criteria.to) {
            if from > to {
                return self.respond(ApiResponse::bad_request(INVALID_RANGE));
            }
        }
        let mut query = self.repo.query(false).order_by(ID, Order::Asc);
        for filter in search_filters(criteria) {
            query = query.filter(filter);
        }
        let rows: Result<Vec<Customer>, DataError> = self
            .repo
            .fetch(query)
            .await
            .map(|records| records.into_iter().map(|r| r.into_inner()).collect());
        self.listed(rows, "Customers retrieved successfully", "Error searching customers")
    }

    /// `true` when `tax_id` is free or already belongs to `exclude_id`.
    pub async fn validate_tax_id(&mut self, tax_id: &str, exclude_id: Option<i64>) -> Outcome<bool> {
        match self.repo.find_by_tax_id(tax_id).await {
            Ok(owner) if available(owner.as_ref(), exclude_id) => {
                self.respond(ApiResponse::success(true, "Tax id available"))
            }
            Ok(_) => self.respond(ApiResponse::success(false, "Tax id already registered")),
            Err(e) => self.fault("Error validating the tax id", e),
        }
    }

    pub async fn validate_email(&mut self, email: &str, exclude_id: Option<i64>) -> Outcome<bool> {
        match self.repo.find_by_email(email).await {
            Ok(owner) if available(owner.as_ref(), exclude_id) => {
                self.respond(ApiResponse::success(true, "Email available"))
            }
            Ok(_) => self.respond(ApiResponse::success(false, "Email already registered")),
            Err(e) => self.fault("Error validating the email", e),
        }
    }
}

impl<R: Repository<Customer> + 'static> CustomerService<R> {
    /// Every customer as a lazy stream; the service is consumed since the
    /// stream owns its session.
    pub fn export(mut self) -> BoxStream<'static, Result<CustomerDto, DataError>> {
        Box::pin(async_stream::stream! {
            let mut rows = self.repo.stream(None);
            while let Some(row) = rows.next().await {
                let item: Result<CustomerDto, DataError> = row.map(CustomerDto::from);
                yield item;
            }
        })
    }
}

fn available(owner: Option<&Customer>, exclude_id: Option<i64>) -> bool {
    match owner {
        None => true,
        Some(owner) => exclude_id == Some(owner.id),
    }
}

fn search_filters(criteria: CustomerSearch) -> Vec<Filter> {
    let mut filters = Vec::new();
    if let Some(name) = criteria.legal_name {
        filters.push(Filter::contains(LEGAL_NAME, name));
    }
    let exact = [
        (TAX_ID, criteria.tax_id),
        (CONTACT_EMAIL, criteria.contact_email),
        (CITY, criteria.city),
        (COUNTRY, criteria.country),
        (CUSTOMER_TYPE, criteria.customer_type),
    ];
    for (column, value) in exact {
        if let Some(value) = value {
            filters.push(Filter::eq(column, value));
        }
    }
    if let Some(active) = criteria.active {
        filters.push(Filter::eq(ACTIVE, active));
    }
    if criteria.from.is_some() || criteria.to.is_some() {
        filters.push(Filter::range(
            REGISTERED_AT,
            criteria.from.map(Into::into),
            criteria.to.map(Into::into),
        ));
    }
    filters
}
