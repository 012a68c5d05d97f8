use crate::trace::TraceId;
use app_data::{DataError, Storage};
use app_dto::{
    customer::{
        CustomerDto, CustomerSearch, CustomerSummary, EmailCheck, NameQuery, RegisteredRange,
        TaxIdCheck,
    },
    response::ApiResponse,
};
use app_error::AppError;
use app_schema::customer::Customer;
use app_service::CustomerService;
use app_state::AppState;
use askama::Template;
use axum::{
    body::Body,
    extract::{
        Json, Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::header,
    response::{Html, IntoResponse, Response},
};
use futures::StreamExt;
use std::{fmt::Display, sync::Arc};
use tracing::*;

type Reply<T> = Result<ApiResponse<T>, AppError>;

#[derive(Template)]
#[template(path = "customer.html")]
struct CustomerPage;

pub async fn get_customer() -> Result<Html<String>, AppError> {
    let page = CustomerPage;
    Ok(Html(page.render()?))
}

fn service<S: Storage<Customer>>(
    state: &AppState<S>,
    trace_id: Option<String>,
) -> CustomerService<S::Session> {
    CustomerService::new(state.store.session()).with_trace_id(trace_id)
}

fn no_data<T>(trace_id: Option<String>, rejection: impl Display) -> Reply<T> {
    debug!("{rejection}");
    Ok(ApiResponse::bad_request("No data received").traced(trace_id))
}

/// An absent body is "No data received"; a body that does not parse into the
/// DTO is an invalid request.
fn rejected_body<T>(trace_id: Option<String>, rejection: JsonRejection) -> Reply<T> {
    match rejection {
        JsonRejection::JsonDataError(_) | JsonRejection::JsonSyntaxError(_) => {
            invalid_request(trace_id, rejection)
        }
        _ => no_data(trace_id, rejection),
    }
}

fn invalid_request<T>(trace_id: Option<String>, rejection: impl Display) -> Reply<T> {
    debug!("{rejection}");
    Ok(ApiResponse::bad_request("Invalid request").traced(trace_id))
}

pub async fn list_customers<S: Storage<Customer>>(
    State(state): State<Arc<AppState<S>>>,
    TraceId(trace_id): TraceId,
) -> Reply<Vec<CustomerDto>> {
    service(&state, trace_id).list().await
}

pub async fn create_customer<S: Storage<Customer>>(
    State(state): State<Arc<AppState<S>>>,
    TraceId(trace_id): TraceId,
    payload: Result<Json<CustomerDto>, JsonRejection>,
) -> Reply<CustomerDto> {
    match payload {
        Ok(Json(dto)) => service(&state, trace_id).create(dto).await,
        Err(e) => rejected_body(trace_id, e),
    }
}

pub async fn get_customer_by_id<S: Storage<Customer>>(
    State(state): State<Arc<AppState<S>>>,
    TraceId(trace_id): TraceId,
    id: Result<Path<i64>, PathRejection>,
) -> Reply<CustomerDto> {
    match id {
        Ok(Path(id)) => service(&state, trace_id).get_by_id(id).await,
        Err(e) => invalid_request(trace_id, e),
    }
}

pub async fn update_customer<S: Storage<Customer>>(
    State(state): State<Arc<AppState<S>>>,
    TraceId(trace_id): TraceId,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<CustomerDto>, JsonRejection>,
) -> Reply<CustomerDto> {
    let Path(id) = match id {
        Ok(id) => id,
        Err(e) => return invalid_request(trace_id, e),
    };
    match payload {
        Ok(Json(dto)) => service(&state, trace_id).update(id, dto).await,
        Err(e) => rejected_body(trace_id, e),
    }
}

pub async fn delete_customer<S: Storage<Customer>>(
    State(state): State<Arc<AppState<S>>>,
    TraceId(trace_id): TraceId,
    id: Result<Path<i64>, PathRejection>,
) -> Reply<bool> {
    match id {
        Ok(Path(id)) => service(&state, trace_id).delete(id).await,
        Err(e) => invalid_request(trace_id, e),
    }
}

pub async fn get_customer_summary<S: Storage<Customer>>(
    State(state): State<Arc<AppState<S>>>,
    TraceId(trace_id): TraceId,
    id: Result<Path<i64>, PathRejection>,
) -> Reply<CustomerSummary> {
    match id {
        Ok(Path(id)) => service(&state, trace_id).summary(id).await,
        Err(e) => invalid_request(trace_id, e),
    }
}

pub async fn list_customer_summaries<S: Storage<Customer>>(
    State(state): State<Arc<AppState<S>>>,
    TraceId(trace_id): TraceId,
) -> Reply<Vec<CustomerSummary>> {
    service(&state, trace_id).summaries().await
}

pub async fn list_active_customers<S: Storage<Customer>>(
    State(state): State<Arc<AppState<S>>>,
    TraceId(trace_id): TraceId,
) -> Reply<Vec<CustomerDto>> {
    service(&state, trace_id).active().await
}

pub async fn search_customers<S: Storage<Customer>>(
    State(state): State<Arc<AppState<S>>>,
    TraceId(trace_id): TraceId,
    criteria: Result<Query<CustomerSearch>, QueryRejection>,
) -> Reply<Vec<CustomerDto>> {
    match criteria {
        Ok(Query(criteria)) => service(&state, trace_id).search(criteria).await,
        Err(e) => invalid_request(trace_id, e),
    }
}

pub async fn get_customer_by_tax_id<S: Storage<Customer>>(
    State(state): State<Arc<AppState<S>>>,
    TraceId(trace_id): TraceId,
    tax_id: Result<Path<String>, PathRejection>,
) -> Reply<CustomerDto> {
    match tax_id {
        Ok(Path(tax_id)) => service(&state, trace_id).by_tax_id(&tax_id).await,
        Err(e) => invalid_request(trace_id, e),
    }
}

pub async fn get_customer_by_email<S: Storage<Customer>>(
    State(state): State<Arc<AppState<S>>>,
    TraceId(trace_id): TraceId,
    email: Result<Path<String>, PathRejection>,
) -> Reply<CustomerDto> {
    match email {
        Ok(Path(email)) => service(&state, trace_id).by_email(&email).await,
        Err(e) => invalid_request(trace_id, e),
    }
}

pub async fn list_customers_by_city<S: Storage<Customer>>(
    State(state): State<Arc<AppState<S>>>,
    TraceId(trace_id): TraceId,
    city: Result<Path<String>, PathRejection>,
) -> Reply<Vec<CustomerDto>> {
    match city {
        Ok(Path(city)) => service(&state, trace_id).by_city(&city).await,
        Err(e) => invalid_request(trace_id, e),
    }
}

pub async fn list_customers_by_country<S: Storage<Customer>>(
    State(state): State<Arc<AppState<S>>>,
    TraceId(trace_id): TraceId,
    country: Result<Path<String>, PathRejection>,
) -> Reply<Vec<CustomerDto>> {
    match country {
        Ok(Path(country)) => service(&state, trace_id).by_country(&country).await,
        Err(e) => invalid_request(trace_id, e),
    }
}

pub async fn list_customers_by_type<S: Storage<Customer>>(
    State(state): State<Arc<AppState<S>>>,
    TraceId(trace_id): TraceId,
    customer_type: Result<Path<String>, PathRejection>,
) -> Reply<Vec<CustomerDto>> {
    match customer_type {
        Ok(Path(customer_type)) => service(&state, trace_id).by_type(&customer_type).await,
        Err(e) => invalid_request(trace_id, e),
    }
}

pub async fn search_customers_by_name<S: Storage<Customer>>(
    State(state): State<Arc<AppState<S>>>,
    TraceId(trace_id): TraceId,
    name: Result<Query<NameQuery>, QueryRejection>,
) -> Reply<Vec<CustomerDto>> {
    match name {
        Ok(Query(name)) => service(&state, trace_id).search_by_name(&name.q).await,
        Err(e) => invalid_request(trace_id, e),
    }
}

pub async fn list_customers_registered<S: Storage<Customer>>(
    State(state): State<Arc<AppState<S>>>,
    TraceId(trace_id): TraceId,
    range: Result<Query<RegisteredRange>, QueryRejection>,
) -> Reply<Vec<CustomerDto>> {
    match range {
        Ok(Query(range)) => {
            service(&state, trace_id)
                .by_registration_range(range.from, range.to)
                .await
        }
        Err(e) => invalid_request(trace_id, e),
    }
}

pub async fn validate_tax_id<S: Storage<Customer>>(
    State(state): State<Arc<AppState<S>>>,
    TraceId(trace_id): TraceId,
    check: Result<Query<TaxIdCheck>, QueryRejection>,
) -> Reply<bool> {
    match check {
        Ok(Query(check)) => {
            service(&state, trace_id)
                .validate_tax_id(&check.tax_id, check.exclude_id)
                .await
        }
        Err(e) => invalid_request(trace_id, e),
    }
}

pub async fn validate_email<S: Storage<Customer>>(
    State(state): State<Arc<AppState<S>>>,
    TraceId(trace_id): TraceId,
    check: Result<Query<EmailCheck>, QueryRejection>,
) -> Reply<bool> {
    match check {
        Ok(Query(check)) => {
            service(&state, trace_id)
                .validate_email(&check.email, check.exclude_id)
                .await
        }
        Err(e) => invalid_request(trace_id, e),
    }
}

/// One JSON document per line; a storage fault ends the body early.
pub async fn export_customers<S: Storage<Customer>>(
    State(state): State<Arc<AppState<S>>>,
    TraceId(trace_id): TraceId,
) -> Response {
    let lines = service(&state, trace_id).export().map(|row| {
        let line = row.and_then(|dto| {
            serde_json::to_string(&dto).map_err(|e| DataError::Encode(e.to_string()))
        });
        match line {
            Ok(mut line) => {
                line.push('\n');
                Ok(line)
            }
            Err(e) => {
                warn!("customer export aborted: {e}");
                Err(e)
            }
        }
    });
    (
        [(header::CONTENT_TYPE, "application/x-ndjson")],
        Body::from_stream(lines),
    )
        .into_response()
}
