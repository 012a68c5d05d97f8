use crate::handlers::{customer::*, ping::*};
use app_data::Storage;
use app_schema::customer::Customer;
use app_state::AppState;
use axum::{Router, routing::get};
use std::sync::Arc;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    services::ServeDir,
    trace::TraceLayer,
};

pub fn router<S: Storage<Customer>>(state: Arc<AppState<S>>) -> Router {
    let asset_path = state.config.asset_path.clone();
    let asset_service = ServeDir::new(&asset_path).append_index_html_on_directories(true);

    Router::new()
        .route("/", get(get_customer))
        .route("/customer", get(get_customer))
        .route("/ping", get(ping).post(ping))
        .route(
            "/api/customers",
            get(list_customers::<S>).post(create_customer::<S>),
        )
        .route("/api/customers/summaries", get(list_customer_summaries::<S>))
        .route("/api/customers/active", get(list_active_customers::<S>))
        .route("/api/customers/search", get(search_customers::<S>))
        .route("/api/customers/by-name", get(search_customers_by_name::<S>))
        .route("/api/customers/registered", get(list_customers_registered::<S>))
        .route("/api/customers/validate-tax-id", get(validate_tax_id::<S>))
        .route("/api/customers/validate-email", get(validate_email::<S>))
        .route("/api/customers/export", get(export_customers::<S>))
        .route(
            "/api/customers/by-tax-id/{tax_id}",
            get(get_customer_by_tax_id::<S>),
        )
        .route(
            "/api/customers/by-email/{email}",
            get(get_customer_by_email::<S>),
        )
        .route(
            "/api/customers/by-city/{city}",
            get(list_customers_by_city::<S>),
        )
        .route(
            "/api/customers/by-country/{country}",
            get(list_customers_by_country::<S>),
        )
        .route(
            "/api/customers/by-type/{customer_type}",
            get(list_customers_by_type::<S>),
        )
        .route(
            "/api/customers/{id}",
            get(get_customer_by_id::<S>)
                .put(update_customer::<S>)
                .delete(delete_customer::<S>),
        )
        .route(
            "/api/customers/{id}/summary",
            get(get_customer_summary::<S>),
        )
        .nest_service("/assets", asset_service)
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .with_state(state)
}
