//src/main.rs

use anyhow::Context;
use axum::{
    middleware as axum_middleware,
    routing::{delete, get, patch, post},
    Router,
};
use tokio::net::TcpListener;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod common;
mod config;
mod db;
mod docs;
mod handlers;
mod middleware;
mod models;
mod services;

use crate::config::{AppState, Config};
use crate::docs::ApiDoc;
use crate::middleware::auth::auth_guard;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn")),
        )
        .with_target(false)
        .compact()
        .init();

    // Sem configuração válida a aplicação não sobe
    let config = Config::from_env()?;
    let app_state = AppState::new(&config).await?;

    sqlx::migrate!()
        .run(&app_state.db_pool)
        .await
        .context("Falha ao rodar as migrações do banco de dados.")?;

    tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

    let sales_routes = Router::new()
        .route("/"
               ,post(handlers::sales::create_sale)
               .get(handlers::sales::list_sales)
        )
        .route("/reports/by-day", get(handlers::sales::sales_by_day))
        .route("/{id}"
               ,get(handlers::sales::get_sale)
               .put(handlers::sales::update_sale)
               .delete(handlers::sales::delete_sale)
        );

    let quotation_routes = Router::new()
        .route("/"
               ,post(handlers::quotation::create_quotation)
               .get(handlers::quotation::list_quotations)
        )
        .route("/{id}", get(handlers::quotation::get_quotation))
        .route("/{id}/convert", post(handlers::quotation::convert_quotation));

    let promotion_routes = Router::new()
        .route("/"
               ,post(handlers::promotions::create_promotion)
               .get(handlers::promotions::list_promotions)
        )
        .route("/validate", post(handlers::promotions::validate_promotion))
        .route("/{id}"
               ,get(handlers::promotions::get_promotion)
               .put(handlers::promotions::update_promotion)
               .delete(handlers::promotions::delete_promotion)
        );

    let partner_routes = Router::new()
        .route("/"
               ,post(handlers::delivery::create_partner)
               .get(handlers::delivery::list_partners)
        )
        .route("/rates/calculate", post(handlers::delivery::calculate_rates))
        .route("/{id}"
               ,get(handlers::delivery::get_partner)
               .delete(handlers::delivery::delete_partner)
        )
        .route("/{id}/status", patch(handlers::delivery::change_partner_status))
        .route("/{id}/rates"
               ,post(handlers::delivery::create_rate)
               .get(handlers::delivery::list_rates)
        )
        .route("/{id}/rates/{rate_id}", delete(handlers::delivery::delete_rate));

    let shipment_routes = Router::new()
        .route("/"
               ,post(handlers::delivery::create_shipment)
               .get(handlers::delivery::list_shipments)
        )
        .route("/{id}"
               ,get(handlers::delivery::get_shipment)
               .delete(handlers::delivery::delete_shipment)
        )
        .route("/{id}/status", patch(handlers::delivery::update_shipment_status));

    let customer_group_routes = Router::new()
        .route("/"
               ,post(handlers::customers::create_group)
               .get(handlers::customers::list_groups)
        )
        .route("/{id}"
               ,get(handlers::customers::get_group)
               .put(handlers::customers::update_group)
               .delete(handlers::customers::delete_group)
        )
        .route("/{id}/members"
               ,get(handlers::customers::list_members)
               .post(handlers::customers::assign_members)
        );

    let supplier_routes = Router::new()
        .route("/{id}/purchases"
               ,post(handlers::purchasing::create_purchase)
               .get(handlers::purchasing::list_purchases)
        )
        .route("/{id}/payments", post(handlers::purchasing::pay_supplier))
        .route("/{id}/balance", get(handlers::purchasing::supplier_balance))
        .route("/{id}/ledger", get(handlers::purchasing::supplier_ledger));

    let purchase_return_routes = Router::new()
        .route("/"
               ,post(handlers::purchasing::create_return)
               .get(handlers::purchasing::list_returns)
        )
        .route("/{id}", get(handlers::purchasing::get_return));

    let installment_routes = Router::new()
        .route("/"
               ,post(handlers::installments::create_plan)
               .get(handlers::installments::list_installments)
        )
        .route("/{id}/pay", post(handlers::installments::pay_installment));

    let booking_routes = Router::new()
        .route("/"
               ,post(handlers::bookings::create_booking)
               .get(handlers::bookings::list_bookings)
        )
        .route("/{id}", get(handlers::bookings::get_booking))
        .route("/{id}/status", patch(handlers::bookings::change_booking_status));

    let finance_routes = Router::new()
        .route("/income"
               ,post(handlers::finance::create_income)
               .get(handlers::finance::list_incomes)
        )
        .route("/income/by-item", get(handlers::finance::income_by_item))
        .route("/income-items"
               ,post(handlers::finance::create_income_item)
               .get(handlers::finance::list_income_items)
        )
        .route("/expense-categories"
               ,post(handlers::finance::create_expense_category)
               .get(handlers::finance::list_expense_categories)
        )
        .route("/expense-categories/{id}", delete(handlers::finance::delete_expense_category))
        .route("/expense-categories/{id}/expenses", post(handlers::finance::create_expense))
        .route("/employees/{id}/attendance"
               ,post(handlers::hr::record_attendance)
               .get(handlers::hr::list_attendance)
        );

    // Tudo abaixo de /api exige token, exceto o health check
    let protected = Router::new()
        .nest("/api/sales", sales_routes)
        .nest("/api/quotation", quotation_routes)
        .nest("/api/promotions", promotion_routes)
        .nest("/api/delivery-partners", partner_routes)
        .nest("/api/shipments", shipment_routes)
        .nest("/api/customer-groups", customer_group_routes)
        .nest("/api/suppliers", supplier_routes)
        .nest("/api/purchase-returns", purchase_return_routes)
        .nest("/api/installments", installment_routes)
        .nest("/api/bookings", booking_routes)
        .nest("/api", finance_routes)
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    let app = Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(protected)
        .layer(TimeoutLayer::new(config.request_timeout))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state);

    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Falha ao iniciar o listener TCP em {}", config.bind_addr))?;
    tracing::info!("🚀 Servidor escutando em {}", listener.local_addr()?);
    axum::serve(listener, app)
        .await
        .context("Erro no servidor Axum")?;

    Ok(())
}
