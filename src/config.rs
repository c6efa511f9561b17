// src/config.rs

use crate::{
    common::i18n::I18nStore,
    db::{
        BookingRepository, CustomerRepository, DeliveryRepository, FinanceRepository, HrRepository,
        InstallmentRepository, OwnershipRepository, PromotionRepository, QuotationRepository, SalesRepository,
        StockRepository, SupplierRepository,
    },
    services::{
        booking_service::BookingService, customer_service::CustomerService, delivery_service::DeliveryService,
        entity_validator::EntityValidator, finance_service::FinanceService, hr_service::HrService,
        installment_service::InstallmentService, inventory_service::InventoryService,
        promotion_engine::PromotionService, purchase_service::PurchaseService, quotation_service::QuotationService,
        report_service::ReportService, sales_service::SalesService,
    },
};
use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, Executor, PgPool};
use std::{env, str::FromStr, sync::Arc, time::Duration};

/// Configuração lida do ambiente (e do `.env`, se existir).
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub bind_addr: String,
    pub db_max_connections: u32,
    pub db_statement_timeout: Duration,
    pub request_timeout: Duration,
}

fn var_or<T: FromStr>(name: &str, default: T) -> anyhow::Result<T> {
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| anyhow::anyhow!("{} inválida: '{}'", name, raw)),
        Err(_) => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL deve ser definida")?,
            jwt_secret: env::var("JWT_SECRET").context("JWT_SECRET deve ser definido")?,
            bind_addr: var_or("BIND_ADDR", "0.0.0.0:3000".to_string())?,
            db_max_connections: var_or("DB_MAX_CONNECTIONS", 5)?,
            db_statement_timeout: Duration::from_secs(var_or("DB_STATEMENT_TIMEOUT_SECS", 15)?),
            request_timeout: Duration::from_secs(var_or("REQUEST_TIMEOUT_SECS", 30)?),
        })
    }
}

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub jwt_secret: String,
    pub i18n_store: Arc<I18nStore>,

    pub sales_service: SalesService,
    pub quotation_service: QuotationService,
    pub promotion_service: PromotionService,
    pub purchase_service: PurchaseService,
    pub delivery_service: DeliveryService,
    pub customer_service: CustomerService,
    pub booking_service: BookingService,
    pub installment_service: InstallmentService,
    pub finance_service: FinanceService,
    pub report_service: ReportService,
    pub hr_service: HrService,
}

impl AppState {
    pub async fn new(config: &Config) -> anyhow::Result<Self> {
        // Toda conexão nova já nasce com o statement_timeout
        let statement_timeout = format!("SET statement_timeout = {}", config.db_statement_timeout.as_millis());
        let db_pool = PgPoolOptions::new()
            .max_connections(config.db_max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .after_connect(move |conn, _meta| {
                let statement_timeout = statement_timeout.clone();
                Box::pin(async move {
                    conn.execute(statement_timeout.as_str()).await?;
                    Ok(())
                })
            })
            .connect(&config.database_url)
            .await
            .context("Falha ao conectar ao banco de dados")?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        let i18n_store = Arc::new(I18nStore::load()?);

        // --- Monta o gráfico de dependências ---
        let validator = EntityValidator::new(OwnershipRepository);
        let inventory = InventoryService::new(StockRepository);
        let promotion_service = PromotionService::new(PromotionRepository, CustomerRepository, validator.clone());
        let installment_service = InstallmentService::new(InstallmentRepository, validator.clone());
        let sales_service = SalesService::new(
            SalesRepository,
            PromotionRepository,
            validator.clone(),
            inventory.clone(),
            promotion_service.clone(),
            installment_service.clone(),
        );
        let quotation_service = QuotationService::new(QuotationRepository, validator.clone(), sales_service.clone());
        let purchase_service = PurchaseService::new(SupplierRepository, validator.clone(), inventory);
        let delivery_service = DeliveryService::new(DeliveryRepository, validator.clone());
        let customer_service = CustomerService::new(CustomerRepository, validator.clone());
        let booking_service = BookingService::new(BookingRepository, validator.clone());
        let finance_service = FinanceService::new(FinanceRepository, validator.clone());
        let report_service = ReportService::new(FinanceRepository, SalesRepository);
        let hr_service = HrService::new(HrRepository, validator);

        Ok(Self {
            db_pool,
            jwt_secret: config.jwt_secret.clone(),
            i18n_store,
            sales_service,
            quotation_service,
            promotion_service,
            purchase_service,
            delivery_service,
            customer_service,
            booking_service,
            installment_service,
            finance_service,
            report_service,
            hr_service,
        })
    }
}
