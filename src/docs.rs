// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use crate::handlers;
use crate::models;
use crate::services;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Sales ---
        handlers::sales::create_sale,
        handlers::sales::list_sales,
        handlers::sales::get_sale,
        handlers::sales::update_sale,
        handlers::sales::delete_sale,
        handlers::sales::sales_by_day,

        // --- Quotations ---
        handlers::quotation::create_quotation,
        handlers::quotation::list_quotations,
        handlers::quotation::get_quotation,
        handlers::quotation::convert_quotation,

        // --- Promotions ---
        handlers::promotions::create_promotion,
        handlers::promotions::list_promotions,
        handlers::promotions::get_promotion,
        handlers::promotions::update_promotion,
        handlers::promotions::delete_promotion,
        handlers::promotions::validate_promotion,

        // --- Delivery ---
        handlers::delivery::create_partner,
        handlers::delivery::list_partners,
        handlers::delivery::get_partner,
        handlers::delivery::change_partner_status,
        handlers::delivery::delete_partner,
        handlers::delivery::create_rate,
        handlers::delivery::list_rates,
        handlers::delivery::delete_rate,
        handlers::delivery::calculate_rates,
        handlers::delivery::create_shipment,
        handlers::delivery::list_shipments,
        handlers::delivery::get_shipment,
        handlers::delivery::update_shipment_status,
        handlers::delivery::delete_shipment,

        // --- Customers ---
        handlers::customers::create_group,
        handlers::customers::list_groups,
        handlers::customers::get_group,
        handlers::customers::update_group,
        handlers::customers::delete_group,
        handlers::customers::list_members,
        handlers::customers::assign_members,

        // --- Purchasing ---
        handlers::purchasing::create_purchase,
        handlers::purchasing::list_purchases,
        handlers::purchasing::pay_supplier,
        handlers::purchasing::supplier_balance,
        handlers::purchasing::supplier_ledger,
        handlers::purchasing::create_return,
        handlers::purchasing::list_returns,
        handlers::purchasing::get_return,

        // --- Installments ---
        handlers::installments::create_plan,
        handlers::installments::list_installments,
        handlers::installments::pay_installment,

        // --- Bookings ---
        handlers::bookings::create_booking,
        handlers::bookings::list_bookings,
        handlers::bookings::get_booking,
        handlers::bookings::change_booking_status,

        // --- Finance ---
        handlers::finance::create_income_item,
        handlers::finance::list_income_items,
        handlers::finance::create_income,
        handlers::finance::list_incomes,
        handlers::finance::income_by_item,
        handlers::finance::create_expense_category,
        handlers::finance::list_expense_categories,
        handlers::finance::delete_expense_category,
        handlers::finance::create_expense,

        // --- HR ---
        handlers::hr::record_attendance,
        handlers::hr::list_attendance,
    ),
    components(
        schemas(
            // --- Sales ---
            models::sales::PaymentMethod,
            models::sales::SaleStatus,
            models::sales::Sale,
            models::sales::SaleItem,
            models::sales::SaleDetail,
            models::sales::SaleListResponse,
            models::sales::QuotationStatus,
            models::sales::Quotation,
            models::sales::QuotationItem,
            models::sales::QuotationDetail,
            models::sales::QuotationListResponse,
            models::sales::SalesByDay,
            services::report_service::SalesByDayReport,

            // --- Promotions ---
            models::promotion::Promotion,
            models::promotion::PromotionView,
            models::promotion::PromotionListResponse,
            models::promotion::PromotionRejection,
            models::promotion::PromotionValidation,

            // --- Inventory ---
            models::inventory::Product,
            models::inventory::ProductStock,
            models::inventory::StockMovementReason,

            // --- Purchasing ---
            models::purchasing::Supplier,
            models::purchasing::Purchase,
            models::purchasing::PurchaseItem,
            models::purchasing::PurchaseDetail,
            models::purchasing::SupplierPayment,
            models::purchasing::PurchaseReturn,
            models::purchasing::PurchaseReturnItem,
            models::purchasing::PurchaseReturnDetail,
            models::purchasing::PurchaseReturnListResponse,
            models::purchasing::SupplierBalance,
            models::purchasing::LedgerEntryKind,
            models::purchasing::LedgerEntry,
            models::purchasing::SupplierLedger,

            // --- Delivery ---
            models::delivery::DeliveryPartnerStatus,
            models::delivery::DeliveryMethod,
            models::delivery::ShipmentStatus,
            models::delivery::DeliveryPartnerView,
            models::delivery::DeliveryPartnerListResponse,
            models::delivery::ShippingRate,
            models::delivery::ShippingRateListResponse,
            models::delivery::RateQuote,
            models::delivery::RateQuoteListResponse,
            models::delivery::TrackingEvent,
            models::delivery::Shipment,
            models::delivery::ShipmentListResponse,

            // --- Customers ---
            models::customers::Customer,
            models::customers::CustomerGroup,
            models::customers::CustomerGroupSummary,
            models::customers::CustomerGroupListResponse,
            models::customers::CustomerGroupDeleted,

            // --- Finance ---
            models::finance::IncomeItem,
            models::finance::Income,
            models::finance::IncomeItemListResponse,
            models::finance::IncomeListResponse,
            models::finance::IncomeByItem,
            models::finance::ExpenseCategory,
            models::finance::Expense,
            models::finance::ExpenseCategoryListResponse,
            services::report_service::IncomeByItemReport,

            // --- Installments / Bookings / HR ---
            models::installments::InstallmentStatus,
            models::installments::Installment,
            models::installments::InstallmentListResponse,
            models::bookings::BookingStatus,
            models::bookings::Booking,
            models::bookings::BookingStatusChange,
            models::bookings::BookingDetail,
            models::bookings::BookingListResponse,
            models::hr::AttendanceStatus,
            models::hr::Attendance,
            models::hr::AttendanceListResponse,

            // --- Payloads ---
            handlers::sales::SaleItemPayload,
            handlers::sales::InstallmentPlanPayload,
            handlers::sales::CreateSalePayload,
            handlers::sales::UpdateSalePayload,
            handlers::quotation::CreateQuotationPayload,
            handlers::quotation::ConvertQuotationPayload,
            handlers::promotions::CreatePromotionPayload,
            handlers::promotions::UpdatePromotionPayload,
            handlers::promotions::PromotionItemPayload,
            handlers::promotions::ValidatePromotionPayload,
            handlers::delivery::CreatePartnerPayload,
            handlers::delivery::PartnerStatusPayload,
            handlers::delivery::CreateRatePayload,
            handlers::delivery::DimensionsPayload,
            handlers::delivery::CalculateRatesPayload,
            handlers::delivery::CreateShipmentPayload,
            handlers::delivery::ShipmentStatusPayload,
            handlers::customers::CustomerGroupPayload,
            handlers::customers::UpdateCustomerGroupPayload,
            handlers::customers::AssignMembersPayload,
            handlers::purchasing::PurchaseItemPayload,
            handlers::purchasing::CreatePurchasePayload,
            handlers::purchasing::SupplierPaymentPayload,
            handlers::purchasing::ReturnItemPayload,
            handlers::purchasing::CreateReturnPayload,
            handlers::installments::CreateInstallmentPlanPayload,
            handlers::bookings::CreateBookingPayload,
            handlers::bookings::BookingStatusPayload,
            handlers::finance::NamedPayload,
            handlers::finance::CreateIncomePayload,
            handlers::finance::CreateExpensePayload,
            handlers::hr::AttendancePayload,
        )
    ),
    tags(
        (name = "Sales", description = "Vendas, estoque e relatório diário"),
        (name = "Quotations", description = "Orçamentos e conversão em venda"),
        (name = "Promotions", description = "Promoções e validação de cupom"),
        (name = "Delivery", description = "Parceiros, tarifas de frete e entregas"),
        (name = "Customers", description = "Grupos de clientes"),
        (name = "Purchasing", description = "Compras, pagamentos a fornecedor e devoluções"),
        (name = "Installments", description = "Crediário"),
        (name = "Bookings", description = "Agendamentos"),
        (name = "Finance", description = "Receitas e despesas"),
        (name = "HR", description = "Ponto dos funcionários")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(
                Http::new(HttpAuthScheme::Bearer)
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_lists_the_core_routes() {
        let doc = ApiDoc::openapi();
        for path in [
            "/api/sales",
            "/api/promotions/validate",
            "/api/delivery-partners/rates/calculate",
            "/api/shipments/{id}/status",
            "/api/quotation/{id}/convert",
        ] {
            assert!(doc.paths.paths.contains_key(path), "rota ausente: {path}");
        }
        let schemes = doc.components.expect("components").security_schemes;
        assert!(schemes.contains_key("api_jwt"));
    }

    #[test]
    fn documented_tax_rates_pass_validation() {
        let json = serde_json::to_value(ApiDoc::openapi()).unwrap();
        for schema in ["CreateSalePayload", "CreateQuotationPayload", "CreatePurchasePayload"] {
            let example = &json["components"]["schemas"][schema]["properties"]["taxRate"]["example"];
            let rate: rust_decimal::Decimal = example.as_str().unwrap().parse().unwrap();
            assert!(
                handlers::validation::validate_tax_rate(&rate).is_ok(),
                "exemplo inválido em {schema}: {rate}"
            );
        }
    }
}
