// src/common/entity.rs

use serde::Serialize;
use std::fmt;
use utoipa::ToSchema;

/// Tipos de entidade que podem ser referenciados por uma requisição.
/// Cada variante sabe em qual tabela mora, o que permite um único validador
/// de posse para todas elas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum EntityKind {
    Organization,
    Outlet,
    Customer,
    CustomerGroup,
    Product,
    ProductCategory,
    Supplier,
    Purchase,
    DeliveryPartner,
    ShippingRate,
    Shipment,
    Promotion,
    Sale,
    Quotation,
    Installment,
    Booking,
    Employee,
    IncomeItem,
    ExpenseCategory,
}

impl EntityKind {
    pub fn table(self) -> &'static str {
        match self {
            EntityKind::Organization => "organizations",
            EntityKind::Outlet => "outlets",
            EntityKind::Customer => "customers",
            EntityKind::CustomerGroup => "customer_groups",
            EntityKind::Product => "products",
            EntityKind::ProductCategory => "product_categories",
            EntityKind::Supplier => "suppliers",
            EntityKind::Purchase => "purchases",
            EntityKind::DeliveryPartner => "delivery_partners",
            EntityKind::ShippingRate => "shipping_rates",
            EntityKind::Shipment => "shipments",
            EntityKind::Promotion => "promotions",
            EntityKind::Sale => "sales",
            EntityKind::Quotation => "quotations",
            EntityKind::Installment => "installments",
            EntityKind::Booking => "bookings",
            EntityKind::Employee => "employees",
            EntityKind::IncomeItem => "income_items",
            EntityKind::ExpenseCategory => "expense_categories",
        }
    }

    /// Coluna que diz a qual organização a linha pertence.
    pub fn owner_column(self) -> &'static str {
        match self {
            EntityKind::Organization => "id",
            _ => "organization_id",
        }
    }

    /// Chave usada no catálogo de mensagens (locales/*.json).
    pub fn message_key(self) -> &'static str {
        match self {
            EntityKind::Organization => "entity.organization",
            EntityKind::Outlet => "entity.outlet",
            EntityKind::Customer => "entity.customer",
            EntityKind::CustomerGroup => "entity.customerGroup",
            EntityKind::Product => "entity.product",
            EntityKind::ProductCategory => "entity.productCategory",
            EntityKind::Supplier => "entity.supplier",
            EntityKind::Purchase => "entity.purchase",
            EntityKind::DeliveryPartner => "entity.deliveryPartner",
            EntityKind::ShippingRate => "entity.shippingRate",
            EntityKind::Shipment => "entity.shipment",
            EntityKind::Promotion => "entity.promotion",
            EntityKind::Sale => "entity.sale",
            EntityKind::Quotation => "entity.quotation",
            EntityKind::Installment => "entity.installment",
            EntityKind::Booking => "entity.booking",
            EntityKind::Employee => "entity.employee",
            EntityKind::IncomeItem => "entity.incomeItem",
            EntityKind::ExpenseCategory => "entity.expenseCategory",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::Organization => "Organization",
            EntityKind::Outlet => "Outlet",
            EntityKind::Customer => "Customer",
            EntityKind::CustomerGroup => "CustomerGroup",
            EntityKind::Product => "Product",
            EntityKind::ProductCategory => "ProductCategory",
            EntityKind::Supplier => "Supplier",
            EntityKind::Purchase => "Purchase",
            EntityKind::DeliveryPartner => "DeliveryPartner",
            EntityKind::ShippingRate => "ShippingRate",
            EntityKind::Shipment => "Shipment",
            EntityKind::Promotion => "Promotion",
            EntityKind::Sale => "Sale",
            EntityKind::Quotation => "Quotation",
            EntityKind::Installment => "Installment",
            EntityKind::Booking => "Booking",
            EntityKind::Employee => "Employee",
            EntityKind::IncomeItem => "IncomeItem",
            EntityKind::ExpenseCategory => "ExpenseCategory",
        };
        f.write_str(name)
    }
}
