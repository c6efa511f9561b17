pub mod sale_calculator;
pub mod entity_validator;
pub mod inventory_service;
pub mod promotion_engine;
pub mod rate_engine;
pub mod installment_service;
pub mod sales_service;
pub mod quotation_service;
pub mod purchase_service;
pub mod delivery_service;
pub mod customer_service;
pub mod booking_service;
pub mod finance_service;
pub mod report_service;
pub mod hr_service;
