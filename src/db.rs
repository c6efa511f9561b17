// src/db.rs

pub mod ownership_repo;
pub use ownership_repo::OwnershipRepository;
pub mod stock_repo;
pub use stock_repo::StockRepository;
pub mod promotion_repo;
pub use promotion_repo::PromotionRepository;
pub mod customer_repo;
pub use customer_repo::CustomerRepository;
pub mod sales_repo;
pub use sales_repo::SalesRepository;
pub mod quotation_repo;
pub use quotation_repo::QuotationRepository;
pub mod supplier_repo;
pub use supplier_repo::SupplierRepository;
pub mod delivery_repo;
pub use delivery_repo::DeliveryRepository;
pub mod booking_repo;
pub use booking_repo::BookingRepository;
pub mod installment_repo;
pub use installment_repo::InstallmentRepository;
pub mod hr_repo;
pub use hr_repo::HrRepository;
pub mod finance_repo;
pub use finance_repo::FinanceRepository;
