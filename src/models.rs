pub mod bookings;
pub mod customers;
pub mod delivery;
pub mod finance;
pub mod hr;
pub mod installments;
pub mod inventory;
pub mod promotion;
pub mod purchasing;
pub mod sales;
