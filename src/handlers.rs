// src/handlers.rs

pub mod validation;

pub mod bookings;
pub mod customers;
pub mod delivery;
pub mod finance;
pub mod hr;
pub mod installments;
pub mod promotions;
pub mod purchasing;
pub mod quotation;
pub mod sales;
