pub mod db_utils;
pub mod entity;
pub mod error;
pub mod i18n;
