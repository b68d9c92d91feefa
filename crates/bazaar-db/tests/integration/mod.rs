mod accounts_tests;
mod catalog_tests;
mod checkout_tests;
pub mod common;
