mod api_tests;
mod flow_tests;
pub mod common;
