pub mod api_connection;
pub mod candidates;
pub mod category_filter;
pub mod cli;
pub mod config;
pub mod credits;
pub mod data_store;
pub mod enricher;
pub mod error;
pub mod meal_plan_generator;
pub mod models;
pub mod orchestrator;
pub mod plan_resolver;
pub mod recipe_import;
pub mod response_validator;
