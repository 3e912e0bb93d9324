pub mod filter;
pub mod models;
pub mod queries;
