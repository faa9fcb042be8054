pub mod checkout;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod referral;
pub mod routes;
pub mod server;
pub mod store;
