pub mod app;
pub mod config;
pub mod db;
pub mod errors;
pub mod logging;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

#[cfg(test)]
pub mod test_support;
