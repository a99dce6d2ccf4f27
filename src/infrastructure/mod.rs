pub mod app_state;
pub mod auth;
pub mod persistence;
pub mod services;
pub mod stores;
