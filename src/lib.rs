pub mod app;
pub mod auth;
pub mod conferences;
pub mod config;
pub mod error;
pub mod registrations;
pub mod state;
pub mod store;
