pub mod api;
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod geo;
pub mod models;
pub mod observability;
pub mod presence;
pub mod proximity;
pub mod state;
pub mod store;
