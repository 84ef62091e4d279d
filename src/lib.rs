pub mod auth;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod http;
pub mod operations;
pub mod paginate;
pub mod params;
pub mod record;
