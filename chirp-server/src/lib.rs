// Library exports for chirp-server; the binary and integration tests build on these

pub mod api;
pub mod config;
pub mod db;
pub mod feed;
pub mod images;
pub mod middleware;
pub mod placeholder;
pub mod routes;
pub mod session;
pub mod state;
