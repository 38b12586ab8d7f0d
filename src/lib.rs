pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod gateway;
pub mod models;
pub mod relay;
pub mod rooms;
pub mod routes;
pub mod state;
