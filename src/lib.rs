pub mod app;
pub mod auth;
pub mod catalog;
pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod health;
pub mod history;
pub mod notes;
pub mod reactions;
pub mod state;
pub mod store;
pub mod trials;
pub mod users;
pub mod wishlist;
