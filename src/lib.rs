pub mod api;
pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod state;
pub mod storage;
pub mod view;
