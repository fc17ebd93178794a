// src/lib.rs
pub mod config;
pub mod handlers;
pub mod models;
pub mod refresher;
pub mod resolver;
pub mod storage;
pub mod utils;
