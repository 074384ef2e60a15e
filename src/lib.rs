pub mod article;
pub mod bridge;
pub mod category;
pub mod commands;
pub mod config;
pub mod db;
pub mod error;
pub mod feed;
pub mod http;
pub mod loader;
pub mod tree_entry;
pub mod ui;
pub mod utils;
