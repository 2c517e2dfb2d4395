pub mod commands;
pub mod components;
pub mod config;
pub mod db;
pub mod error;
pub mod map;
pub mod services;
pub mod utils;
