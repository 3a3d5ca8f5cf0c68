pub mod db;
pub mod errors;
pub mod models;
pub mod names;
pub mod services;
