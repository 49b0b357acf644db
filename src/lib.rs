pub mod config;
pub mod context;
pub mod db;
pub mod dialect;
pub mod explain;
pub mod pagination;
