mod adapter;
mod connection;
mod postgres;
mod query;
mod schema;

pub use adapter::*;
pub use connection::*;
pub use postgres::*;
pub use query::*;
pub use schema::*;
