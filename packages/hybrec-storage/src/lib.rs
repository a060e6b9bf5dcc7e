pub mod candidates;
pub mod db;
pub mod graph;
pub mod interactions;
pub mod keywords;
pub mod models;
pub mod schema;

mod error;

pub use error::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;
