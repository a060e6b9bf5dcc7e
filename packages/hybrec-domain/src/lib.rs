pub mod candidate;
pub mod graph;
pub mod query;
pub mod signal;
pub mod text;
pub mod weights;

mod error;

pub use error::{Error, Result};
