pub mod db;
pub mod types;

pub use db::{Database, Records};
pub use types::{DbConfig, DbPaths};
