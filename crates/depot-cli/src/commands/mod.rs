pub mod collections;
pub mod common;
pub mod delete;
pub mod get;
pub mod health;
pub mod load;
pub mod pending;
pub mod run;
pub mod save;
pub mod sync;
