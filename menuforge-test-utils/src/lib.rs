//! Shared helpers for menuforge integration tests.

pub mod db;
pub mod fixtures;
pub mod temp;

pub use db::TestDb;
pub use fixtures::{seed_menu, MenuFixture};
pub use temp::TempDir;
