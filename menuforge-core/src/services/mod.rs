pub mod catalog_service;
pub mod menu_mutations;
pub mod validation;

pub use catalog_service::*;
pub use menu_mutations::*;
pub use validation::*;
