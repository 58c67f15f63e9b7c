pub mod accounts;
pub mod catalog;
pub mod orders;

pub use accounts::AccountService;
pub use catalog::CatalogService;
pub use orders::OrderService;
