pub mod category;
pub mod delivery_address;
pub mod order;
pub mod order_item;
pub mod product;
pub mod refresh_token;
pub mod user;
