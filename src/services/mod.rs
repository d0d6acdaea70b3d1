pub mod distance;
pub mod rates;
pub mod store;
