pub mod extract;
pub mod products;
