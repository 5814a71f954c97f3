//! Shopping carts.

pub mod cart;

pub use cart::{Cart, CartLine};
