//! Catalog, carts and orders.

mod cart;
mod order;
mod product;

pub use cart::{CartLine, CartStore};
pub use order::{Order, OrderItem, OrderStore};
pub use product::{Product, ProductInput, ProductPage, ProductStore, ITEMS_PER_PAGE};
