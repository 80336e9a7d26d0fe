//! Domain types and rules: money, products, orders, tax, pricing, and the
//! ports the application layer talks to.

pub mod money;
pub mod order;
pub mod ports;
pub mod pricing;
pub mod product;
pub mod tax;
