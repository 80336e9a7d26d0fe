//! Application layer containing the order placement orchestration.
//!
//! This module defines the `OrderEngine`, the entry point for cart previews,
//! order creation and order queries, and the `InventoryLedger` it reserves
//! stock through inside a store transaction.

pub mod engine;
pub mod ledger;
