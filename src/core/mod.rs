//! Core business logic, independent of the HTTP layer.
//!
//! Every operation takes a database connection (and a gateway where payments
//! are involved) and returns structured data for the API layer to render.

/// Registration, login and sessions
pub mod user;
/// Products, courses and lectures
pub mod catalog;
/// Checkout and order lifecycle
pub mod order;
/// Seller earnings ledger
pub mod earnings;
/// Payment intents, verification and webhooks
pub mod payment;
/// Course access through purchases and subscriptions
pub mod enrollment;
/// Seller and admin aggregations
pub mod dashboard;
/// Mentor directory matching
pub mod mentor;
