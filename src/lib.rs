//! Client session manager for the PDI Finance backend.
//!
//! Keeps an authenticated identity across process restarts, attaches bearer
//! credentials to outgoing requests, transparently renews an expired access
//! token (at most one replay per request), and gates protected views by
//! permission and role.

pub mod cli;
pub mod gateway;
pub mod guard;
pub mod session;
pub mod state;
pub mod store;
