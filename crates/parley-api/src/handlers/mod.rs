//! Route handlers, one module per resource.
//!
//! Services are constructed per request; they only borrow the shared store,
//! clock and policy from [`crate::AppState`].

pub mod replies;
pub mod topics;
pub mod votes;
