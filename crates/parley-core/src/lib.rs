//! Core types, policies and services for the Parley discussion engine.
//!
//! This crate is free of HTTP and database dependencies. Services borrow a
//! [`store::ForumStore`] and a [`clock::Clock`] and hold all of the rules;
//! storage backends only persist rows.

#![allow(async_fn_in_trait)]

pub mod acceptance;
pub mod actor;
pub mod clock;
pub mod error;
pub mod flatten;
pub mod ledger;
pub mod reconcile;
pub mod replies;
pub mod reply;
pub mod store;
pub mod subject;
pub mod thread;
pub mod topic;
pub mod topics;
pub mod vote;

pub use error::{Error, ErrorClass, Result};
