//! Terminal client for a clicker game whose state lives on a remote backend.
//!
//! The backend is polled for the authoritative snapshot while user actions
//! are sent as individual requests. [`reconciler::Reconciler`] merges both
//! streams into the [`store::GameStore`] and keeps [`view::GameView`] in step
//! with it by patching nodes in place instead of redrawing from scratch.

pub mod client;
pub mod config;
pub mod format;
pub mod gateway;
pub mod logging;
pub mod model;
pub mod poller;
pub mod reconciler;
pub mod store;
pub mod ui;
pub mod view;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;
