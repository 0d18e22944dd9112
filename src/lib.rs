//! Server-rendered todo lists.
//!
//! A default list lives at `/` and any other path names a custom list that
//! is created on first visit. Everything is stored in a [`DocumentStore`]
//! that keeps both collections in memory and, unless configured otherwise,
//! journals every write to disk.

pub mod app;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod state;
pub mod storage;
pub mod views;

pub use app::{build_router, build_router_with_assets};
pub use repository::{DocumentStore, ListRepository};
