//! cloudnotes library
//!
//! Core subsystems of the cloudnotes application: the live view-state
//! store, note/notebook/share services, the document store and identity
//! provider capabilities, and the profile-mirror HTTP server.

pub mod auth;
pub mod config;
pub mod database;
pub mod error;
pub mod models;
pub mod server;
pub mod services;
pub mod state;
pub mod store;
