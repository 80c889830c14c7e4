//! # fleetsync Model
//!
//! Data model and identity resolution for fleetsync.
//!
//! This crate provides:
//! - The identity key that correlates one logical user across servers
//! - Client records as servers report them
//! - Durable directory entries (the local system of record)
//!
//! ## Identity Contract
//!
//! A `ClientRecord` and a `DirectoryEntry` describing the same logical
//! user must derive the same [`IdentityKey`]. Reconciliation is keyed on
//! this equality and nothing else; per-server credential and subscription
//! IDs deliberately differ between servers for the same user.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod directory;
mod identity;
mod record;

pub use directory::{DirectoryEntry, ServerHandle};
pub use identity::IdentityKey;
pub use record::{ClientRecord, ServerView};
