//! In-memory Persistence Port backend for the Libris authorization server.
//!
//! This crate implements every `libris-auth` storage trait on top of a single
//! `tokio::sync::RwLock`. It backs the development server and serves as the
//! deterministic test double for concurrency tests.
//!
//! # Example
//!
//! ```ignore
//! use libris_auth::StoragePorts;
//! use libris_auth_memory::InMemoryAuthStorage;
//!
//! let storage = Arc::new(InMemoryAuthStorage::new());
//! storage.insert_client(client).await?;
//! let ports = StoragePorts::from_backend(storage);
//! ```

pub mod storage;

pub use storage::InMemoryAuthStorage;
