//! In-memory student directory and provider registry.
//!
//! Passwords are hashed with Argon2. Both stores live behind a tokio
//! `RwLock` and are cheap to clone.

mod directory;
mod providers;

pub use directory::{FIRST_STUDENT_ID, StudentDirectory};
pub use providers::{FIRST_PROVIDER_ID, InMemoryProviderRegistry};
