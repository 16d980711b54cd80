//! Domain model for the project collection.
//!
//! # Responsibility
//! - Define the canonical project document used by core business logic.
//! - Own the invariants every persisted project must satisfy.
//!
//! # Invariants
//! - Every project is identified by a stable, caller-chosen `ProjectId`.
//! - Projects are never deleted; they only accumulate members and usage.

pub mod project;
