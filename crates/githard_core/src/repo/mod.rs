//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts for the project collection.
//! - Isolate SQLite and document-encoding details from the service layer.
//!
//! # Invariants
//! - Repository writes enforce `Project::validate()` before persistence.
//! - Every read-then-write runs inside one immediate transaction.
//! - Repository APIs return semantic errors (`NotFound`, `AlreadyExists`,
//!   `AlreadyMember`, `InvalidQuantity`) in addition to DB transport errors.

pub mod project_repo;
