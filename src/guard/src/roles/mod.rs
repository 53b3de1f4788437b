//! Role resolution
//!
//! Turns an (acting user, item) pair into the ordered list of roles the
//! request holds:
//!
//! - no user: exactly `["guest"]`, no predicate runs
//! - otherwise: `"authenticated"` followed by every custom role whose
//!   predicate returned `true`, in declaration order
//!
//! Custom predicates run concurrently. The first failing predicate fails
//! the whole resolution with its own error.

pub mod resolver;

pub use resolver::{Resolution, RoleResolver};
