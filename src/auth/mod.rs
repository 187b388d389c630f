//! Permission Model
//!
//! Identities and the capabilities granted to them.
//!
//! ## Rules
//! - Each operation needs its own explicit grant; no capability implies another
//! - An absent identity holds no capabilities, so every check fails closed
//! - User data is immutable after construction and shared without locking

mod user;

pub use user::{has_permission, Capability, User, UserDirectory};
