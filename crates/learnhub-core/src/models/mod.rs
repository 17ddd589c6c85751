//! Data models for the LearnHub platform.
//!
//! - `user`: account identity and role, persisted with the session
//! - `program`: programs, modules and topics served to learners

pub mod program;
pub mod user;

pub use program::{Enrollment, Module, ProfileUpdate, Program, Topic};
pub use user::{Role, User};
