//! Authentication for the hubuum API.
//!
//! # Purpose
//! Groups password hashing, opaque token handling, the login/logout
//! endpoints and the startup admin seed.
pub mod bootstrap;
pub mod password;
pub mod session;
pub mod token;
