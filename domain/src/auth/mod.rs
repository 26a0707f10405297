//! Authentication value objects

pub mod credential;
