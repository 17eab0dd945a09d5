//! Small helpers shared by several workspace crates.

pub mod uuid;
