//! CLI Commands

pub mod aggregate;
