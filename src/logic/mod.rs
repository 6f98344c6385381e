//! Logic modules: translate host facts and caller intent into decisions.
//!
//! # Modules
//!
//! - `resolver`: OS classification and platform profile resolution

pub mod resolver;
