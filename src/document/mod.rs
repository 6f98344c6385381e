//! Config document serializer: plugin tree in, TOML text out.
//!
//! - `value`: recursive option values and insertion-ordered tables
//! - `tree`: agent globals and ordered input/output plugin sets
//! - `render`: validation and TOML rendering

pub mod render;
pub mod tree;
pub mod value;

pub use render::{ConfigDocument, Section, render, render_fragment};
pub use tree::{AgentSettings, PluginSet, PluginTree};
pub use value::{Table, Value};
