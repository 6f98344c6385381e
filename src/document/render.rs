//! TOML rendering of plugin trees.
//!
//! `render` validates the whole tree up front and returns a `ConfigDocument`;
//! its `Display` impl produces the text and cannot fail.
//!
//! Layout:
//!
//! ```text
//! [agent]
//!   interval = "60s"
//!   ...
//!
//! [global_tags]
//!   dc = "dc"
//!
//! [[inputs.cpu]]
//!   percpu = true
//!   fielddrop = ["time_*"]
//!
//!   [inputs.cpu.tagpass]
//!     cpu = ["cpu0"]
//! ```
//!
//! Plain keys precede sub-table headers within every table, because a TOML
//! key after a `[a.b]` header would belong to that sub-table.

use std::fmt::{self, Write as _};

use super::tree::PluginTree;
use super::value::{Table, Value, index_path, key_path};
use crate::error::{ProvisionError, Result};
use crate::types::PluginCategory;

const HEADER: &str = "# Managed by telegraf-provision. Local changes will be overwritten.";

/// One top-level block of the rendered document.
#[derive(Debug, Clone, PartialEq)]
pub enum Section {
    /// `[name]`: agent settings or global tags
    Table { name: String, entries: Table },
    /// `[[category.plugin]]`: one plugin instance
    PluginInstance {
        category: PluginCategory,
        plugin: String,
        entries: Table,
    },
}

/// Rendered configuration document, built only through `render` or `render_fragment`.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigDocument {
    sections: Vec<Section>,
}

impl ConfigDocument {
    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    /// Number of `[[category.plugin]]` blocks.
    pub fn instance_count(&self, category: PluginCategory, plugin: &str) -> usize {
        self.sections
            .iter()
            .filter(|s| {
                matches!(s, Section::PluginInstance { category: c, plugin: p, .. }
                    if *c == category && p == plugin)
            })
            .count()
    }
}

// ============================================================================
// Rendering
// ============================================================================

/// Render the full agent configuration.
///
/// Order: `[agent]`, `[global_tags]`, then every input instance, then every
/// output instance. Plugin names and instances keep their supplied order, and
/// an empty instance still produces its block.
///
/// # Errors
///
/// `UnsupportedValueType` naming the key path of the first value that has no
/// TOML representation here: arrays holding arrays or tables, and non-finite
/// floats.
pub fn render(tree: &PluginTree) -> Result<ConfigDocument> {
    let mut sections = vec![
        Section::Table {
            name: "agent".to_string(),
            entries: tree.agent.agent_table(),
        },
        Section::Table {
            name: "global_tags".to_string(),
            entries: tree.agent.tags_table(),
        },
    ];

    for category in [PluginCategory::Inputs, PluginCategory::Outputs] {
        for (plugin, instances) in tree.plugins(category).iter() {
            sections.extend(instance_sections(category, plugin, instances)?);
        }
    }

    tracing::debug!(
        "Rendered {} sections ({} inputs, {} outputs)",
        sections.len(),
        tree.inputs.instance_count(),
        tree.outputs.instance_count()
    );

    Ok(ConfigDocument { sections })
}

/// Render a drop-in fragment holding the instances of a single plugin.
pub fn render_fragment(
    category: PluginCategory,
    plugin: &str,
    instances: &[Table],
) -> Result<ConfigDocument> {
    Ok(ConfigDocument {
        sections: instance_sections(category, plugin, instances)?,
    })
}

fn instance_sections(
    category: PluginCategory,
    plugin: &str,
    instances: &[Table],
) -> Result<Vec<Section>> {
    let plugin_path = key_path(&category.to_string(), plugin);
    instances
        .iter()
        .enumerate()
        .map(|(i, entries)| {
            check_table(entries, &index_path(&plugin_path, i))?;
            Ok(Section::PluginInstance {
                category,
                plugin: plugin.to_string(),
                entries: entries.clone(),
            })
        })
        .collect()
}

fn check_table(table: &Table, path: &str) -> Result<()> {
    for (key, value) in table.iter() {
        check_value(value, &key_path(path, key))?;
    }
    Ok(())
}

fn check_value(value: &Value, path: &str) -> Result<()> {
    match value {
        Value::Float(f) if !f.is_finite() => Err(ProvisionError::unsupported_value(
            path,
            format!("non-finite float {f}"),
        )),
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                let item_path = index_path(path, i);
                if !item.is_scalar() {
                    return Err(ProvisionError::unsupported_value(
                        item_path,
                        format!("arrays may only hold scalar values, found {}", item.type_name()),
                    ));
                }
                check_value(item, &item_path)?;
            }
            Ok(())
        }
        Value::Table(table) => check_table(table, path),
        _ => Ok(()),
    }
}

// ============================================================================
// Text output
// ============================================================================

impl fmt::Display for ConfigDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{HEADER}")?;
        for section in &self.sections {
            writeln!(f)?;
            match section {
                Section::Table { name, entries } => {
                    let header = format_key(name);
                    writeln!(f, "[{header}]")?;
                    write_table_body(f, &header, entries, 1)?;
                }
                Section::PluginInstance {
                    category,
                    plugin,
                    entries,
                } => {
                    let header = format!("{}.{}", category, format_key(plugin));
                    writeln!(f, "[[{header}]]")?;
                    write_table_body(f, &header, entries, 1)?;
                }
            }
        }
        Ok(())
    }
}

fn write_table_body(f: &mut fmt::Formatter<'_>, header: &str, table: &Table, depth: usize) -> fmt::Result {
    let indent = "  ".repeat(depth);

    for (key, value) in table.iter().filter(|(_, v)| !matches!(v, Value::Table(_))) {
        writeln!(f, "{indent}{} = {}", format_key(key), format_value(value))?;
    }

    for (key, value) in table.iter() {
        if let Value::Table(sub) = value {
            let sub_header = format!("{header}.{}", format_key(key));
            writeln!(f)?;
            writeln!(f, "{indent}[{sub_header}]")?;
            write_table_body(f, &sub_header, sub, depth + 1)?;
        }
    }
    Ok(())
}

/// TOML literal for a value. Tables only appear here inside arrays, which
/// `render` rejects, so they fall back to inline-table syntax.
pub fn format_value(value: &Value) -> String {
    match value {
        Value::Boolean(b) => b.to_string(),
        Value::Integer(i) => i.to_string(),
        Value::Float(x) => format_float(*x),
        Value::String(s) => quote(s),
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().map(format_value).collect();
            format!("[{}]", parts.join(", "))
        }
        Value::Table(table) => {
            let parts: Vec<String> = table
                .iter()
                .map(|(k, v)| format!("{} = {}", format_key(k), format_value(v)))
                .collect();
            format!("{{ {} }}", parts.join(", "))
        }
    }
}

/// Floats always carry a decimal point: `1.0`, never `1`.
fn format_float(x: f64) -> String {
    let s = x.to_string();
    if s.contains('.') || !x.is_finite() {
        s
    } else {
        format!("{s}.0")
    }
}

/// Bare key when possible, quoted otherwise.
pub fn format_key(key: &str) -> String {
    let bare = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if bare { key.to_string() } else { quote(key) }
}

/// Double-quoted TOML basic string.
fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{8}' => out.push_str("\\b"),
            '\u{c}' => out.push_str("\\f"),
            c if c.is_control() => {
                let _ = write!(out, "\\u{:04X}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}
