//! Plugin tree: agent globals plus ordered input and output plugin sets.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

use super::value::{Table, Value, index_path, json_type_name, key_path};
use crate::error::{ProvisionError, Result};
use crate::types::PluginCategory;

/// Global `[agent]` settings and `[global_tags]`.
///
/// The four core settings are always rendered; the optional ones only when set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    pub interval: String,
    #[serde(deserialize_with = "count_from_number_or_string")]
    pub metric_batch_size: u32,
    #[serde(deserialize_with = "count_from_number_or_string")]
    pub metric_buffer_limit: u32,
    pub flush_interval: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub omit_hostname: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub round_interval: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection_jitter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flush_jitter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub precision: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logfile: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quiet: Option<bool>,
    /// Rendered sorted by tag name.
    pub global_tags: BTreeMap<String, String>,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            interval: "10s".to_string(),
            metric_batch_size: 1000,
            metric_buffer_limit: 10000,
            flush_interval: "10s".to_string(),
            hostname: None,
            omit_hostname: None,
            round_interval: None,
            collection_jitter: None,
            flush_jitter: None,
            precision: None,
            logfile: None,
            debug: None,
            quiet: None,
            global_tags: BTreeMap::new(),
        }
    }
}

impl AgentSettings {
    /// The `[agent]` table in its fixed key order.
    pub fn agent_table(&self) -> Table {
        let mut table = Table::new()
            .with("interval", self.interval.as_str())
            .with("metric_batch_size", i64::from(self.metric_batch_size))
            .with("metric_buffer_limit", i64::from(self.metric_buffer_limit))
            .with("flush_interval", self.flush_interval.as_str());

        let optional: [(&str, Option<Value>); 9] = [
            ("hostname", self.hostname.clone().map(Value::from)),
            ("omit_hostname", self.omit_hostname.map(Value::from)),
            ("round_interval", self.round_interval.map(Value::from)),
            ("collection_jitter", self.collection_jitter.clone().map(Value::from)),
            ("flush_jitter", self.flush_jitter.clone().map(Value::from)),
            ("precision", self.precision.clone().map(Value::from)),
            ("logfile", self.logfile.clone().map(Value::from)),
            ("debug", self.debug.map(Value::from)),
            ("quiet", self.quiet.map(Value::from)),
        ];
        for (key, value) in optional {
            if let Some(value) = value {
                table.insert(key, value);
            }
        }
        table
    }

    /// The `[global_tags]` table, sorted by tag name.
    pub fn tags_table(&self) -> Table {
        self.global_tags
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

/// Accepts `1000`, `"1000"` or `"10_000"`; underscores must sit between digits.
fn count_from_number_or_string<'de, D>(deserializer: D) -> std::result::Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Count {
        Number(u32),
        Text(String),
    }

    match Count::deserialize(deserializer)? {
        Count::Number(n) => Ok(n),
        Count::Text(s) => parse_count(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid count '{s}'"))),
    }
}

/// Decimal digits, with single underscores allowed only between digits.
fn parse_count(text: &str) -> Option<u32> {
    let digits = text.trim();
    let well_formed = digits.starts_with(|c: char| c.is_ascii_digit())
        && digits.ends_with(|c: char| c.is_ascii_digit())
        && digits.chars().all(|c| c.is_ascii_digit() || c == '_')
        && !digits.contains("__");
    if !well_formed {
        return None;
    }
    digits.replace('_', "").parse().ok()
}

// ============================================================================
// Plugin sets
// ============================================================================

/// Insertion-ordered mapping of plugin name → instances.
///
/// A name with no instances is never stored, so an empty sequence and an
/// absent name compare equal.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PluginSet {
    plugins: Vec<(String, Vec<Table>)>,
}

impl PluginSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one instance of `name`, after any instances already present.
    pub fn push(&mut self, name: impl Into<String>, instance: Table) {
        let name = name.into();
        match self.plugins.iter_mut().find(|(n, _)| *n == name) {
            Some((_, instances)) => instances.push(instance),
            None => self.plugins.push((name, vec![instance])),
        }
    }

    /// Builder-style `push`.
    pub fn with_instance(mut self, name: impl Into<String>, instance: Table) -> Self {
        self.push(name, instance);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Table])> {
        self.plugins.iter().map(|(n, i)| (n.as_str(), i.as_slice()))
    }

    pub fn instances(&self, name: &str) -> &[Table] {
        self.plugins
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, i)| i.as_slice())
            .unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Total number of instances across all plugin names.
    pub fn instance_count(&self) -> usize {
        self.plugins.iter().map(|(_, i)| i.len()).sum()
    }

    /// Build a plugin set from JSON.
    ///
    /// Accepts `null` (empty), an object of `name → instances`, or an array of
    /// such objects which are merged in order. Instances are an array of
    /// objects, or a single object standing for one instance.
    pub fn from_json(value: &serde_json::Value, category: PluginCategory) -> Result<Self> {
        let root = category.to_string();
        let mut set = Self::new();

        match value {
            serde_json::Value::Null => {}
            serde_json::Value::Object(_) => set.merge_json_object(value, &root)?,
            serde_json::Value::Array(items) => {
                for item in items {
                    set.merge_json_object(item, &root)?;
                }
            }
            other => {
                return Err(ProvisionError::unsupported_value(
                    root,
                    format!("expected an object or a list of objects, found {}", json_type_name(other)),
                ));
            }
        }

        Ok(set)
    }

    fn merge_json_object(&mut self, value: &serde_json::Value, root: &str) -> Result<()> {
        let serde_json::Value::Object(map) = value else {
            return Err(ProvisionError::unsupported_value(
                root,
                format!("expected an object of plugins, found {}", json_type_name(value)),
            ));
        };

        for (name, instances) in map {
            let plugin_path = key_path(root, name);
            let offset = self.instances(name).len();
            match instances {
                serde_json::Value::Array(items) => {
                    for (i, item) in items.iter().enumerate() {
                        let table = Table::from_json(item, &index_path(&plugin_path, offset + i))?;
                        self.push(name.clone(), table);
                    }
                }
                serde_json::Value::Object(_) => {
                    let table = Table::from_json(instances, &index_path(&plugin_path, offset))?;
                    self.push(name.clone(), table);
                }
                other => {
                    return Err(ProvisionError::unsupported_value(
                        plugin_path,
                        format!("expected a list of instances, found {}", json_type_name(other)),
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Caller-supplied configuration intent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PluginTree {
    pub agent: AgentSettings,
    pub inputs: PluginSet,
    pub outputs: PluginSet,
}

impl PluginTree {
    pub fn plugins(&self, category: PluginCategory) -> &PluginSet {
        match category {
            PluginCategory::Inputs => &self.inputs,
            PluginCategory::Outputs => &self.outputs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_agent_table_fixed_order() {
        let agent = AgentSettings {
            interval: "60s".to_string(),
            flush_interval: "60s".to_string(),
            ..AgentSettings::default()
        };
        let table = agent.agent_table();
        let keys: Vec<&str> = table.keys().collect();
        assert_eq!(
            keys,
            vec!["interval", "metric_batch_size", "metric_buffer_limit", "flush_interval"]
        );
    }

    #[test]
    fn test_agent_table_optional_settings() {
        let agent = AgentSettings {
            hostname: Some("web01".to_string()),
            round_interval: Some(true),
            precision: Some("1s".to_string()),
            quiet: Some(false),
            ..AgentSettings::default()
        };
        let table = agent.agent_table();
        let keys: Vec<&str> = table.keys().collect();
        assert_eq!(
            keys,
            vec![
                "interval",
                "metric_batch_size",
                "metric_buffer_limit",
                "flush_interval",
                "hostname",
                "round_interval",
                "precision",
                "quiet"
            ]
        );
    }

    #[test]
    fn test_agent_settings_accepts_string_counts() {
        let agent: AgentSettings = serde_json::from_value(json!({
            "interval": "60s",
            "metric_batch_size": "1000",
            "metric_buffer_limit": "10_000"
        }))
        .unwrap();
        assert_eq!(agent.metric_batch_size, 1000);
        assert_eq!(agent.metric_buffer_limit, 10000);
        assert_eq!(agent.flush_interval, "10s");
    }

    #[test]
    fn test_agent_settings_rejects_bad_count() {
        let result: std::result::Result<AgentSettings, _> =
            serde_json::from_value(json!({"metric_batch_size": "lots"}));
        assert!(result.is_err());
    }

    #[test]
    fn test_count_underscores_only_between_digits() {
        assert_eq!(parse_count("10_000"), Some(10000));
        assert_eq!(parse_count(" 1_2_3 "), Some(123));
        for bad in ["_1__0_", "1__0", "1_", "_1", "_", ""] {
            assert_eq!(parse_count(bad), None, "accepted {bad:?}");
            let result: std::result::Result<AgentSettings, _> =
                serde_json::from_value(json!({"metric_buffer_limit": bad}));
            assert!(result.is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn test_tags_table_sorted() {
        let mut agent = AgentSettings::default();
        agent.global_tags.insert("role".into(), "telegraf".into());
        agent.global_tags.insert("dc".into(), "dc".into());
        let table = agent.tags_table();
        let keys: Vec<&str> = table.keys().collect();
        assert_eq!(keys, vec!["dc", "role"]);
    }

    #[test]
    fn test_plugin_set_object_form_keeps_order() {
        let value = json!({"mem": [{}], "cpu": [{"percpu": true}], "disk": [{}]});
        let set = PluginSet::from_json(&value, PluginCategory::Inputs).unwrap();
        let names: Vec<&str> = set.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["mem", "cpu", "disk"]);
    }

    #[test]
    fn test_plugin_set_list_form_merges() {
        let value = json!([
            {"exec": [{"commands": ["who | wc -l"]}]},
            {"mem": [{}]},
            {"exec": [{"commands": ["uptime"]}]}
        ]);
        let set = PluginSet::from_json(&value, PluginCategory::Inputs).unwrap();
        assert_eq!(set.instances("exec").len(), 2);
        assert_eq!(set.instance_count(), 3);
        let names: Vec<&str> = set.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["exec", "mem"]);
    }

    #[test]
    fn test_plugin_set_empty_sequence_equals_absent() {
        let with_empty = PluginSet::from_json(&json!({"cpu": [], "mem": [{}]}), PluginCategory::Inputs)
            .unwrap();
        let without = PluginSet::from_json(&json!({"mem": [{}]}), PluginCategory::Inputs).unwrap();
        assert_eq!(with_empty, without);
    }

    #[test]
    fn test_plugin_set_single_object_is_one_instance() {
        let set = PluginSet::from_json(&json!({"cpu": {"percpu": false}}), PluginCategory::Inputs)
            .unwrap();
        assert_eq!(set.instances("cpu").len(), 1);
    }

    #[test]
    fn test_plugin_set_null_is_empty() {
        let set = PluginSet::from_json(&serde_json::Value::Null, PluginCategory::Outputs).unwrap();
        assert!(set.is_empty());
    }

    #[test]
    fn test_plugin_set_bad_instances_reports_path() {
        let err = PluginSet::from_json(&json!({"cpu": "yes"}), PluginCategory::Inputs).unwrap_err();
        match err {
            ProvisionError::UnsupportedValueType { path, .. } => assert_eq!(path, "inputs.cpu"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_plugin_set_list_form_path_offsets() {
        let value = json!([
            {"exec": [{"commands": ["a"]}]},
            {"exec": [{"commands": [null]}]}
        ]);
        let err = PluginSet::from_json(&value, PluginCategory::Inputs).unwrap_err();
        assert!(err.to_string().contains("inputs.exec[1].commands[0]"));
    }
}
