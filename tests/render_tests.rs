//! Config document rendering against a realistic parameter set.
//!
//! The rendered text is parsed back with the `toml` crate to check it is a
//! valid document with the expected structure.

use serde_json::json;
use telegraf_provision::{ProvisionParams, render};

fn sample_params() -> ProvisionParams {
    serde_json::from_value(json!({
        "ensure": "1.3.5-1",
        "interval": "60s",
        "metric_batch_size": "1000",
        "metric_buffer_limit": "10000",
        "flush_interval": "60s",
        "global_tags": {"dc": "dc", "env": "production", "role": "telegraf"},
        "inputs": [{
            "cpu": [{"percpu": true, "totalcpu": true, "fielddrop": ["time_*"]}],
            "disk": [{"ignore_fs": ["tmpfs", "devtmpfs"]}],
            "diskio": [{}],
            "kernel": [{}],
            "exec": [
                {"commands": ["who | wc -l"]},
                {"commands": ["cat /proc/uptime | awk '{print $1}'"]}
            ],
            "mem": [{}],
            "net": [{"interfaces": ["eth0"], "drop": ["net_icmp"]}],
            "netstat": [{}],
            "ping": [{"urls": ["10.10.10.1"], "count": 1, "timeout": 1.0}],
            "statsd": [{
                "service_address": ":8125",
                "delete_gauges": false,
                "delete_counters": false,
                "delete_sets": false,
                "delete_timings": true,
                "percentiles": [90],
                "allowed_pending_messages": 10000,
                "convert_names": true,
                "percentile_limit": 1000,
                "udp_packet_size": 1500
            }],
            "swap": [{}],
            "system": [{}]
        }],
        "outputs": [{
            "influxdb": [{
                "urls": ["http://influxdb.example.com:8086"],
                "database": "telegraf",
                "username": "telegraf",
                "password": "telegraf"
            }]
        }]
    }))
    .unwrap()
}

fn rendered() -> String {
    let tree = sample_params().plugin_tree().unwrap();
    render(&tree).unwrap().to_string()
}

#[test]
fn test_sample_document_parses() {
    let text = rendered();
    let doc: toml::Table = toml::from_str(&text).unwrap();

    assert_eq!(doc["agent"]["interval"].as_str(), Some("60s"));
    assert_eq!(doc["agent"]["metric_batch_size"].as_integer(), Some(1000));
    assert_eq!(doc["agent"]["metric_buffer_limit"].as_integer(), Some(10000));
    assert_eq!(doc["global_tags"]["env"].as_str(), Some("production"));

    let exec = doc["inputs"]["exec"].as_array().unwrap();
    assert_eq!(exec.len(), 2);
    assert_eq!(
        exec[1]["commands"][0].as_str(),
        Some("cat /proc/uptime | awk '{print $1}'")
    );

    let ping = &doc["inputs"]["ping"][0];
    assert_eq!(ping["timeout"].as_float(), Some(1.0));
    assert_eq!(ping["count"].as_integer(), Some(1));

    let statsd = &doc["inputs"]["statsd"][0];
    assert_eq!(statsd["percentiles"][0].as_integer(), Some(90));
    assert_eq!(statsd["delete_timings"].as_bool(), Some(true));

    let influxdb = &doc["outputs"]["influxdb"][0];
    assert_eq!(influxdb["database"].as_str(), Some("telegraf"));
}

#[test]
fn test_sample_document_order() {
    let text = rendered();
    let headers: Vec<&str> = text
        .lines()
        .filter(|l| l.starts_with('['))
        .collect();

    assert_eq!(
        headers,
        vec![
            "[agent]",
            "[global_tags]",
            "[[inputs.cpu]]",
            "[[inputs.disk]]",
            "[[inputs.diskio]]",
            "[[inputs.kernel]]",
            "[[inputs.exec]]",
            "[[inputs.exec]]",
            "[[inputs.mem]]",
            "[[inputs.net]]",
            "[[inputs.netstat]]",
            "[[inputs.ping]]",
            "[[inputs.statsd]]",
            "[[inputs.swap]]",
            "[[inputs.system]]",
            "[[outputs.influxdb]]",
        ]
    );
}

#[test]
fn test_sample_agent_and_tags_blocks() {
    let text = rendered();
    assert!(text.contains(
        "[agent]\n  interval = \"60s\"\n  metric_batch_size = 1000\n  metric_buffer_limit = 10000\n  flush_interval = \"60s\"\n"
    ));
    assert!(text.contains(
        "[global_tags]\n  dc = \"dc\"\n  env = \"production\"\n  role = \"telegraf\"\n"
    ));
}

#[test]
fn test_instance_keys_keep_supplied_order() {
    let text = rendered();
    assert!(text.contains(
        "[[inputs.cpu]]\n  percpu = true\n  totalcpu = true\n  fielddrop = [\"time_*\"]\n"
    ));
    assert!(text.contains("[[inputs.disk]]\n  ignore_fs = [\"tmpfs\", \"devtmpfs\"]\n"));
}

#[test]
fn test_list_and_map_forms_render_identically() {
    let list: ProvisionParams = serde_json::from_value(json!({
        "inputs": [{"cpu": [{"percpu": true}]}, {"mem": [{}]}]
    }))
    .unwrap();
    let map: ProvisionParams = serde_json::from_value(json!({
        "inputs": {"cpu": [{"percpu": true}], "mem": [{}]}
    }))
    .unwrap();

    let from_list = render(&list.plugin_tree().unwrap()).unwrap().to_string();
    let from_map = render(&map.plugin_tree().unwrap()).unwrap().to_string();
    assert_eq!(from_list, from_map);
}

#[test]
fn test_empty_and_absent_plugin_lists_equivalent() {
    let empty: ProvisionParams =
        serde_json::from_value(json!({"inputs": {"cpu": []}})).unwrap();
    let absent = ProvisionParams::default();

    assert_eq!(
        render(&empty.plugin_tree().unwrap()).unwrap().to_string(),
        render(&absent.plugin_tree().unwrap()).unwrap().to_string()
    );
}

#[test]
fn test_nested_tables_parse() {
    let params: ProvisionParams = serde_json::from_value(json!({
        "inputs": {"cpu": [{
            "percpu": true,
            "tagpass": {"cpu": ["cpu0", "cpu1"]},
            "fieldpass": ["usage_idle"]
        }]}
    }))
    .unwrap();
    let text = render(&params.plugin_tree().unwrap()).unwrap().to_string();
    let doc: toml::Table = toml::from_str(&text).unwrap();

    let cpu = &doc["inputs"]["cpu"][0];
    assert_eq!(cpu["percpu"].as_bool(), Some(true));
    assert_eq!(cpu["fieldpass"][0].as_str(), Some("usage_idle"));
    assert_eq!(cpu["tagpass"]["cpu"][1].as_str(), Some("cpu1"));
}
