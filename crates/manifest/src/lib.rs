//! # Manifest
//!
//! Declared load-balancing objects, read from TOML.
//!
//! A manifest holds one array of tables per resource kind. Each entry names
//! its identity fields, an optional `ensure`, and property values typed by
//! the kind's schema:
//!
//! ```toml
//! [[device_group]]
//! name = "udpGroup"
//! probe_type = "udp"
//! probe_port = 53
//! probe_frequency = "default"
//!
//! [[device_group_node]]
//! plbdg = "udpGroup"
//! node = "1.1.1.1"
//! node_type = "ip"
//! weight = 5
//!
//! [[service]]
//! name = "web"
//! ingress_interface = [["vlan2", "4.4.4.4"]]
//! virtual_ip = ["ip 3.3.3.3 255.0.0.0 tcp 500"]
//! shutdown = false
//! ```
//!
//! The string `default` (or a list starting with `default`) asks for the
//! device's built-in value.
//!
//! ## Example
//!
//! ```no_run
//! use std::path::Path;
//!
//! let manifest = manifest::load(Path::new("plb.toml"))?;
//! for descriptor in manifest.resources() {
//!     println!("{}", descriptor.key());
//! }
//! # Ok::<(), manifest::Error>(())
//! ```

mod error;
mod types;

pub use error::{Error, Result};
pub use types::{Manifest, ManifestStats};

use plb_core::value::DEFAULT_TOKEN;
use plb_core::{
    Desired, Ensure, Identity, PropertyKind, ResourceDescriptor, ResourceKind, TriState, Value,
    kinds,
};
use std::collections::BTreeSet;
use std::path::Path;
use toml::{Table, Value as Toml};

/// Read and parse a manifest file
pub fn load(path: &Path) -> Result<Manifest> {
    if !path.exists() {
        return Err(Error::PathNotFound(path.to_path_buf()));
    }
    let content = std::fs::read_to_string(path)?;
    parse(&content)
}

/// Parse a manifest document
pub fn parse(content: &str) -> Result<Manifest> {
    let document: Table = toml::from_str(content)?;
    let mut manifest = Manifest::default();

    // declaration order of kinds in the file does not matter
    let mut sections: Vec<(ResourceKind, &Vec<Toml>)> = Vec::new();
    for (name, entries) in &document {
        let kind: ResourceKind = name
            .parse()
            .map_err(|_| Error::UnknownKind(name.clone()))?;
        let Toml::Array(entries) = entries else {
            return Err(Error::NotAnArray(name.clone()));
        };
        sections.push((kind, entries));
    }
    sections.sort_by_key(|(kind, _)| kind.rank());

    for (kind, entries) in sections {
        let mut seen = BTreeSet::new();
        for (index, entry) in entries.iter().enumerate() {
            let Toml::Table(table) = entry else {
                return Err(Error::NotAnArray(kind.to_string()));
            };
            let descriptor = descriptor(kind, index, table)?;
            if !seen.insert(descriptor.identity().clone()) {
                return Err(Error::DuplicateIdentity {
                    kind,
                    identity: descriptor.identity().to_string(),
                });
            }
            manifest.push(descriptor);
        }
    }

    Ok(manifest)
}

fn descriptor(kind: ResourceKind, index: usize, table: &Table) -> Result<ResourceDescriptor> {
    let schema = kinds::schema(kind);
    let wrap = |source: plb_core::Error| Error::Resource {
        kind,
        index,
        source,
    };

    let mut fields = Vec::with_capacity(schema.key_fields().len());
    for &field in schema.key_fields() {
        match table.get(field) {
            Some(Toml::String(s)) => fields.push(s.clone()),
            _ => return Err(Error::MissingField { kind, index, field }),
        }
    }

    let mut descriptor =
        ResourceDescriptor::new(kind, Identity::composite(fields)).map_err(wrap)?;

    for (name, raw) in table {
        if schema.key_fields().contains(&name.as_str()) {
            continue;
        }
        if name == "ensure" {
            descriptor = descriptor.with_ensure(ensure(kind, index, raw)?);
            continue;
        }
        let Some(spec) = schema.property(name) else {
            return Err(wrap(plb_core::Error::UnknownProperty {
                kind,
                property: name.clone(),
            }));
        };
        let desired = desired(spec.kind, raw).map_err(|reason| Error::BadValue {
            kind,
            index,
            property: name.clone(),
            reason,
        })?;
        descriptor = descriptor.with(spec.name, desired).map_err(wrap)?;
    }

    Ok(descriptor)
}

fn ensure(kind: ResourceKind, index: usize, raw: &Toml) -> Result<Ensure> {
    match raw.as_str() {
        Some("present") => Ok(Ensure::Present),
        Some("absent") => Ok(Ensure::Absent),
        _ => Err(Error::BadValue {
            kind,
            index,
            property: "ensure".to_string(),
            reason: format!("expected \"present\" or \"absent\", got {raw}"),
        }),
    }
}

fn is_default(raw: &Toml) -> bool {
    match raw {
        Toml::String(s) => s == DEFAULT_TOKEN,
        Toml::Array(items) => items.first().and_then(Toml::as_str) == Some(DEFAULT_TOKEN),
        _ => false,
    }
}

/// Type a raw value by the kind its property declares
fn desired(kind: PropertyKind, raw: &Toml) -> std::result::Result<Desired, String> {
    if is_default(raw) {
        return Ok(Desired::Default);
    }
    let value = match (kind, raw) {
        (PropertyKind::Scalar, Toml::String(s)) => Value::text(s.as_str()),
        (PropertyKind::Scalar, Toml::Integer(n)) => Value::Int(*n),
        (PropertyKind::Flag, Toml::Boolean(b)) => Value::flag(*b),
        (PropertyKind::Flag, Toml::String(s)) => match TriState::parse(s) {
            Some(state) => Value::Flag(state),
            None => return Err(format!("expected true or false, got \"{s}\"")),
        },
        (PropertyKind::TupleList, Toml::String(s)) => Value::tuples([[s.as_str()]]),
        (PropertyKind::TupleList, Toml::Array(rows)) => {
            let mut tuples = Vec::with_capacity(rows.len());
            for row in rows {
                tuples.push(tuple(row)?);
            }
            Value::Tuples(tuples)
        }
        (PropertyKind::Scalar, other) => {
            return Err(format!("expected a string or integer, got {}", other.type_str()));
        }
        (PropertyKind::Flag, other) => {
            return Err(format!("expected a boolean, got {}", other.type_str()));
        }
        (PropertyKind::TupleList, other) => {
            return Err(format!("expected a list, got {}", other.type_str()));
        }
    };
    Ok(Desired::Value(value))
}

fn tuple(row: &Toml) -> std::result::Result<Vec<String>, String> {
    match row {
        Toml::String(s) => Ok(vec![s.clone()]),
        Toml::Array(items) => items
            .iter()
            .map(|item| match item {
                Toml::String(s) => Ok(s.clone()),
                Toml::Integer(n) => Ok(n.to_string()),
                other => Err(format!("tuple entries must be strings, got {}", other.type_str())),
            })
            .collect(),
        other => Err(format!("expected a tuple, got {}", other.type_str())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SAMPLE: &str = r#"
[[service]]
name = "web"
access_list = "iap"
ingress_interface = [["vlan2", "4.4.4.4"], ["port-channel100", "6.6.6.6"]]
virtual_ip = ["ip 3.3.3.3 255.0.0.0 tcp 500", "ip 4.4.4.4 255.0.0.0"]
load_bal_buckets = 16
load_bal_enable = "true"
peer_local = "default"
shutdown = false

[[device_group]]
name = "udpGroup"
probe_type = "udp"
probe_port = 53
probe_frequency = "default"

[[device_group_node]]
plbdg = "udpGroup"
node = "1.1.1.1"
node_type = "ip"
weight = 5
hot_standby = true

[[device_group_node]]
plbdg = "udpGroup"
node = "2.2.2.2"
node_type = "ip"
ensure = "absent"
"#;

    #[test]
    fn test_parse_sample() {
        let manifest = parse(SAMPLE).unwrap();
        assert_eq!(manifest.len(), 4);
        let stats = ManifestStats::from(&manifest);
        assert_eq!(stats.services, 1);
        assert_eq!(stats.nodes, 2);
        assert_eq!(stats.absent, 1);
    }

    #[test]
    fn test_kinds_come_out_in_dependency_order() {
        let manifest = parse(SAMPLE).unwrap();
        let kinds: Vec<_> = manifest.resources().iter().map(ResourceDescriptor::kind).collect();
        assert_eq!(
            kinds,
            vec![
                ResourceKind::DeviceGroup,
                ResourceKind::DeviceGroupNode,
                ResourceKind::DeviceGroupNode,
                ResourceKind::Service,
            ]
        );
    }

    #[test]
    fn test_values_are_typed_by_schema() {
        let manifest = parse(SAMPLE).unwrap();
        let web = &manifest.of_kind(ResourceKind::Service)[0];
        assert_eq!(
            web.get("load_bal_enable").and_then(Desired::literal),
            Some(&Value::flag(true))
        );
        assert_eq!(
            web.get("load_bal_buckets").and_then(Desired::literal),
            Some(&Value::Int(16))
        );
        assert_eq!(
            web.get("virtual_ip").and_then(Desired::literal),
            Some(&Value::tuples([
                ["ip 3.3.3.3 255.0.0.0 tcp 500"],
                ["ip 4.4.4.4 255.0.0.0"]
            ]))
        );
        assert!(web.get("peer_local").unwrap().is_default());
    }

    #[test]
    fn test_default_list_is_sentinel() {
        let manifest = parse(
            r#"
[[service]]
name = "web"
ingress_interface = ["default"]
"#,
        )
        .unwrap();
        let web = &manifest.resources()[0];
        assert!(web.get("ingress_interface").unwrap().is_default());
    }

    #[test]
    fn test_node_identity_and_ensure() {
        let manifest = parse(SAMPLE).unwrap();
        let absent = manifest.of_kind_ensure(ResourceKind::DeviceGroupNode, Ensure::Absent);
        assert_eq!(absent.len(), 1);
        assert_eq!(absent[0].identity().to_string(), "udpGroup 2.2.2.2 ip");
    }

    #[test]
    fn test_unknown_kind_rejected() {
        let err = parse("[[router]]\nname = \"r1\"\n").unwrap_err();
        assert!(matches!(err, Error::UnknownKind(k) if k == "router"));
    }

    #[test]
    fn test_unknown_property_rejected() {
        let err = parse("[[device_group]]\nname = \"g\"\nweight = 5\n").unwrap_err();
        assert!(err.to_string().contains("weight"));
    }

    #[test]
    fn test_missing_identity_field_rejected() {
        let err = parse("[[device_group_node]]\nplbdg = \"g\"\nnode = \"1.1.1.1\"\n").unwrap_err();
        assert!(matches!(
            err,
            Error::MissingField {
                field: "node_type",
                ..
            }
        ));
    }

    #[test]
    fn test_duplicate_identity_rejected() {
        let err = parse("[[device_group]]\nname = \"g\"\n\n[[device_group]]\nname = \"g\"\n")
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateIdentity { .. }));
    }

    #[test]
    fn test_bad_flag_value_rejected() {
        let err = parse("[[service]]\nname = \"web\"\nfail_action = \"maybe\"\n").unwrap_err();
        assert!(matches!(err, Error::BadValue { ref property, .. } if property == "fail_action"));
    }

    #[test]
    fn test_bad_ensure_rejected() {
        let err = parse("[[service]]\nname = \"web\"\nensure = \"gone\"\n").unwrap_err();
        assert!(err.to_string().contains("ensure"));
    }

    #[test]
    fn test_load_from_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("plb.toml");
        std::fs::write(&path, SAMPLE).unwrap();

        let manifest = load(&path).unwrap();
        assert_eq!(manifest.len(), 4);
    }

    #[test]
    fn test_load_missing_file() {
        let tmp = TempDir::new().unwrap();
        let err = load(&tmp.path().join("nope.toml")).unwrap_err();
        assert!(matches!(err, Error::PathNotFound(_)));
    }
}
