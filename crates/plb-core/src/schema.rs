//! Property schema: a static description of every property of a resource kind
//!
//! Each resource kind declares its properties once through [`SchemaBuilder`].
//! The resulting [`Schema`] is the single source the diff engine, the
//! capability table and the flush executor consult; nothing is discovered at
//! apply time.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The reconciled object types
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Service,
    DeviceGroup,
    DeviceGroupNode,
}

impl ResourceKind {
    pub const ALL: [Self; 3] = [Self::DeviceGroup, Self::DeviceGroupNode, Self::Service];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Service => "service",
            Self::DeviceGroup => "device_group",
            Self::DeviceGroupNode => "device_group_node",
        }
    }

    /// Dependency rank: groups before their nodes, nodes before services
    pub fn rank(self) -> u8 {
        match self {
            Self::DeviceGroup => 0,
            Self::DeviceGroupNode => 1,
            Self::Service => 2,
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "service" | "plb_service" => Ok(Self::Service),
            "device_group" | "plb_device_group" => Ok(Self::DeviceGroup),
            "device_group_node" | "plb_device_group_node" => Ok(Self::DeviceGroupNode),
            other => Err(Error::UnknownKind(other.to_string())),
        }
    }
}

/// Shape of a property value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyKind {
    Scalar,
    /// Tri-state boolean
    Flag,
    /// Whole-list replacement, compared as a set of tuples
    TupleList,
}

/// Composite groups: properties the device only accepts in one call
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupId {
    Probe,
    LoadBalance,
    HotStandbyWeight,
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Probe => "probe",
            Self::LoadBalance => "load_balance",
            Self::HotStandbyWeight => "hot_standby_weight",
        })
    }
}

/// One property of a resource kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertySpec {
    pub name: &'static str,
    pub kind: PropertyKind,
    pub group: Option<GroupId>,
    pub activation_gate: bool,
}

impl PropertySpec {
    pub fn is_composite_member(&self) -> bool {
        self.group.is_some()
    }

    /// Neither a group member nor the activation gate
    pub fn is_plain(&self) -> bool {
        self.group.is_none() && !self.activation_gate
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompositeGroup {
    pub id: GroupId,
    pub members: Vec<&'static str>,
}

/// Static property table for one resource kind
#[derive(Debug, Clone)]
pub struct Schema {
    kind: ResourceKind,
    key_fields: &'static [&'static str],
    properties: Vec<PropertySpec>,
    groups: Vec<CompositeGroup>,
}

impl Schema {
    pub fn builder(kind: ResourceKind, key_fields: &'static [&'static str]) -> SchemaBuilder {
        SchemaBuilder {
            kind,
            key_fields,
            properties: Vec::new(),
            groups: Vec::new(),
        }
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// Identity fields, in identity order
    pub fn key_fields(&self) -> &'static [&'static str] {
        self.key_fields
    }

    /// All properties in declaration order
    pub fn properties(&self) -> &[PropertySpec] {
        &self.properties
    }

    pub fn property(&self, name: &str) -> Option<&PropertySpec> {
        self.properties.iter().find(|p| p.name == name)
    }

    pub fn groups(&self) -> &[CompositeGroup] {
        &self.groups
    }

    pub fn activation_gate(&self) -> Option<&PropertySpec> {
        self.properties.iter().find(|p| p.activation_gate)
    }

    pub fn plain_properties(&self) -> impl Iterator<Item = &PropertySpec> {
        self.properties.iter().filter(|p| p.is_plain())
    }
}

/// Builds a [`Schema`] from declarations
///
/// ```ignore
/// let schema = Schema::builder(ResourceKind::DeviceGroup, &["name"])
///     .scalar("probe_type")
///     .flag("probe_control")
///     .group(GroupId::Probe, &["probe_type", "probe_control"])
///     .build()?;
/// ```
#[derive(Debug)]
pub struct SchemaBuilder {
    kind: ResourceKind,
    key_fields: &'static [&'static str],
    properties: Vec<PropertySpec>,
    groups: Vec<CompositeGroup>,
}

impl SchemaBuilder {
    fn push(mut self, name: &'static str, kind: PropertyKind, activation_gate: bool) -> Self {
        self.properties.push(PropertySpec {
            name,
            kind,
            group: None,
            activation_gate,
        });
        self
    }

    pub fn scalar(self, name: &'static str) -> Self {
        self.push(name, PropertyKind::Scalar, false)
    }

    pub fn flag(self, name: &'static str) -> Self {
        self.push(name, PropertyKind::Flag, false)
    }

    pub fn tuples(self, name: &'static str) -> Self {
        self.push(name, PropertyKind::TupleList, false)
    }

    /// The administrative shut property; `true` means shut
    pub fn activation_gate(self, name: &'static str) -> Self {
        self.push(name, PropertyKind::Flag, true)
    }

    /// Bind already-declared properties into a composite group
    pub fn group(mut self, id: GroupId, members: &[&'static str]) -> Self {
        self.groups.push(CompositeGroup {
            id,
            members: members.to_vec(),
        });
        self
    }

    pub fn build(mut self) -> Result<Schema> {
        let invalid = |reason: String| Error::InvalidSchema {
            kind: self.kind,
            reason,
        };

        if self.properties.iter().filter(|p| p.activation_gate).count() > 1 {
            return Err(invalid("more than one activation gate".to_string()));
        }

        for (i, spec) in self.properties.iter().enumerate() {
            if self.properties[..i].iter().any(|p| p.name == spec.name) {
                return Err(invalid(format!("property `{}` declared twice", spec.name)));
            }
        }

        for group in &self.groups {
            for member in &group.members {
                let Some(spec) = self.properties.iter_mut().find(|p| p.name == *member) else {
                    return Err(Error::InvalidSchema {
                        kind: self.kind,
                        reason: format!("group {} names undeclared property `{member}`", group.id),
                    });
                };
                if spec.activation_gate {
                    return Err(Error::InvalidSchema {
                        kind: self.kind,
                        reason: format!("activation gate `{member}` cannot join group {}", group.id),
                    });
                }
                if let Some(existing) = spec.group {
                    return Err(Error::InvalidSchema {
                        kind: self.kind,
                        reason: format!("`{member}` already belongs to group {existing}"),
                    });
                }
                spec.group = Some(group.id);
            }
        }

        Ok(Schema {
            kind: self.kind,
            key_fields: self.key_fields,
            properties: self.properties,
            groups: self.groups,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Schema {
        Schema::builder(ResourceKind::Service, &["name"])
            .scalar("access_list")
            .tuples("ingress_interface")
            .flag("load_bal_enable")
            .scalar("load_bal_buckets")
            .activation_gate("shutdown")
            .group(GroupId::LoadBalance, &["load_bal_buckets", "load_bal_enable"])
            .build()
            .unwrap()
    }

    #[test]
    fn test_group_members_are_not_plain() {
        let schema = sample();
        let plain: Vec<_> = schema.plain_properties().map(|p| p.name).collect();
        assert_eq!(plain, vec!["access_list", "ingress_interface"]);
        assert!(schema.property("load_bal_enable").unwrap().is_composite_member());
        assert_eq!(schema.activation_gate().unwrap().name, "shutdown");
    }

    #[test]
    fn test_two_gates_rejected() {
        let err = Schema::builder(ResourceKind::Service, &["name"])
            .activation_gate("shutdown")
            .activation_gate("disabled")
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::InvalidSchema { .. }));
    }

    #[test]
    fn test_group_member_must_be_declared() {
        let err = Schema::builder(ResourceKind::DeviceGroup, &["name"])
            .scalar("probe_type")
            .group(GroupId::Probe, &["probe_type", "probe_port"])
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("probe_port"));
    }

    #[test]
    fn test_kind_from_str_accepts_prefixed_names() {
        assert_eq!(
            "plb_device_group_node".parse::<ResourceKind>().unwrap(),
            ResourceKind::DeviceGroupNode
        );
        assert!("router".parse::<ResourceKind>().is_err());
    }
}
