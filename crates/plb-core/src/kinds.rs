//! Built-in property tables for the three resource kinds

use crate::schema::{GroupId, ResourceKind, Schema};
use std::sync::LazyLock;

const PROBE_MEMBERS: [&str; 8] = [
    "probe_type",
    "probe_dns_host",
    "probe_frequency",
    "probe_port",
    "probe_retry_down",
    "probe_retry_up",
    "probe_timeout",
    "probe_control",
];

static SERVICE: LazyLock<Schema> = LazyLock::new(|| {
    Schema::builder(ResourceKind::Service, &["name"])
        .scalar("access_list")
        .scalar("device_group")
        .scalar("exclude_access_list")
        .scalar("load_bal_buckets")
        .scalar("load_bal_mask_pos")
        .scalar("load_bal_method_bundle_hash")
        .scalar("load_bal_method_bundle_select")
        .scalar("load_bal_method_end_port")
        .scalar("load_bal_method_proto")
        .scalar("load_bal_method_start_port")
        .scalar("peer_local")
        .tuples("ingress_interface")
        .tuples("virtual_ip")
        .flag("fail_action")
        .flag("load_bal_enable")
        .flag("nat_destination")
        .activation_gate("shutdown")
        .group(
            GroupId::LoadBalance,
            &[
                "load_bal_buckets",
                "load_bal_mask_pos",
                "load_bal_method_bundle_hash",
                "load_bal_method_bundle_select",
                "load_bal_method_end_port",
                "load_bal_method_proto",
                "load_bal_method_start_port",
                "load_bal_enable",
            ],
        )
        .build()
        .expect("service schema is well-formed")
});

static DEVICE_GROUP: LazyLock<Schema> = LazyLock::new(|| {
    Schema::builder(ResourceKind::DeviceGroup, &["name"])
        .scalar("probe_type")
        .scalar("probe_dns_host")
        .scalar("probe_frequency")
        .scalar("probe_port")
        .scalar("probe_retry_down")
        .scalar("probe_retry_up")
        .scalar("probe_timeout")
        .flag("probe_control")
        .group(GroupId::Probe, &PROBE_MEMBERS)
        .build()
        .expect("device group schema is well-formed")
});

static DEVICE_GROUP_NODE: LazyLock<Schema> = LazyLock::new(|| {
    Schema::builder(ResourceKind::DeviceGroupNode, &["plbdg", "node", "node_type"])
        .scalar("probe_type")
        .scalar("probe_dns_host")
        .scalar("probe_frequency")
        .scalar("probe_port")
        .scalar("probe_retry_down")
        .scalar("probe_retry_up")
        .scalar("probe_timeout")
        .scalar("weight")
        .flag("hot_standby")
        .flag("probe_control")
        .group(GroupId::Probe, &PROBE_MEMBERS)
        .group(GroupId::HotStandbyWeight, &["hot_standby", "weight"])
        .build()
        .expect("device group node schema is well-formed")
});

/// Static schema for a resource kind
pub fn schema(kind: ResourceKind) -> &'static Schema {
    match kind {
        ResourceKind::Service => &SERVICE,
        ResourceKind::DeviceGroup => &DEVICE_GROUP,
        ResourceKind::DeviceGroupNode => &DEVICE_GROUP_NODE,
    }
}
