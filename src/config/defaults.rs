//! Built-in chart defaults (layer 1)
//!
//! Hardcoded defaults for every value the renderer reads, plus the
//! built-in schema the resolved tree is checked against.

use serde::{Deserialize, Serialize};
use svcchart_schema::{FieldSpec, Schema, ValueKind};

/// Built-in default configuration values
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartDefaults {
    /// Replica count when autoscaling is off (default: 1)
    pub replica_count: u64,

    /// Image pull policy (default: "IfNotPresent")
    pub image_pull_policy: String,

    /// Port the container listens on (default: 8080)
    pub container_port: u64,

    /// Service type (default: "ClusterIP")
    pub service_type: String,

    /// Service port (default: 80)
    pub service_port: u64,

    /// Autoscaling bounds and CPU target (default: off, 1..3, 80%)
    pub autoscaling_enabled: bool,
    pub autoscaling_min_replicas: u64,
    pub autoscaling_max_replicas: u64,
    pub autoscaling_target_cpu: u64,

    /// Istio VirtualService (default: off)
    pub virtual_service_enabled: bool,
    pub virtual_service_gateways: Vec<String>,

    /// Create a ServiceAccount (default: true)
    pub service_account_create: bool,

    /// Probe paths (default: "/health/live", "/health/ready")
    pub liveness_path: String,
    pub readiness_path: String,

    /// Spread replicas across nodes (default: on) and zones (default: off)
    pub node_spreading: bool,
    pub zone_spreading: bool,
}

impl Default for ChartDefaults {
    fn default() -> Self {
        Self {
            replica_count: 1,
            image_pull_policy: "IfNotPresent".to_string(),
            container_port: 8080,
            service_type: "ClusterIP".to_string(),
            service_port: 80,
            autoscaling_enabled: false,
            autoscaling_min_replicas: 1,
            autoscaling_max_replicas: 3,
            autoscaling_target_cpu: 80,
            virtual_service_enabled: false,
            virtual_service_gateways: vec!["istio-system/istio-ingressgateway".to_string()],
            service_account_create: true,
            liveness_path: "/health/live".to_string(),
            readiness_path: "/health/ready".to_string(),
            node_spreading: true,
            zone_spreading: false,
        }
    }
}

impl ChartDefaults {
    /// Convert to JSON Value for merging
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::json!({
            "replicaCount": self.replica_count,
            "image": {
                "pullPolicy": self.image_pull_policy
            },
            "containerPort": self.container_port,
            "service": {
                "enabled": true,
                "type": self.service_type,
                "port": self.service_port
            },
            "autoscaling": {
                "enabled": self.autoscaling_enabled,
                "minReplicas": self.autoscaling_min_replicas,
                "maxReplicas": self.autoscaling_max_replicas,
                "targetCPUUtilizationPercentage": self.autoscaling_target_cpu
            },
            "virtualService": {
                "enabled": self.virtual_service_enabled,
                "gateways": self.virtual_service_gateways
            },
            "serviceAccount": {
                "create": self.service_account_create
            },
            "healthCheck": {
                "enabled": true,
                "livenessProbe": {
                    "httpGet": { "path": self.liveness_path },
                    "initialDelaySeconds": 10,
                    "periodSeconds": 10
                },
                "readinessProbe": {
                    "httpGet": { "path": self.readiness_path },
                    "initialDelaySeconds": 5,
                    "periodSeconds": 5
                }
            },
            "podAntiAffinity": {
                "node": { "enabled": self.node_spreading, "override": false },
                "zone": { "enabled": self.zone_spreading, "override": false }
            }
        })
    }
}

/// Built-in schema for the resolved tree.
pub fn default_schema() -> Schema {
    let port = || FieldSpec::new(ValueKind::Integer).min(1.0).max(65535.0);
    let flag = || FieldSpec::new(ValueKind::Boolean);

    Schema::new()
        .field("environment", FieldSpec::new(ValueKind::String).required())
        .field("image.repository", FieldSpec::new(ValueKind::String).required())
        .field("image.pullPolicy", FieldSpec::new(ValueKind::String))
        .field("containerPort", port().required())
        .field("replicaCount", FieldSpec::new(ValueKind::Integer).min(0.0))
        .field("service.enabled", flag())
        .field("service.port", port())
        .field("service.targetPort", port())
        .field("autoscaling.enabled", flag())
        .field("autoscaling.minReplicas", FieldSpec::new(ValueKind::Integer).min(1.0))
        .field("autoscaling.maxReplicas", FieldSpec::new(ValueKind::Integer).min(1.0))
        .field(
            "autoscaling.targetCPUUtilizationPercentage",
            FieldSpec::new(ValueKind::Integer).min(1.0).max(100.0),
        )
        .field("virtualService.enabled", flag())
        .field("virtualService.gateways", FieldSpec::new(ValueKind::List))
        .field("serviceAccount.create", flag())
        .field("healthCheck.enabled", flag())
        .field("podAntiAffinity.node.enabled", flag())
        .field("podAntiAffinity.node.override", flag())
        .field("podAntiAffinity.zone.enabled", flag())
        .field("podAntiAffinity.zone.override", flag())
        .field("commonLabels", FieldSpec::new(ValueKind::Map))
        .field("podAnnotations", FieldSpec::new(ValueKind::Map))
}
