//! Service

use serde_json::json;

use super::{NamedArtifact, RenderError, RenderScope};

const SERVICE_TYPES: [&str; 4] = ["ClusterIP", "NodePort", "LoadBalancer", "ExternalName"];

pub(crate) fn render(scope: &RenderScope<'_>) -> Result<NamedArtifact, RenderError> {
    let name = scope.checked_name(scope.kind.default_name(scope.ctx))?;

    let service_type = scope.config.get_nonempty_str("service.type").unwrap_or("ClusterIP");
    if !SERVICE_TYPES.contains(&service_type) {
        return Err(scope.invalid("service.type", format!("unknown service type {:?}", service_type)));
    }
    let port = scope.require_port("service.port")?;
    let target_port = scope.require_port("service.targetPort")?;

    let mut service_port = json!({
        "name": "http",
        "port": port,
        "targetPort": target_port,
        "protocol": "TCP",
    });
    if service_type == "NodePort" {
        if let Some(node_port) = scope.optional("service.nodePort") {
            service_port["nodePort"] = node_port.clone();
        }
    }

    let spec = json!({
        "type": service_type,
        "selector": scope.selector_labels,
        "ports": [service_port],
    });
    let metadata = scope.metadata(&name, scope.optional_map("service.annotations")?);
    Ok(scope.artifact(name, metadata, spec))
}
