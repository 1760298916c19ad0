//! Istio VirtualService

use serde_json::{json, Map, Value};

use super::{NamedArtifact, RenderError, RenderScope, ResourceKind};

pub(crate) fn render(scope: &RenderScope<'_>) -> Result<NamedArtifact, RenderError> {
    let name = scope.checked_name(scope.kind.default_name(scope.ctx))?;
    let config = scope.config;

    if !config.flag("service.enabled", true) {
        return Err(scope.invalid("service.enabled", "a VirtualService needs a Service to route to"));
    }

    let domain = scope
        .require("virtualService.effectiveDomain")?
        .as_str()
        .ok_or_else(|| scope.invalid("virtualService.effectiveDomain", "expected a string"))?;
    let mut hosts = vec![Value::String(format!("{}.{}", scope.ctx.primary_name(), domain))];
    if let Some(extra) = scope.optional_list("virtualService.extraHosts")? {
        for host in extra {
            if !host.is_string() {
                return Err(scope.invalid("virtualService.extraHosts", format!("{} is not a host name", host)));
            }
            hosts.push(host.clone());
        }
    }

    let gateways = scope
        .optional_list("virtualService.gateways")?
        .cloned()
        .unwrap_or_default();
    let port = scope.require_port("virtualService.destinationPort")?;

    let mut route = Map::new();
    route.insert(
        "route".to_string(),
        json!([{
            "destination": {
                "host": ResourceKind::Service.default_name(scope.ctx),
                "port": {"number": port}
            }
        }]),
    );
    if let Some(timeout) = scope.optional("virtualService.timeout") {
        route.insert("timeout".to_string(), timeout.clone());
    }
    if let Some(retries) = scope.optional_map("virtualService.retries")? {
        route.insert("retries".to_string(), Value::Object(retries.clone()));
    }

    let spec = json!({
        "hosts": hosts,
        "gateways": gateways,
        "http": [Value::Object(route)],
    });
    let metadata = scope.metadata(&name, scope.optional_map("virtualService.annotations")?);
    Ok(scope.artifact(name, metadata, spec))
}
