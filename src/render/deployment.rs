//! Deployment (the primary resource)

use serde_json::{json, Map, Value};

use super::affinity::anti_affinity;
use super::service_account::service_account_name;
use super::{NamedArtifact, RenderError, RenderScope};
use crate::naming::truncate_name;

/// Pod annotation carrying the resolved configuration checksum.
pub const CHECKSUM_ANNOTATION: &str = "checksum/config";

const PROBES: [(&str, &str); 2] = [
    ("livenessProbe", "healthCheck.livenessProbe"),
    ("readinessProbe", "healthCheck.readinessProbe"),
];

const PROBE_HANDLERS: [&str; 4] = ["httpGet", "tcpSocket", "exec", "grpc"];

pub(crate) fn render(scope: &RenderScope<'_>) -> Result<NamedArtifact, RenderError> {
    let name = scope.checked_name(scope.kind.default_name(scope.ctx))?;
    let config = scope.config;

    let mut spec = Map::new();
    if !config.flag("autoscaling.enabled", false) {
        spec.insert("replicas".to_string(), json!(config.get_u64("replicaCount").unwrap_or(1)));
    }
    spec.insert(
        "selector".to_string(),
        json!({"matchLabels": scope.selector_labels}),
    );
    spec.insert(
        "template".to_string(),
        json!({
            "metadata": {
                "labels": scope.metadata_labels,
                "annotations": pod_annotations(scope)?,
            },
            "spec": pod_spec(scope)?,
        }),
    );

    let metadata = scope.metadata(&name, scope.optional_map("deploymentAnnotations")?);
    Ok(scope.artifact(name, metadata, Value::Object(spec)))
}

fn pod_annotations(scope: &RenderScope<'_>) -> Result<Value, RenderError> {
    let mut annotations = scope.optional_map("podAnnotations")?.cloned().unwrap_or_default();
    let checksum = scope.config.checksum().map_err(|e| RenderError::Checksum {
        kind: scope.kind,
        message: e.to_string(),
    })?;
    annotations.insert(CHECKSUM_ANNOTATION.to_string(), Value::String(checksum));
    Ok(Value::Object(annotations))
}

fn pod_spec(scope: &RenderScope<'_>) -> Result<Value, RenderError> {
    let mut pod = Map::new();
    pod.insert(
        "serviceAccountName".to_string(),
        json!(service_account_name(scope.config, scope.ctx)),
    );
    if let Some(secrets) = scope.optional_list("imagePullSecrets")? {
        pod.insert("imagePullSecrets".to_string(), Value::Array(secrets.clone()));
    }
    if let Some(context) = scope.optional_map("podSecurityContext")? {
        pod.insert("securityContext".to_string(), Value::Object(context.clone()));
    }

    pod.insert("containers".to_string(), json!([container(scope)?]));

    if let Some(selector) = scope.optional_map("nodeSelector")? {
        pod.insert("nodeSelector".to_string(), Value::Object(selector.clone()));
    }
    if let Some(affinity) = anti_affinity(scope.config, &scope.selector_labels)? {
        pod.insert("affinity".to_string(), affinity);
    }
    if let Some(tolerations) = scope.optional_list("tolerations")? {
        pod.insert("tolerations".to_string(), Value::Array(tolerations.clone()));
    }
    Ok(Value::Object(pod))
}

fn container(scope: &RenderScope<'_>) -> Result<Value, RenderError> {
    let config = scope.config;
    let repository = scope
        .require("image.repository")?
        .as_str()
        .ok_or_else(|| scope.invalid("image.repository", "expected a string"))?;
    let tag = match scope.optional("image.tag") {
        Some(Value::String(tag)) => tag.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(other) => return Err(scope.invalid("image.tag", format!("expected a string, found {}", other))),
        None => scope.ctx.app_version.clone(),
    };
    let port = scope.require_port("containerPort")?;

    let mut container = Map::new();
    container.insert("name".to_string(), json!(truncate_name(&scope.ctx.name)));
    container.insert("image".to_string(), json!(format!("{}:{}", repository, tag)));
    container.insert(
        "imagePullPolicy".to_string(),
        json!(config.get_nonempty_str("image.pullPolicy").unwrap_or("IfNotPresent")),
    );
    container.insert(
        "ports".to_string(),
        json!([{"name": "http", "containerPort": port, "protocol": "TCP"}]),
    );
    if let Some(env) = scope.optional_list("env")? {
        container.insert("env".to_string(), Value::Array(env.clone()));
    }
    if let Some(resources) = scope.optional_map("resources")? {
        container.insert("resources".to_string(), Value::Object(resources.clone()));
    }
    if let Some(context) = scope.optional_map("securityContext")? {
        container.insert("securityContext".to_string(), Value::Object(context.clone()));
    }

    if config.flag("healthCheck.enabled", true) {
        for (field, path) in PROBES {
            if let Some(probe) = scope.optional_map(path)? {
                container.insert(field.to_string(), probe_document(scope, path, probe)?);
            }
        }
    }

    Ok(Value::Object(container))
}

/// A probe with cleared keys dropped; it must use exactly one handler.
fn probe_document(scope: &RenderScope<'_>, path: &str, probe: &Map<String, Value>) -> Result<Value, RenderError> {
    let probe: Map<String, Value> = probe
        .iter()
        .filter(|(_, value)| !value.is_null())
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    let handlers: Vec<&str> = PROBE_HANDLERS
        .iter()
        .copied()
        .filter(|handler| probe.contains_key(*handler))
        .collect();
    match handlers.as_slice() {
        [] => Err(scope.invalid(path, format!("probe needs one of {}", PROBE_HANDLERS.join(", ")))),
        ["httpGet"] => {
            // the port is filled from containerPort by the fallback pass
            scope.require(&format!("{}.httpGet.port", path))?;
            Ok(Value::Object(probe))
        }
        [_] => Ok(Value::Object(probe)),
        _ => Err(scope.invalid(
            path,
            format!("probe has more than one handler ({})", handlers.join(", ")),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{context, resolved};
    use super::super::{render_kind, Emission, ResourceKind};
    use super::*;
    use crate::config::ResolvedConfig;

    fn deployment(config: &ResolvedConfig) -> Value {
        match render_kind(ResourceKind::Deployment, config, &context(config)).unwrap() {
            Emission::Emit(artifact) => artifact.document,
            Emission::Omit { reason } => panic!("omitted: {reason}"),
        }
    }

    #[test]
    fn test_basic_deployment() {
        let config = resolved(json!({"image": {"tag": "1.2.3"}, "replicaCount": 2}));
        let doc = deployment(&config);

        assert_eq!(doc["apiVersion"], "apps/v1");
        assert_eq!(doc["kind"], "Deployment");
        assert_eq!(doc["metadata"]["name"], "orders-api-microservice");
        assert_eq!(doc["spec"]["replicas"], 2);

        let container = &doc["spec"]["template"]["spec"]["containers"][0];
        assert_eq!(container["image"], "registry.local/orders:1.2.3");
        assert_eq!(container["imagePullPolicy"], "IfNotPresent");
        assert_eq!(container["ports"][0]["containerPort"], 8080);
        assert_eq!(container["livenessProbe"]["httpGet"]["port"], 8080);
        assert_eq!(container["readinessProbe"]["httpGet"]["path"], "/health/ready");

        let selector = &doc["spec"]["selector"]["matchLabels"];
        assert_eq!(selector.as_object().unwrap().len(), 3);
    }

    #[test]
    fn test_tag_defaults_to_app_version() {
        let config = resolved(json!({}));
        let doc = deployment(&config);
        let image = doc["spec"]["template"]["spec"]["containers"][0]["image"].as_str().unwrap();
        assert_eq!(image, "registry.local/orders:0.1.0");
    }

    #[test]
    fn test_replicas_omitted_with_autoscaling() {
        let config = resolved(json!({"autoscaling": {"enabled": true}}));
        let doc = deployment(&config);
        assert!(doc["spec"].get("replicas").is_none());
    }

    #[test]
    fn test_probes_omitted_when_disabled() {
        let config = resolved(json!({"healthCheck": {"enabled": false}}));
        let container = deployment(&config)["spec"]["template"]["spec"]["containers"][0].clone();
        assert!(container.get("livenessProbe").is_none());
        assert!(container.get("readinessProbe").is_none());
    }

    #[test]
    fn test_exec_probe_replaces_http_get() {
        let config = resolved(json!({"healthCheck": {"livenessProbe": {
            "httpGet": null,
            "exec": {"command": ["/bin/check"]}
        }}}));
        let container = deployment(&config)["spec"]["template"]["spec"]["containers"][0].clone();
        let probe = container["livenessProbe"].as_object().unwrap();
        assert!(!probe.contains_key("httpGet"));
        assert_eq!(probe["exec"]["command"][0], "/bin/check");
        assert_eq!(probe["initialDelaySeconds"], 10);
        assert_eq!(container["readinessProbe"]["httpGet"]["port"], 8080);
    }

    #[test]
    fn test_probe_handler_count_checked() {
        let config = resolved(json!({"healthCheck": {"readinessProbe": {"tcpSocket": {"port": 8080}}}}));
        let err = render_kind(ResourceKind::Deployment, &config, &context(&config)).unwrap_err();
        assert!(matches!(
            err,
            RenderError::InvalidValue { ref path, .. } if path == "healthCheck.readinessProbe"
        ));

        let config = resolved(json!({"healthCheck": {"readinessProbe": {"httpGet": null}}}));
        let err = render_kind(ResourceKind::Deployment, &config, &context(&config)).unwrap_err();
        assert!(err.to_string().contains("probe needs one of"));
    }

    #[test]
    fn test_checksum_annotation() {
        let config = resolved(json!({"podAnnotations": {"sidecar.istio.io/inject": "true"}}));
        let annotations = deployment(&config)["spec"]["template"]["metadata"]["annotations"].clone();
        assert_eq!(annotations["sidecar.istio.io/inject"], "true");
        assert_eq!(annotations[CHECKSUM_ANNOTATION], config.checksum().unwrap());

        let changed = resolved(json!({"containerPort": 9090}));
        let other = deployment(&changed)["spec"]["template"]["metadata"]["annotations"][CHECKSUM_ANNOTATION].clone();
        assert_ne!(annotations[CHECKSUM_ANNOTATION], other);
    }

    #[test]
    fn test_default_node_anti_affinity() {
        let doc = deployment(&resolved(json!({})));
        let terms = &doc["spec"]["template"]["spec"]["affinity"]["podAntiAffinity"]
            ["preferredDuringSchedulingIgnoredDuringExecution"];
        assert_eq!(terms.as_array().unwrap().len(), 1);
        assert_eq!(terms[0]["weight"], 100);
    }

    #[test]
    fn test_pod_extras() {
        let config = resolved(json!({
            "env": [{"name": "LOG_LEVEL", "value": "info"}],
            "resources": {"limits": {"cpu": "500m"}},
            "nodeSelector": {"pool": "general"},
            "tolerations": [{"key": "dedicated", "operator": "Exists"}]
        }));
        let pod = deployment(&config)["spec"]["template"]["spec"].clone();
        assert_eq!(pod["serviceAccountName"], "orders-api-microservice-serviceaccount");
        assert_eq!(pod["nodeSelector"]["pool"], "general");
        assert_eq!(pod["tolerations"][0]["key"], "dedicated");
        assert_eq!(pod["containers"][0]["env"][0]["name"], "LOG_LEVEL");
        assert_eq!(pod["containers"][0]["resources"]["limits"]["cpu"], "500m");
    }

    #[test]
    fn test_override_without_custom_fails_deployment() {
        let config = resolved(json!({"podAntiAffinity": {"zone": {"enabled": true, "override": true}}}));
        let err = render_kind(ResourceKind::Deployment, &config, &context(&config)).unwrap_err();
        assert_eq!(err.kind(), ResourceKind::Deployment);
    }

    #[test]
    fn test_missing_container_port() {
        let config = resolved(json!({"containerPort": null, "healthCheck": {"enabled": false}}));
        let err = render_kind(ResourceKind::Deployment, &config, &context(&config)).unwrap_err();
        assert_eq!(
            err,
            RenderError::MissingValue {
                kind: ResourceKind::Deployment,
                path: "containerPort".to_string()
            }
        );
    }
}
