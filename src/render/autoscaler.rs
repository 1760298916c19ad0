//! HorizontalPodAutoscaler

use serde_json::{json, Value};

use super::{NamedArtifact, RenderError, RenderScope, ResourceKind};

pub(crate) fn render(scope: &RenderScope<'_>) -> Result<NamedArtifact, RenderError> {
    let name = scope.checked_name(scope.kind.default_name(scope.ctx))?;

    let min = replicas(scope, "autoscaling.minReplicas")?;
    let max = replicas(scope, "autoscaling.maxReplicas")?;
    if min > max {
        return Err(scope.invalid(
            "autoscaling.minReplicas",
            format!("minReplicas {} exceeds maxReplicas {}", min, max),
        ));
    }

    let mut metrics = Vec::new();
    for (resource, path) in [
        ("cpu", "autoscaling.targetCPUUtilizationPercentage"),
        ("memory", "autoscaling.targetMemoryUtilizationPercentage"),
    ] {
        if let Some(target) = utilization(scope, path)? {
            metrics.push(json!({
                "type": "Resource",
                "resource": {
                    "name": resource,
                    "target": {"type": "Utilization", "averageUtilization": target}
                }
            }));
        }
    }
    if metrics.is_empty() {
        return Err(RenderError::MissingValue {
            kind: scope.kind,
            path: "autoscaling.targetCPUUtilizationPercentage".to_string(),
        });
    }

    let target = ResourceKind::Deployment;
    let spec = json!({
        "scaleTargetRef": {
            "apiVersion": target.api_version(),
            "kind": target.as_str(),
            "name": target.default_name(scope.ctx),
        },
        "minReplicas": min,
        "maxReplicas": max,
        "metrics": metrics,
    });
    let metadata = scope.metadata(&name, None);
    Ok(scope.artifact(name, metadata, spec))
}

fn replicas(scope: &RenderScope<'_>, path: &str) -> Result<u64, RenderError> {
    match scope.require(path)?.as_u64() {
        Some(n) if n >= 1 => Ok(n),
        _ => Err(scope.invalid(path, "expected an integer >= 1")),
    }
}

fn utilization(scope: &RenderScope<'_>, path: &str) -> Result<Option<u64>, RenderError> {
    match scope.optional(path) {
        None => Ok(None),
        Some(Value::Number(n)) => match n.as_u64() {
            Some(pct) if (1..=100).contains(&pct) => Ok(Some(pct)),
            _ => Err(scope.invalid(path, format!("{} is not a percentage", n))),
        },
        Some(other) => Err(scope.invalid(path, format!("expected an integer, found {}", other))),
    }
}
