//! ServiceAccount

use serde_json::{json, Map};

use super::{NamedArtifact, RenderError, RenderScope, ResourceKind};
use crate::config::ResolvedConfig;
use crate::naming::NamingContext;

/// Account the pods run as.
///
/// An explicit `serviceAccount.name` always wins. Otherwise the created
/// account gets the suffixed name, and without one the pods use `default`.
pub fn service_account_name(config: &ResolvedConfig, ctx: &NamingContext) -> String {
    if let Some(name) = config.get_nonempty_str("serviceAccount.name") {
        return name.to_string();
    }
    if config.flag("serviceAccount.create", true) {
        ResourceKind::ServiceAccount.default_name(ctx)
    } else {
        "default".to_string()
    }
}

pub(crate) fn render(scope: &RenderScope<'_>) -> Result<NamedArtifact, RenderError> {
    let name = scope.checked_name(service_account_name(scope.config, scope.ctx))?;
    let metadata = scope.metadata(&name, scope.optional_map("serviceAccount.annotations")?);

    let mut fields = Map::new();
    if let Some(automount) = scope.config.get_bool("serviceAccount.automount") {
        fields.insert("automountServiceAccountToken".to_string(), json!(automount));
    }
    Ok(scope.artifact_with(name, metadata, fields))
}

#[cfg(test)]
mod tests {
    use super::super::tests::{context, resolved};
    use super::super::{render_kind, Emission};
    use super::*;

    #[test]
    fn test_name_resolution() {
        let config = resolved(json!({}));
        assert_eq!(
            service_account_name(&config, &context(&config)),
            "orders-api-microservice-serviceaccount"
        );

        let config = resolved(json!({"serviceAccount": {"name": "orders-runner"}}));
        assert_eq!(service_account_name(&config, &context(&config)), "orders-runner");

        let config = resolved(json!({"serviceAccount": {"create": false}}));
        assert_eq!(service_account_name(&config, &context(&config)), "default");

        let config = resolved(json!({"serviceAccount": {"create": false, "name": "shared"}}));
        assert_eq!(service_account_name(&config, &context(&config)), "shared");
    }

    #[test]
    fn test_rendered_account() {
        let config = resolved(json!({
            "serviceAccount": {
                "annotations": {"eks.amazonaws.com/role-arn": "arn:aws:iam::1:role/orders"},
                "automount": false
            }
        }));
        let Emission::Emit(artifact) =
            render_kind(ResourceKind::ServiceAccount, &config, &context(&config)).unwrap()
        else {
            panic!("expected emission");
        };
        let doc = artifact.document;
        assert_eq!(doc["apiVersion"], "v1");
        assert_eq!(doc["kind"], "ServiceAccount");
        assert!(doc.get("spec").is_none());
        assert_eq!(doc["automountServiceAccountToken"], false);
        assert_eq!(
            doc["metadata"]["annotations"]["eks.amazonaws.com/role-arn"],
            "arn:aws:iam::1:role/orders"
        );
    }

    #[test]
    fn test_omitted_when_not_created() {
        let config = resolved(json!({"serviceAccount": {"create": false}}));
        let emission = render_kind(ResourceKind::ServiceAccount, &config, &context(&config)).unwrap();
        assert!(matches!(emission, Emission::Omit { .. }));
    }
}
