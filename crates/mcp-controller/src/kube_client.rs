//! Cluster access for the MCP reconcilers
//!
//! [`McpKubeClient`] is the seam between reconcile logic and the API server.
//! Reconcilers only ever see the trait, so every state machine can be driven
//! by `MockMcpKubeClient` in tests.

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{ConfigMap, Service};
use k8s_openapi::api::networking::v1::Ingress;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::{
    Api, ApiResource, DynamicObject, ListParams, Patch, PatchParams, PostParams, Resource,
};
use kube::Client;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

#[cfg(test)]
use mockall::automock;

use mcp_common::crd::{
    McpPrompt, McpPromptStatus, McpResource, McpResourceStatus, McpServer, McpServerStatus,
    McpTool, McpToolStatus,
};
use mcp_common::{Error, FIELD_MANAGER};

/// Trait abstracting Kubernetes operations for the MCP reconcilers
#[cfg_attr(test, automock)]
#[async_trait]
pub trait McpKubeClient: Send + Sync {
    /// Get a plain Service, `None` if it does not exist
    async fn get_service(&self, name: &str, namespace: &str) -> Result<Option<Service>, Error>;

    /// Get a Deployment, `None` if it does not exist
    async fn get_deployment(&self, name: &str, namespace: &str)
        -> Result<Option<Deployment>, Error>;

    /// Patch the Deployment with the desired body, creating it if absent
    async fn create_or_update_deployment(&self, deployment: &Deployment) -> Result<(), Error>;

    /// Replace the Service, keeping its resourceVersion and assigned ClusterIP
    async fn create_or_update_service(&self, service: &Service) -> Result<(), Error>;

    /// Replace the ConfigMap, creating it if absent
    async fn create_or_update_config_map(&self, config_map: &ConfigMap) -> Result<(), Error>;

    /// Replace the Ingress, keeping its resourceVersion, creating it if absent
    async fn create_or_update_ingress(&self, ingress: &Ingress) -> Result<(), Error>;

    /// List MCPTools matching a label selector query; empty on query failure
    async fn list_tools(&self, namespace: &str, selector: &str) -> Vec<McpTool>;

    /// List MCPPrompts matching a label selector query; empty on query failure
    async fn list_prompts(&self, namespace: &str, selector: &str) -> Vec<McpPrompt>;

    /// List MCPResources matching a label selector query; empty on query failure
    async fn list_resources(&self, namespace: &str, selector: &str) -> Vec<McpResource>;

    /// List every MCPServer in a namespace
    async fn list_servers(&self, namespace: &str) -> Result<Vec<McpServer>, Error>;

    /// Patch MCPServer status
    async fn patch_server_status(
        &self,
        name: &str,
        namespace: &str,
        status: &McpServerStatus,
    ) -> Result<(), Error>;

    /// Patch MCPTool status
    async fn patch_tool_status(
        &self,
        name: &str,
        namespace: &str,
        status: &McpToolStatus,
    ) -> Result<(), Error>;

    /// Patch MCPPrompt status
    async fn patch_prompt_status(
        &self,
        name: &str,
        namespace: &str,
        status: &McpPromptStatus,
    ) -> Result<(), Error>;

    /// Patch MCPResource status
    async fn patch_resource_status(
        &self,
        name: &str,
        namespace: &str,
        status: &McpResourceStatus,
    ) -> Result<(), Error>;

    /// Set a single annotation on an MCPServer
    async fn annotate_server(
        &self,
        name: &str,
        namespace: &str,
        key: &str,
        value: &str,
    ) -> Result<(), Error>;
}

/// Real Kubernetes client implementation
pub struct McpKubeClientImpl {
    client: Client,
}

impl McpKubeClientImpl {
    /// Create a new McpKubeClientImpl wrapping the given client
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api<K>(&self, namespace: &str) -> Api<K>
    where
        K: Resource<Scope = kube::core::NamespaceResourceScope>,
        K::DynamicType: Default,
    {
        Api::namespaced(self.client.clone(), namespace)
    }

    async fn get_opt<K>(&self, name: &str, namespace: &str) -> Result<Option<K>, Error>
    where
        K: Resource<Scope = kube::core::NamespaceResourceScope>
            + Clone
            + DeserializeOwned
            + std::fmt::Debug,
        K::DynamicType: Default,
    {
        match self.api::<K>(namespace).get(name).await {
            Ok(obj) => Ok(Some(obj)),
            Err(kube::Error::Api(ae)) if ae.code == 404 => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// List custom resources, parsing each item on its own
    ///
    /// One malformed object must not hide its siblings from aggregation, so
    /// items that fail to parse are skipped and a failed query yields an
    /// empty list.
    async fn list_parsed<K>(&self, namespace: &str, selector: &str) -> Vec<K>
    where
        K: Resource<DynamicType = ()> + DeserializeOwned,
    {
        let ar = ApiResource::erase::<K>(&());
        let api: Api<DynamicObject> = Api::namespaced_with(self.client.clone(), namespace, &ar);
        let params = if selector.is_empty() {
            ListParams::default()
        } else {
            ListParams::default().labels(selector)
        };

        let list = match api.list(&params).await {
            Ok(list) => list,
            Err(e) => {
                warn!(kind = %ar.kind, %namespace, %selector, error = %e, "list failed, treating as empty");
                return Vec::new();
            }
        };

        list.items
            .into_iter()
            .filter_map(|obj| {
                let name = obj.metadata.name.clone().unwrap_or_default();
                match obj.try_parse::<K>() {
                    Ok(parsed) => Some(parsed),
                    Err(e) => {
                        warn!(kind = %ar.kind, %namespace, %name, error = %e, "skipping unparseable object");
                        None
                    }
                }
            })
            .collect()
    }

    async fn patch_status<K, S>(&self, name: &str, namespace: &str, status: &S) -> Result<(), Error>
    where
        S: serde::Serialize + Sync,
        K: Resource<Scope = kube::core::NamespaceResourceScope>
            + Clone
            + DeserializeOwned
            + std::fmt::Debug,
        K::DynamicType: Default,
    {
        let status_patch = serde_json::json!({ "status": status });
        self.api::<K>(namespace)
            .patch_status(
                name,
                &PatchParams::apply(FIELD_MANAGER),
                &Patch::Merge(&status_patch),
            )
            .await?;
        Ok(())
    }
}

/// Name and namespace of a generated object
fn object_key(meta: &ObjectMeta, kind: &str) -> Result<(String, String), Error> {
    match (&meta.name, &meta.namespace) {
        (Some(name), Some(namespace)) => Ok((name.clone(), namespace.clone())),
        _ => Err(Error::internal_with_context(
            format!("{kind} is missing name or namespace"),
            "kube_client",
        )),
    }
}

#[async_trait]
impl McpKubeClient for McpKubeClientImpl {
    async fn get_service(&self, name: &str, namespace: &str) -> Result<Option<Service>, Error> {
        self.get_opt(name, namespace).await
    }

    async fn get_deployment(
        &self,
        name: &str,
        namespace: &str,
    ) -> Result<Option<Deployment>, Error> {
        self.get_opt(name, namespace).await
    }

    async fn create_or_update_deployment(&self, deployment: &Deployment) -> Result<(), Error> {
        let (name, namespace) = object_key(&deployment.metadata, "Deployment")?;
        let api: Api<Deployment> = self.api(&namespace);

        match api
            .patch(&name, &PatchParams::default(), &Patch::Merge(deployment))
            .await
        {
            Ok(_) => {
                debug!(deployment = %name, %namespace, "patched deployment");
                Ok(())
            }
            Err(kube::Error::Api(ae)) if ae.code == 404 => {
                api.create(&PostParams::default(), deployment).await?;
                debug!(deployment = %name, %namespace, "created deployment");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn create_or_update_service(&self, service: &Service) -> Result<(), Error> {
        let (name, namespace) = object_key(&service.metadata, "Service")?;
        let api: Api<Service> = self.api(&namespace);

        let Some(existing) = self.get_opt::<Service>(&name, &namespace).await? else {
            api.create(&PostParams::default(), service).await?;
            debug!(service = %name, %namespace, "created service");
            return Ok(());
        };

        let desired = preserve_allocated(service, &existing);
        api.replace(&name, &PostParams::default(), &desired).await?;
        debug!(service = %name, %namespace, "replaced service");
        Ok(())
    }

    async fn create_or_update_config_map(&self, config_map: &ConfigMap) -> Result<(), Error> {
        let (name, namespace) = object_key(&config_map.metadata, "ConfigMap")?;
        let api: Api<ConfigMap> = self.api(&namespace);

        match api.replace(&name, &PostParams::default(), config_map).await {
            Ok(_) => {
                debug!(config_map = %name, %namespace, "replaced config map");
                Ok(())
            }
            Err(kube::Error::Api(ae)) if ae.code == 404 => {
                api.create(&PostParams::default(), config_map).await?;
                debug!(config_map = %name, %namespace, "created config map");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn create_or_update_ingress(&self, ingress: &Ingress) -> Result<(), Error> {
        let (name, namespace) = object_key(&ingress.metadata, "Ingress")?;
        let api: Api<Ingress> = self.api(&namespace);

        match self.get_opt::<Ingress>(&name, &namespace).await? {
            Some(existing) => {
                let desired = Ingress {
                    metadata: with_resource_version(&ingress.metadata, &existing.metadata),
                    ..ingress.clone()
                };
                api.replace(&name, &PostParams::default(), &desired).await?;
                debug!(ingress = %name, %namespace, "replaced ingress");
            }
            None => {
                api.create(&PostParams::default(), ingress).await?;
                debug!(ingress = %name, %namespace, "created ingress");
            }
        }
        Ok(())
    }

    async fn list_tools(&self, namespace: &str, selector: &str) -> Vec<McpTool> {
        self.list_parsed(namespace, selector).await
    }

    async fn list_prompts(&self, namespace: &str, selector: &str) -> Vec<McpPrompt> {
        self.list_parsed(namespace, selector).await
    }

    async fn list_resources(&self, namespace: &str, selector: &str) -> Vec<McpResource> {
        self.list_parsed(namespace, selector).await
    }

    async fn list_servers(&self, namespace: &str) -> Result<Vec<McpServer>, Error> {
        let list = self
            .api::<McpServer>(namespace)
            .list(&ListParams::default())
            .await?;
        Ok(list.items)
    }

    async fn patch_server_status(
        &self,
        name: &str,
        namespace: &str,
        status: &McpServerStatus,
    ) -> Result<(), Error> {
        self.patch_status::<McpServer, _>(name, namespace, status).await
    }

    async fn patch_tool_status(
        &self,
        name: &str,
        namespace: &str,
        status: &McpToolStatus,
    ) -> Result<(), Error> {
        self.patch_status::<McpTool, _>(name, namespace, status).await
    }

    async fn patch_prompt_status(
        &self,
        name: &str,
        namespace: &str,
        status: &McpPromptStatus,
    ) -> Result<(), Error> {
        self.patch_status::<McpPrompt, _>(name, namespace, status).await
    }

    async fn patch_resource_status(
        &self,
        name: &str,
        namespace: &str,
        status: &McpResourceStatus,
    ) -> Result<(), Error> {
        self.patch_status::<McpResource, _>(name, namespace, status).await
    }

    async fn annotate_server(
        &self,
        name: &str,
        namespace: &str,
        key: &str,
        value: &str,
    ) -> Result<(), Error> {
        let patch = serde_json::json!({
            "metadata": { "annotations": { key: value } }
        });
        self.api::<McpServer>(namespace)
            .patch(name, &PatchParams::default(), &Patch::Merge(&patch))
            .await?;
        Ok(())
    }
}

/// Copy of `desired` metadata carrying the stored object's resourceVersion,
/// so a replace applies on top of the current revision
pub(crate) fn with_resource_version(desired: &ObjectMeta, existing: &ObjectMeta) -> ObjectMeta {
    ObjectMeta {
        resource_version: existing.resource_version.clone(),
        ..desired.clone()
    }
}

/// Desired Service adjusted for a replace over `existing`
///
/// The API server rejects updates that drop an allocated ClusterIP, so
/// ClusterIP Services (the default when no type is set) keep theirs.
pub(crate) fn preserve_allocated(desired: &Service, existing: &Service) -> Service {
    let mut merged = Service {
        metadata: with_resource_version(&desired.metadata, &existing.metadata),
        ..desired.clone()
    };

    let is_cluster_ip = merged
        .spec
        .as_ref()
        .and_then(|s| s.type_.as_deref())
        .map_or(true, |t| t == "ClusterIP");
    if is_cluster_ip {
        if let (Some(spec), Some(current)) = (merged.spec.as_mut(), existing.spec.as_ref()) {
            spec.cluster_ip = current.cluster_ip.clone();
            spec.cluster_ips = current.cluster_ips.clone();
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::ServiceSpec;

    fn service(type_: Option<&str>, cluster_ip: Option<&str>, resource_version: Option<&str>) -> Service {
        Service {
            metadata: ObjectMeta {
                name: Some("gateway".to_string()),
                namespace: Some("default".to_string()),
                resource_version: resource_version.map(str::to_string),
                ..Default::default()
            },
            spec: Some(ServiceSpec {
                type_: type_.map(str::to_string),
                cluster_ip: cluster_ip.map(str::to_string),
                cluster_ips: cluster_ip.map(|ip| vec![ip.to_string()]),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    /// Story: replacing a ClusterIP Service keeps the allocated address
    #[test]
    fn story_cluster_ip_survives_replace() {
        let existing = service(Some("ClusterIP"), Some("10.96.0.12"), Some("41"));
        let merged = preserve_allocated(&service(Some("ClusterIP"), None, None), &existing);

        let spec = merged.spec.expect("spec");
        assert_eq!(spec.cluster_ip.as_deref(), Some("10.96.0.12"));
        assert_eq!(spec.cluster_ips, Some(vec!["10.96.0.12".to_string()]));
        assert_eq!(merged.metadata.resource_version.as_deref(), Some("41"));
    }

    #[test]
    fn untyped_service_is_treated_as_cluster_ip() {
        let existing = service(None, Some("10.96.0.7"), Some("3"));
        let merged = preserve_allocated(&service(None, None, None), &existing);
        assert_eq!(
            merged.spec.and_then(|s| s.cluster_ip).as_deref(),
            Some("10.96.0.7")
        );
    }

    /// Story: other Service types are replaced with the desired spec as-is
    #[test]
    fn story_other_types_keep_desired_spec() {
        for type_ in ["NodePort", "LoadBalancer"] {
            let existing = service(Some(type_), Some("10.96.0.9"), Some("7"));
            let merged = preserve_allocated(&service(Some(type_), None, None), &existing);

            let spec = merged.spec.expect("spec");
            assert_eq!(spec.cluster_ip, None, "{type_}");
            assert_eq!(spec.cluster_ips, None, "{type_}");
            assert_eq!(merged.metadata.resource_version.as_deref(), Some("7"));
        }
    }

    #[test]
    fn resource_version_comes_from_the_stored_object() {
        let desired = ObjectMeta {
            name: Some("gateway".to_string()),
            resource_version: Some("stale".to_string()),
            labels: Some([("app".to_string(), "gw".to_string())].into()),
            ..Default::default()
        };
        let existing = ObjectMeta {
            resource_version: Some("99".to_string()),
            ..Default::default()
        };

        let merged = with_resource_version(&desired, &existing);
        assert_eq!(merged.resource_version.as_deref(), Some("99"));
        assert_eq!(merged.name.as_deref(), Some("gateway"));
        assert_eq!(merged.labels, desired.labels);
    }
}
