//! Typed builders for the objects an MCPServer owns
//!
//! Every builder stamps the MCPServer as controlling owner so the API
//! server garbage-collects children when the server is deleted.

use std::collections::BTreeMap;

use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{
    ConfigMap, ConfigMapVolumeSource, Container, ContainerPort, EnvVar, PodSpec, PodTemplateSpec,
    Service, ServicePort, ServiceSpec, Volume, VolumeMount,
};
use k8s_openapi::api::networking::v1::{
    HTTPIngressPath, HTTPIngressRuleValue, Ingress, IngressBackend, IngressRule,
    IngressServiceBackend, IngressSpec, IngressTLS, ServiceBackendPort,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta, OwnerReference};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kube::{Resource, ResourceExt};

use mcp_common::crd::{IngressConfig, McpServer};
use mcp_common::{Error, APP_INSTANCE_LABEL_KEY, APP_NAME, APP_NAME_LABEL_KEY, SERVER_LABEL_KEY};

/// Port the gateway container listens on and the Service exposes
pub const GATEWAY_PORT: i32 = 8080;

/// Where the generated ConfigMap is mounted in the gateway container
pub const CONFIG_MOUNT_PATH: &str = "/etc/mcp/config";

/// Gateway container name
pub const CONTAINER_NAME: &str = "server";

const CONFIG_VOLUME: &str = "config";
const HTTP_PORT_NAME: &str = "http";

/// ConfigMap key holding the aggregated tools
pub const TOOLS_KEY: &str = "tools.json";
/// ConfigMap key holding the aggregated prompts
pub const PROMPTS_KEY: &str = "prompts.json";
/// ConfigMap key holding the aggregated resources
pub const RESOURCES_KEY: &str = "resources.json";

/// Name shared by the gateway Deployment, Service and Ingress
pub fn gateway_name(server: &str) -> String {
    format!("mcp-server-{server}")
}

/// Name of the aggregated ConfigMap
pub fn config_map_name(server: &str) -> String {
    format!("mcp-server-{server}-config")
}

/// Labels that select the gateway pods
pub fn selector_labels(server: &str) -> BTreeMap<String, String> {
    BTreeMap::from([
        (APP_NAME_LABEL_KEY.to_string(), APP_NAME.to_string()),
        (APP_INSTANCE_LABEL_KEY.to_string(), server.to_string()),
    ])
}

/// Labels on the Deployment and its pod template
pub fn gateway_labels(server: &str) -> BTreeMap<String, String> {
    let mut labels = selector_labels(server);
    labels.insert(SERVER_LABEL_KEY.to_string(), server.to_string());
    labels
}

fn owner_reference(server: &McpServer) -> Result<OwnerReference, Error> {
    server.controller_owner_ref(&()).ok_or_else(|| {
        Error::internal_with_context(
            format!("MCPServer {} has no uid", server.name_any()),
            "owner_reference",
        )
    })
}

fn owned_meta(server: &McpServer, name: String, namespace: &str) -> Result<ObjectMeta, Error> {
    Ok(ObjectMeta {
        name: Some(name),
        namespace: Some(namespace.to_string()),
        labels: Some(gateway_labels(&server.name_any())),
        owner_references: Some(vec![owner_reference(server)?]),
        ..Default::default()
    })
}

/// Serialized aggregation documents
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConfigDocuments {
    /// JSON array of tool entries
    pub tools: String,
    /// JSON array of prompt entries
    pub prompts: String,
    /// JSON array of resource entries
    pub resources: String,
}

/// Build the ConfigMap carrying the aggregated documents
pub fn build_config_map(
    server: &McpServer,
    namespace: &str,
    documents: ConfigDocuments,
) -> Result<ConfigMap, Error> {
    Ok(ConfigMap {
        metadata: owned_meta(server, config_map_name(&server.name_any()), namespace)?,
        data: Some(BTreeMap::from([
            (TOOLS_KEY.to_string(), documents.tools),
            (PROMPTS_KEY.to_string(), documents.prompts),
            (RESOURCES_KEY.to_string(), documents.resources),
        ])),
        ..Default::default()
    })
}

fn env_var(name: &str, value: impl Into<String>) -> EnvVar {
    EnvVar {
        name: name.to_string(),
        value: Some(value.into()),
        ..Default::default()
    }
}

/// Build the gateway Deployment
pub fn build_deployment(server: &McpServer, namespace: &str) -> Result<Deployment, Error> {
    let name = server.name_any();
    let spec = &server.spec;

    let mut env = vec![
        env_var("REDIS_HOST", spec.redis.service_name.clone()),
        env_var("MCP_CONFIG_DIR", CONFIG_MOUNT_PATH),
    ];
    if let Some(config) = &spec.config {
        env.push(env_var("MCP_REQUEST_TIMEOUT", config.request_timeout.clone()));
        env.push(env_var(
            "MCP_MAX_CONCURRENT_REQUESTS",
            config.max_concurrent_requests.to_string(),
        ));
    }

    Ok(Deployment {
        metadata: owned_meta(server, gateway_name(&name), namespace)?,
        spec: Some(DeploymentSpec {
            replicas: Some(spec.replicas),
            selector: LabelSelector {
                match_labels: Some(selector_labels(&name)),
                ..Default::default()
            },
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(gateway_labels(&name)),
                    ..Default::default()
                }),
                spec: Some(PodSpec {
                    containers: vec![Container {
                        name: CONTAINER_NAME.to_string(),
                        image: Some(spec.image.clone()),
                        ports: Some(vec![ContainerPort {
                            name: Some(HTTP_PORT_NAME.to_string()),
                            container_port: GATEWAY_PORT,
                            protocol: Some("TCP".to_string()),
                            ..Default::default()
                        }]),
                        env: Some(env),
                        volume_mounts: Some(vec![VolumeMount {
                            name: CONFIG_VOLUME.to_string(),
                            mount_path: CONFIG_MOUNT_PATH.to_string(),
                            read_only: Some(true),
                            ..Default::default()
                        }]),
                        ..Default::default()
                    }],
                    volumes: Some(vec![Volume {
                        name: CONFIG_VOLUME.to_string(),
                        config_map: Some(ConfigMapVolumeSource {
                            name: config_map_name(&name),
                            ..Default::default()
                        }),
                        ..Default::default()
                    }]),
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        ..Default::default()
    })
}

/// Build the ClusterIP Service in front of the gateway
pub fn build_service(server: &McpServer, namespace: &str) -> Result<Service, Error> {
    let name = server.name_any();
    Ok(Service {
        metadata: owned_meta(server, gateway_name(&name), namespace)?,
        spec: Some(ServiceSpec {
            type_: Some("ClusterIP".to_string()),
            selector: Some(selector_labels(&name)),
            ports: Some(vec![ServicePort {
                name: Some(HTTP_PORT_NAME.to_string()),
                port: GATEWAY_PORT,
                target_port: Some(IntOrString::Int(GATEWAY_PORT)),
                protocol: Some("TCP".to_string()),
                ..Default::default()
            }]),
            ..Default::default()
        }),
        ..Default::default()
    })
}

/// Build the Ingress routing `pathPrefix` to the gateway Service
pub fn build_ingress(
    server: &McpServer,
    namespace: &str,
    ingress: &IngressConfig,
) -> Result<Ingress, Error> {
    let name = gateway_name(&server.name_any());

    let rule = IngressRule {
        host: ingress.host.clone(),
        http: Some(HTTPIngressRuleValue {
            paths: vec![HTTPIngressPath {
                path: Some(ingress.path_prefix.clone()),
                path_type: "Prefix".to_string(),
                backend: IngressBackend {
                    service: Some(IngressServiceBackend {
                        name: name.clone(),
                        port: Some(ServiceBackendPort {
                            number: Some(GATEWAY_PORT),
                            ..Default::default()
                        }),
                    }),
                    ..Default::default()
                },
            }],
        }),
    };

    let tls = ingress.tls_secret_name.as_ref().map(|secret| {
        vec![IngressTLS {
            hosts: ingress.host.clone().map(|h| vec![h]),
            secret_name: Some(secret.clone()),
        }]
    });

    Ok(Ingress {
        metadata: owned_meta(server, name, namespace)?,
        spec: Some(IngressSpec {
            rules: Some(vec![rule]),
            tls,
            ..Default::default()
        }),
        ..Default::default()
    })
}
