use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::{AsyncBufReadExt, StreamExt};
use k8s_openapi::NamespaceResourceScope;
use k8s_openapi::api::apps::v1::{DaemonSet, Deployment, ReplicaSet, StatefulSet};
use k8s_openapi::api::batch::v1::{CronJob, Job};
use k8s_openapi::api::core::v1::{
    ConfigMap, Namespace, Node, PersistentVolumeClaim, Pod, Secret, Service,
};
use k8s_openapi::api::networking::v1::Ingress;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use kube::api::{DeleteParams, ListParams, LogParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::core::{ApiResource, DynamicObject, ObjectList};
use kube::{Api, Client, Config, Resource, ResourceExt};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt::Debug;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;
use tracing::{debug, info};

use crate::backend::{Backend, Connector, LogLines};
use crate::model::{NamespaceScope, ResourceItem, ResourceKind};

pub const IN_CLUSTER_CONTEXT: &str = "in-cluster";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const LIST_TIMEOUT: Duration = Duration::from_secs(8);
const LOG_TAIL_LINES: i64 = 200;
const LOG_BUFFER: usize = 256;

#[derive(Debug, Clone)]
struct KubeTarget {
    context: String,
    cluster_name: String,
    namespace: Option<String>,
}

/// Reads the kubeconfig once and opens one `KubeBackend` per context on
/// demand. Without a kubeconfig only the in-cluster context is offered.
pub struct KubeConnector {
    kubeconfig: Option<Kubeconfig>,
    targets: Vec<KubeTarget>,
}

impl KubeConnector {
    pub fn load() -> Self {
        let kubeconfig = Kubeconfig::read().ok();
        let targets = kubeconfig
            .as_ref()
            .map(build_kube_targets)
            .unwrap_or_default();
        debug!("kubeconfig lists {} contexts", targets.len());
        Self {
            kubeconfig,
            targets,
        }
    }

    /// Namespace recorded on the context entry, if any.
    pub fn context_namespace(&self, context: &str) -> Option<String> {
        self.targets
            .iter()
            .find(|target| target.context == context)
            .and_then(|target| target.namespace.clone())
    }
}

#[async_trait]
impl Connector for KubeConnector {
    fn available_contexts(&self) -> Vec<String> {
        if self.kubeconfig.is_none() {
            return vec![IN_CLUSTER_CONTEXT.to_string()];
        }
        self.targets
            .iter()
            .map(|target| target.context.clone())
            .collect()
    }

    fn current_context(&self) -> Option<String> {
        match &self.kubeconfig {
            Some(kubeconfig) => kubeconfig.current_context.clone(),
            None => Some(IN_CLUSTER_CONTEXT.to_string()),
        }
    }

    async fn connect(&self, context: &str) -> Result<Arc<dyn Backend>> {
        let backend = KubeBackend::connect(self.kubeconfig.clone(), context).await?;
        Ok(Arc::new(backend) as Arc<dyn Backend>)
    }
}

#[derive(Clone)]
pub struct KubeBackend {
    client: Client,
    context: String,
}

impl KubeBackend {
    async fn connect(kubeconfig: Option<Kubeconfig>, context: &str) -> Result<Self> {
        let config = match kubeconfig {
            Some(kubeconfig) => {
                let options = KubeConfigOptions {
                    context: Some(context.to_string()),
                    cluster: None,
                    user: None,
                };
                Config::from_custom_kubeconfig(kubeconfig, &options)
                    .await
                    .with_context(|| format!("failed to load context '{context}'"))?
            }
            None if context == IN_CLUSTER_CONTEXT => Config::infer()
                .await
                .context("failed to infer Kubernetes configuration")?,
            None => anyhow::bail!("kubeconfig not found; context '{context}' is unavailable"),
        };

        let cluster_url = config.cluster_url.to_string();
        let client = Client::try_from(config).context("failed to initialize Kubernetes client")?;
        let version = timeout(CONNECT_TIMEOUT, client.apiserver_version())
            .await
            .map_err(|_| anyhow::anyhow!("{cluster_url} did not answer within {CONNECT_TIMEOUT:?}"))?
            .with_context(|| format!("failed to reach {cluster_url}"))?;
        info!("context {context}: connected to {cluster_url} ({})", version.git_version);

        Ok(Self {
            client,
            context: context.to_string(),
        })
    }

    fn scoped_api<K>(&self, scope: &NamespaceScope) -> Api<K>
    where
        K: Resource<Scope = NamespaceResourceScope>,
        K::DynamicType: Default,
    {
        match scope {
            NamespaceScope::All => Api::all(self.client.clone()),
            NamespaceScope::Named(namespace) => Api::namespaced(self.client.clone(), namespace),
        }
    }

    async fn list_scoped<K>(&self, scope: &NamespaceScope) -> Result<Vec<K>>
    where
        K: Resource<Scope = NamespaceResourceScope> + Clone + DeserializeOwned + Debug,
        K::DynamicType: Default,
    {
        let api = self.scoped_api::<K>(scope);
        bounded_list(api.list(&list_params())).await
    }

    async fn list_cluster<K>(&self) -> Result<Vec<K>>
    where
        K: Resource + Clone + DeserializeOwned + Debug,
        K::DynamicType: Default,
    {
        let api: Api<K> = Api::all(self.client.clone());
        bounded_list(api.list(&list_params())).await
    }

    fn dynamic_api(&self, kind: ResourceKind, namespace: Option<&str>) -> Result<Api<DynamicObject>> {
        let resource = api_resource(kind);
        if kind.namespaced() {
            let namespace = namespace.with_context(|| {
                format!("namespace is required for {}", kind.title().to_ascii_lowercase())
            })?;
            Ok(Api::namespaced_with(self.client.clone(), namespace, &resource))
        } else {
            Ok(Api::all_with(self.client.clone(), &resource))
        }
    }
}

#[async_trait]
impl Backend for KubeBackend {
    async fn list_resources(
        &self,
        kind: ResourceKind,
        scope: &NamespaceScope,
    ) -> Result<Vec<ResourceItem>> {
        let items = match kind {
            ResourceKind::Pods => to_items(kind, self.list_scoped::<Pod>(scope).await, pod_columns),
            ResourceKind::Deployments => to_items(
                kind,
                self.list_scoped::<Deployment>(scope).await,
                deployment_columns,
            ),
            ResourceKind::StatefulSets => to_items(
                kind,
                self.list_scoped::<StatefulSet>(scope).await,
                statefulset_columns,
            ),
            ResourceKind::DaemonSets => to_items(
                kind,
                self.list_scoped::<DaemonSet>(scope).await,
                daemonset_columns,
            ),
            ResourceKind::ReplicaSets => to_items(
                kind,
                self.list_scoped::<ReplicaSet>(scope).await,
                replicaset_columns,
            ),
            ResourceKind::Jobs => to_items(kind, self.list_scoped::<Job>(scope).await, job_columns),
            ResourceKind::CronJobs => to_items(
                kind,
                self.list_scoped::<CronJob>(scope).await,
                cronjob_columns,
            ),
            ResourceKind::Services => to_items(
                kind,
                self.list_scoped::<Service>(scope).await,
                service_columns,
            ),
            ResourceKind::Ingresses => to_items(
                kind,
                self.list_scoped::<Ingress>(scope).await,
                ingress_columns,
            ),
            ResourceKind::ConfigMaps => to_items(
                kind,
                self.list_scoped::<ConfigMap>(scope).await,
                configmap_columns,
            ),
            ResourceKind::Secrets => to_items(
                kind,
                self.list_scoped::<Secret>(scope).await,
                secret_columns,
            ),
            ResourceKind::PersistentVolumeClaims => to_items(
                kind,
                self.list_scoped::<PersistentVolumeClaim>(scope).await,
                pvc_columns,
            ),
            ResourceKind::Nodes => to_items(kind, self.list_cluster::<Node>().await, node_columns),
            ResourceKind::Namespaces => to_items(
                kind,
                self.list_cluster::<Namespace>().await,
                namespace_columns,
            ),
        };
        items.with_context(|| format!("failed to list {} in {}", kind.title(), self.context))
    }

    async fn describe(
        &self,
        kind: ResourceKind,
        name: &str,
        namespace: Option<&str>,
    ) -> Result<String> {
        let api = self.dynamic_api(kind, namespace)?;
        let object = api
            .get(name)
            .await
            .with_context(|| format!("failed to get {} {name}", kind.title()))?;
        describe_yaml(&object)
    }

    async fn delete(&self, kind: ResourceKind, name: &str, namespace: Option<&str>) -> Result<()> {
        let api = self.dynamic_api(kind, namespace)?;
        let _ = api
            .delete(name, &DeleteParams::default())
            .await
            .with_context(|| format!("failed to delete {} {name}", kind.title()))?;
        info!("context {}: deleted {} {name}", self.context, kind.title());
        Ok(())
    }

    async fn list_namespaces(&self) -> Result<Vec<String>> {
        let namespaces = self
            .list_cluster::<Namespace>()
            .await
            .with_context(|| format!("failed to list namespaces in {}", self.context))?;
        Ok(namespaces
            .into_iter()
            .map(|namespace| namespace.name_any())
            .collect())
    }

    async fn list_containers(&self, namespace: &str, pod: &str) -> Result<Vec<String>> {
        let pods: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let pod = pods
            .get(pod)
            .await
            .with_context(|| format!("failed to get pod {namespace}/{pod}"))?;
        Ok(pod_container_names(&pod))
    }

    async fn stream_logs(&self, namespace: &str, pod: &str, container: &str) -> Result<LogLines> {
        let pods: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        let params = LogParams {
            container: Some(container.to_string()),
            follow: true,
            tail_lines: Some(LOG_TAIL_LINES),
            ..LogParams::default()
        };
        let target = format!("{namespace}/{pod}/{container}");
        let pod = pod.to_string();
        let (opened_tx, opened_rx) = oneshot::channel();
        let (tx, rx) = mpsc::channel::<Result<String>>(LOG_BUFFER);

        // The reader borrows its `Api`, so both live on the pump task.
        tokio::spawn(async move {
            let reader = match pods.log_stream(&pod, &params).await {
                Ok(reader) => {
                    let _ = opened_tx.send(Ok(()));
                    reader
                }
                Err(error) => {
                    let _ = opened_tx.send(Err(error));
                    return;
                }
            };
            let mut lines = Box::pin(reader.lines());
            loop {
                tokio::select! {
                    _ = tx.closed() => break,
                    line = lines.next() => match line {
                        Some(line) => {
                            if tx.send(line.context("log stream interrupted")).await.is_err() {
                                break;
                            }
                        }
                        None => break,
                    },
                }
            }
            debug!("log pump for {pod} finished");
        });

        opened_rx
            .await
            .context("log stream task ended before opening")?
            .with_context(|| format!("failed to stream logs for {target}"))?;
        Ok(futures::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|line| (line, rx))
        })
        .boxed())
    }
}

fn to_items<K>(
    kind: ResourceKind,
    list: Result<Vec<K>>,
    columns: fn(&K) -> Vec<String>,
) -> Result<Vec<ResourceItem>>
where
    K: Resource,
{
    Ok(list?
        .iter()
        .map(|resource| ResourceItem {
            identity: crate::model::ResourceIdentity::new(
                "",
                if kind.namespaced() {
                    resource.namespace().unwrap_or_default()
                } else {
                    String::new()
                },
                resource.name_any(),
                resource.uid().unwrap_or_default(),
                kind,
            ),
            columns: columns(resource),
        })
        .collect())
}

async fn bounded_list<K, F>(list: F) -> Result<Vec<K>>
where
    F: Future<Output = kube::Result<ObjectList<K>>>,
    K: Clone,
{
    let list = timeout(LIST_TIMEOUT, list)
        .await
        .map_err(|_| anyhow::anyhow!("list timed out after {LIST_TIMEOUT:?}"))??;
    Ok(list.items)
}

fn api_resource(kind: ResourceKind) -> ApiResource {
    match kind {
        ResourceKind::Pods => ApiResource::erase::<Pod>(&()),
        ResourceKind::Deployments => ApiResource::erase::<Deployment>(&()),
        ResourceKind::StatefulSets => ApiResource::erase::<StatefulSet>(&()),
        ResourceKind::DaemonSets => ApiResource::erase::<DaemonSet>(&()),
        ResourceKind::ReplicaSets => ApiResource::erase::<ReplicaSet>(&()),
        ResourceKind::Jobs => ApiResource::erase::<Job>(&()),
        ResourceKind::CronJobs => ApiResource::erase::<CronJob>(&()),
        ResourceKind::Services => ApiResource::erase::<Service>(&()),
        ResourceKind::Ingresses => ApiResource::erase::<Ingress>(&()),
        ResourceKind::ConfigMaps => ApiResource::erase::<ConfigMap>(&()),
        ResourceKind::Secrets => ApiResource::erase::<Secret>(&()),
        ResourceKind::PersistentVolumeClaims => ApiResource::erase::<PersistentVolumeClaim>(&()),
        ResourceKind::Nodes => ApiResource::erase::<Node>(&()),
        ResourceKind::Namespaces => ApiResource::erase::<Namespace>(&()),
    }
}

fn pod_columns(pod: &Pod) -> Vec<String> {
    let (ready, total, restarts) = pod.status.as_ref().map(pod_readiness).unwrap_or((0, 0, 0));
    let node = pod
        .spec
        .as_ref()
        .and_then(|spec| spec.node_name.clone())
        .unwrap_or_else(|| "-".to_string());
    vec![
        format!("{ready}/{total}"),
        pod_status(pod),
        restarts.to_string(),
        node,
        human_age(pod.metadata.creation_timestamp.as_ref()),
    ]
}

/// Phase, overridden by termination or the first waiting container reason
/// the way `kubectl get pods` reports it.
fn pod_status(pod: &Pod) -> String {
    if pod.metadata.deletion_timestamp.is_some() {
        return "Terminating".to_string();
    }
    let status = pod.status.as_ref();
    let waiting = status
        .and_then(|status| status.container_statuses.as_ref())
        .and_then(|statuses| {
            statuses.iter().find_map(|container| {
                container
                    .state
                    .as_ref()
                    .and_then(|state| state.waiting.as_ref())
                    .and_then(|waiting| waiting.reason.clone())
            })
        });
    waiting
        .or_else(|| status.and_then(|status| status.reason.clone()))
        .or_else(|| status.and_then(|status| status.phase.clone()))
        .unwrap_or_else(|| "Unknown".to_string())
}

fn pod_container_names(pod: &Pod) -> Vec<String> {
    pod.spec
        .as_ref()
        .map(|spec| {
            spec.containers
                .iter()
                .map(|container| container.name.clone())
                .collect()
        })
        .unwrap_or_default()
}

fn deployment_columns(deployment: &Deployment) -> Vec<String> {
    let desired = deployment
        .spec
        .as_ref()
        .and_then(|spec| spec.replicas)
        .unwrap_or(1);
    let status = deployment.status.as_ref();
    let ready = status.and_then(|status| status.ready_replicas).unwrap_or(0);
    let updated = status.and_then(|status| status.updated_replicas).unwrap_or(0);
    let available = status
        .and_then(|status| status.available_replicas)
        .unwrap_or(0);
    vec![
        format!("{ready}/{desired}"),
        updated.to_string(),
        available.to_string(),
        human_age(deployment.metadata.creation_timestamp.as_ref()),
    ]
}

fn statefulset_columns(statefulset: &StatefulSet) -> Vec<String> {
    let desired = statefulset
        .spec
        .as_ref()
        .and_then(|spec| spec.replicas)
        .unwrap_or(1);
    let ready = statefulset
        .status
        .as_ref()
        .and_then(|status| status.ready_replicas)
        .unwrap_or(0);
    vec![
        format!("{ready}/{desired}"),
        human_age(statefulset.metadata.creation_timestamp.as_ref()),
    ]
}

fn daemonset_columns(daemonset: &DaemonSet) -> Vec<String> {
    let (desired, current, ready) = daemonset
        .status
        .as_ref()
        .map(|status| {
            (
                status.desired_number_scheduled,
                status.current_number_scheduled,
                status.number_ready,
            )
        })
        .unwrap_or((0, 0, 0));
    vec![
        desired.to_string(),
        current.to_string(),
        ready.to_string(),
        human_age(daemonset.metadata.creation_timestamp.as_ref()),
    ]
}

fn replicaset_columns(replicaset: &ReplicaSet) -> Vec<String> {
    let desired = replicaset
        .spec
        .as_ref()
        .and_then(|spec| spec.replicas)
        .unwrap_or(1);
    let status = replicaset.status.as_ref();
    let current = status.map(|status| status.replicas).unwrap_or(0);
    let ready = status.and_then(|status| status.ready_replicas).unwrap_or(0);
    vec![
        desired.to_string(),
        current.to_string(),
        ready.to_string(),
        human_age(replicaset.metadata.creation_timestamp.as_ref()),
    ]
}

fn job_columns(job: &Job) -> Vec<String> {
    let desired = job
        .spec
        .as_ref()
        .and_then(|spec| spec.completions)
        .unwrap_or(1);
    let status = job.status.as_ref();
    let succeeded = status.and_then(|status| status.succeeded).unwrap_or(0);
    let active = status.and_then(|status| status.active).unwrap_or(0);
    let failed = status.and_then(|status| status.failed).unwrap_or(0);
    vec![
        format!("{succeeded}/{desired}"),
        active.to_string(),
        failed.to_string(),
        human_age(job.metadata.creation_timestamp.as_ref()),
    ]
}

fn cronjob_columns(cronjob: &CronJob) -> Vec<String> {
    let schedule = cronjob
        .spec
        .as_ref()
        .map(|spec| spec.schedule.clone())
        .unwrap_or_else(|| "-".to_string());
    let suspend = cronjob
        .spec
        .as_ref()
        .and_then(|spec| spec.suspend)
        .unwrap_or(false);
    let active = cronjob
        .status
        .as_ref()
        .and_then(|status| status.active.as_ref())
        .map(|active| active.len())
        .unwrap_or(0);
    vec![
        schedule,
        if suspend { "True" } else { "False" }.to_string(),
        active.to_string(),
        human_age(cronjob.metadata.creation_timestamp.as_ref()),
    ]
}

fn service_columns(service: &Service) -> Vec<String> {
    let spec = service.spec.as_ref();
    let service_type = spec
        .and_then(|spec| spec.type_.clone())
        .unwrap_or_else(|| "ClusterIP".to_string());
    let cluster_ip = spec
        .and_then(|spec| spec.cluster_ip.clone())
        .unwrap_or_else(|| "-".to_string());
    let ports = spec
        .and_then(|spec| spec.ports.as_ref())
        .map(|ports| {
            ports
                .iter()
                .map(|port| {
                    let protocol = port.protocol.clone().unwrap_or_else(|| "TCP".to_string());
                    format!("{}/{}", port.port, protocol)
                })
                .collect::<Vec<_>>()
                .join(",")
        })
        .filter(|ports| !ports.is_empty())
        .unwrap_or_else(|| "-".to_string());
    vec![
        service_type,
        cluster_ip,
        truncate(&ports, 28),
        human_age(service.metadata.creation_timestamp.as_ref()),
    ]
}

fn ingress_columns(ingress: &Ingress) -> Vec<String> {
    let spec = ingress.spec.as_ref();
    let class = spec
        .and_then(|spec| spec.ingress_class_name.clone())
        .unwrap_or_else(|| "-".to_string());
    let hosts = spec
        .and_then(|spec| spec.rules.as_ref())
        .map(|rules| {
            rules
                .iter()
                .filter_map(|rule| rule.host.clone())
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();
    let hosts = if hosts.is_empty() {
        "*".to_string()
    } else {
        truncate(&hosts.join(","), 28)
    };
    vec![
        class,
        hosts,
        human_age(ingress.metadata.creation_timestamp.as_ref()),
    ]
}

fn configmap_columns(configmap: &ConfigMap) -> Vec<String> {
    let data = configmap.data.as_ref().map(|data| data.len()).unwrap_or(0)
        + configmap
            .binary_data
            .as_ref()
            .map(|data| data.len())
            .unwrap_or(0);
    vec![
        data.to_string(),
        human_age(configmap.metadata.creation_timestamp.as_ref()),
    ]
}

fn secret_columns(secret: &Secret) -> Vec<String> {
    let secret_type = secret.type_.clone().unwrap_or_else(|| "Opaque".to_string());
    let data = secret.data.as_ref().map(|data| data.len()).unwrap_or(0);
    vec![
        truncate(&secret_type, 24),
        data.to_string(),
        human_age(secret.metadata.creation_timestamp.as_ref()),
    ]
}

fn pvc_columns(pvc: &PersistentVolumeClaim) -> Vec<String> {
    let status = pvc
        .status
        .as_ref()
        .and_then(|status| status.phase.clone())
        .unwrap_or_else(|| "-".to_string());
    let volume = pvc
        .spec
        .as_ref()
        .and_then(|spec| spec.volume_name.clone())
        .unwrap_or_else(|| "-".to_string());
    let capacity = pvc
        .status
        .as_ref()
        .and_then(|status| status.capacity.as_ref())
        .and_then(|capacity| capacity.get("storage"))
        .map(|quantity| quantity.0.clone())
        .unwrap_or_else(|| "-".to_string());
    vec![
        status,
        truncate(&volume, 22),
        capacity,
        human_age(pvc.metadata.creation_timestamp.as_ref()),
    ]
}

fn node_columns(node: &Node) -> Vec<String> {
    let ready = node
        .status
        .as_ref()
        .and_then(|status| status.conditions.as_ref())
        .and_then(|conditions| {
            conditions
                .iter()
                .find(|condition| condition.type_ == "Ready")
        })
        .map(|condition| match condition.status.as_str() {
            "True" => "Ready",
            "False" => "NotReady",
            _ => "Unknown",
        })
        .unwrap_or("Unknown");
    let ready = if node
        .spec
        .as_ref()
        .and_then(|spec| spec.unschedulable)
        .unwrap_or(false)
    {
        format!("{ready},SchedulingDisabled")
    } else {
        ready.to_string()
    };
    let version = node
        .status
        .as_ref()
        .and_then(|status| status.node_info.as_ref())
        .map(|info| info.kubelet_version.clone())
        .unwrap_or_else(|| "-".to_string());
    vec![
        ready,
        node_roles(node),
        version,
        human_age(node.metadata.creation_timestamp.as_ref()),
    ]
}

fn namespace_columns(namespace: &Namespace) -> Vec<String> {
    let phase = namespace
        .status
        .as_ref()
        .and_then(|status| status.phase.clone())
        .unwrap_or_else(|| "Active".to_string());
    vec![
        phase,
        human_age(namespace.metadata.creation_timestamp.as_ref()),
    ]
}

fn build_kube_targets(kubeconfig: &Kubeconfig) -> Vec<KubeTarget> {
    let mut targets = kubeconfig
        .contexts
        .iter()
        .filter_map(|named| {
            let context = named.context.as_ref()?;
            Some(KubeTarget {
                context: named.name.clone(),
                cluster_name: context.cluster.clone(),
                namespace: context.namespace.clone(),
            })
        })
        .collect::<Vec<_>>();

    targets.sort_by(|left, right| {
        left.context
            .cmp(&right.context)
            .then_with(|| left.cluster_name.cmp(&right.cluster_name))
    });
    targets
}

fn list_params() -> ListParams {
    ListParams::default().limit(500)
}

fn pod_readiness(status: &k8s_openapi::api::core::v1::PodStatus) -> (usize, usize, i32) {
    let container_statuses = status.container_statuses.as_deref().unwrap_or(&[]);
    let total = container_statuses.len();
    let ready = container_statuses
        .iter()
        .filter(|container| container.ready)
        .count();
    let restarts = container_statuses
        .iter()
        .map(|container| container.restart_count)
        .sum();

    (ready, total, restarts)
}

fn node_roles(node: &Node) -> String {
    let Some(labels) = node.metadata.labels.as_ref() else {
        return "-".to_string();
    };

    let mut roles = labels
        .keys()
        .filter_map(|key| key.strip_prefix("node-role.kubernetes.io/"))
        .map(|role| {
            if role.is_empty() {
                "worker".to_string()
            } else {
                role.to_string()
            }
        })
        .collect::<Vec<_>>();

    if roles.is_empty()
        && let Some(role) = labels.get("kubernetes.io/role")
    {
        roles.push(role.clone());
    }

    if roles.is_empty() {
        "-".to_string()
    } else {
        roles.sort();
        roles.dedup();
        roles.join(",")
    }
}

fn truncate(value: &str, max: usize) -> String {
    if value.chars().count() <= max {
        return value.to_string();
    }

    let mut out = value
        .chars()
        .take(max.saturating_sub(1))
        .collect::<String>();
    out.push('…');
    out
}

fn human_age(timestamp: Option<&Time>) -> String {
    let Some(timestamp) = timestamp else {
        return "-".to_string();
    };

    let elapsed_seconds =
        (k8s_openapi::jiff::Timestamp::now().as_second() - timestamp.0.as_second()).max(0);
    format_elapsed_seconds(elapsed_seconds)
}

fn format_elapsed_seconds(seconds: i64) -> String {
    if seconds >= 86_400 {
        return format!("{}d", seconds / 86_400);
    }

    if seconds >= 3_600 {
        return format!("{}h", seconds / 3_600);
    }

    if seconds >= 60 {
        return format!("{}m", seconds / 60);
    }

    format!("{seconds}s")
}

/// YAML manifest without `metadata.managedFields`.
fn describe_yaml<T>(value: &T) -> Result<String>
where
    T: Serialize,
{
    let mut json = serde_json::to_value(value).context("failed to encode resource")?;
    if let Some(metadata) = json.get_mut("metadata").and_then(Value::as_object_mut) {
        metadata.remove("managedFields");
    }
    serde_yaml::to_string(&json).context("failed to format resource as YAML")
}
