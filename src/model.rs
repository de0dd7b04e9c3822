use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum ResourceKind {
    Pods,
    Deployments,
    StatefulSets,
    DaemonSets,
    ReplicaSets,
    Jobs,
    CronJobs,
    Services,
    Ingresses,
    ConfigMaps,
    Secrets,
    PersistentVolumeClaims,
    Nodes,
    Namespaces,
}

impl ResourceKind {
    pub const ALL: [Self; 14] = [
        Self::Pods,
        Self::Deployments,
        Self::StatefulSets,
        Self::DaemonSets,
        Self::ReplicaSets,
        Self::Jobs,
        Self::CronJobs,
        Self::Services,
        Self::Ingresses,
        Self::ConfigMaps,
        Self::Secrets,
        Self::PersistentVolumeClaims,
        Self::Nodes,
        Self::Namespaces,
    ];

    pub fn title(self) -> &'static str {
        match self {
            Self::Pods => "Pods",
            Self::Deployments => "Deployments",
            Self::StatefulSets => "StatefulSets",
            Self::DaemonSets => "DaemonSets",
            Self::ReplicaSets => "ReplicaSets",
            Self::Jobs => "Jobs",
            Self::CronJobs => "CronJobs",
            Self::Services => "Services",
            Self::Ingresses => "Ingresses",
            Self::ConfigMaps => "ConfigMaps",
            Self::Secrets => "Secrets",
            Self::PersistentVolumeClaims => "PVC",
            Self::Nodes => "Nodes",
            Self::Namespaces => "Namespaces",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "po" | "pod" | "pods" => Some(Self::Pods),
            "deploy" | "deployment" | "deployments" | "dp" => Some(Self::Deployments),
            "sts" | "statefulset" | "statefulsets" => Some(Self::StatefulSets),
            "ds" | "daemonset" | "daemonsets" | "daemon-set" | "daemon-sets" => {
                Some(Self::DaemonSets)
            }
            "rs" | "replicaset" | "replicasets" | "replica-set" | "replica-sets" => {
                Some(Self::ReplicaSets)
            }
            "job" | "jobs" => Some(Self::Jobs),
            "cj" | "cronjob" | "cronjobs" | "cron-job" | "cron-jobs" => Some(Self::CronJobs),
            "svc" | "service" | "services" => Some(Self::Services),
            "ing" | "ingress" | "ingresses" => Some(Self::Ingresses),
            "cm" | "configmap" | "configmaps" | "config-map" | "config-maps" => {
                Some(Self::ConfigMaps)
            }
            "secret" | "secrets" => Some(Self::Secrets),
            "pvc"
            | "persistentvolumeclaim"
            | "persistentvolumeclaims"
            | "persistent-volume-claim"
            | "persistent-volume-claims" => Some(Self::PersistentVolumeClaims),
            "node" | "nodes" | "no" => Some(Self::Nodes),
            "ns" | "namespace" | "namespaces" => Some(Self::Namespaces),
            _ => None,
        }
    }

    pub fn short_token(self) -> &'static str {
        match self {
            Self::Pods => "po",
            Self::Deployments => "deploy",
            Self::StatefulSets => "sts",
            Self::DaemonSets => "ds",
            Self::ReplicaSets => "rs",
            Self::Jobs => "job",
            Self::CronJobs => "cj",
            Self::Services => "svc",
            Self::Ingresses => "ing",
            Self::ConfigMaps => "cm",
            Self::Secrets => "secret",
            Self::PersistentVolumeClaims => "pvc",
            Self::Nodes => "node",
            Self::Namespaces => "ns",
        }
    }

    pub fn namespaced(self) -> bool {
        !matches!(self, Self::Nodes | Self::Namespaces)
    }

    pub fn supports_logs(self) -> bool {
        matches!(self, Self::Pods)
    }

    /// Headers for the kind-specific columns a backend reports. Context,
    /// namespace and name are prepended by the table layer.
    pub fn headers(self) -> &'static [&'static str] {
        match self {
            Self::Pods => &["Ready", "Status", "Restarts", "Node", "Age"],
            Self::Deployments => &["Ready", "Up-to-date", "Available", "Age"],
            Self::StatefulSets => &["Ready", "Age"],
            Self::DaemonSets => &["Desired", "Current", "Ready", "Age"],
            Self::ReplicaSets => &["Desired", "Current", "Ready", "Age"],
            Self::Jobs => &["Completions", "Active", "Failed", "Age"],
            Self::CronJobs => &["Schedule", "Suspend", "Active", "Age"],
            Self::Services => &["Type", "Cluster-IP", "Ports", "Age"],
            Self::Ingresses => &["Class", "Hosts", "Age"],
            Self::ConfigMaps => &["Data", "Age"],
            Self::Secrets => &["Type", "Data", "Age"],
            Self::PersistentVolumeClaims => &["Status", "Volume", "Capacity", "Age"],
            Self::Nodes => &["Status", "Roles", "Version", "Age"],
            Self::Namespaces => &["Status", "Age"],
        }
    }
}

impl Display for ResourceKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.title())
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum NamespaceScope {
    All,
    Named(String),
}

impl NamespaceScope {
    pub fn label(&self) -> String {
        match self {
            Self::All => "all".to_string(),
            Self::Named(namespace) => namespace.clone(),
        }
    }

    pub fn from_label(label: &str) -> Self {
        let label = label.trim();
        if label.is_empty() || label == "all" || label == "*" {
            Self::All
        } else {
            Self::Named(label.to_string())
        }
    }
}

impl Display for NamespaceScope {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::All => write!(f, "all"),
            Self::Named(namespace) => write!(f, "{namespace}"),
        }
    }
}

/// Durable handle to one resource instance. `namespace` is empty for
/// cluster-scoped kinds, `source` is empty when only one backend is active.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct ResourceIdentity {
    pub source: String,
    pub namespace: String,
    pub name: String,
    pub uid: String,
    pub kind: ResourceKind,
}

impl ResourceIdentity {
    pub fn new(
        source: impl Into<String>,
        namespace: impl Into<String>,
        name: impl Into<String>,
        uid: impl Into<String>,
        kind: ResourceKind,
    ) -> Self {
        Self {
            source: source.into(),
            namespace: namespace.into(),
            name: name.into(),
            uid: uid.into(),
            kind,
        }
    }

    /// Equal on `(uid, source, namespace, name)`.
    pub fn same_resource(&self, other: &Self) -> bool {
        self.uid == other.uid && self.same_slot(other)
    }

    /// Equal on `(source, namespace, name)`; a recreated resource keeps its slot.
    pub fn same_slot(&self, other: &Self) -> bool {
        self.source == other.source && self.namespace == other.namespace && self.name == other.name
    }

    pub fn namespace_opt(&self) -> Option<&str> {
        if self.namespace.is_empty() {
            None
        } else {
            Some(self.namespace.as_str())
        }
    }

    pub fn display_path(&self) -> String {
        let path = match self.namespace_opt() {
            Some(namespace) => format!("{namespace}/{}", self.name),
            None => self.name.clone(),
        };
        if self.source.is_empty() {
            path
        } else {
            format!("{}:{path}", self.source)
        }
    }
}

/// One listed resource together with its kind-specific column values.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ResourceItem {
    pub identity: ResourceIdentity,
    pub columns: Vec<String>,
}

impl ResourceItem {
    pub fn with_source(mut self, source: &str) -> Self {
        self.identity.source = source.to_string();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::{NamespaceScope, ResourceIdentity, ResourceKind};

    #[test]
    fn resource_aliases_map_to_expected_kinds() {
        assert_eq!(ResourceKind::from_token("cj"), Some(ResourceKind::CronJobs));
        assert_eq!(
            ResourceKind::from_token("daemonsets"),
            Some(ResourceKind::DaemonSets)
        );
        assert_eq!(ResourceKind::from_token("rs"), Some(ResourceKind::ReplicaSets));
        assert_eq!(ResourceKind::from_token("ing"), Some(ResourceKind::Ingresses));
        assert_eq!(ResourceKind::from_token("cm"), Some(ResourceKind::ConfigMaps));
        assert_eq!(
            ResourceKind::from_token("persistent-volume-claims"),
            Some(ResourceKind::PersistentVolumeClaims)
        );
        assert_eq!(ResourceKind::from_token(" PO "), Some(ResourceKind::Pods));
        assert_eq!(ResourceKind::from_token("widgets"), None);
    }

    #[test]
    fn short_tokens_round_trip_through_aliases() {
        for kind in ResourceKind::ALL {
            assert_eq!(ResourceKind::from_token(kind.short_token()), Some(kind));
        }
    }

    #[test]
    fn recreated_resource_keeps_slot_but_not_identity() {
        let original = ResourceIdentity::new("prod", "default", "pod-a", "u1", ResourceKind::Pods);
        let recreated = ResourceIdentity::new("prod", "default", "pod-a", "u2", ResourceKind::Pods);
        assert!(original.same_slot(&recreated));
        assert!(!original.same_resource(&recreated));
    }

    #[test]
    fn namespace_scope_parses_all_aliases() {
        assert_eq!(NamespaceScope::from_label("all"), NamespaceScope::All);
        assert_eq!(NamespaceScope::from_label(""), NamespaceScope::All);
        assert_eq!(
            NamespaceScope::from_label("kube-system"),
            NamespaceScope::Named("kube-system".to_string())
        );
    }
}
