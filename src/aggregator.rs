use anyhow::Result;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{Display, Formatter};
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::backend::{Backend, LogLines};
use crate::model::{NamespaceScope, ResourceIdentity, ResourceItem, ResourceKind};

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("source '{0}' is not configured")]
    NotFound(String),
    #[error("no source given and {0} sources are active")]
    Ambiguous(usize),
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct SourceFailure {
    pub name: String,
    pub cause: String,
}

/// Every source that failed during one fan-out call, with its cause.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct AggregateError {
    pub attempted: usize,
    pub failures: Vec<SourceFailure>,
}

impl AggregateError {
    pub fn failed_sources(&self) -> Vec<&str> {
        self.failures
            .iter()
            .map(|failure| failure.name.as_str())
            .collect()
    }

    pub fn all_failed(&self) -> bool {
        self.failures.len() >= self.attempted
    }
}

impl Display for AggregateError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} of {} sources failed: ",
            self.failures.len(),
            self.attempted
        )?;
        for (index, failure) in self.failures.iter().enumerate() {
            if index > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{}: {}", failure.name, failure.cause)?;
        }
        Ok(())
    }
}

impl std::error::Error for AggregateError {}

/// Named, ordered set of backends. Cloning shares the same map; changing the
/// active contexts builds a new `MultiSource` instead of mutating this one.
#[derive(Clone, Default)]
pub struct MultiSource {
    backends: Arc<BTreeMap<String, Arc<dyn Backend>>>,
}

impl MultiSource {
    pub fn new(backends: impl IntoIterator<Item = (String, Arc<dyn Backend>)>) -> Self {
        Self {
            backends: Arc::new(backends.into_iter().collect()),
        }
    }

    pub fn sources(&self) -> Vec<String> {
        self.backends.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }

    pub fn handle_for(&self, name: &str) -> Result<Arc<dyn Backend>, SourceError> {
        self.backends
            .get(name)
            .cloned()
            .ok_or_else(|| SourceError::NotFound(name.to_string()))
    }

    /// Like `handle_for`, but an empty name addresses the only active source.
    pub fn resolve(&self, name: &str) -> Result<Arc<dyn Backend>, SourceError> {
        if !name.is_empty() {
            return self.handle_for(name);
        }
        match self.backends.values().next() {
            Some(backend) if self.backends.len() == 1 => Ok(backend.clone()),
            Some(_) => Err(SourceError::Ambiguous(self.backends.len())),
            None => Err(SourceError::NotFound(String::new())),
        }
    }

    pub async fn list_all_sources(
        &self,
        kind: ResourceKind,
        scope: &NamespaceScope,
    ) -> (Vec<ResourceItem>, Option<AggregateError>) {
        self.list_sources(&self.sources(), kind, scope).await
    }

    /// Lists `names` concurrently. Unknown names become per-source failures.
    pub async fn list_sources(
        &self,
        names: &[String],
        kind: ResourceKind,
        scope: &NamespaceScope,
    ) -> (Vec<ResourceItem>, Option<AggregateError>) {
        let scope = scope.clone();
        let (batches, failure) = self
            .fan_out(names, move |backend| {
                let scope = scope.clone();
                async move { backend.list_resources(kind, &scope).await }
            })
            .await;

        let items = batches
            .into_iter()
            .flat_map(|(name, items)| {
                items
                    .into_iter()
                    .map(move |item| item.with_source(&name))
                    .collect::<Vec<_>>()
            })
            .collect::<Vec<_>>();
        (items, failure)
    }

    pub async fn unique_namespaces(&self) -> (BTreeSet<String>, Option<AggregateError>) {
        let (batches, failure) = self
            .fan_out(&self.sources(), |backend| async move {
                backend.list_namespaces().await
            })
            .await;
        let namespaces = batches
            .into_iter()
            .flat_map(|(_, namespaces)| namespaces)
            .collect::<BTreeSet<_>>();
        (namespaces, failure)
    }

    pub async fn list_source(
        &self,
        name: &str,
        kind: ResourceKind,
        scope: &NamespaceScope,
    ) -> Result<Vec<ResourceItem>> {
        let backend = self.resolve(name)?;
        let items = backend.list_resources(kind, scope).await?;
        Ok(items
            .into_iter()
            .map(|item| item.with_source(name))
            .collect())
    }

    pub async fn describe(&self, identity: &ResourceIdentity) -> Result<String> {
        let backend = self.resolve(&identity.source)?;
        backend
            .describe(identity.kind, &identity.name, identity.namespace_opt())
            .await
    }

    pub async fn delete(&self, identity: &ResourceIdentity) -> Result<()> {
        let backend = self.resolve(&identity.source)?;
        backend
            .delete(identity.kind, &identity.name, identity.namespace_opt())
            .await
    }

    pub async fn list_containers(&self, identity: &ResourceIdentity) -> Result<Vec<String>> {
        let backend = self.resolve(&identity.source)?;
        backend
            .list_containers(&identity.namespace, &identity.name)
            .await
    }

    pub async fn stream_logs(
        &self,
        identity: &ResourceIdentity,
        container: &str,
    ) -> Result<LogLines> {
        let backend = self.resolve(&identity.source)?;
        backend
            .stream_logs(&identity.namespace, &identity.name, container)
            .await
    }

    /// Runs `call` once per named source on its own task and waits for all of
    /// them. Results come back through one collector channel; the channel
    /// closes only after every task has dropped its sender.
    async fn fan_out<T, F, Fut>(
        &self,
        names: &[String],
        call: F,
    ) -> (Vec<(String, T)>, Option<AggregateError>)
    where
        T: Send + 'static,
        F: Fn(Arc<dyn Backend>) -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<(String, Result<T>)>();
        let mut failures = Vec::new();
        let mut pending = BTreeSet::new();
        let mut attempted = BTreeSet::new();

        for name in names {
            if !attempted.insert(name.as_str()) {
                continue;
            }
            let backend = match self.handle_for(name) {
                Ok(backend) => backend,
                Err(error) => {
                    failures.push(SourceFailure {
                        name: name.clone(),
                        cause: error.to_string(),
                    });
                    continue;
                }
            };
            pending.insert(name.clone());
            let tx = tx.clone();
            let name = name.clone();
            let task = call(backend);
            tokio::spawn(async move {
                let result = task.await;
                let _ = tx.send((name, result));
            });
        }
        drop(tx);

        let mut succeeded = Vec::new();
        while let Some((name, result)) = rx.recv().await {
            pending.remove(&name);
            match result {
                Ok(value) => {
                    debug!("source {name} reported");
                    succeeded.push((name, value));
                }
                Err(error) => {
                    warn!("source {name} failed: {error:#}");
                    failures.push(SourceFailure {
                        name,
                        cause: compact_cause(&error),
                    });
                }
            }
        }

        for name in pending {
            warn!("source {name} task ended without reporting");
            failures.push(SourceFailure {
                name,
                cause: "task ended without reporting".to_string(),
            });
        }

        succeeded.sort_by(|left, right| left.0.cmp(&right.0));
        failures.sort_by(|left, right| left.name.cmp(&right.name));
        let failure = if failures.is_empty() {
            None
        } else {
            Some(AggregateError {
                attempted: attempted.len(),
                failures,
            })
        };
        (succeeded, failure)
    }
}

fn compact_cause(error: &anyhow::Error) -> String {
    error
        .chain()
        .take(2)
        .map(|cause| cause.to_string())
        .collect::<Vec<_>>()
        .join(": ")
}

#[cfg(test)]
mod tests {
    use super::{MultiSource, SourceError};
    use crate::backend::Backend;
    use crate::backend::testing::FakeBackend;
    use crate::model::{NamespaceScope, ResourceIdentity, ResourceKind};
    use std::collections::BTreeSet;
    use std::sync::Arc;
    use std::time::Duration;

    fn set(entries: Vec<(&str, FakeBackend)>) -> MultiSource {
        MultiSource::new(
            entries
                .into_iter()
                .map(|(name, backend)| (name.to_string(), Arc::new(backend) as Arc<dyn Backend>)),
        )
    }

    fn default_scope() -> NamespaceScope {
        NamespaceScope::Named("default".to_string())
    }

    #[tokio::test]
    async fn three_sources_return_every_tagged_item() {
        let sources = set(vec![
            ("alpha", FakeBackend::with_pods("default", &["pod-0", "pod-1"])),
            ("beta", FakeBackend::with_pods("default", &["pod-0", "pod-1"])),
            ("gamma", FakeBackend::with_pods("default", &["pod-0", "pod-1"])),
        ]);

        let (items, error) = sources
            .list_all_sources(ResourceKind::Pods, &default_scope())
            .await;
        assert!(error.is_none());
        assert_eq!(items.len(), 6);
        for source in ["alpha", "beta", "gamma"] {
            let tagged = items
                .iter()
                .filter(|item| item.identity.source == source)
                .count();
            assert_eq!(tagged, 2, "source {source}");
        }

        let (namespaces, error) = sources.unique_namespaces().await;
        assert!(error.is_none());
        assert_eq!(namespaces, BTreeSet::from(["default".to_string()]));
    }

    #[tokio::test]
    async fn partial_failure_keeps_items_and_names_each_failing_source() {
        let sources = set(vec![
            ("alpha", FakeBackend::with_pods("default", &["pod-0"])),
            ("beta", FakeBackend::failing("connection refused")),
            ("gamma", FakeBackend::with_pods("default", &["pod-1", "pod-2"])),
            ("delta", FakeBackend::failing("Unauthorized")),
        ]);

        let (items, error) = sources
            .list_all_sources(ResourceKind::Pods, &default_scope())
            .await;
        assert_eq!(items.len(), 3);
        let error = error.expect("two sources failed");
        assert_eq!(error.failed_sources(), vec!["beta", "delta"]);
        assert!(!error.all_failed());
        let message = error.to_string();
        assert!(message.contains("beta: connection refused"), "{message}");
        assert!(message.contains("delta: Unauthorized"), "{message}");
        assert!(message.starts_with("2 of 4 sources failed"), "{message}");
    }

    #[tokio::test]
    async fn fast_failure_does_not_cut_off_slow_sources() {
        let sources = set(vec![
            ("fast", FakeBackend::failing("boom")),
            (
                "slow",
                FakeBackend::with_pods("default", &["pod-a", "pod-b"])
                    .delayed(Duration::from_millis(80)),
            ),
            (
                "slower",
                FakeBackend::with_pods("default", &["pod-c"]).delayed(Duration::from_millis(150)),
            ),
        ]);

        let (items, error) = sources
            .list_all_sources(ResourceKind::Pods, &default_scope())
            .await;
        assert_eq!(items.len(), 3);
        assert_eq!(error.map(|error| error.failures.len()), Some(1));
    }

    #[tokio::test]
    async fn total_failure_returns_empty_list() {
        let sources = set(vec![
            ("alpha", FakeBackend::failing("down")),
            ("beta", FakeBackend::failing("down")),
        ]);
        let (items, error) = sources
            .list_all_sources(ResourceKind::Pods, &NamespaceScope::All)
            .await;
        assert!(items.is_empty());
        assert!(error.is_some_and(|error| error.all_failed()));
    }

    #[tokio::test]
    async fn unknown_source_is_folded_into_aggregate() {
        let sources = set(vec![(
            "alpha",
            FakeBackend::with_pods("default", &["pod-0"]),
        )]);
        let names = vec!["alpha".to_string(), "ghost".to_string()];
        let (items, error) = sources
            .list_sources(&names, ResourceKind::Pods, &default_scope())
            .await;
        assert_eq!(items.len(), 1);
        let error = error.expect("ghost is unknown");
        assert_eq!(error.failed_sources(), vec!["ghost"]);
        assert!(error.to_string().contains("not configured"));
    }

    #[tokio::test]
    async fn repeated_names_are_listed_once() {
        let sources = set(vec![(
            "alpha",
            FakeBackend::with_pods("default", &["pod-0"]),
        )]);
        let names = vec!["alpha".to_string(), "alpha".to_string(), "ghost".to_string()];
        let (items, error) = sources
            .list_sources(&names, ResourceKind::Pods, &default_scope())
            .await;
        assert_eq!(items.len(), 1);
        let error = error.expect("ghost is unknown");
        assert_eq!(error.attempted, 2);
        assert!(!error.all_failed());
        assert!(error.to_string().starts_with("1 of 2 sources failed"));
    }

    #[tokio::test]
    async fn single_source_errors_pass_through() {
        let sources = set(vec![("alpha", FakeBackend::failing("forbidden"))]);
        let error = sources
            .list_source("alpha", ResourceKind::Pods, &default_scope())
            .await
            .expect_err("backend fails");
        assert_eq!(error.to_string(), "forbidden");
        assert!(error.downcast_ref::<super::AggregateError>().is_none());
    }

    #[test]
    fn handle_lookup_reports_not_found() {
        let sources = set(vec![("alpha", FakeBackend::default())]);
        assert!(sources.handle_for("alpha").is_ok());
        assert!(matches!(
            sources.handle_for("beta"),
            Err(SourceError::NotFound(name)) if name == "beta"
        ));
        assert!(sources.resolve("").is_ok());
    }

    #[test]
    fn empty_source_is_ambiguous_with_several_backends() {
        let sources = set(vec![
            ("alpha", FakeBackend::default()),
            ("beta", FakeBackend::default()),
        ]);
        assert!(matches!(sources.resolve(""), Err(SourceError::Ambiguous(2))));
        assert_eq!(sources.sources(), vec!["alpha", "beta"]);
    }

    #[tokio::test]
    async fn delete_routes_to_the_identity_source() {
        let alpha = Arc::new(FakeBackend::with_pods("default", &["pod-0"]));
        let beta = Arc::new(FakeBackend::with_pods("default", &["pod-0"]));
        let sources = MultiSource::new(vec![
            ("alpha".to_string(), alpha.clone() as Arc<dyn Backend>),
            ("beta".to_string(), beta.clone() as Arc<dyn Backend>),
        ]);
        let identity =
            ResourceIdentity::new("beta", "default", "pod-0", "uid-pod-0", ResourceKind::Pods);
        sources.delete(&identity).await.expect("delete succeeds");
        assert!(alpha.deleted_names().is_empty());
        assert_eq!(beta.deleted_names(), vec!["pod-0"]);
    }
}
