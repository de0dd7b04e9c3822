use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, warn};

use crate::aggregator::{MultiSource, SourceFailure};
use crate::app::{AppCommand, AppMessage};
use crate::backend::Connector;
use crate::logs::LogSession;

/// Runs `AppCommand`s off the event loop. Every command but `StartLogs` is
/// fire-and-forget; its result arrives later as an `AppMessage`.
pub struct Dispatcher {
    connector: Arc<dyn Connector>,
    tx: UnboundedSender<AppMessage>,
}

impl Dispatcher {
    pub fn new(connector: Arc<dyn Connector>, tx: UnboundedSender<AppMessage>) -> Self {
        Self { connector, tx }
    }

    /// Returns the session handle for `StartLogs` so the caller can attach
    /// it to the view that asked for it.
    pub fn dispatch(&self, command: AppCommand, sources: &MultiSource) -> Option<LogSession> {
        let tx = self.tx.clone();
        match command {
            AppCommand::None => {}
            AppCommand::Refresh {
                kind,
                scope,
                generation,
            } => {
                let sources = sources.clone();
                let listing =
                    tokio::spawn(async move { sources.list_all_sources(kind, &scope).await });
                // The app waits for one answer per generation, even if the listing dies.
                tokio::spawn(async move {
                    let message = match listing.await {
                        Ok((items, failure)) => {
                            debug!(
                                "refresh {generation}: {} {} rows",
                                items.len(),
                                kind.title()
                            );
                            AppMessage::RowsLoaded {
                                generation,
                                kind,
                                items,
                                failure,
                            }
                        }
                        Err(error) => {
                            warn!("refresh {generation} ended without a listing: {error}");
                            AppMessage::RefreshAborted {
                                generation,
                                cause: error.to_string(),
                            }
                        }
                    };
                    let _ = tx.send(message);
                });
            }
            AppCommand::LoadNamespaces => {
                let sources = sources.clone();
                tokio::spawn(async move {
                    let (namespaces, failure) = sources.unique_namespaces().await;
                    let _ = tx.send(AppMessage::NamespacesLoaded {
                        namespaces,
                        failure,
                    });
                });
            }
            AppCommand::Describe { identity } => {
                let sources = sources.clone();
                tokio::spawn(async move {
                    let result = sources
                        .describe(&identity)
                        .await
                        .map_err(|error| format!("{error:#}"));
                    let _ = tx.send(AppMessage::DescribeLoaded { identity, result });
                });
            }
            AppCommand::Delete { identity } => {
                let sources = sources.clone();
                tokio::spawn(async move {
                    let result = sources.delete(&identity).await.map_err(|error| {
                        warn!("delete {} failed: {error:#}", identity.display_path());
                        format!("{error:#}")
                    });
                    let _ = tx.send(AppMessage::DeleteFinished { identity, result });
                });
            }
            AppCommand::StartLogs { identity, session } => {
                return Some(LogSession::spawn(session, sources.clone(), identity, tx));
            }
            AppCommand::ConnectSources { contexts } => {
                let connector = self.connector.clone();
                tokio::spawn(async move {
                    let (sources, failures) = connect_all(connector.as_ref(), &contexts).await;
                    let _ = tx.send(AppMessage::SourcesConnected { sources, failures });
                });
            }
        }
        None
    }
}

/// Connects every context concurrently. Contexts that fail are reported
/// individually; the rest form the new source set.
pub async fn connect_all(
    connector: &dyn Connector,
    contexts: &[String],
) -> (MultiSource, Vec<SourceFailure>) {
    let attempts = join_all(contexts.iter().map(|context| async move {
        (context.clone(), connector.connect(context).await)
    }))
    .await;

    let mut backends = Vec::new();
    let mut failures = Vec::new();
    for (context, result) in attempts {
        match result {
            Ok(backend) => backends.push((context, backend)),
            Err(error) => {
                warn!("context {context} failed to connect: {error:#}");
                failures.push(SourceFailure {
                    name: context,
                    cause: format!("{error:#}"),
                });
            }
        }
    }
    (MultiSource::new(backends), failures)
}

#[cfg(test)]
mod tests {
    use super::{Dispatcher, connect_all};
    use crate::aggregator::MultiSource;
    use crate::app::{AppCommand, AppMessage};
    use crate::backend::testing::{FakeBackend, FakeConnector};
    use crate::backend::{Backend, Connector};
    use crate::model::{NamespaceScope, ResourceIdentity, ResourceKind};
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::mpsc;

    fn connector() -> Arc<FakeConnector> {
        Arc::new(FakeConnector {
            backends: HashMap::from([
                (
                    "alpha".to_string(),
                    Arc::new(FakeBackend::with_pods("default", &["pod-0"])),
                ),
                (
                    "beta".to_string(),
                    Arc::new(FakeBackend::with_pods("default", &["pod-1", "pod-2"])),
                ),
            ]),
            unreachable: vec!["gamma".to_string()],
        })
    }

    async fn next(rx: &mut mpsc::UnboundedReceiver<AppMessage>) -> AppMessage {
        match tokio::time::timeout(Duration::from_secs(2), rx.recv()).await {
            Ok(Some(message)) => message,
            _ => panic!("no message arrived"),
        }
    }

    #[tokio::test]
    async fn refresh_reports_rows_with_its_generation() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let connector = connector();
        let dispatcher = Dispatcher::new(connector.clone() as Arc<dyn Connector>, tx);
        let (sources, _) =
            connect_all(connector.as_ref(), &["alpha".to_string(), "beta".to_string()]).await;

        let session = dispatcher.dispatch(
            AppCommand::Refresh {
                kind: ResourceKind::Pods,
                scope: NamespaceScope::All,
                generation: 4,
            },
            &sources,
        );
        assert!(session.is_none());

        match next(&mut rx).await {
            AppMessage::RowsLoaded {
                generation,
                items,
                failure,
                ..
            } => {
                assert_eq!(generation, 4);
                assert_eq!(items.len(), 3);
                assert!(failure.is_none());
            }
            other => panic!("unexpected {}", other.label()),
        }
    }

    #[tokio::test]
    async fn connect_reports_unreachable_contexts() {
        let connector = connector();
        let contexts = vec!["alpha".to_string(), "gamma".to_string()];
        let (sources, failures) = connect_all(connector.as_ref(), &contexts).await;

        assert_eq!(sources.sources(), vec!["alpha"]);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].name, "gamma");
        assert!(failures[0].cause.contains("unreachable"));
    }

    #[tokio::test]
    async fn delete_is_routed_and_reported() {
        let backend = Arc::new(FakeBackend::with_pods("default", &["pod-0"]));
        let sources = MultiSource::new(vec![(
            "alpha".to_string(),
            backend.clone() as Arc<dyn Backend>,
        )]);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let dispatcher = Dispatcher::new(connector() as Arc<dyn Connector>, tx);

        let identity = ResourceIdentity::new("", "default", "pod-0", "uid-pod-0", ResourceKind::Pods);
        dispatcher.dispatch(AppCommand::Delete { identity }, &sources);

        match next(&mut rx).await {
            AppMessage::DeleteFinished { result, .. } => assert!(result.is_ok()),
            other => panic!("unexpected {}", other.label()),
        }
        assert_eq!(backend.deleted_names(), vec!["pod-0"]);
    }

    #[tokio::test]
    async fn describe_failure_is_carried_as_text() {
        let sources = MultiSource::new(vec![(
            "alpha".to_string(),
            Arc::new(FakeBackend::failing("not found")) as Arc<dyn Backend>,
        )]);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let dispatcher = Dispatcher::new(connector() as Arc<dyn Connector>, tx);

        let identity = ResourceIdentity::new("", "default", "pod-0", "u0", ResourceKind::Pods);
        dispatcher.dispatch(AppCommand::Describe { identity }, &sources);

        match next(&mut rx).await {
            AppMessage::DescribeLoaded { result, .. } => {
                assert_eq!(result, Err("not found".to_string()));
            }
            other => panic!("unexpected {}", other.label()),
        }
    }

    #[tokio::test]
    async fn start_logs_hands_back_a_session() {
        let sources = MultiSource::new(vec![(
            "alpha".to_string(),
            Arc::new(FakeBackend::with_pods("default", &["pod-0"])) as Arc<dyn Backend>,
        )]);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let dispatcher = Dispatcher::new(connector() as Arc<dyn Connector>, tx);

        let identity = ResourceIdentity::new("", "default", "pod-0", "u0", ResourceKind::Pods);
        let session = dispatcher.dispatch(AppCommand::StartLogs { identity, session: 9 }, &sources);
        assert_eq!(session.as_ref().map(|session| session.id()), Some(9));

        match next(&mut rx).await {
            AppMessage::LogStarted { session, containers } => {
                assert_eq!(session, 9);
                assert_eq!(containers, vec!["main"]);
            }
            other => panic!("unexpected {}", other.label()),
        }
    }
}
