use futures::StreamExt;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, warn};

use crate::aggregator::MultiSource;
use crate::app::AppMessage;
use crate::model::ResourceIdentity;

/// A running log stream for one pod: a supervisor task with one child per
/// container. Dropping or stopping the session aborts all of them.
pub struct LogSession {
    id: u64,
    task: JoinHandle<()>,
}

impl LogSession {
    pub fn spawn(
        id: u64,
        sources: MultiSource,
        identity: ResourceIdentity,
        tx: UnboundedSender<AppMessage>,
    ) -> Self {
        let task = tokio::spawn(run_session(id, sources, identity, tx));
        Self { id, task }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn stop(self) {
        debug!("stopping log session {}", self.id);
        self.task.abort();
    }
}

impl Drop for LogSession {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run_session(
    id: u64,
    sources: MultiSource,
    identity: ResourceIdentity,
    tx: UnboundedSender<AppMessage>,
) {
    let containers = match sources.list_containers(&identity).await {
        Ok(containers) if !containers.is_empty() => containers,
        Ok(_) => {
            let _ = tx.send(AppMessage::LogError {
                session: id,
                container: identity.name.clone(),
                message: "pod has no containers".to_string(),
            });
            return;
        }
        Err(error) => {
            warn!("log session {id}: container lookup failed: {error:#}");
            let _ = tx.send(AppMessage::LogError {
                session: id,
                container: identity.name.clone(),
                message: format!("{error:#}"),
            });
            return;
        }
    };

    let _ = tx.send(AppMessage::LogStarted {
        session: id,
        containers: containers.clone(),
    });

    // The set owns the children; aborting the supervisor drops it, which
    // aborts every container stream with it.
    let mut streams = JoinSet::new();
    for container in containers {
        streams.spawn(follow_container(
            id,
            sources.clone(),
            identity.clone(),
            container,
            tx.clone(),
        ));
    }
    while let Some(result) = streams.join_next().await {
        if let Err(error) = result
            && error.is_panic()
        {
            warn!("log session {id}: container stream panicked");
        }
    }
    debug!("log session {id} finished");
}

async fn follow_container(
    id: u64,
    sources: MultiSource,
    identity: ResourceIdentity,
    container: String,
    tx: UnboundedSender<AppMessage>,
) {
    let mut lines = match sources.stream_logs(&identity, &container).await {
        Ok(lines) => lines,
        Err(error) => {
            let _ = tx.send(AppMessage::LogError {
                session: id,
                container,
                message: format!("{error:#}"),
            });
            return;
        }
    };

    while let Some(line) = lines.next().await {
        let message = match line {
            Ok(line) => AppMessage::LogLine {
                session: id,
                container: container.clone(),
                line,
            },
            Err(error) => {
                let _ = tx.send(AppMessage::LogError {
                    session: id,
                    container: container.clone(),
                    message: format!("{error:#}"),
                });
                break;
            }
        };
        if tx.send(message).is_err() {
            return;
        }
    }

    let _ = tx.send(AppMessage::LogEnded {
        session: id,
        container,
    });
}

#[cfg(test)]
mod tests {
    use super::LogSession;
    use crate::aggregator::MultiSource;
    use crate::app::AppMessage;
    use crate::backend::Backend;
    use crate::backend::testing::FakeBackend;
    use crate::model::{ResourceIdentity, ResourceKind};
    use std::collections::BTreeSet;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::mpsc;

    fn single(backend: FakeBackend) -> MultiSource {
        MultiSource::new(vec![(
            "alpha".to_string(),
            Arc::new(backend) as Arc<dyn Backend>,
        )])
    }

    fn target() -> ResourceIdentity {
        ResourceIdentity::new("", "default", "web-0", "u1", ResourceKind::Pods)
    }

    #[tokio::test]
    async fn every_container_streams_into_the_session() {
        let backend = FakeBackend {
            containers: vec!["app".to_string(), "sidecar".to_string()],
            log_lines: vec!["one".to_string(), "two".to_string()],
            ..FakeBackend::default()
        };
        let (tx, mut rx) = mpsc::unbounded_channel();
        let session = LogSession::spawn(7, single(backend), target(), tx);

        let mut lines = Vec::new();
        let mut ended = BTreeSet::new();
        let mut started = None;
        while let Ok(Some(message)) =
            tokio::time::timeout(Duration::from_secs(2), rx.recv()).await
        {
            match message {
                AppMessage::LogStarted { session, containers } => {
                    assert_eq!(session, 7);
                    started = Some(containers);
                }
                AppMessage::LogLine { session, line, .. } => {
                    assert_eq!(session, 7);
                    lines.push(line);
                }
                AppMessage::LogEnded { container, .. } => {
                    ended.insert(container);
                }
                other => panic!("unexpected {}", other.label()),
            }
        }

        assert_eq!(started, Some(vec!["app".to_string(), "sidecar".to_string()]));
        lines.sort();
        assert_eq!(
            lines,
            vec!["app: one", "app: two", "sidecar: one", "sidecar: two"]
        );
        assert_eq!(ended.len(), 2);
        drop(session);
    }

    #[tokio::test]
    async fn container_lookup_failure_is_reported() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let _session = LogSession::spawn(3, single(FakeBackend::failing("forbidden")), target(), tx);

        let message = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .ok()
            .flatten();
        assert!(matches!(
            message,
            Some(AppMessage::LogError { session: 3, ref message, .. }) if message.as_str() == "forbidden"
        ));
    }

    #[tokio::test]
    async fn stopping_the_session_closes_the_channel() {
        let backend = FakeBackend {
            containers: vec!["app".to_string()],
            ..FakeBackend::default()
        }
        .delayed(Duration::from_secs(30));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let session = LogSession::spawn(1, single(backend), target(), tx);
        session.stop();

        let closed = tokio::time::timeout(Duration::from_secs(2), rx.recv()).await;
        assert!(matches!(closed, Ok(None)));
    }
}
