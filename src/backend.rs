use anyhow::Result;
use async_trait::async_trait;
use futures::stream::BoxStream;
use std::sync::Arc;

use crate::model::{NamespaceScope, ResourceItem, ResourceKind};

pub type LogLines = BoxStream<'static, Result<String>>;

/// One authenticated connection to a single context.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn list_resources(
        &self,
        kind: ResourceKind,
        scope: &NamespaceScope,
    ) -> Result<Vec<ResourceItem>>;

    async fn describe(
        &self,
        kind: ResourceKind,
        name: &str,
        namespace: Option<&str>,
    ) -> Result<String>;

    async fn delete(&self, kind: ResourceKind, name: &str, namespace: Option<&str>) -> Result<()>;

    async fn list_namespaces(&self) -> Result<Vec<String>>;

    async fn list_containers(&self, namespace: &str, pod: &str) -> Result<Vec<String>>;

    async fn stream_logs(&self, namespace: &str, pod: &str, container: &str) -> Result<LogLines>;
}

/// Opens backends by context name. Kept separate from `Backend` so the
/// context picker can be driven without a live cluster.
#[async_trait]
pub trait Connector: Send + Sync {
    fn available_contexts(&self) -> Vec<String>;

    fn current_context(&self) -> Option<String>;

    async fn connect(&self, context: &str) -> Result<Arc<dyn Backend>>;
}
