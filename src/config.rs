use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cli::CliArgs;
use crate::model::{NamespaceScope, ResourceKind};

const DEFAULT_REFRESH_SECS: u64 = 5;

#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
pub struct ConfigFile {
    #[serde(default)]
    pub contexts: Vec<String>,
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default, alias = "resource")]
    pub kind: Option<String>,
    #[serde(default, alias = "refresh")]
    pub refresh_secs: Option<u64>,
}

impl ConfigFile {
    /// Loads the first config file found; no file is not an error.
    pub fn discover() -> Result<(Option<PathBuf>, Self)> {
        let Some(path) = discover_config_path() else {
            return Ok((None, Self::default()));
        };
        let parsed = Self::load(&path)?;
        Ok((Some(path), parsed))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::parse(&raw).with_context(|| format!("failed to parse config {}", path.display()))
    }

    pub fn parse(raw: &str) -> Result<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(raw)?)
    }
}

/// What the kubeconfig suggests when neither flags nor the file decide.
#[derive(Debug, Clone, Default)]
pub struct KubeDefaults {
    pub available_contexts: Vec<String>,
    pub current_context: Option<String>,
    pub context_namespace: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub contexts: Vec<String>,
    pub namespace_scope: NamespaceScope,
    pub kind: ResourceKind,
    pub refresh_interval: Duration,
}

impl Settings {
    /// Flags win over the file, the file wins over kubeconfig defaults.
    pub fn resolve(args: &CliArgs, file: &ConfigFile, defaults: &KubeDefaults) -> Result<Self> {
        let contexts = if args.all_contexts {
            defaults.available_contexts.clone()
        } else if !args.contexts.is_empty() {
            args.contexts.clone()
        } else if !file.contexts.is_empty() {
            file.contexts.clone()
        } else {
            defaults.current_context.clone().into_iter().collect()
        };

        let namespace_scope = if args.all_namespaces {
            NamespaceScope::All
        } else if let Some(namespace) = &args.namespace {
            NamespaceScope::from_label(namespace)
        } else if let Some(namespace) = &file.namespace {
            NamespaceScope::from_label(namespace)
        } else {
            NamespaceScope::Named(
                defaults
                    .context_namespace
                    .clone()
                    .unwrap_or_else(|| "default".to_string()),
            )
        };

        let kind = match args.kind.as_deref().or(file.kind.as_deref()) {
            Some(token) => ResourceKind::from_token(token)
                .with_context(|| format!("unknown resource kind '{token}'"))?,
            None => ResourceKind::Pods,
        };

        let refresh_secs = args
            .refresh_secs
            .or(file.refresh_secs)
            .unwrap_or(DEFAULT_REFRESH_SECS)
            .max(1);

        Ok(Self {
            contexts,
            namespace_scope,
            kind,
            refresh_interval: Duration::from_secs(refresh_secs),
        })
    }
}

fn discover_config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("KUBEDECK_CONFIG")
        && !path.trim().is_empty()
    {
        return Some(PathBuf::from(path));
    }

    let cwd_candidates = [
        PathBuf::from("kubedeck.yaml"),
        PathBuf::from("kubedeck.yml"),
        PathBuf::from(".kubedeck.yaml"),
    ];
    for candidate in cwd_candidates {
        if candidate.exists() {
            return Some(candidate);
        }
    }

    if let Ok(home) = std::env::var("HOME") {
        let user_candidates = [
            PathBuf::from(&home).join(".config/kubedeck/config.yaml"),
            PathBuf::from(&home).join(".config/kubedeck/config.yml"),
        ];
        for candidate in user_candidates {
            if candidate.exists() {
                return Some(candidate);
            }
        }
    }

    None
}
