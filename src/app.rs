use chrono::{DateTime, Local};
use crossterm::event::KeyEvent;
use std::collections::{BTreeSet, VecDeque};
use std::time::Duration;
use tracing::debug;

use crate::aggregator::{AggregateError, MultiSource, SourceFailure};
use crate::input::motion_for;
use crate::logs::LogSession;
use crate::mode::{ModeController, ScreenMode};
use crate::model::{NamespaceScope, ResourceIdentity, ResourceItem, ResourceKind};
use crate::selection::SelectionTracker;

const MAX_LOG_LINES: usize = 5_000;

/// Background work requested by a key or a message. Executed by
/// `commands::dispatch`; results come back as `AppMessage`s.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCommand {
    None,
    Refresh {
        kind: ResourceKind,
        scope: NamespaceScope,
        generation: u64,
    },
    LoadNamespaces,
    Describe {
        identity: ResourceIdentity,
    },
    Delete {
        identity: ResourceIdentity,
    },
    StartLogs {
        identity: ResourceIdentity,
        session: u64,
    },
    ConnectSources {
        contexts: Vec<String>,
    },
}

pub enum AppMessage {
    RowsLoaded {
        generation: u64,
        kind: ResourceKind,
        items: Vec<ResourceItem>,
        failure: Option<AggregateError>,
    },
    RefreshAborted {
        generation: u64,
        cause: String,
    },
    NamespacesLoaded {
        namespaces: BTreeSet<String>,
        failure: Option<AggregateError>,
    },
    DescribeLoaded {
        identity: ResourceIdentity,
        result: Result<String, String>,
    },
    DeleteFinished {
        identity: ResourceIdentity,
        result: Result<(), String>,
    },
    LogStarted {
        session: u64,
        containers: Vec<String>,
    },
    LogLine {
        session: u64,
        container: String,
        line: String,
    },
    LogError {
        session: u64,
        container: String,
        message: String,
    },
    LogEnded {
        session: u64,
        container: String,
    },
    SourcesConnected {
        sources: MultiSource,
        failures: Vec<SourceFailure>,
    },
}

impl AppMessage {
    pub fn label(&self) -> &'static str {
        match self {
            Self::RowsLoaded { .. } => "rows-loaded",
            Self::RefreshAborted { .. } => "refresh-aborted",
            Self::NamespacesLoaded { .. } => "namespaces-loaded",
            Self::DescribeLoaded { .. } => "describe-loaded",
            Self::DeleteFinished { .. } => "delete-finished",
            Self::LogStarted { .. } => "log-started",
            Self::LogLine { .. } => "log-line",
            Self::LogError { .. } => "log-error",
            Self::LogEnded { .. } => "log-ended",
            Self::SourcesConnected { .. } => "sources-connected",
        }
    }
}

/// Synchronous answer to a request made by a mode: whether it was accepted,
/// plus any background work it needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestOutcome {
    pub accepted: bool,
    pub command: AppCommand,
}

impl RequestOutcome {
    fn accepted(command: AppCommand) -> Self {
        Self {
            accepted: true,
            command,
        }
    }

    fn refused() -> Self {
        Self {
            accepted: false,
            command: AppCommand::None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Picker {
    pub items: Vec<String>,
    pub cursor: usize,
    pub loading: bool,
}

impl Picker {
    fn move_cursor(&mut self, delta: isize) {
        if self.items.is_empty() {
            self.cursor = 0;
            return;
        }
        let max = self.items.len() as isize - 1;
        self.cursor = (self.cursor as isize).saturating_add(delta).clamp(0, max) as usize;
    }

    fn cycle(&mut self, step: isize) {
        if self.items.is_empty() {
            return;
        }
        let len = self.items.len() as isize;
        self.cursor = (self.cursor as isize + step).rem_euclid(len) as usize;
    }

    pub fn current(&self) -> Option<&str> {
        self.items.get(self.cursor).map(String::as_str)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContextPicker {
    pub picker: Picker,
    pub checked: BTreeSet<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescribeView {
    pub identity: ResourceIdentity,
    pub text: Option<String>,
    pub scroll: usize,
}

/// Lines of one log session. Lines from older sessions are rejected by id.
pub struct LogView {
    pub identity: ResourceIdentity,
    pub session: u64,
    pub containers: Vec<String>,
    lines: VecDeque<String>,
    scroll: usize,
    follow: bool,
    task: Option<LogSession>,
}

impl LogView {
    fn new(identity: ResourceIdentity, session: u64) -> Self {
        Self {
            identity,
            session,
            containers: Vec::new(),
            lines: VecDeque::new(),
            scroll: 0,
            follow: true,
            task: None,
        }
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(String::as_str)
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn follow(&self) -> bool {
        self.follow
    }

    /// First visible line for a viewport of `height` lines.
    pub fn offset(&self, height: usize) -> usize {
        let max = self.lines.len().saturating_sub(height);
        if self.follow {
            max
        } else {
            self.scroll.min(max)
        }
    }

    fn push(&mut self, line: String) {
        self.lines.push_back(line);
        while self.lines.len() > MAX_LOG_LINES {
            self.lines.pop_front();
            self.scroll = self.scroll.saturating_sub(1);
        }
    }

    fn scroll_by(&mut self, delta: isize, height: usize) {
        let max = self.lines.len().saturating_sub(height) as isize;
        let current = self.offset(height) as isize;
        let next = current.saturating_add(delta).clamp(0, max.max(0));
        self.scroll = next as usize;
        self.follow = next >= max;
    }

    fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.stop();
        }
    }
}

/// Everything a mode may observe or change. One instance lives for the
/// program's lifetime and is only touched from the event loop.
pub struct AppContext {
    running: bool,
    mode: ScreenMode,
    previous_mode: Option<ScreenMode>,
    sources: MultiSource,
    known_contexts: Vec<String>,
    kind: ResourceKind,
    rows_kind: ResourceKind,
    namespace_scope: NamespaceScope,
    rows: Vec<ResourceItem>,
    selection: SelectionTracker,
    refresh_interval: Duration,
    refresh_generation: u64,
    rows_loading: bool,
    connecting: bool,
    last_refreshed: Option<DateTime<Local>>,
    failures: Vec<SourceFailure>,
    connect_failures: Vec<SourceFailure>,
    status: String,
    page_size: usize,
    pending_delete: Option<ResourceIdentity>,
    namespace_picker: Option<Picker>,
    context_picker: Option<ContextPicker>,
    resource_picker: Option<Picker>,
    describe_view: Option<DescribeView>,
    log_view: Option<LogView>,
    help_scroll: usize,
    next_log_session: u64,
}

impl AppContext {
    pub fn new(
        sources: MultiSource,
        namespace_scope: NamespaceScope,
        kind: ResourceKind,
        refresh_interval: Duration,
        known_contexts: Vec<String>,
    ) -> Self {
        Self {
            running: true,
            mode: ScreenMode::List,
            previous_mode: None,
            sources,
            known_contexts,
            kind,
            rows_kind: kind,
            namespace_scope,
            rows: Vec::new(),
            selection: SelectionTracker::new(),
            refresh_interval,
            refresh_generation: 0,
            rows_loading: false,
            connecting: false,
            last_refreshed: None,
            failures: Vec::new(),
            connect_failures: Vec::new(),
            status: "Ready".to_string(),
            page_size: 10,
            pending_delete: None,
            namespace_picker: None,
            context_picker: None,
            resource_picker: None,
            describe_view: None,
            log_view: None,
            help_scroll: 0,
            next_log_session: 1,
        }
    }

    pub fn running(&self) -> bool {
        self.running
    }

    pub fn quit(&mut self) {
        if let Some(view) = self.log_view.as_mut() {
            view.stop();
        }
        self.running = false;
    }

    pub fn mode(&self) -> ScreenMode {
        self.mode
    }

    pub fn enter_mode(&mut self, mode: ScreenMode) {
        if mode != self.mode {
            self.previous_mode = Some(self.mode);
            self.mode = mode;
        }
    }

    pub fn force_mode(&mut self, mode: ScreenMode) {
        self.mode = mode;
        self.previous_mode = None;
    }

    pub fn previous_mode(&self) -> Option<ScreenMode> {
        self.previous_mode
    }

    pub fn return_to_previous(&mut self) {
        self.mode = self.previous_mode.take().unwrap_or(ScreenMode::List);
    }

    /// Leaves any selector or dialog, discarding its view and pending state.
    pub fn cancel_to_list(&mut self) {
        self.namespace_picker = None;
        self.context_picker = None;
        self.resource_picker = None;
        self.pending_delete = None;
        self.force_mode(ScreenMode::List);
    }

    pub fn sources(&self) -> &MultiSource {
        &self.sources
    }

    pub fn replace_sources(&mut self, sources: MultiSource) {
        self.sources = sources;
        self.failures.clear();
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// Kind the current rows were listed as; lags `kind` while a switch loads.
    pub fn rows_kind(&self) -> ResourceKind {
        self.rows_kind
    }

    pub fn namespace_scope(&self) -> &NamespaceScope {
        &self.namespace_scope
    }

    pub fn rows(&self) -> &[ResourceItem] {
        &self.rows
    }

    pub fn selected_row(&self) -> usize {
        self.selection.selected_row()
    }

    pub fn selected_identity(&self) -> Option<ResourceIdentity> {
        self.selection.selected_identity()
    }

    pub fn move_selection(&mut self, delta: isize) -> usize {
        self.selection.move_selection(delta, self.rows.len())
    }

    pub fn show_context_column(&self) -> bool {
        self.sources.len() > 1
    }

    pub fn refresh_interval(&self) -> Duration {
        self.refresh_interval
    }

    pub fn rows_loading(&self) -> bool {
        self.rows_loading
    }

    pub fn connecting(&self) -> bool {
        self.connecting
    }

    pub fn last_refreshed(&self) -> Option<String> {
        self.last_refreshed
            .map(|moment| moment.format("%H:%M:%S").to_string())
    }

    /// Contexts that failed to connect, then sources that failed the last refresh.
    pub fn failures(&self) -> Vec<&SourceFailure> {
        self.connect_failures
            .iter()
            .chain(self.failures.iter())
            .collect()
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn set_status(&mut self, status: impl Into<String>) {
        self.status = normalize_status_text(status.into());
    }

    pub fn set_page_size(&mut self, rows: usize) {
        self.page_size = rows.max(1);
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn pending_delete(&self) -> Option<&ResourceIdentity> {
        self.pending_delete.as_ref()
    }

    pub fn namespace_picker(&self) -> Option<&Picker> {
        self.namespace_picker.as_ref()
    }

    pub fn context_picker(&self) -> Option<&ContextPicker> {
        self.context_picker.as_ref()
    }

    pub fn resource_picker(&self) -> Option<&Picker> {
        self.resource_picker.as_ref()
    }

    pub fn describe_view(&self) -> Option<&DescribeView> {
        self.describe_view.as_ref()
    }

    pub fn log_view(&self) -> Option<&LogView> {
        self.log_view.as_ref()
    }

    pub fn help_scroll(&self) -> usize {
        self.help_scroll
    }

    pub fn request_refresh(&mut self) -> AppCommand {
        if self.sources.is_empty() {
            if !self.connecting {
                self.set_status("No context connected; press c to choose one");
            }
            return AppCommand::None;
        }
        self.refresh_generation += 1;
        self.rows_loading = true;
        AppCommand::Refresh {
            kind: self.kind,
            scope: self.namespace_scope.clone(),
            generation: self.refresh_generation,
        }
    }

    /// Periodic refresh; skipped while a previous one is still in flight.
    pub fn on_tick(&mut self) -> AppCommand {
        if self.rows_loading || self.connecting || self.sources.is_empty() {
            return AppCommand::None;
        }
        self.request_refresh()
    }

    pub fn switch_kind(&mut self, kind: ResourceKind) -> AppCommand {
        if kind != self.kind {
            self.kind = kind;
            self.set_status(format!("Loading {}", kind.title()));
        }
        self.request_refresh()
    }

    pub fn open_namespace_selector(&mut self) -> RequestOutcome {
        let mut picker = Picker {
            items: vec!["all".to_string()],
            cursor: 0,
            loading: !self.sources.is_empty(),
        };
        if let NamespaceScope::Named(current) = &self.namespace_scope {
            picker.items.push(current.clone());
            picker.cursor = 1;
        }
        let command = if picker.loading {
            AppCommand::LoadNamespaces
        } else {
            AppCommand::None
        };
        self.namespace_picker = Some(picker);
        self.enter_mode(ScreenMode::NamespaceSelector);
        RequestOutcome::accepted(command)
    }

    pub fn set_namespaces(&mut self, namespaces: BTreeSet<String>, failure: Option<AggregateError>) {
        if let Some(failure) = &failure {
            self.set_status(format!("Namespaces incomplete: {failure}"));
        }
        let Some(picker) = self.namespace_picker.as_mut() else {
            debug!("namespace list arrived with no picker open");
            return;
        };
        let current = self.namespace_scope.label();
        picker.items = std::iter::once("all".to_string())
            .chain(namespaces.into_iter().filter(|namespace| namespace != "all"))
            .collect();
        picker.cursor = picker
            .items
            .iter()
            .position(|item| *item == current)
            .unwrap_or(0);
        picker.loading = false;
    }

    pub fn apply_namespace_selection(&mut self) -> RequestOutcome {
        let Some(picker) = self.namespace_picker.as_ref() else {
            return RequestOutcome::refused();
        };
        if picker.loading {
            return RequestOutcome::refused();
        }
        let Some(choice) = picker.current().map(NamespaceScope::from_label) else {
            return RequestOutcome::refused();
        };
        self.cancel_to_list();
        self.namespace_scope = choice;
        self.set_status(format!("Namespace: {}", self.namespace_scope));
        RequestOutcome::accepted(self.request_refresh())
    }

    pub fn open_context_selector(&mut self) -> RequestOutcome {
        let active = self.sources.sources();
        let items = self
            .known_contexts
            .iter()
            .chain(active.iter())
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect::<Vec<_>>();
        if items.is_empty() {
            self.set_status("No contexts found in kubeconfig");
            return RequestOutcome::refused();
        }
        let cursor = active
            .first()
            .and_then(|first| items.iter().position(|item| item == first))
            .unwrap_or(0);
        self.context_picker = Some(ContextPicker {
            picker: Picker {
                items,
                cursor,
                loading: false,
            },
            checked: active.into_iter().collect(),
        });
        self.enter_mode(ScreenMode::ContextSelector);
        RequestOutcome::accepted(AppCommand::None)
    }

    pub fn toggle_context_checked(&mut self) {
        let Some(context_picker) = self.context_picker.as_mut() else {
            return;
        };
        let Some(current) = context_picker.picker.current().map(str::to_string) else {
            return;
        };
        if !context_picker.checked.remove(&current) {
            context_picker.checked.insert(current);
        }
    }

    pub fn apply_context_selection(&mut self) -> RequestOutcome {
        let Some(context_picker) = self.context_picker.as_ref() else {
            return RequestOutcome::refused();
        };
        if context_picker.checked.is_empty() {
            self.set_status("Select at least one context");
            return RequestOutcome::refused();
        }
        let contexts = context_picker.checked.iter().cloned().collect::<Vec<_>>();
        self.cancel_to_list();
        if contexts == self.sources.sources() {
            return RequestOutcome::accepted(AppCommand::None);
        }
        RequestOutcome::accepted(self.connect(contexts))
    }

    /// Starts replacing the backend set with `contexts`.
    pub fn connect(&mut self, contexts: Vec<String>) -> AppCommand {
        if contexts.is_empty() {
            self.set_status("No context selected; press c to choose one");
            return AppCommand::None;
        }
        self.connecting = true;
        self.set_status(format!("Connecting to {}", contexts.join(", ")));
        AppCommand::ConnectSources { contexts }
    }

    pub fn open_resource_selector(&mut self) -> RequestOutcome {
        let items = ResourceKind::ALL
            .iter()
            .map(|kind| format!("{} ({})", kind.title(), kind.short_token()))
            .collect();
        let cursor = ResourceKind::ALL
            .iter()
            .position(|kind| *kind == self.kind)
            .unwrap_or(0);
        self.resource_picker = Some(Picker {
            items,
            cursor,
            loading: false,
        });
        self.enter_mode(ScreenMode::ResourceSelector);
        RequestOutcome::accepted(AppCommand::None)
    }

    pub fn cycle_resource_picker(&mut self, step: isize) {
        if let Some(picker) = self.resource_picker.as_mut() {
            picker.cycle(step);
        }
    }

    pub fn apply_resource_selection(&mut self) -> RequestOutcome {
        let Some(kind) = self
            .resource_picker
            .as_ref()
            .and_then(|picker| ResourceKind::ALL.get(picker.cursor).copied())
        else {
            return RequestOutcome::refused();
        };
        self.cancel_to_list();
        RequestOutcome::accepted(self.switch_kind(kind))
    }

    pub fn open_describe(&mut self) -> RequestOutcome {
        let Some(identity) = self.actionable_selection("describe") else {
            return RequestOutcome::refused();
        };
        self.describe_view = Some(DescribeView {
            identity: identity.clone(),
            text: None,
            scroll: 0,
        });
        self.enter_mode(ScreenMode::Describe);
        RequestOutcome::accepted(AppCommand::Describe { identity })
    }

    pub fn close_describe(&mut self) {
        self.describe_view = None;
        self.force_mode(ScreenMode::List);
    }

    pub fn open_logs(&mut self) -> RequestOutcome {
        if !self.rows_kind.supports_logs() || !self.kind.supports_logs() {
            self.set_status(format!("Logs are not available for {}", self.kind.title()));
            return RequestOutcome::refused();
        }
        let Some(identity) = self.actionable_selection("stream logs for") else {
            return RequestOutcome::refused();
        };
        if let Some(previous) = self.log_view.as_mut() {
            previous.stop();
        }
        let session = self.next_log_session;
        self.next_log_session += 1;
        self.log_view = Some(LogView::new(identity.clone(), session));
        self.enter_mode(ScreenMode::Log);
        RequestOutcome::accepted(AppCommand::StartLogs { identity, session })
    }

    /// Hands the running stream to its view, or stops it when the view it
    /// was started for is already gone.
    pub fn attach_log_session(&mut self, session: LogSession) {
        match self.log_view.as_mut() {
            Some(view) if view.session == session.id() => view.task = Some(session),
            _ => {
                debug!("log session {} has no view, stopping", session.id());
                session.stop();
            }
        }
    }

    pub fn close_logs(&mut self) {
        if let Some(view) = self.log_view.as_mut() {
            view.stop();
        }
        self.log_view = None;
        self.force_mode(ScreenMode::List);
    }

    pub fn toggle_log_follow(&mut self) {
        let page = self.page_size;
        if let Some(view) = self.log_view.as_mut() {
            if view.follow {
                view.scroll = view.offset(page);
                view.follow = false;
            } else {
                view.follow = true;
            }
        }
    }

    pub fn request_delete_confirmation(&mut self) -> RequestOutcome {
        let Some(identity) = self.actionable_selection("delete") else {
            return RequestOutcome::refused();
        };
        self.pending_delete = Some(identity);
        self.enter_mode(ScreenMode::ConfirmDialog);
        RequestOutcome::accepted(AppCommand::None)
    }

    pub fn confirm_delete(&mut self) -> RequestOutcome {
        let Some(identity) = self.pending_delete.take() else {
            self.cancel_to_list();
            return RequestOutcome::refused();
        };
        self.cancel_to_list();
        self.set_status(format!("Deleting {}", identity.display_path()));
        RequestOutcome::accepted(AppCommand::Delete { identity })
    }

    /// Applies motion keys to whatever the active mode shows. A view that
    /// was never constructed ignores them.
    pub fn forward_to_view(&mut self, key: KeyEvent) {
        let Some(motion) = motion_for(key) else {
            return;
        };
        let page = self.page_size;
        let delta = motion.delta(page);
        match self.mode {
            ScreenMode::List => {
                self.move_selection(delta);
            }
            ScreenMode::Log => {
                if let Some(view) = self.log_view.as_mut() {
                    view.scroll_by(delta, page);
                }
            }
            ScreenMode::Describe => {
                if let Some(view) = self.describe_view.as_mut() {
                    let lines = view.text.as_deref().map(|text| text.lines().count()).unwrap_or(0);
                    view.scroll = scroll_offset(view.scroll, delta, lines);
                }
            }
            ScreenMode::Help => {
                self.help_scroll = scroll_offset(self.help_scroll, delta, usize::MAX / 4);
            }
            ScreenMode::NamespaceSelector => {
                if let Some(picker) = self.namespace_picker.as_mut() {
                    picker.move_cursor(delta);
                }
            }
            ScreenMode::ResourceSelector => {
                if let Some(picker) = self.resource_picker.as_mut() {
                    picker.move_cursor(delta);
                }
            }
            ScreenMode::ContextSelector => {
                if let Some(context_picker) = self.context_picker.as_mut() {
                    context_picker.picker.move_cursor(delta);
                }
            }
            ScreenMode::ConfirmDialog => {}
        }
    }

    /// Installs a fresh listing and restores the selection onto it.
    pub fn replace_rows(&mut self, kind: ResourceKind, mut items: Vec<ResourceItem>) {
        if self.sources.len() <= 1 {
            for item in &mut items {
                item.identity.source.clear();
            }
        }
        items.sort_by(|left, right| {
            left.identity
                .name
                .cmp(&right.identity.name)
                .then_with(|| left.identity.namespace.cmp(&right.identity.namespace))
                .then_with(|| left.identity.source.cmp(&right.identity.source))
        });
        self.selection
            .set_row_map(items.iter().map(|item| item.identity.clone()).collect());
        self.rows = items;
        self.rows_kind = kind;
        self.selection.restore_selection(self.rows.len());
    }

    pub fn apply_message(&mut self, message: AppMessage) -> AppCommand {
        match message {
            AppMessage::RowsLoaded {
                generation,
                kind,
                items,
                failure,
            } => {
                if generation != self.refresh_generation || kind != self.kind {
                    debug!("discarding stale {} listing (generation {generation})", kind.title());
                    return AppCommand::None;
                }
                self.rows_loading = false;
                self.replace_rows(kind, items);
                self.last_refreshed = Some(Local::now());
                match failure {
                    Some(failure) if failure.all_failed() => {
                        self.set_status(format!(
                            "All sources failed: {}",
                            failure.failed_sources().join(", ")
                        ));
                        self.failures = failure.failures;
                    }
                    Some(failure) => {
                        self.set_status(summarize_error_line(&failure.to_string()));
                        self.failures = failure.failures;
                    }
                    None => {
                        self.failures.clear();
                        self.set_status(format!("{} {}", self.rows.len(), kind.title()));
                    }
                }
                AppCommand::None
            }
            AppMessage::RefreshAborted { generation, cause } => {
                if generation != self.refresh_generation {
                    return AppCommand::None;
                }
                self.rows_loading = false;
                self.set_status(format!("Refresh failed: {}", summarize_error_line(&cause)));
                AppCommand::None
            }
            AppMessage::NamespacesLoaded {
                namespaces,
                failure,
            } => {
                self.set_namespaces(namespaces, failure);
                AppCommand::None
            }
            AppMessage::DescribeLoaded { identity, result } => {
                let Some(view) = self.describe_view.as_mut() else {
                    return AppCommand::None;
                };
                if view.identity != identity {
                    return AppCommand::None;
                }
                view.text = Some(match result {
                    Ok(text) => text,
                    Err(error) => format!("Describe failed: {error}"),
                });
                AppCommand::None
            }
            AppMessage::DeleteFinished { identity, result } => {
                match result {
                    Ok(()) => self.set_status(format!("Deleted {}", identity.display_path())),
                    Err(error) => self.set_status(format!(
                        "Delete {} failed: {}",
                        identity.display_path(),
                        summarize_error_line(&error)
                    )),
                }
                self.request_refresh()
            }
            AppMessage::LogStarted {
                session,
                containers,
            } => {
                if let Some(view) = self.session_view(session) {
                    view.containers = containers;
                }
                AppCommand::None
            }
            AppMessage::LogLine {
                session,
                container,
                line,
            } => {
                if let Some(view) = self.session_view(session) {
                    let line = if view.containers.len() > 1 {
                        format!("[{container}] {line}")
                    } else {
                        line
                    };
                    view.push(line);
                }
                AppCommand::None
            }
            AppMessage::LogError {
                session,
                container,
                message,
            } => {
                if let Some(view) = self.session_view(session) {
                    view.push(format!("! {container}: {message}"));
                }
                AppCommand::None
            }
            AppMessage::LogEnded { session, container } => {
                if let Some(view) = self.session_view(session) {
                    view.push(format!("-- {container} stream ended --"));
                }
                AppCommand::None
            }
            AppMessage::SourcesConnected { sources, failures } => {
                self.connecting = false;
                let connected = sources.sources();
                self.replace_sources(sources);
                self.connect_failures.clear();
                if failures.is_empty() {
                    self.set_status(format!("Connected to {}", connected.join(", ")));
                } else {
                    let failed = failures
                        .iter()
                        .map(|failure| format!("{}: {}", failure.name, failure.cause))
                        .collect::<Vec<_>>()
                        .join("; ");
                    self.set_status(format!("Connect failed for {failed}"));
                    self.connect_failures = failures;
                }
                if self.sources.is_empty() {
                    self.replace_rows(self.kind, Vec::new());
                    return AppCommand::None;
                }
                self.request_refresh()
            }
        }
    }

    fn session_view(&mut self, session: u64) -> Option<&mut LogView> {
        self.log_view
            .as_mut()
            .filter(|view| view.session == session)
    }

    fn actionable_selection(&mut self, action: &str) -> Option<ResourceIdentity> {
        let identity = self.selected_identity()?;
        match self.sources.resolve(&identity.source) {
            Ok(_) => Some(identity),
            Err(error) => {
                self.set_status(format!(
                    "Cannot {action} {}: {error}",
                    identity.display_path()
                ));
                None
            }
        }
    }
}

/// Pairs the context with the controller that interprets keys for it.
pub struct App {
    ctx: AppContext,
    controller: ModeController,
}

impl App {
    pub fn new(ctx: AppContext) -> Self {
        Self::with_controller(ctx, ModeController::new())
    }

    pub fn with_controller(ctx: AppContext, controller: ModeController) -> Self {
        Self { ctx, controller }
    }

    pub fn context(&self) -> &AppContext {
        &self.ctx
    }

    pub fn context_mut(&mut self) -> &mut AppContext {
        &mut self.ctx
    }

    pub fn controller(&self) -> &ModeController {
        &self.controller
    }

    pub fn running(&self) -> bool {
        self.ctx.running()
    }

    /// Mode actually drawn; unregistered modes render as the list.
    pub fn visible_mode(&self) -> ScreenMode {
        self.controller.effective_mode(self.ctx.mode())
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> AppCommand {
        let outcome = self.controller.handle_key(&mut self.ctx, key);
        if !outcome.handled {
            self.ctx.forward_to_view(key);
        }
        outcome.command
    }

    pub fn apply_message(&mut self, message: AppMessage) -> AppCommand {
        debug!("applying {}", message.label());
        self.ctx.apply_message(message)
    }

    pub fn on_tick(&mut self) -> AppCommand {
        self.ctx.on_tick()
    }
}

fn scroll_offset(current: usize, delta: isize, lines: usize) -> usize {
    let max = lines.saturating_sub(1) as isize;
    (current as isize).saturating_add(delta).clamp(0, max.max(0)) as usize
}

fn summarize_error_line(error: &str) -> String {
    error
        .lines()
        .find(|line| !line.trim().is_empty())
        .map(|line| line.trim().to_string())
        .unwrap_or_else(|| "unknown error".to_string())
}

fn normalize_status_text(status: String) -> String {
    const MAX_STATUS_LEN: usize = 180;
    if status.chars().count() <= MAX_STATUS_LEN {
        return status;
    }

    let mut shortened = status
        .chars()
        .take(MAX_STATUS_LEN.saturating_sub(1))
        .collect::<String>();
    shortened.push('…');
    shortened
}
