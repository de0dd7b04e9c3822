use crossterm::event::KeyEvent;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};

use crate::app::{AppCommand, AppContext, RequestOutcome};
use crate::input::{HELP, KeyBinding, QUIT};

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum ScreenMode {
    List,
    Log,
    Describe,
    Help,
    ContextSelector,
    NamespaceSelector,
    ConfirmDialog,
    ResourceSelector,
}

impl ScreenMode {
    pub const ALL: [Self; 8] = [
        Self::List,
        Self::Log,
        Self::Describe,
        Self::Help,
        Self::ContextSelector,
        Self::NamespaceSelector,
        Self::ConfirmDialog,
        Self::ResourceSelector,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::List => "list",
            Self::Log => "log",
            Self::Describe => "describe",
            Self::Help => "help",
            Self::ContextSelector => "contexts",
            Self::NamespaceSelector => "namespaces",
            Self::ConfirmDialog => "confirm",
            Self::ResourceSelector => "resources",
        }
    }

    pub fn is_overlay(self) -> bool {
        matches!(
            self,
            Self::ContextSelector
                | Self::NamespaceSelector
                | Self::ConfirmDialog
                | Self::ResourceSelector
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyOutcome {
    pub handled: bool,
    pub command: AppCommand,
}

impl KeyOutcome {
    pub fn handled(command: AppCommand) -> Self {
        Self {
            handled: true,
            command,
        }
    }

    pub fn consumed() -> Self {
        Self::handled(AppCommand::None)
    }

    pub fn unhandled() -> Self {
        Self {
            handled: false,
            command: AppCommand::None,
        }
    }
}

impl From<RequestOutcome> for KeyOutcome {
    /// A refused request is still a handled key: it must not fall through to
    /// a view that may not exist.
    fn from(outcome: RequestOutcome) -> Self {
        Self::handled(outcome.command)
    }
}

/// One screen's key handling. Modes hold no state of their own; everything
/// they change lives on the `AppContext`.
pub trait Mode {
    fn screen(&self) -> ScreenMode;

    /// Returns `handled = false` to let the caller forward the key to the
    /// active content view.
    fn handle_key(&self, ctx: &mut AppContext, key: KeyEvent) -> KeyOutcome;

    fn key_bindings(&self) -> BTreeMap<&'static str, KeyBinding>;
}

pub struct ModeController {
    modes: HashMap<ScreenMode, Box<dyn Mode>>,
}

impl Default for ModeController {
    fn default() -> Self {
        Self::new()
    }
}

impl ModeController {
    pub fn new() -> Self {
        Self::with_modes(vec![
            Box::new(LogMode),
            Box::new(DescribeMode),
            Box::new(HelpMode),
            Box::new(ContextSelectorMode),
            Box::new(NamespaceSelectorMode),
            Box::new(ConfirmDialogMode),
            Box::new(ResourceSelectorMode),
        ])
    }

    /// List mode is always registered; it is what every bad transition
    /// falls back to.
    pub fn with_modes(modes: Vec<Box<dyn Mode>>) -> Self {
        let mut controller = Self {
            modes: HashMap::new(),
        };
        controller.register(Box::new(ListMode));
        for mode in modes {
            controller.register(mode);
        }
        controller
    }

    pub fn register(&mut self, mode: Box<dyn Mode>) {
        self.modes.insert(mode.screen(), mode);
    }

    pub fn is_registered(&self, screen: ScreenMode) -> bool {
        self.modes.contains_key(&screen)
    }

    pub fn effective_mode(&self, requested: ScreenMode) -> ScreenMode {
        if self.is_registered(requested) {
            requested
        } else {
            ScreenMode::List
        }
    }

    /// Moves the context back to list mode when its current mode has no
    /// registered handler.
    pub fn normalize(&self, ctx: &mut AppContext) {
        let requested = ctx.mode();
        if !self.is_registered(requested) {
            warn!("mode {} is not registered, falling back to list", requested.label());
            ctx.force_mode(ScreenMode::List);
        }
    }

    pub fn handle_key(&self, ctx: &mut AppContext, key: KeyEvent) -> KeyOutcome {
        self.normalize(ctx);

        if QUIT.matches(key) {
            ctx.quit();
            return KeyOutcome::consumed();
        }

        if HELP.matches(key) {
            if ctx.mode() == ScreenMode::Help {
                ctx.return_to_previous();
            } else if self.is_registered(ScreenMode::Help) {
                ctx.enter_mode(ScreenMode::Help);
            }
            return KeyOutcome::consumed();
        }

        let screen = self.effective_mode(ctx.mode());
        let Some(mode) = self.modes.get(&screen) else {
            return KeyOutcome::consumed();
        };
        let outcome = mode.handle_key(ctx, key);
        if outcome.command != AppCommand::None {
            debug!("mode {} issued {:?}", screen.label(), outcome.command);
        }
        outcome
    }

    /// The bindings active in `screen`, including the cross-cutting ones.
    pub fn key_bindings(&self, screen: ScreenMode) -> BTreeMap<&'static str, KeyBinding> {
        let mut bindings = self
            .modes
            .get(&self.effective_mode(screen))
            .map(|mode| mode.key_bindings())
            .unwrap_or_default();
        bindings.insert("quit", QUIT);
        bindings.insert("help", HELP);
        bindings
    }
}

const NAMESPACE: KeyBinding = KeyBinding::new(&["n"], "Switch namespace", "Scope");
const CONTEXT: KeyBinding = KeyBinding::new(&["c"], "Choose contexts", "Scope");
const RESOURCES: KeyBinding = KeyBinding::new(&["tab", "backtab"], "Choose resource kind", "Scope");
const LOGS: KeyBinding = KeyBinding::new(&["l", "enter"], "Stream logs", "Resource");
const DESCRIBE: KeyBinding = KeyBinding::new(&["d", "i"], "Describe", "Resource");
const DELETE: KeyBinding = KeyBinding::new(&["ctrl+d", "delete"], "Delete", "Resource");
const REFRESH: KeyBinding = KeyBinding::new(&["r", "f5"], "Refresh now", "General");
const NAVIGATE: KeyBinding = KeyBinding::new(&["j", "k", "up", "down"], "Move", "Navigation");
const BACK: KeyBinding = KeyBinding::new(&["esc"], "Back to list", "Navigation");
const CANCEL: KeyBinding = KeyBinding::new(&["esc"], "Cancel", "Dialog");
const APPLY: KeyBinding = KeyBinding::new(&["enter"], "Apply", "Dialog");
const TOGGLE: KeyBinding = KeyBinding::new(&["space"], "Toggle context", "Dialog");
const CONFIRM: KeyBinding = KeyBinding::new(&["y", "enter"], "Confirm", "Dialog");
const DECLINE: KeyBinding = KeyBinding::new(&["n", "esc"], "Cancel", "Dialog");
const FOLLOW: KeyBinding = KeyBinding::new(&["f"], "Toggle follow", "Logs");
const CYCLE: KeyBinding = KeyBinding::new(&["tab", "backtab"], "Next/previous kind", "Dialog");
const CLOSE_HELP: KeyBinding = KeyBinding::new(&["esc"], "Close help", "Navigation");

pub struct ListMode;

impl Mode for ListMode {
    fn screen(&self) -> ScreenMode {
        ScreenMode::List
    }

    fn handle_key(&self, ctx: &mut AppContext, key: KeyEvent) -> KeyOutcome {
        if NAMESPACE.matches(key) {
            return ctx.open_namespace_selector().into();
        }
        if CONTEXT.matches(key) {
            return ctx.open_context_selector().into();
        }
        if RESOURCES.matches(key) {
            return ctx.open_resource_selector().into();
        }
        if LOGS.matches(key) {
            return ctx.open_logs().into();
        }
        if DESCRIBE.matches(key) {
            return ctx.open_describe().into();
        }
        if DELETE.matches(key) {
            return ctx.request_delete_confirmation().into();
        }
        if REFRESH.matches(key) {
            return KeyOutcome::handled(ctx.request_refresh());
        }
        KeyOutcome::unhandled()
    }

    fn key_bindings(&self) -> BTreeMap<&'static str, KeyBinding> {
        BTreeMap::from([
            ("namespace", NAMESPACE),
            ("context", CONTEXT),
            ("resources", RESOURCES),
            ("logs", LOGS),
            ("describe", DESCRIBE),
            ("delete", DELETE),
            ("refresh", REFRESH),
            ("navigate", NAVIGATE),
        ])
    }
}

pub struct LogMode;

impl Mode for LogMode {
    fn screen(&self) -> ScreenMode {
        ScreenMode::Log
    }

    fn handle_key(&self, ctx: &mut AppContext, key: KeyEvent) -> KeyOutcome {
        if BACK.matches(key) {
            ctx.close_logs();
            return KeyOutcome::consumed();
        }
        if FOLLOW.matches(key) {
            ctx.toggle_log_follow();
            return KeyOutcome::consumed();
        }
        KeyOutcome::unhandled()
    }

    fn key_bindings(&self) -> BTreeMap<&'static str, KeyBinding> {
        BTreeMap::from([("back", BACK), ("follow", FOLLOW), ("scroll", NAVIGATE)])
    }
}

pub struct DescribeMode;

impl Mode for DescribeMode {
    fn screen(&self) -> ScreenMode {
        ScreenMode::Describe
    }

    fn handle_key(&self, ctx: &mut AppContext, key: KeyEvent) -> KeyOutcome {
        if BACK.matches(key) {
            ctx.close_describe();
            return KeyOutcome::consumed();
        }
        KeyOutcome::unhandled()
    }

    fn key_bindings(&self) -> BTreeMap<&'static str, KeyBinding> {
        BTreeMap::from([("back", BACK), ("scroll", NAVIGATE)])
    }
}

pub struct HelpMode;

impl Mode for HelpMode {
    fn screen(&self) -> ScreenMode {
        ScreenMode::Help
    }

    fn handle_key(&self, ctx: &mut AppContext, key: KeyEvent) -> KeyOutcome {
        if CLOSE_HELP.matches(key) {
            ctx.return_to_previous();
            return KeyOutcome::consumed();
        }
        KeyOutcome::unhandled()
    }

    fn key_bindings(&self) -> BTreeMap<&'static str, KeyBinding> {
        BTreeMap::from([("close", CLOSE_HELP)])
    }
}

pub struct ContextSelectorMode;

impl Mode for ContextSelectorMode {
    fn screen(&self) -> ScreenMode {
        ScreenMode::ContextSelector
    }

    fn handle_key(&self, ctx: &mut AppContext, key: KeyEvent) -> KeyOutcome {
        if CANCEL.matches(key) {
            ctx.cancel_to_list();
            return KeyOutcome::consumed();
        }
        if APPLY.matches(key) {
            return ctx.apply_context_selection().into();
        }
        if TOGGLE.matches(key) {
            ctx.toggle_context_checked();
            return KeyOutcome::consumed();
        }
        KeyOutcome::unhandled()
    }

    fn key_bindings(&self) -> BTreeMap<&'static str, KeyBinding> {
        BTreeMap::from([
            ("cancel", CANCEL),
            ("apply", APPLY),
            ("toggle", TOGGLE),
            ("navigate", NAVIGATE),
        ])
    }
}

pub struct NamespaceSelectorMode;

impl Mode for NamespaceSelectorMode {
    fn screen(&self) -> ScreenMode {
        ScreenMode::NamespaceSelector
    }

    fn handle_key(&self, ctx: &mut AppContext, key: KeyEvent) -> KeyOutcome {
        if CANCEL.matches(key) {
            ctx.cancel_to_list();
            return KeyOutcome::consumed();
        }
        if APPLY.matches(key) {
            return ctx.apply_namespace_selection().into();
        }
        KeyOutcome::unhandled()
    }

    fn key_bindings(&self) -> BTreeMap<&'static str, KeyBinding> {
        BTreeMap::from([("cancel", CANCEL), ("apply", APPLY), ("navigate", NAVIGATE)])
    }
}

pub struct ConfirmDialogMode;

impl Mode for ConfirmDialogMode {
    fn screen(&self) -> ScreenMode {
        ScreenMode::ConfirmDialog
    }

    fn handle_key(&self, ctx: &mut AppContext, key: KeyEvent) -> KeyOutcome {
        if CONFIRM.matches(key) {
            return ctx.confirm_delete().into();
        }
        if DECLINE.matches(key) {
            ctx.cancel_to_list();
            ctx.set_status("Delete cancelled");
            return KeyOutcome::consumed();
        }
        // Nothing behind the dialog may react while it is open.
        KeyOutcome::consumed()
    }

    fn key_bindings(&self) -> BTreeMap<&'static str, KeyBinding> {
        BTreeMap::from([("confirm", CONFIRM), ("cancel", DECLINE)])
    }
}

pub struct ResourceSelectorMode;

impl Mode for ResourceSelectorMode {
    fn screen(&self) -> ScreenMode {
        ScreenMode::ResourceSelector
    }

    fn handle_key(&self, ctx: &mut AppContext, key: KeyEvent) -> KeyOutcome {
        if CANCEL.matches(key) {
            ctx.cancel_to_list();
            return KeyOutcome::consumed();
        }
        if APPLY.matches(key) {
            return ctx.apply_resource_selection().into();
        }
        if CYCLE.matches(key) {
            let forward = crate::input::key_event_signature(key).as_deref() == Some("tab");
            ctx.cycle_resource_picker(if forward { 1 } else { -1 });
            return KeyOutcome::consumed();
        }
        KeyOutcome::unhandled()
    }

    fn key_bindings(&self) -> BTreeMap<&'static str, KeyBinding> {
        BTreeMap::from([
            ("cancel", CANCEL),
            ("apply", APPLY),
            ("cycle", CYCLE),
            ("navigate", NAVIGATE),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::{KeyOutcome, ModeController, ScreenMode};
    use crate::aggregator::MultiSource;
    use crate::app::{AppCommand, AppContext};
    use crate::backend::Backend;
    use crate::backend::testing::{FakeBackend, pod};
    use crate::model::{NamespaceScope, ResourceKind};
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use std::sync::Arc;
    use std::time::Duration;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn char_key(c: char) -> KeyEvent {
        key(KeyCode::Char(c))
    }

    fn context_with_rows() -> AppContext {
        let backend = FakeBackend::with_pods("default", &["pod-0", "pod-1"]);
        let sources = MultiSource::new(vec![(
            "alpha".to_string(),
            Arc::new(backend) as Arc<dyn Backend>,
        )]);
        let mut ctx = AppContext::new(
            sources,
            NamespaceScope::Named("default".to_string()),
            ResourceKind::Pods,
            Duration::from_secs(5),
            vec!["alpha".to_string(), "beta".to_string()],
        );
        ctx.replace_rows(
            ResourceKind::Pods,
            vec![
                pod("default", "pod-0", "u0").with_source("alpha"),
                pod("default", "pod-1", "u1").with_source("alpha"),
            ],
        );
        ctx
    }

    fn empty_context() -> AppContext {
        AppContext::new(
            MultiSource::default(),
            NamespaceScope::All,
            ResourceKind::Pods,
            Duration::from_secs(5),
            Vec::new(),
        )
    }

    #[test]
    fn list_starts_as_the_initial_mode() {
        let ctx = empty_context();
        assert_eq!(ctx.mode(), ScreenMode::List);
        assert!(ctx.running());
    }

    #[test]
    fn help_remembers_and_restores_the_previous_mode() {
        let controller = ModeController::new();
        let mut ctx = context_with_rows();

        controller.handle_key(&mut ctx, char_key('d'));
        assert_eq!(ctx.mode(), ScreenMode::Describe);

        assert_eq!(controller.handle_key(&mut ctx, char_key('?')), KeyOutcome::consumed());
        assert_eq!(ctx.mode(), ScreenMode::Help);

        controller.handle_key(&mut ctx, key(KeyCode::Esc));
        assert_eq!(ctx.mode(), ScreenMode::Describe);

        controller.handle_key(&mut ctx, char_key('?'));
        controller.handle_key(&mut ctx, char_key('?'));
        assert_eq!(ctx.mode(), ScreenMode::Describe);
    }

    #[test]
    fn quit_is_recognized_in_every_mode() {
        let controller = ModeController::new();
        for screen in ScreenMode::ALL {
            let mut ctx = context_with_rows();
            ctx.force_mode(screen);
            let outcome = controller.handle_key(&mut ctx, char_key('q'));
            assert!(outcome.handled, "{screen:?}");
            assert!(!ctx.running(), "{screen:?}");
        }
    }

    #[test]
    fn describe_with_row_fetches_from_the_row_source() {
        let controller = ModeController::new();
        let mut ctx = context_with_rows();

        let outcome = controller.handle_key(&mut ctx, char_key('d'));
        assert!(outcome.handled);
        match outcome.command {
            AppCommand::Describe { identity } => {
                assert_eq!(identity.name, "pod-0");
                assert_eq!(identity.source, "");
            }
            other => panic!("unexpected command {other:?}"),
        }
        assert_eq!(ctx.mode(), ScreenMode::Describe);
    }

    #[test]
    fn action_keys_without_a_row_are_handled_no_ops() {
        let controller = ModeController::new();
        let mut ctx = empty_context();

        for c in ['d', 'l'] {
            let outcome = controller.handle_key(&mut ctx, char_key(c));
            assert_eq!(outcome, KeyOutcome::consumed(), "key {c}");
            assert_eq!(ctx.mode(), ScreenMode::List);
        }
        let outcome = controller.handle_key(&mut ctx, key(KeyCode::Delete));
        assert_eq!(outcome, KeyOutcome::consumed());
        assert_eq!(ctx.mode(), ScreenMode::List);
        assert!(ctx.pending_delete().is_none());
    }

    #[test]
    fn describe_without_reachable_backend_stays_in_list() {
        let controller = ModeController::new();
        let mut ctx = context_with_rows();
        ctx.replace_sources(MultiSource::default());

        let outcome = controller.handle_key(&mut ctx, char_key('d'));
        assert_eq!(outcome, KeyOutcome::consumed());
        assert_eq!(ctx.mode(), ScreenMode::List);
    }

    #[test]
    fn delete_confirmation_round_trip() {
        let controller = ModeController::new();
        let mut ctx = context_with_rows();
        ctx.move_selection(1);

        controller.handle_key(&mut ctx, key(KeyCode::Delete));
        assert_eq!(ctx.mode(), ScreenMode::ConfirmDialog);
        assert_eq!(
            ctx.pending_delete().map(|identity| identity.name.as_str()),
            Some("pod-1")
        );

        // Keys behind the dialog are swallowed.
        assert!(controller.handle_key(&mut ctx, char_key('j')).handled);
        assert_eq!(ctx.mode(), ScreenMode::ConfirmDialog);

        let outcome = controller.handle_key(&mut ctx, char_key('y'));
        match outcome.command {
            AppCommand::Delete { identity } => assert_eq!(identity.name, "pod-1"),
            other => panic!("unexpected command {other:?}"),
        }
        assert_eq!(ctx.mode(), ScreenMode::List);
        assert!(ctx.pending_delete().is_none());
    }

    #[test]
    fn cancelling_delete_clears_pending_state() {
        let controller = ModeController::new();
        let mut ctx = context_with_rows();

        controller.handle_key(&mut ctx, KeyEvent::new(KeyCode::Char('d'), KeyModifiers::CONTROL));
        assert_eq!(ctx.mode(), ScreenMode::ConfirmDialog);
        controller.handle_key(&mut ctx, key(KeyCode::Esc));
        assert_eq!(ctx.mode(), ScreenMode::List);
        assert!(ctx.pending_delete().is_none());
    }

    #[test]
    fn namespace_selector_loads_and_applies() {
        let controller = ModeController::new();
        let mut ctx = context_with_rows();

        let outcome = controller.handle_key(&mut ctx, char_key('n'));
        assert_eq!(outcome.command, AppCommand::LoadNamespaces);
        assert_eq!(ctx.mode(), ScreenMode::NamespaceSelector);

        // Enter while loading is refused but handled.
        let outcome = controller.handle_key(&mut ctx, key(KeyCode::Enter));
        assert_eq!(outcome, KeyOutcome::consumed());
        assert_eq!(ctx.mode(), ScreenMode::NamespaceSelector);

        ctx.set_namespaces(["default".to_string(), "kube-system".to_string()].into(), None);
        let outcome = controller.handle_key(&mut ctx, char_key('j'));
        assert!(!outcome.handled);
        ctx.forward_to_view(char_key('j'));

        let outcome = controller.handle_key(&mut ctx, key(KeyCode::Enter));
        assert_eq!(ctx.mode(), ScreenMode::List);
        assert_eq!(
            ctx.namespace_scope(),
            &NamespaceScope::Named("kube-system".to_string())
        );
        assert!(matches!(outcome.command, AppCommand::Refresh { .. }));
    }

    #[test]
    fn escape_discards_selector_views() {
        let controller = ModeController::new();
        let mut ctx = context_with_rows();

        controller.handle_key(&mut ctx, char_key('c'));
        assert_eq!(ctx.mode(), ScreenMode::ContextSelector);
        assert!(ctx.context_picker().is_some());
        controller.handle_key(&mut ctx, key(KeyCode::Esc));
        assert_eq!(ctx.mode(), ScreenMode::List);
        assert!(ctx.context_picker().is_none());

        controller.handle_key(&mut ctx, key(KeyCode::Tab));
        assert_eq!(ctx.mode(), ScreenMode::ResourceSelector);
        controller.handle_key(&mut ctx, key(KeyCode::Esc));
        assert_eq!(ctx.mode(), ScreenMode::List);
        assert!(ctx.resource_picker().is_none());
    }

    #[test]
    fn context_selector_connects_checked_contexts() {
        let controller = ModeController::new();
        let mut ctx = context_with_rows();

        controller.handle_key(&mut ctx, char_key('c'));
        controller.handle_key(&mut ctx, char_key('j'));
        ctx.forward_to_view(char_key('j'));
        controller.handle_key(&mut ctx, char_key(' '));

        let outcome = controller.handle_key(&mut ctx, key(KeyCode::Enter));
        assert_eq!(
            outcome.command,
            AppCommand::ConnectSources {
                contexts: vec!["alpha".to_string(), "beta".to_string()]
            }
        );
        assert_eq!(ctx.mode(), ScreenMode::List);
    }

    #[test]
    fn context_selector_refuses_an_empty_selection() {
        let controller = ModeController::new();
        let mut ctx = context_with_rows();

        controller.handle_key(&mut ctx, char_key('c'));
        controller.handle_key(&mut ctx, char_key(' '));
        let outcome = controller.handle_key(&mut ctx, key(KeyCode::Enter));
        assert_eq!(outcome, KeyOutcome::consumed());
        assert_eq!(ctx.mode(), ScreenMode::ContextSelector);
    }

    #[test]
    fn resource_selector_switches_kind_and_refreshes() {
        let controller = ModeController::new();
        let mut ctx = context_with_rows();

        controller.handle_key(&mut ctx, key(KeyCode::Tab));
        controller.handle_key(&mut ctx, key(KeyCode::Tab));
        let outcome = controller.handle_key(&mut ctx, key(KeyCode::Enter));
        assert_eq!(ctx.kind(), ResourceKind::Deployments);
        assert_eq!(ctx.mode(), ScreenMode::List);
        assert!(matches!(
            outcome.command,
            AppCommand::Refresh {
                kind: ResourceKind::Deployments,
                ..
            }
        ));
    }

    #[test]
    fn logs_enter_log_mode_and_escape_stops_them() {
        let controller = ModeController::new();
        let mut ctx = context_with_rows();

        let outcome = controller.handle_key(&mut ctx, key(KeyCode::Enter));
        assert!(matches!(outcome.command, AppCommand::StartLogs { .. }));
        assert_eq!(ctx.mode(), ScreenMode::Log);
        assert!(ctx.log_view().is_some());

        controller.handle_key(&mut ctx, key(KeyCode::Esc));
        assert_eq!(ctx.mode(), ScreenMode::List);
        assert!(ctx.log_view().is_none());
    }

    #[test]
    fn logs_for_non_pod_kinds_are_refused() {
        let controller = ModeController::new();
        let mut ctx = context_with_rows();
        ctx.switch_kind(ResourceKind::Services);

        let outcome = controller.handle_key(&mut ctx, char_key('l'));
        assert_eq!(outcome, KeyOutcome::consumed());
        assert_eq!(ctx.mode(), ScreenMode::List);
    }

    #[test]
    fn unregistered_mode_falls_back_to_list() {
        let controller = ModeController::with_modes(Vec::new());
        let mut ctx = context_with_rows();
        ctx.force_mode(ScreenMode::Describe);

        assert_eq!(controller.effective_mode(ScreenMode::Describe), ScreenMode::List);
        let outcome = controller.handle_key(&mut ctx, char_key('j'));
        assert!(!outcome.handled);
        assert_eq!(ctx.mode(), ScreenMode::List);
    }

    #[test]
    fn bindings_include_cross_cutting_keys() {
        let controller = ModeController::new();
        for screen in ScreenMode::ALL {
            let bindings = controller.key_bindings(screen);
            assert!(bindings.contains_key("quit"), "{screen:?}");
            assert!(bindings.contains_key("help"), "{screen:?}");
        }
        assert!(controller.key_bindings(ScreenMode::List).contains_key("delete"));
    }
}
