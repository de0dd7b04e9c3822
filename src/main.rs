mod aggregator;
mod app;
mod backend;
mod cli;
mod commands;
mod config;
mod input;
mod k8s;
mod logs;
mod mode;
mod model;
mod selection;
mod ui;

use anyhow::{Context, Result};
use app::{App, AppCommand, AppContext};
use aggregator::MultiSource;
use backend::Connector;
use clap::Parser;
use cli::CliArgs;
use commands::Dispatcher;
use config::{ConfigFile, KubeDefaults, Settings};
use crossterm::event::{
    Event, EventStream, KeyEventKind, KeyboardEnhancementFlags, PopKeyboardEnhancementFlags,
    PushKeyboardEnhancementFlags,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
    supports_keyboard_enhancement,
};
use futures::StreamExt;
use k8s::KubeConnector;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use std::fs::OpenOptions;
use std::io::{self, Stdout};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

type TuiTerminal = Terminal<CrosstermBackend<Stdout>>;

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();
    init_tracing(&args.log_filter, args.log_file.as_deref())?;

    let connector = KubeConnector::load();
    let (config_path, file) = ConfigFile::discover()?;
    if let Some(path) = &config_path {
        info!("loaded config from {}", path.display());
    }

    let current_context = connector.current_context();
    let defaults = KubeDefaults {
        available_contexts: connector.available_contexts(),
        context_namespace: current_context
            .as_deref()
            .and_then(|context| connector.context_namespace(context)),
        current_context,
    };
    let settings = Settings::resolve(&args, &file, &defaults)?;
    if args.all_namespaces && args.namespace.is_some() {
        warn!("both --all-namespaces and --namespace were provided, using all namespaces");
    }

    let ctx = AppContext::new(
        MultiSource::default(),
        settings.namespace_scope,
        settings.kind,
        settings.refresh_interval,
        defaults.available_contexts.clone(),
    );
    let mut app = App::new(ctx);
    let connector: Arc<dyn Connector> = Arc::new(connector);

    run(&mut app, connector, settings.contexts).await
}

fn init_tracing(level_filter: &str, log_file: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::try_new(level_filter)
        .or_else(|_| EnvFilter::try_new("info"))
        .context("failed to initialize tracing filter")?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(false)
        .compact();

    // The terminal belongs to the UI; without a file, tracing output is dropped.
    let _ = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open log file {}", path.display()))?;
            builder.with_writer(Mutex::new(file)).try_init()
        }
        None => builder.with_writer(io::sink).try_init(),
    };

    Ok(())
}

async fn run(app: &mut App, connector: Arc<dyn Connector>, contexts: Vec<String>) -> Result<()> {
    let (mut terminal, keyboard_enhanced) = init_terminal()?;
    let run_result = run_loop(&mut terminal, app, connector, contexts).await;
    let restore_result = restore_terminal(&mut terminal, keyboard_enhanced);

    match (run_result, restore_result) {
        (Err(run_error), Err(restore_error)) => Err(anyhow::anyhow!(
            "{}\nterminal restore error: {}",
            compact_error(&run_error),
            compact_error(&restore_error)
        )),
        (Err(error), _) => Err(error),
        (_, Err(error)) => Err(error),
        (Ok(()), Ok(())) => Ok(()),
    }
}

fn init_terminal() -> Result<(TuiTerminal, bool)> {
    enable_raw_mode().context("failed to enable raw mode")?;
    let mut stdout = io::stdout();
    let keyboard_enhanced = matches!(supports_keyboard_enhancement(), Ok(true));
    if keyboard_enhanced {
        execute!(
            stdout,
            EnterAlternateScreen,
            PushKeyboardEnhancementFlags(
                KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES
                    | KeyboardEnhancementFlags::REPORT_EVENT_TYPES
            )
        )
        .context("failed to enter alternate screen with keyboard enhancement")?;
    } else {
        execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
    }
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("failed to create terminal backend")?;
    terminal.clear().context("failed to clear terminal")?;
    Ok((terminal, keyboard_enhanced))
}

fn restore_terminal(terminal: &mut TuiTerminal, keyboard_enhanced: bool) -> Result<()> {
    if keyboard_enhanced {
        execute!(terminal.backend_mut(), PopKeyboardEnhancementFlags)
            .context("failed to pop keyboard enhancement flags")?;
    }
    disable_raw_mode().context("failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("failed to leave alternate screen")?;
    terminal.show_cursor().context("failed to show cursor")?;
    Ok(())
}

async fn run_loop(
    terminal: &mut TuiTerminal,
    app: &mut App,
    connector: Arc<dyn Connector>,
    contexts: Vec<String>,
) -> Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let dispatcher = Dispatcher::new(connector, tx);

    let command = app.context_mut().connect(contexts);
    execute_app_command(app, &dispatcher, command);

    let mut reader = EventStream::new();
    let mut ticker = interval(app.context().refresh_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        terminal
            .draw(|frame| ui::render(frame, app))
            .context("failed to render terminal frame")?;

        if !app.running() {
            break;
        }

        tokio::select! {
            maybe_event = reader.next() => {
                match maybe_event {
                    Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                        let command = app.handle_key(key);
                        execute_app_command(app, &dispatcher, command);
                    }
                    Some(Ok(_)) => {}
                    Some(Err(error)) => {
                        app.context_mut().set_status(format!("terminal event error: {error}"));
                    }
                    None => {
                        app.context_mut().set_status("terminal event stream closed");
                        break;
                    }
                }
            }
            _ = ticker.tick() => {
                let command = app.on_tick();
                execute_app_command(app, &dispatcher, command);
            }
            maybe_message = rx.recv() => {
                // The dispatcher keeps a sender alive, so the queue never closes here.
                if let Some(message) = maybe_message {
                    let command = app.apply_message(message);
                    execute_app_command(app, &dispatcher, command);
                }
            }
        }
    }

    Ok(())
}

fn execute_app_command(app: &mut App, dispatcher: &Dispatcher, command: AppCommand) {
    if command == AppCommand::None {
        return;
    }
    debug!("dispatching {command:?}");
    if let Some(session) = dispatcher.dispatch(command, app.context().sources()) {
        app.context_mut().attach_log_session(session);
    }
}

fn compact_error(error: &anyhow::Error) -> String {
    let mut out = Vec::new();
    for (index, cause) in error.chain().enumerate() {
        if index == 0 {
            out.push(cause.to_string());
        } else if index <= 2 {
            out.push(format!("caused by: {cause}"));
        } else {
            break;
        }
    }

    out.join("\n")
}
