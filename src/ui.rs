use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState, Wrap};
use std::collections::BTreeMap;

use crate::app::{App, AppContext, Picker};
use crate::input::KeyBinding;
use crate::mode::ScreenMode;
use crate::model::ResourceItem;

const BG: Color = Color::Rgb(9, 15, 25);
const PANEL: Color = Color::Rgb(16, 27, 44);
const ACCENT: Color = Color::Rgb(52, 211, 153);
const MUTED: Color = Color::Rgb(140, 156, 178);
const WARN: Color = Color::Rgb(251, 191, 36);
const ERROR: Color = Color::Rgb(248, 113, 113);
const PL_A: Color = Color::Rgb(17, 94, 89);
const PL_B: Color = Color::Rgb(30, 64, 175);
const PL_C: Color = Color::Rgb(55, 48, 163);
const PL_D: Color = Color::Rgb(82, 24, 124);
const SELECTED_BG: Color = Color::Rgb(24, 36, 58);

pub fn render(frame: &mut Frame, app: &mut App) {
    let root = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(6),
            Constraint::Length(1),
        ])
        .split(frame.area());

    let visible = app.visible_mode();
    let base = base_screen(app, visible);
    app.context_mut()
        .set_page_size(viewport_rows(root[1], base));

    let app = &*app;
    render_header(frame, root[0], app.context());
    render_screen(frame, root[1], app, base);
    if visible == ScreenMode::Help {
        render_help_modal(frame, app, base);
    }
    render_footer(frame, root[2], app, visible);
}

/// Screen drawn underneath help. Help opened over help falls back to the list.
fn base_screen(app: &App, visible: ScreenMode) -> ScreenMode {
    if visible != ScreenMode::Help {
        return visible;
    }
    app.context()
        .previous_mode()
        .map(|previous| app.controller().effective_mode(previous))
        .filter(|previous| *previous != ScreenMode::Help)
        .unwrap_or(ScreenMode::List)
}

fn viewport_rows(area: Rect, screen: ScreenMode) -> usize {
    let chrome = match screen {
        ScreenMode::Log | ScreenMode::Describe => 2,
        _ => 3,
    };
    area.height.saturating_sub(chrome).max(1) as usize
}

fn render_screen(frame: &mut Frame, area: Rect, app: &App, screen: ScreenMode) {
    let ctx = app.context();
    if screen.is_overlay() {
        render_table(frame, area, ctx);
    }
    match screen {
        ScreenMode::Log => render_logs(frame, area, ctx),
        ScreenMode::Describe => render_describe(frame, area, ctx),
        ScreenMode::List | ScreenMode::Help => render_table(frame, area, ctx),
        ScreenMode::NamespaceSelector => {
            if let Some(picker) = ctx.namespace_picker() {
                let lines = picker_lines(picker, |item| item.to_string());
                render_picker_modal(frame, "Namespace", lines, picker, picker.loading);
            }
        }
        ScreenMode::ResourceSelector => {
            if let Some(picker) = ctx.resource_picker() {
                let lines = picker_lines(picker, |item| item.to_string());
                render_picker_modal(frame, "Resource kind", lines, picker, false);
            }
        }
        ScreenMode::ContextSelector => {
            if let Some(context_picker) = ctx.context_picker() {
                let active = ctx.sources().sources();
                let lines = picker_lines(&context_picker.picker, |item| {
                    let mark = if context_picker.checked.contains(item) {
                        "[x]"
                    } else {
                        "[ ]"
                    };
                    let live = if active.iter().any(|name| name == item) {
                        " (active)"
                    } else {
                        ""
                    };
                    format!("{mark} {item}{live}")
                });
                render_picker_modal(frame, "Contexts", lines, &context_picker.picker, false);
            }
        }
        ScreenMode::ConfirmDialog => render_confirm_modal(frame, ctx),
    }
}

fn render_header(frame: &mut Frame, area: Rect, ctx: &AppContext) {
    let sources = ctx.sources().sources();
    let contexts = if ctx.connecting() {
        "connecting…".to_string()
    } else if sources.is_empty() {
        "no context".to_string()
    } else {
        sources.join(",")
    };

    let mut left = Vec::new();
    push_powerline_segment(&mut left, " kubedeck ", Color::White, PL_A, PL_B);
    push_powerline_segment(
        &mut left,
        format!(" 󰠳 {} ", compact_text(&contexts, 40)),
        Color::White,
        PL_B,
        PL_C,
    );
    push_powerline_segment(
        &mut left,
        format!(" 󰉖 {} ", compact_text(&ctx.namespace_scope().label(), 24)),
        Color::White,
        PL_C,
        PL_D,
    );
    push_powerline_segment(
        &mut left,
        format!(" {} ", ctx.kind().title().to_ascii_lowercase()),
        Color::White,
        PL_D,
        BG,
    );

    let refreshed = if ctx.rows_loading() {
        " loading… ".to_string()
    } else {
        ctx.last_refreshed()
            .map(|at| format!(" ↻ {at} "))
            .unwrap_or_else(|| " ↻ never ".to_string())
    };
    let right = vec![Span::styled(
        refreshed,
        Style::default().fg(if ctx.rows_loading() { WARN } else { MUTED }),
    )];

    render_split_line(frame, area, left, right);
}

fn render_footer(frame: &mut Frame, area: Rect, app: &App, visible: ScreenMode) {
    let ctx = app.context();
    let status = ctx.status();
    let (status_bg, status_fg) = if visible == ScreenMode::ConfirmDialog {
        (WARN, Color::Black)
    } else {
        (PL_B, Color::White)
    };

    let mut left = Vec::new();
    push_powerline_segment(
        &mut left,
        format!(" {} ", visible.label()),
        Color::White,
        PL_A,
        status_bg,
    );
    push_powerline_segment(
        &mut left,
        format!(
            " {} {} ",
            footer_status_icon(status),
            compact_text(status, area.width.saturating_sub(30).max(24) as usize)
        ),
        status_fg,
        status_bg,
        BG,
    );

    let mut right = Vec::new();
    let failing = ctx.failures().len();
    if failing > 0 {
        let noun = if failing == 1 { "source" } else { "sources" };
        right.push(Span::styled(
            format!(" 󰅚 {failing} {noun} failing "),
            Style::default().fg(Color::Black).bg(ERROR),
        ));
    }
    right.push(Span::styled(" ? help ", Style::default().fg(MUTED)));

    render_split_line(frame, area, left, right);
}

fn render_split_line(
    frame: &mut Frame,
    area: Rect,
    left: Vec<Span<'static>>,
    right: Vec<Span<'static>>,
) {
    let right_width = (spans_width(&right) as u16).min(area.width.saturating_sub(24));
    if right_width == 0 {
        frame.render_widget(
            Paragraph::new(Line::from(left)).style(Style::default().bg(BG).fg(Color::White)),
            area,
        );
        return;
    }

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(1), Constraint::Length(right_width)])
        .split(area);
    frame.render_widget(
        Paragraph::new(Line::from(left)).style(Style::default().bg(BG).fg(Color::White)),
        chunks[0],
    );
    frame.render_widget(
        Paragraph::new(Line::from(right))
            .style(Style::default().bg(BG))
            .alignment(Alignment::Right),
        chunks[1],
    );
}

fn render_table(frame: &mut Frame, area: Rect, ctx: &AppContext) {
    let kind = ctx.rows_kind();
    let rows = ctx.rows();
    let block = panel_block(format!(" {} ({}) ", kind.title(), rows.len()), ACCENT);

    if rows.is_empty() {
        let placeholder = if ctx.connecting() || ctx.rows_loading() {
            "Loading…"
        } else if ctx.sources().is_empty() {
            "No context connected. Press c to choose contexts."
        } else {
            "No resources"
        };
        let paragraph = Paragraph::new(placeholder)
            .block(block)
            .style(Style::default().fg(MUTED));
        frame.render_widget(paragraph, area);
        return;
    }

    let show_context = ctx.show_context_column();
    let show_namespace = kind.namespaced();
    let mut headers = Vec::new();
    if show_context {
        headers.push("Context");
    }
    if show_namespace {
        headers.push("Namespace");
    }
    headers.push("Name");
    headers.extend_from_slice(kind.headers());

    let header_row = Row::new(headers.iter().map(|header| {
        Cell::from(header.to_string()).style(Style::default().add_modifier(Modifier::BOLD))
    }))
    .height(1)
    .style(Style::default().fg(ACCENT));

    let table_rows = rows
        .iter()
        .map(|item| table_row(item, show_context, show_namespace));

    let table = Table::new(table_rows, column_constraints(&headers))
        .header(header_row)
        .block(block)
        .column_spacing(1)
        .row_highlight_style(
            Style::default()
                .bg(SELECTED_BG)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("▶ ");

    let mut state = TableState::default();
    state.select(Some(ctx.selected_row().min(rows.len() - 1)));
    frame.render_stateful_widget(table, area, &mut state);
}

fn table_row(item: &ResourceItem, show_context: bool, show_namespace: bool) -> Row<'static> {
    let identity = &item.identity;
    let mut cells = Vec::with_capacity(item.columns.len() + 3);
    if show_context {
        cells.push(Cell::from(identity.source.clone()).style(Style::default().fg(MUTED)));
    }
    if show_namespace {
        cells.push(Cell::from(identity.namespace.clone()).style(Style::default().fg(MUTED)));
    }
    cells.push(Cell::from(identity.name.clone()).style(Style::default().fg(Color::White)));
    cells.extend(
        item.columns
            .iter()
            .map(|column| Cell::from(column.clone()).style(Style::default().fg(status_color(column)))),
    );
    Row::new(cells)
}

fn render_logs(frame: &mut Frame, area: Rect, ctx: &AppContext) {
    let Some(view) = ctx.log_view() else {
        let paragraph = Paragraph::new("Loading…")
            .block(panel_block(" Logs ".to_string(), ACCENT))
            .style(Style::default().fg(MUTED));
        frame.render_widget(paragraph, area);
        return;
    };

    let height = ctx.page_size();
    let offset = view.offset(height);
    let follow = if view.follow() { "following" } else { "paused" };
    let containers = if view.containers.is_empty() {
        String::new()
    } else {
        format!(" [{}]", view.containers.join(","))
    };
    let title = format!(
        " Logs {}{} ({} lines, {follow}) ",
        view.identity.display_path(),
        containers,
        view.line_count()
    );

    let lines = if view.line_count() == 0 {
        vec![Line::from(Span::styled(
            "Waiting for log lines…",
            Style::default().fg(MUTED),
        ))]
    } else {
        view.lines()
            .skip(offset)
            .take(height)
            .map(log_line)
            .collect()
    };

    let paragraph = Paragraph::new(lines)
        .block(panel_block(title, if view.follow() { ACCENT } else { WARN }))
        .style(Style::default().fg(Color::White));
    frame.render_widget(paragraph, area);
}

fn log_line(line: &str) -> Line<'static> {
    if let Some((container, rest)) = line
        .strip_prefix('[')
        .and_then(|tail| tail.split_once("] "))
    {
        return Line::from(vec![
            Span::styled(format!("[{container}] "), Style::default().fg(MUTED)),
            Span::raw(rest.to_string()),
        ]);
    }
    if line.starts_with("! ") {
        return Line::from(Span::styled(line.to_string(), Style::default().fg(ERROR)));
    }
    if line.starts_with("-- ") {
        return Line::from(Span::styled(line.to_string(), Style::default().fg(MUTED)));
    }
    Line::from(line.to_string())
}

fn render_describe(frame: &mut Frame, area: Rect, ctx: &AppContext) {
    let Some(view) = ctx.describe_view() else {
        let paragraph = Paragraph::new("Loading…")
            .block(panel_block(" Describe ".to_string(), ACCENT))
            .style(Style::default().fg(MUTED));
        frame.render_widget(paragraph, area);
        return;
    };

    let title = format!(
        " {} {} ",
        view.identity.kind.title(),
        view.identity.display_path()
    );
    let paragraph = match view.text.as_deref() {
        Some(text) => Paragraph::new(highlight_yaml_text(text))
            .scroll((view.scroll.min(u16::MAX as usize) as u16, 0)),
        None => Paragraph::new("Loading…").style(Style::default().fg(MUTED)),
    };
    frame.render_widget(paragraph.block(panel_block(title, ACCENT)), area);
}

fn picker_lines(picker: &Picker, label: impl Fn(&str) -> String) -> Vec<Line<'static>> {
    picker
        .items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            if index == picker.cursor {
                Line::from(Span::styled(
                    format!("▶ {}", label(item)),
                    Style::default()
                        .fg(ACCENT)
                        .bg(SELECTED_BG)
                        .add_modifier(Modifier::BOLD),
                ))
            } else {
                Line::from(Span::styled(
                    format!("  {}", label(item)),
                    Style::default().fg(Color::White),
                ))
            }
        })
        .collect()
}

fn render_picker_modal(
    frame: &mut Frame,
    title: &str,
    mut lines: Vec<Line<'static>>,
    picker: &Picker,
    loading: bool,
) {
    let area = centered_rect(50, 60, frame.area());
    frame.render_widget(Clear, area);

    if loading {
        lines.push(Line::from(Span::styled(
            "  loading…",
            Style::default().fg(MUTED),
        )));
    }
    let height = area.height.saturating_sub(2).max(1) as usize;
    let offset = picker.cursor.saturating_sub(height.saturating_sub(1));

    let modal = Paragraph::new(lines)
        .scroll((offset.min(u16::MAX as usize) as u16, 0))
        .block(panel_block(format!(" {title} "), ACCENT));
    frame.render_widget(modal, area);
}

fn render_confirm_modal(frame: &mut Frame, ctx: &AppContext) {
    let Some(target) = ctx.pending_delete() else {
        return;
    };
    let area = centered_rect(60, 30, frame.area());
    frame.render_widget(Clear, area);

    let lines = vec![
        Line::from(format!(
            "Delete {} ({})?",
            target.display_path(),
            target.kind.title()
        )),
        Line::from(""),
        Line::from(Span::styled(
            "y/enter confirm   n/esc cancel",
            Style::default().fg(MUTED),
        )),
    ];
    let modal = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(panel_block(" Confirm ".to_string(), WARN))
        .style(Style::default().fg(Color::White));
    frame.render_widget(modal, area);
}

fn render_help_modal(frame: &mut Frame, app: &App, base: ScreenMode) {
    let area = centered_rect(70, 70, frame.area());
    frame.render_widget(Clear, area);

    let mut lines = vec![
        Line::from(format!(
            "kubedeck help  mode:{}  scope:{}  kind:{}",
            base.label(),
            app.context().namespace_scope(),
            app.context().kind().title()
        )),
        Line::from(""),
    ];
    let mut bindings = app.controller().key_bindings(base);
    bindings.extend(app.controller().key_bindings(ScreenMode::Help));
    lines.extend(help_lines(&bindings));

    let max_scroll = lines.len().saturating_sub(1);
    let scroll = app.context().help_scroll().min(max_scroll);
    let modal = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .scroll((scroll.min(u16::MAX as usize) as u16, 0))
        .block(panel_block(" Help ".to_string(), ACCENT))
        .style(Style::default().fg(Color::White));
    frame.render_widget(modal, area);
}

fn help_lines(bindings: &BTreeMap<&'static str, KeyBinding>) -> Vec<Line<'static>> {
    let mut groups: BTreeMap<&str, Vec<&KeyBinding>> = BTreeMap::new();
    for binding in bindings.values() {
        groups.entry(binding.group).or_default().push(binding);
    }

    let mut lines = Vec::new();
    for (group, entries) in groups {
        lines.push(Line::from(Span::styled(
            group.to_string(),
            Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
        )));
        for binding in entries {
            lines.push(Line::from(vec![
                Span::styled(
                    format!("  {:<18}", binding.key_label()),
                    Style::default().fg(WARN),
                ),
                Span::raw(binding.help.to_string()),
            ]));
        }
        lines.push(Line::from(""));
    }
    lines
}

fn panel_block(title: String, border: Color) -> Block<'static> {
    Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border))
        .style(Style::default().bg(PANEL))
}

fn status_color(value: &str) -> Color {
    match value {
        "Running" | "Ready" | "Active" | "Bound" | "Complete" | "Succeeded" => ACCENT,
        "Pending" | "ContainerCreating" | "Terminating" | "NotReady" | "Unknown" => WARN,
        "Failed" | "Error" | "CrashLoopBackOff" | "ImagePullBackOff" | "ErrImagePull"
        | "OOMKilled" | "Lost" => ERROR,
        _ => Color::White,
    }
}

fn footer_status_icon(status_text: &str) -> &'static str {
    let status = status_text.to_ascii_lowercase();
    let has_failure = [
        "failed",
        "error",
        "timed out",
        "unreachable",
        "refused",
        "forbidden",
        "incomplete",
    ]
    .iter()
    .any(|needle| status.contains(needle));
    if has_failure { "󰅚" } else { "󰄬" }
}

fn highlight_yaml_text(input: &str) -> Text<'static> {
    let lines = input
        .lines()
        .map(highlight_yaml_line)
        .collect::<Vec<Line<'static>>>();
    Text::from(lines)
}

fn highlight_yaml_line(line: &str) -> Line<'static> {
    let indent_len = line
        .as_bytes()
        .iter()
        .take_while(|byte| **byte == b' ')
        .count();
    let (indent, trimmed) = line.split_at(indent_len);

    let mut spans = vec![Span::raw(indent.to_string())];
    if trimmed.is_empty() {
        return Line::from(spans);
    }
    if trimmed.starts_with('#') {
        spans.push(Span::styled(trimmed.to_string(), Style::default().fg(MUTED)));
        return Line::from(spans);
    }
    if let Some(rest) = trimmed.strip_prefix("- ") {
        spans.push(Span::styled("- ", Style::default().fg(ACCENT)));
        spans.extend(highlight_yaml_content(rest));
        return Line::from(spans);
    }

    spans.extend(highlight_yaml_content(trimmed));
    Line::from(spans)
}

fn highlight_yaml_content(content: &str) -> Vec<Span<'static>> {
    let Some((key, value)) = split_yaml_key_value(content) else {
        return vec![Span::styled(
            content.to_string(),
            Style::default().fg(Color::White),
        )];
    };

    let mut spans = vec![
        Span::styled(
            key.to_string(),
            Style::default().fg(Color::Rgb(103, 232, 249)),
        ),
        Span::styled(":", Style::default().fg(MUTED)),
    ];
    let value = value.trim();
    if !value.is_empty() {
        spans.push(Span::raw(" "));
        spans.push(Span::styled(
            value.to_string(),
            Style::default().fg(yaml_value_color(value)),
        ));
    }
    spans
}

fn split_yaml_key_value(content: &str) -> Option<(&str, &str)> {
    let (key, value) = content.split_once(':')?;
    let key = key.trim_end();
    if key.is_empty() || key.contains(' ') {
        return None;
    }
    if !value.is_empty() && !value.starts_with(' ') {
        return None;
    }
    Some((key, value))
}

fn yaml_value_color(value: &str) -> Color {
    if value.starts_with('"') || value.starts_with('\'') {
        Color::Rgb(125, 211, 252)
    } else if matches!(value, "true" | "false" | "null" | "~") {
        WARN
    } else if value.parse::<f64>().is_ok() {
        Color::Rgb(251, 146, 60)
    } else if value.starts_with('{') || value.starts_with('[') || value.starts_with('|') {
        MUTED
    } else {
        Color::Rgb(147, 197, 253)
    }
}

fn push_powerline_segment(
    spans: &mut Vec<Span<'static>>,
    content: impl Into<String>,
    fg: Color,
    bg: Color,
    next_bg: Color,
) {
    spans.push(Span::styled(
        content.into(),
        Style::default().fg(fg).bg(bg).add_modifier(Modifier::BOLD),
    ));
    spans.push(Span::styled("", Style::default().fg(bg).bg(next_bg)));
}

fn spans_width(spans: &[Span<'_>]) -> usize {
    spans.iter().map(|span| span.content.chars().count()).sum()
}

fn compact_text(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    if max_chars <= 1 {
        return "…".to_string();
    }
    let mut out = value
        .chars()
        .take(max_chars.saturating_sub(1))
        .collect::<String>();
    out.push('…');
    out
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

/// Names get the most room, then context and namespace, then the kind columns.
fn column_constraints(headers: &[&str]) -> Vec<Constraint> {
    headers
        .iter()
        .map(|header| match *header {
            "Name" => Constraint::Fill(4),
            "Context" | "Namespace" | "Hosts" | "Ports" => Constraint::Fill(2),
            _ => Constraint::Fill(1),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{compact_text, highlight_yaml_line, render};
    use crate::aggregator::MultiSource;
    use crate::app::{App, AppCommand, AppContext, AppMessage};
    use crate::backend::Backend;
    use crate::backend::testing::{FakeBackend, pod};
    use crate::mode::{ListMode, ModeController, ScreenMode};
    use crate::model::{NamespaceScope, ResourceKind};
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;
    use std::sync::Arc;
    use std::time::Duration;

    fn context(names: &[&str]) -> AppContext {
        let sources = MultiSource::new(names.iter().map(|name| {
            (
                name.to_string(),
                Arc::new(FakeBackend::default()) as Arc<dyn Backend>,
            )
        }));
        AppContext::new(
            sources,
            NamespaceScope::Named("default".to_string()),
            ResourceKind::Pods,
            Duration::from_secs(5),
            names.iter().map(|name| name.to_string()).collect(),
        )
    }

    fn draw(app: &mut App) -> String {
        draw_sized(app, 100, 24)
    }

    fn draw_sized(app: &mut App, width: u16, height: u16) -> String {
        let mut terminal = Terminal::new(TestBackend::new(width, height)).expect("terminal");
        terminal.draw(|frame| render(frame, app)).expect("draw");
        let buffer = terminal.backend().buffer();
        let width = buffer.area.width as usize;
        buffer
            .content()
            .chunks(width)
            .map(|row| row.iter().map(|cell| cell.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn list_renders_rows_and_header() {
        let mut ctx = context(&["alpha"]);
        ctx.replace_rows(
            ResourceKind::Pods,
            vec![pod("default", "web-0", "u0"), pod("default", "web-1", "u1")],
        );
        let mut app = App::new(ctx);
        let screen = draw(&mut app);

        assert!(screen.contains("kubedeck"));
        assert!(screen.contains("alpha"));
        assert!(screen.contains("Pods (2)"));
        assert!(screen.contains("Namespace"));
        assert!(screen.contains("web-0"));
        assert!(screen.contains("web-1"));
        assert!(!screen.contains("Context "));
    }

    #[test]
    fn several_sources_add_a_context_column() {
        let mut ctx = context(&["alpha", "beta"]);
        ctx.replace_rows(
            ResourceKind::Pods,
            vec![
                pod("default", "web-0", "u0").with_source("alpha"),
                pod("default", "web-0", "u1").with_source("beta"),
            ],
        );
        let mut app = App::new(ctx);
        let screen = draw(&mut app);

        assert!(screen.contains("Context"));
        assert!(screen.contains("beta"));
    }

    #[test]
    fn empty_list_without_sources_explains_itself() {
        let mut app = App::new(context(&[]));
        let screen = draw(&mut app);
        assert!(screen.contains("No context connected"));
    }

    #[test]
    fn unregistered_mode_still_draws_the_list() {
        let mut ctx = context(&["alpha"]);
        ctx.replace_rows(ResourceKind::Pods, vec![pod("default", "web-0", "u0")]);
        ctx.force_mode(ScreenMode::Log);
        let mut app = App::with_controller(ctx, ModeController::with_modes(vec![Box::new(ListMode)]));
        let screen = draw(&mut app);

        assert_eq!(app.visible_mode(), ScreenMode::List);
        assert!(screen.contains("web-0"));
    }

    #[test]
    fn confirm_dialog_names_the_target() {
        let mut ctx = context(&["alpha"]);
        ctx.replace_rows(ResourceKind::Pods, vec![pod("default", "web-0", "u0")]);
        let mut app = App::new(ctx);
        app.handle_key(KeyEvent::new(KeyCode::Delete, KeyModifiers::NONE));
        assert_eq!(app.visible_mode(), ScreenMode::ConfirmDialog);

        let screen = draw(&mut app);
        assert!(screen.contains("Delete default/web-0 (Pods)?"));
    }

    #[test]
    fn help_lists_bindings_of_the_mode_below() {
        let mut ctx = context(&["alpha"]);
        ctx.replace_rows(ResourceKind::Pods, vec![pod("default", "web-0", "u0")]);
        let mut app = App::new(ctx);
        app.handle_key(key(KeyCode::Char('?')));
        assert_eq!(app.visible_mode(), ScreenMode::Help);

        let screen = draw_sized(&mut app, 100, 40);
        assert!(screen.contains("Switch namespace"));
        assert!(screen.contains("Close help"));
        assert!(screen.contains("mode:list"));
    }

    #[test]
    fn log_view_shows_tagged_lines_for_its_session() {
        let mut ctx = context(&["alpha"]);
        ctx.replace_rows(ResourceKind::Pods, vec![pod("default", "web-0", "u0")]);
        let mut app = App::new(ctx);
        let command = app.handle_key(key(KeyCode::Char('l')));
        let AppCommand::StartLogs { session, .. } = command else {
            panic!("expected a log session, got {command:?}");
        };

        app.apply_message(AppMessage::LogStarted {
            session,
            containers: vec!["app".to_string(), "sidecar".to_string()],
        });
        for (container, line) in [("app", "listening on :8080"), ("sidecar", "proxy ready")] {
            app.apply_message(AppMessage::LogLine {
                session,
                container: container.to_string(),
                line: line.to_string(),
            });
        }
        app.apply_message(AppMessage::LogLine {
            session: session + 1,
            container: "app".to_string(),
            line: "from another session".to_string(),
        });

        let screen = draw(&mut app);
        assert!(screen.contains("Logs default/web-0 [app,sidecar]"));
        assert!(screen.contains("[app] listening on :8080"));
        assert!(screen.contains("[sidecar] proxy ready"));
        assert!(!screen.contains("from another session"));
    }

    #[test]
    fn page_size_follows_the_body_height() {
        let mut app = App::new(context(&["alpha"]));
        draw(&mut app);
        // 24 rows minus header, footer, two borders and the column header.
        assert_eq!(app.context().page_size(), 19);
    }

    #[test]
    fn yaml_keys_and_values_are_split() {
        let line = highlight_yaml_line("  replicas: 3");
        let text = line
            .spans
            .iter()
            .map(|span| span.content.to_string())
            .collect::<Vec<_>>();
        assert_eq!(text, vec!["  ", "replicas", ":", " ", "3"]);

        let url = highlight_yaml_line("image: registry.io/app:1.2");
        assert_eq!(url.spans[1].content, "image");
    }

    #[test]
    fn compact_text_appends_an_ellipsis() {
        assert_eq!(compact_text("kubernetes", 5), "kube…");
        assert_eq!(compact_text("pod", 5), "pod");
    }
}
