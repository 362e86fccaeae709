mod export;
mod help;
mod state;

use crate::cli::{build_config, build_orchestrator, build_settings, Cli, RunMode};
use crate::model::{LogKind, PanelEvent};
use crate::orchestrator::{self, UiCommand};
use crate::terminal::{Row, CURSOR_MARKER};
use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Terminal,
};
use state::{Field, FormState, UiState};
use std::{io, time::Duration, time::Instant};
use tokio::sync::mpsc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

pub async fn run(args: Cli) -> Result<()> {
    // Unbounded channels: reveal frames arrive in bursts and must never stall a producer.
    let (event_tx, event_rx) = mpsc::unbounded_channel::<PanelEvent>();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<UiCommand>();

    let settings = build_settings(&args);
    let orchestrator = build_orchestrator(&settings, event_tx)?;

    if args.submit_on_launch {
        let _ = cmd_tx.send(UiCommand::Submit(build_config(&args)));
    }

    // TUI runs in a dedicated thread to keep all blocking I/O out of the Tokio runtime.
    let ui_args = args.clone();
    let ui_handle = std::thread::spawn(move || run_threaded(ui_args, event_rx, cmd_tx));

    let last = orchestrator::run_controller(orchestrator, cmd_rx).await;
    tracing::debug!(?last, "controller stopped");

    let join_res = tokio::task::spawn_blocking(move || ui_handle.join()).await;
    if let Ok(joined) = join_res {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e),
            Err(_) => return Err(anyhow::anyhow!("TUI thread panicked")),
        }
    }

    Ok(())
}

/// Run the TUI loop on a dedicated thread.
pub fn run_threaded(
    args: Cli,
    mut event_rx: UnboundedReceiver<PanelEvent>,
    cmd_tx: UnboundedSender<UiCommand>,
) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).ok();

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;
    terminal.clear().ok();

    let mode_label = match args.mode {
        RunMode::Server => "server",
        RunMode::Simulated => "simulated",
    };
    // UiState is owned by the UI thread only; no cross-thread mutation.
    let mut state = UiState::new(
        FormState::from_config(&build_config(&args)),
        args.endpoint.clone(),
        mode_label,
    );

    // Fast enough for 10ms reveal frames to look continuous.
    let tick_rate = Duration::from_millis(16);
    let mut last_tick = Instant::now();

    let res = loop {
        while let Ok(ev) = event_rx.try_recv() {
            apply_event(&mut state, ev);
        }

        if last_tick.elapsed() >= tick_rate {
            terminal.draw(|f| draw(f.area(), f, &state)).ok();
            last_tick = Instant::now();
        }

        // Poll input with a short timeout to avoid blocking the render loop.
        if event::poll(Duration::from_millis(5)).unwrap_or(false) {
            if let Ok(Event::Key(k)) = event::read() {
                if k.kind != KeyEventKind::Press {
                    continue;
                }
                match (k.modifiers, k.code) {
                    (_, KeyCode::Esc) | (KeyModifiers::CONTROL, KeyCode::Char('c')) => {
                        let _ = cmd_tx.send(UiCommand::Quit);
                        break Ok(());
                    }
                    (KeyModifiers::CONTROL, KeyCode::Char('s')) => {
                        export::save_and_show_path(&mut state);
                    }
                    (KeyModifiers::CONTROL, KeyCode::Char('y')) => {
                        export::copy_saved_path(&mut state);
                    }
                    (_, KeyCode::F(1)) => {
                        state.show_help = !state.show_help;
                    }
                    (_, KeyCode::Enter) => submit(&mut state, &cmd_tx),
                    (_, KeyCode::Tab) | (_, KeyCode::Down) => {
                        state.form.focus = state.form.focus.next();
                    }
                    (_, KeyCode::BackTab) | (_, KeyCode::Up) => {
                        state.form.focus = state.form.focus.prev();
                    }
                    (_, KeyCode::Left) => state.form.cycle_option(false),
                    (_, KeyCode::Right) => state.form.cycle_option(true),
                    (_, KeyCode::PageUp) => state.terminal.scroll_up(10),
                    (_, KeyCode::PageDown) => state.terminal.scroll_down(10),
                    (_, KeyCode::End) => state.terminal.scroll_to_bottom(),
                    (_, KeyCode::Backspace) => state.form.backspace(),
                    (m, KeyCode::Char(c))
                        if !m.contains(KeyModifiers::CONTROL) && state.form.focus.is_text() =>
                    {
                        state.form.insert_char(c);
                    }
                    _ => {}
                }
            }
        }
    };

    disable_raw_mode().ok();
    let mut stdout = io::stdout();
    execute!(stdout, LeaveAlternateScreen).ok();
    res
}

fn submit(state: &mut UiState, cmd_tx: &UnboundedSender<UiCommand>) {
    if !state.can_submit() {
        state.info = "Run in progress…".into();
        return;
    }
    state.info.clear();
    let _ = cmd_tx.send(UiCommand::Submit(state.form.to_config()));
}

fn apply_event(state: &mut UiState, ev: PanelEvent) {
    if let PanelEvent::StateChanged(s) = ev {
        state.run_state = s;
    }
    state.terminal.apply(ev);
}

fn kind_style(kind: LogKind) -> Style {
    match kind {
        LogKind::Info => Style::default(),
        LogKind::Success => Style::default().fg(Color::Green),
        LogKind::Warning => Style::default().fg(Color::Yellow),
        LogKind::Error => Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        LogKind::Muted => Style::default().fg(Color::DarkGray),
    }
}

fn draw(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(3),
                Constraint::Min(0),
                Constraint::Length(3),
            ]
            .as_ref(),
        )
        .split(area);

    let header = Paragraph::new(Line::from(vec![
        Span::styled("Automattuner", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw("  "),
        Span::styled("BETA", Style::default().fg(Color::Yellow)),
        Span::raw("   endpoint: "),
        Span::styled(state.endpoint.clone(), Style::default().fg(Color::Cyan)),
        Span::raw("   mode: "),
        Span::styled(state.mode_label, Style::default().fg(Color::Cyan)),
    ]))
    .block(Block::default().borders(Borders::ALL).title("automattuner"));
    f.render_widget(header, chunks[0]);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)].as_ref())
        .split(chunks[1]);

    draw_form(body[0], f, state);
    if state.show_help {
        help::draw_help(body[1], f);
    } else {
        draw_terminal(body[1], f, state);
    }
    draw_status(chunks[2], f, state);
}

fn field_block(title: &'static str, focused: bool) -> Block<'static> {
    let border = if focused {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::Gray)
    };
    Block::default()
        .borders(Borders::ALL)
        .border_style(border)
        .title(title)
}

fn draw_form(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let outer = Block::default()
        .borders(Borders::ALL)
        .title("Configuration");
    let inner = outer.inner(area);
    f.render_widget(outer, area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(5), // Application IDs
                Constraint::Length(3), // Version
                Constraint::Length(3), // Architecture + context
                Constraint::Length(3), // Tenant
                Constraint::Min(0),
                Constraint::Length(3), // Submit
            ]
            .as_ref(),
        )
        .split(inner);

    let form = &state.form;
    let text_value = |value: &str, placeholder: &'static str, field: Field| -> Line<'static> {
        let mut spans = Vec::new();
        if value.is_empty() {
            spans.push(Span::styled(placeholder, Style::default().fg(Color::DarkGray)));
        } else {
            spans.push(Span::raw(value.to_string()));
        }
        if form.focus == field {
            spans.push(Span::styled("▏", Style::default().fg(Color::Yellow)));
        }
        Line::from(spans)
    };

    f.render_widget(
        Paragraph::new(text_value(&form.app_ids, "e.g. Mozilla.Firefox, Zoom.Zoom", Field::AppIds))
            .wrap(ratatui::widgets::Wrap { trim: false })
            .block(field_block("Application IDs", form.focus == Field::AppIds)),
        rows[0],
    );
    f.render_widget(
        Paragraph::new(text_value(&form.version, "Latest", Field::Version))
            .block(field_block("Target Version (optional)", form.focus == Field::Version)),
        rows[1],
    );

    let options = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)].as_ref())
        .split(rows[2]);
    let option_line = |value: String| {
        Line::from(vec![
            Span::styled("◀ ", Style::default().fg(Color::DarkGray)),
            Span::raw(value),
            Span::styled(" ▶", Style::default().fg(Color::DarkGray)),
        ])
    };
    f.render_widget(
        Paragraph::new(option_line(form.architecture.to_string())).block(field_block(
            "Architecture",
            form.focus == Field::Architecture,
        )),
        options[0],
    );
    f.render_widget(
        Paragraph::new(option_line(form.context.to_string()))
            .block(field_block("Install Context", form.focus == Field::Context)),
        options[1],
    );

    f.render_widget(
        Paragraph::new(text_value(&form.tenant_id, "optional", Field::Tenant))
            .block(field_block("Tenant", form.focus == Field::Tenant)),
        rows[3],
    );

    let label = state.run_state.submit_label();
    let button_style = if state.can_submit() {
        Style::default()
            .fg(Color::Black)
            .bg(Color::Cyan)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let button_label = if state.can_submit() {
        format!("⚡ {label}")
    } else {
        format!("⟳ {label}")
    };
    f.render_widget(
        Paragraph::new(Span::styled(button_label, button_style))
            .alignment(Alignment::Center)
            .block(field_block("", form.focus == Field::Submit)),
        rows[5],
    );
}

fn draw_terminal(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let ts_style = Style::default().fg(Color::DarkGray);
    let lines: Vec<Line> = state
        .terminal
        .rows()
        .into_iter()
        .map(|row| match row {
            Row::Text {
                timestamp,
                text,
                kind,
            } => {
                let prefix = match timestamp {
                    Some(ts) => Span::styled(format!("[{ts}] "), ts_style),
                    None => Span::raw(" ".repeat(11)),
                };
                Line::from(vec![prefix, Span::styled(text.to_string(), kind_style(kind))])
            }
            Row::Cursor => Line::from(Span::styled(
                CURSOR_MARKER,
                Style::default()
                    .fg(Color::Green)
                    .add_modifier(Modifier::SLOW_BLINK),
            )),
        })
        .collect();

    let view_height = area.height.saturating_sub(2) as usize;
    let total = lines.len();
    let offset = total.saturating_sub(view_height + state.terminal.scroll_back());

    let title = if state.terminal.scroll_back() > 0 {
        "Terminal (scrolled, End to follow)"
    } else {
        "Terminal"
    };
    let p = Paragraph::new(lines)
        .scroll((offset.min(u16::MAX as usize) as u16, 0))
        .block(Block::default().borders(Borders::ALL).title(title));
    f.render_widget(p, area);
}

fn draw_status(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let status = if state.info.is_empty() {
        help::hint_line()
    } else {
        Line::from(state.info.clone())
    };
    let run = if state.run_state.is_running() {
        Span::styled(" RUNNING ", Style::default().fg(Color::Black).bg(Color::Yellow))
    } else {
        Span::styled(" IDLE ", Style::default().fg(Color::Black).bg(Color::Green))
    };
    let mut spans = vec![run, Span::raw(" ")];
    spans.extend(status.spans);
    let p = Paragraph::new(Line::from(spans))
        .block(Block::default().borders(Borders::ALL).title("Status"));
    f.render_widget(p, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FixedClock, LogEntry, RunConfig, RunState};
    use ratatui::backend::TestBackend;
    use time::macros::time;

    fn ui() -> UiState {
        UiState::new(
            FormState::from_config(&RunConfig::default()),
            "http://127.0.0.1:5000".into(),
            "server",
        )
    }

    fn screen_text(terminal: &Terminal<TestBackend>) -> String {
        let buf = terminal.backend().buffer();
        let mut out = String::new();
        for y in 0..buf.area.height {
            for x in 0..buf.area.width {
                out.push_str(buf[(x, y)].symbol());
            }
            out.push('\n');
        }
        out
    }

    #[test]
    fn submit_is_blocked_while_running() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut state = ui();
        state.form.app_ids = "Foo.Bar".into();

        apply_event(&mut state, PanelEvent::StateChanged(RunState::Running));
        submit(&mut state, &tx);
        assert!(rx.try_recv().is_err());
        assert_eq!(state.info, "Run in progress…");

        apply_event(&mut state, PanelEvent::StateChanged(RunState::Idle));
        submit(&mut state, &tx);
        match rx.try_recv() {
            Ok(UiCommand::Submit(cfg)) => assert_eq!(cfg.app_ids, "Foo.Bar"),
            other => panic!("expected submit, got {other:?}"),
        }
    }

    #[test]
    fn draws_label_and_terminal_lines() {
        let mut state = ui();
        let clock = FixedClock(time!(8:00:01));
        apply_event(&mut state, PanelEvent::StateChanged(RunState::Running));
        apply_event(
            &mut state,
            PanelEvent::Appended {
                entry: LogEntry::create("> SUCCESS: done", LogKind::Success, &clock),
                typed: false,
            },
        );

        let mut terminal = Terminal::new(TestBackend::new(120, 30)).unwrap();
        terminal.draw(|f| draw(f.area(), f, &state)).unwrap();
        let text = screen_text(&terminal);
        assert!(text.contains("PROCESSING..."));
        assert!(text.contains("[08:00:01] > SUCCESS: done"));

        apply_event(&mut state, PanelEvent::StateChanged(RunState::Idle));
        terminal.draw(|f| draw(f.area(), f, &state)).unwrap();
        assert!(screen_text(&terminal).contains("INITIATE SEQUENCE"));
    }
}
