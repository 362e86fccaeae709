use ratatui::{
    layout::Rect,
    style::Color,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

fn keybind(key: &'static str, pad: usize, what: &'static str) -> Line<'static> {
    Line::from(vec![
        Span::raw("  "),
        Span::styled(key, Style::default().fg(Color::Magenta)),
        Span::raw(" ".repeat(pad)),
        Span::raw(what),
    ])
}

pub fn draw_help(area: Rect, f: &mut Frame) {
    let p = Paragraph::new(vec![
        Line::from("Keybinds:"),
        Line::from(vec![
            Span::raw("  "),
            Span::styled("Esc", Style::default().fg(Color::Magenta)),
            Span::raw(" / "),
            Span::styled("Ctrl-C", Style::default().fg(Color::Magenta)),
            Span::raw("  Quit"),
        ]),
        keybind("Enter", 7, "Initiate sequence (submit the form)"),
        keybind("Tab", 9, "Next field"),
        keybind("Shift-Tab", 3, "Previous field"),
        keybind("←/→", 9, "Change architecture / install context"),
        keybind("PgUp/PgDn", 3, "Scroll terminal"),
        keybind("End", 9, "Follow newest output"),
        keybind("Ctrl-S", 6, "Save transcript JSON"),
        keybind("Ctrl-Y", 6, "Copy saved transcript path"),
        keybind("F1", 10, "Toggle this help"),
        Line::from(""),
        Line::from("Form:"),
        Line::from("  Application IDs are required; separate several with commas."),
        Line::from("  An empty version requests the latest release."),
    ])
    .block(Block::default().borders(Borders::ALL).title("Help"));
    f.render_widget(p, area);
}

/// One-line key hints for the status bar.
pub fn hint_line() -> Line<'static> {
    let key = |k: &'static str| Span::styled(k, Style::default().fg(Color::Magenta));
    Line::from(vec![
        key("Enter"),
        Span::raw(" run  "),
        key("Tab"),
        Span::raw(" field  "),
        key("←/→"),
        Span::raw(" option  "),
        key("PgUp/PgDn"),
        Span::raw(" scroll  "),
        key("Ctrl-S"),
        Span::raw(" save  "),
        key("F1"),
        Span::raw(" help  "),
        key("Esc"),
        Span::raw(" quit"),
    ])
}
