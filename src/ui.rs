use chrono::Utc;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols,
    text::{Line, Span},
    widgets::{Axis, Block, BorderType, Borders, Chart, Dataset, Gauge, GraphType, Paragraph},
    Frame,
};

use crate::app::{App, LinkState};
use crate::history::HISTORY_CAPACITY;
use crate::theme::*;
use crate::view::{Bar, Dashboard, GpuPanel, TrendChart, TrendKind, View};

/// Renders the main UI with header and either the loading panel or the dashboard
pub fn render(frame: &mut Frame, app: &App) {
    // Main container with dark background
    let main_block = Block::default().style(Style::default().bg(DARK_BG));
    frame.render_widget(main_block, frame.area());

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(4), // Header
            Constraint::Min(0),    // Body
        ])
        .split(frame.area());

    render_header(frame, chunks[0], app);

    match app.view() {
        View::Loading => render_loading(frame, chunks[1], app),
        View::Dashboard(dashboard) => render_dashboard(frame, chunks[1], &dashboard),
    }
}

fn link_span(link: &LinkState) -> Span<'static> {
    match link {
        LinkState::Live => Span::styled(
            "● LIVE",
            Style::default().fg(NEON_GREEN).add_modifier(Modifier::BOLD),
        ),
        LinkState::Connecting(attempt) => Span::styled(
            format!("◌ CONNECTING #{attempt}"),
            Style::default().fg(NEON_YELLOW),
        ),
        LinkState::Down(_) => Span::styled(
            "✖ DOWN",
            Style::default().fg(NEON_RED).add_modifier(Modifier::BOLD),
        ),
    }
}

fn render_header(frame: &mut Frame, area: Rect, app: &App) {
    let now = Utc::now();
    let glitch_char = if app.frame_count % 10 < 2 { "█" } else { " " };
    let dropped_color = if app.dropped > 0 { NEON_RED } else { NEON_CYAN };
    let history = if app.history.is_empty() {
        "HISTORY: -".to_string()
    } else {
        format!("HISTORY: {}/{}", app.history.len(), HISTORY_CAPACITY)
    };

    let header_text = vec![
        Line::from(vec![
            Span::styled("  ", Style::default()),
            Span::styled(glitch_char, Style::default().fg(NEON_MAGENTA)),
            Span::styled(
                " FINE-TUNING MONITOR ",
                Style::default().fg(NEON_GREEN).add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!("v{} ", env!("CARGO_PKG_VERSION")),
                Style::default().fg(CYBER_BLUE),
            ),
            Span::styled("│ ", Style::default().fg(NEON_GREEN)),
            Span::styled(
                format!("{}", now.format("%H:%M:%S")),
                Style::default().fg(NEON_YELLOW),
            ),
            Span::styled(" │ ", Style::default().fg(NEON_GREEN)),
            link_span(&app.link),
            Span::styled(" │ ", Style::default().fg(NEON_GREEN)),
            Span::styled(
                format!("DROPPED: {}", app.dropped),
                Style::default().fg(dropped_color),
            ),
            Span::styled(" │ ", Style::default().fg(NEON_GREEN)),
            Span::styled(history, Style::default().fg(NEON_MAGENTA)),
        ]),
        Line::from(vec![
            Span::styled("  FEED ", Style::default().fg(Color::DarkGray)),
            Span::styled(app.endpoint.as_str(), Style::default().fg(NEON_CYAN)),
        ]),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Double)
        .border_style(Style::default().fg(NEON_GREEN))
        .style(Style::default().bg(DARK_BG));

    let header = Paragraph::new(header_text)
        .block(block)
        .alignment(Alignment::Left);
    frame.render_widget(header, area);
}

fn render_loading(frame: &mut Frame, area: Rect, app: &App) {
    let blink = if app.frame_count % 20 < 10 { "█" } else { " " };
    let mut text = vec![
        Line::from(""),
        Line::from(vec![
            Span::styled("  [", Style::default().fg(NEON_RED)),
            Span::styled(
                "!",
                Style::default()
                    .fg(NEON_YELLOW)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled("] ", Style::default().fg(NEON_RED)),
            Span::styled(
                "WAITING FOR METRICS FEED",
                Style::default().fg(NEON_RED).add_modifier(Modifier::BOLD),
            ),
            Span::styled(blink, Style::default().fg(NEON_GREEN)),
        ]),
        Line::from(""),
        Line::from(vec![Span::styled(
            format!("      Loading... listening on {}", app.endpoint),
            Style::default().fg(Color::DarkGray),
        )]),
    ];
    if let LinkState::Down(reason) = &app.link {
        text.push(Line::from(vec![Span::styled(
            format!("      Last error: {reason}"),
            Style::default().fg(NEON_RED),
        )]));
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Double)
        .border_style(Style::default().fg(NEON_RED))
        .style(Style::default().bg(DARK_BG));

    let paragraph = Paragraph::new(text).block(block);
    frame.render_widget(paragraph, area);
}

fn render_dashboard(frame: &mut Frame, area: Rect, dashboard: &Dashboard) {
    let mut constraints = vec![Constraint::Length(8)]; // Overview + sessions
    if !dashboard.gpus.is_empty() {
        constraints.push(Constraint::Length(8)); // GPU panels
    }
    constraints.push(Constraint::Min(8)); // History chart

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(area);

    let top = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(rows[0]);
    render_system(frame, top[0], dashboard);
    render_sessions(frame, top[1], dashboard.active_sessions);

    if !dashboard.gpus.is_empty() {
        // Dynamic layout for GPUs
        let gpu_count = dashboard.gpus.len();
        let gpu_chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints(
                (0..gpu_count)
                    .map(|_| Constraint::Ratio(1, gpu_count as u32))
                    .collect::<Vec<_>>(),
            )
            .split(rows[1]);
        for (gpu, chunk) in dashboard.gpus.iter().zip(gpu_chunks.iter()) {
            render_gpu(frame, *chunk, gpu);
        }
    }

    render_history(frame, rows[rows.len() - 1], &dashboard.chart);
}

fn panel<'a>(title: Vec<Span<'a>>) -> Block<'a> {
    Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(MATRIX_GREEN))
        .title(title)
        .style(Style::default().bg(DARK_BG))
}

fn gauge(name: &str, bar: Bar, color: Color) -> Gauge<'static> {
    Gauge::default()
        .block(
            Block::default()
                .borders(Borders::NONE)
                .style(Style::default().bg(DARK_BG)),
        )
        .gauge_style(Style::default().fg(color).bg(GAUGE_TRACK))
        .ratio(bar.fill)
        .label(Span::styled(
            format!("▓ {name} {:5.1}%", bar.value),
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        ))
}

fn render_system(frame: &mut Frame, area: Rect, dashboard: &Dashboard) {
    let block = panel(vec![Span::styled(
        " ◆ System Overview ",
        Style::default().fg(NEON_GREEN).add_modifier(Modifier::BOLD),
    )]);
    frame.render_widget(block, area);

    let inner = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(1), // CPU caption
            Constraint::Length(2), // CPU bar
            Constraint::Length(1), // Memory caption
            Constraint::Length(2), // Memory bar
        ])
        .split(area);

    let caption = |text: &'static str| {
        Paragraph::new(Span::styled(text, Style::default().fg(Color::DarkGray)))
            .style(Style::default().bg(DARK_BG))
    };

    frame.render_widget(caption("  CPU Usage"), inner[0]);
    frame.render_widget(
        gauge("CPU", dashboard.cpu, load_color(dashboard.cpu.value)),
        inner[1],
    );
    frame.render_widget(caption("  Memory Usage"), inner[2]);
    frame.render_widget(gauge("MEM", dashboard.memory, MEMORY_LINE), inner[3]);
}

fn render_sessions(frame: &mut Frame, area: Rect, active_sessions: u64) {
    let block = panel(vec![Span::styled(
        " ◆ Active Sessions ",
        Style::default().fg(NEON_GREEN).add_modifier(Modifier::BOLD),
    )]);

    let text = vec![
        Line::from(""),
        Line::from(Span::styled(
            active_sessions.to_string(),
            Style::default().fg(CYBER_BLUE).add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(Span::styled(
            "Current Training Jobs",
            Style::default().fg(Color::DarkGray),
        )),
    ];

    let paragraph = Paragraph::new(text)
        .block(block)
        .alignment(Alignment::Center);
    frame.render_widget(paragraph, area);
}

fn render_gpu(frame: &mut Frame, area: Rect, gpu: &GpuPanel) {
    let status_color = load_color(gpu.utilization.value);

    let block = panel(vec![
        Span::styled(" ◆ ", Style::default().fg(status_color)),
        Span::styled(
            format!("GPU {} ", gpu.id),
            Style::default().fg(NEON_GREEN).add_modifier(Modifier::BOLD),
        ),
        Span::styled("│ ", Style::default().fg(MATRIX_GREEN)),
        Span::styled(gpu.name.as_str(), Style::default().fg(CYBER_BLUE)),
        Span::styled(" ", Style::default()),
    ]);
    frame.render_widget(block, area);

    let inner = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(2), // Util bar
            Constraint::Length(2), // Memory bar
            Constraint::Length(1), // Memory text
        ])
        .split(area);

    frame.render_widget(gauge("GPU", gpu.utilization, status_color), inner[0]);
    frame.render_widget(gauge("MEM", gpu.memory, NEON_YELLOW), inner[1]);

    let memory = Paragraph::new(Line::from(vec![
        Span::styled("  MEM: ", Style::default().fg(Color::DarkGray)),
        Span::styled(gpu.memory_text.as_str(), Style::default().fg(NEON_MAGENTA)),
    ]))
    .style(Style::default().bg(DARK_BG));
    frame.render_widget(memory, inner[2]);
}

fn render_history(frame: &mut Frame, area: Rect, chart: &TrendChart) {
    let mut gpu_seen = 0;
    let datasets: Vec<Dataset> = chart
        .lines
        .iter()
        .map(|line| {
            let color = match line.kind {
                TrendKind::Cpu => CPU_LINE,
                TrendKind::Memory => MEMORY_LINE,
                TrendKind::Gpu(_) => {
                    gpu_seen += 1;
                    gpu_line(gpu_seen - 1)
                }
            };
            Dataset::default()
                .name(line.label.as_str())
                .marker(symbols::Marker::Braille)
                .graph_type(GraphType::Line)
                .style(Style::default().fg(color))
                .data(&line.points)
        })
        .collect();

    let axis_style = Style::default().fg(Color::DarkGray);
    let widget = Chart::new(datasets)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(Style::default().fg(Color::Rgb(40, 80, 40)))
                .title(Span::styled(
                    " ◇ Resource Usage History ",
                    Style::default().fg(NEON_GREEN),
                ))
                .style(Style::default().bg(DARK_BG)),
        )
        .x_axis(
            Axis::default()
                .style(axis_style)
                .bounds(chart.x_bounds)
                .labels(chart.x_labels.iter().map(String::as_str)),
        )
        .y_axis(
            Axis::default()
                .style(axis_style)
                .bounds(chart.y_bounds)
                .labels([
                    format!("{:.0}", chart.y_bounds[0]),
                    format!("{:.0}", chart.y_bounds[1]),
                ]),
        );
    frame.render_widget(widget, area);
}
