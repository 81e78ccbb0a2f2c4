use ratatui::style::Color;

// Muted hacker palette
pub const NEON_GREEN: Color = Color::Rgb(0, 160, 50);
pub const NEON_CYAN: Color = Color::Rgb(0, 150, 160);
pub const NEON_MAGENTA: Color = Color::Rgb(160, 60, 160);
pub const NEON_YELLOW: Color = Color::Rgb(180, 160, 60);
pub const NEON_RED: Color = Color::Rgb(180, 60, 60);
pub const DARK_BG: Color = Color::Rgb(15, 15, 25);
pub const GAUGE_TRACK: Color = Color::Rgb(20, 20, 30);
pub const MATRIX_GREEN: Color = Color::Rgb(30, 130, 30);
pub const CYBER_BLUE: Color = Color::Rgb(60, 130, 180);

pub const CPU_LINE: Color = CYBER_BLUE;
pub const MEMORY_LINE: Color = NEON_GREEN;
const GPU_LINES: [Color; 4] = [
    NEON_MAGENTA,
    Color::Rgb(120, 90, 200),
    Color::Rgb(200, 110, 170),
    Color::Rgb(90, 60, 140),
];

/// Trend line colour for the n-th GPU on screen.
pub fn gpu_line(n: usize) -> Color {
    GPU_LINES[n % GPU_LINES.len()]
}

/// Gauge colour escalating with load.
pub fn load_color(percent: f64) -> Color {
    if percent > 90.0 {
        NEON_RED
    } else if percent > 50.0 {
        NEON_YELLOW
    } else {
        NEON_GREEN
    }
}
