use ratatui::style::Color;

pub const STATUS_BG: Color = Color::Rgb(30, 30, 40);
pub const HEADER_BG: Color = Color::Rgb(25, 25, 38);
pub const ACCENT: Color = Color::Rgb(140, 115, 200);
pub const SEPARATOR: Color = Color::Rgb(55, 55, 75);
pub const DIM_TEXT: Color = Color::Rgb(100, 100, 120);
pub const CONTENT_FG: Color = Color::Rgb(220, 220, 230);
pub const SELECTED_BG: Color = Color::Rgb(50, 50, 80);
pub const ACTIVE_BORDER: Color = Color::Rgb(120, 120, 180);
pub const LIVE_FG: Color = Color::LightGreen;
pub const SUCCESS_FG: Color = Color::LightGreen;
pub const ERROR_FG: Color = Color::LightRed;

/// Stable color per event family (`push`, `pull_request/opened` -> `pull_request`).
pub fn event_kind_color(kind: &str) -> Color {
    let family = kind.split('/').next().unwrap_or(kind);
    match family {
        "push" | "create" => Color::Cyan,
        "pull_request" | "pull_request_review" => Color::Magenta,
        "issues" | "issue_comment" => Color::Yellow,
        "release" => Color::LightGreen,
        "delete" => Color::LightRed,
        _ => ACCENT,
    }
}
