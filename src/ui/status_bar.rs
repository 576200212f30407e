use crate::activity::types::{HookId, Subscriptions};
use crate::ui::theme;
use itertools::Itertools;
use ratatui::{
    buffer::Buffer as Buf,
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::Widget,
};

pub struct StatusBar<'a> {
    pub hook_id: Option<&'a HookId>,
    pub live: bool,
    pub subscriptions: &'a Subscriptions,
}

impl<'a> Widget for StatusBar<'a> {
    fn render(self, area: Rect, buf: &mut Buf) {
        let bg = Style::default().bg(theme::STATUS_BG);
        for x in area.x..area.right() {
            buf[(x, area.y)].set_style(bg);
        }

        let mut spans = vec![Span::styled(" ", bg)];
        match self.hook_id {
            Some(id) => {
                let (dot, color) = if self.live {
                    ("\u{25cf} live", theme::LIVE_FG)
                } else {
                    ("\u{25cb} offline", theme::DIM_TEXT)
                };
                spans.push(Span::styled(dot, bg.fg(color)));
                spans.push(Span::styled(format!("  hook {id}"), bg.fg(theme::DIM_TEXT)));
            }
            None => spans.push(Span::styled("no webhook", bg.fg(theme::DIM_TEXT))),
        }

        if !self.subscriptions.is_empty() {
            spans.push(Span::styled("  \u{2502} ", bg.fg(theme::SEPARATOR)));
            spans.push(Span::styled(
                self.subscriptions.iter().join(", "),
                bg.fg(theme::CONTENT_FG),
            ));
        }

        buf.set_line(area.x, area.y, &Line::from(spans), area.width);
    }
}
