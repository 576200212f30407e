use crate::activity::types::ActivityEvent;
use crate::ui::{theme, truncate_with_ellipsis};
use ratatui::{
    buffer::Buffer as Buf,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Widget,
};
use unicode_width::UnicodeWidthStr;

const TIME_W: usize = 17;
const KIND_W: usize = 24;
const ACTOR_W: usize = 16;

pub struct ActivityPane<'a> {
    pub events: &'a [ActivityEvent],
    /// Events are only shown while the room has a webhook.
    pub has_webhook: bool,
    pub scroll: usize,
    pub selected: usize,
}

impl<'a> Widget for ActivityPane<'a> {
    fn render(self, area: Rect, buf: &mut Buf) {
        if area.height == 0 {
            return;
        }

        if !self.has_webhook || self.events.is_empty() {
            let msg = if self.has_webhook {
                " No activity yet"
            } else {
                " No webhook configured. Press s to set one up"
            };
            let line = Line::from(Span::styled(msg, Style::default().fg(theme::DIM_TEXT)));
            buf.set_line(area.x, area.y, &line, area.width);
            return;
        }

        for (row, (idx, event)) in self
            .events
            .iter()
            .enumerate()
            .skip(self.scroll)
            .take(area.height as usize)
            .enumerate()
        {
            let y = area.y + row as u16;
            let summary = event.summary();
            let base = if idx == self.selected {
                Style::default().bg(theme::SELECTED_BG)
            } else {
                Style::default()
            };
            if idx == self.selected {
                for x in area.x..area.right() {
                    buf[(x, y)].set_style(base);
                }
            }

            let time = event.updated_at.format("%Y-%m-%d %H:%M").to_string();
            let kind = truncate_with_ellipsis(&summary.kind, KIND_W - 1);
            let actor = truncate_with_ellipsis(summary.actor.as_deref().unwrap_or(""), ACTOR_W - 1);
            let used = 1 + TIME_W + KIND_W + ACTOR_W;
            let title_w = (area.width as usize).saturating_sub(used);

            let spans = vec![
                Span::styled(" ", base),
                Span::styled(format!("{time:<TIME_W$}"), base.fg(theme::DIM_TEXT)),
                Span::styled(
                    format!("{kind}{}", " ".repeat(KIND_W - UnicodeWidthStr::width(kind.as_str()))),
                    base.fg(theme::event_kind_color(&summary.kind))
                        .add_modifier(Modifier::BOLD),
                ),
                Span::styled(
                    format!("{actor}{}", " ".repeat(ACTOR_W - UnicodeWidthStr::width(actor.as_str()))),
                    base.fg(theme::ACCENT),
                ),
                Span::styled(
                    truncate_with_ellipsis(&summary.title, title_w),
                    base.fg(theme::CONTENT_FG),
                ),
            ];
            buf.set_line(area.x, y, &Line::from(spans), area.width);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::make_event;

    fn row_text(buf: &Buf, y: u16) -> String {
        (0..buf.area.width)
            .map(|x| buf[(x, y)].symbol().to_string())
            .collect()
    }

    #[test]
    fn renders_events_in_feed_order() {
        let events = vec![make_event("newest", 20), make_event("older", 10)];
        let area = Rect::new(0, 0, 90, 3);
        let mut buf = Buf::empty(area);
        ActivityPane {
            events: &events,
            has_webhook: true,
            scroll: 0,
            selected: 0,
        }
        .render(area, &mut buf);

        assert!(row_text(&buf, 0).contains("newest"));
        assert!(row_text(&buf, 1).contains("older"));
    }

    #[test]
    fn hides_events_without_webhook() {
        let events = vec![make_event("e1", 1)];
        let area = Rect::new(0, 0, 80, 2);
        let mut buf = Buf::empty(area);
        ActivityPane {
            events: &events,
            has_webhook: false,
            scroll: 0,
            selected: 0,
        }
        .render(area, &mut buf);

        assert!(row_text(&buf, 0).contains("No webhook configured"));
        assert!(!row_text(&buf, 0).contains("e1"));
    }
}
