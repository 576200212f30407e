use crate::ui::theme;
use ratatui::{
    buffer::Buffer as Buf,
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Widget},
};
use std::time::{Duration, Instant};
use unicode_width::UnicodeWidthStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Success,
    Info,
    Error,
}

impl Severity {
    pub fn color(&self) -> Color {
        match self {
            Severity::Success => theme::SUCCESS_FG,
            Severity::Info => theme::ACCENT,
            Severity::Error => theme::ERROR_FG,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    Timeout,
    /// Incidental click elsewhere on screen; never dismisses.
    ClickAway,
    Explicit,
}

#[derive(Debug, Clone)]
pub struct Notification {
    pub message: String,
    pub severity: Severity,
    pub shown_at: Instant,
}

/// Single-slot notification: a new message replaces the old and restarts its timer.
#[derive(Debug)]
pub struct Snackbar {
    current: Option<Notification>,
    ttl: Duration,
}

impl Snackbar {
    pub fn new(ttl: Duration) -> Self {
        Self { current: None, ttl }
    }

    pub fn set(&mut self, severity: Severity, message: impl Into<String>) {
        self.set_at(severity, message, Instant::now());
    }

    pub fn set_at(&mut self, severity: Severity, message: impl Into<String>, now: Instant) {
        self.current = Some(Notification {
            message: message.into(),
            severity,
            shown_at: now,
        });
    }

    pub fn close(&mut self, reason: CloseReason) {
        if reason == CloseReason::ClickAway {
            return;
        }
        self.current = None;
    }

    /// Auto-dismisses the message once it has been visible for the full ttl.
    pub fn tick(&mut self, now: Instant) {
        let expired = self
            .current
            .as_ref()
            .is_some_and(|n| now.saturating_duration_since(n.shown_at) >= self.ttl);
        if expired {
            self.close(CloseReason::Timeout);
        }
    }

    pub fn current(&self) -> Option<&Notification> {
        self.current.as_ref()
    }
}

pub struct Toast<'a> {
    pub notification: &'a Notification,
}

impl<'a> Widget for Toast<'a> {
    fn render(self, area: Rect, buf: &mut Buf) {
        let first_line = self.notification.message.lines().next().unwrap_or("");
        let text_w = UnicodeWidthStr::width(first_line);
        let box_w = text_w.saturating_add(4).min(area.width as usize) as u16;
        let box_h: u16 = 3;

        if area.width < box_w || area.height < box_h.saturating_add(1) {
            return;
        }

        // top-right corner
        let x = area.right().saturating_sub(box_w.saturating_add(1));
        let y = area.y.saturating_add(1);
        let toast_area = Rect::new(x, y, box_w, box_h);

        Clear.render(toast_area, buf);

        let color = self.notification.severity.color();
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(color));
        let inner = block.inner(toast_area);
        block.render(toast_area, buf);

        if inner.width == 0 {
            return;
        }

        let text = crate::ui::truncate_with_ellipsis(first_line, inner.width as usize);
        let line = Line::from(Span::styled(text, Style::default().fg(color)));
        buf.set_line(inner.x, inner.y, &line, inner.width);
    }
}
