use crate::activity::sync::WebhookMutator;
use crate::activity::types::{HookId, Subscriptions, WebhookRecord};
use crate::error::Result;
use crate::ui::theme;
use crate::ui::toast::{Severity, Snackbar};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use itertools::Itertools;
use ratatui::{
    buffer::Buffer as Buf,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Widget},
};
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogAction {
    None,
    Close,
    Save(Vec<String>),
    Delete(HookId),
}

/// Edits which event categories the room's webhook reports.
#[derive(Debug)]
pub struct WebhookDialogState {
    hook_id: Option<HookId>,
    categories: Vec<String>,
    selected: BTreeSet<String>,
    pub cursor: usize,
    pub busy: bool,
}

impl WebhookDialogState {
    pub fn new(hook_id: Option<HookId>, current: &Subscriptions, known: &[String]) -> Self {
        let categories = known
            .iter()
            .map(String::as_str)
            .chain(current.iter())
            .unique()
            .map(String::from)
            .collect();
        Self {
            hook_id,
            categories,
            selected: current.iter().map(String::from).collect(),
            cursor: 0,
            busy: false,
        }
    }

    pub fn hook_id(&self) -> Option<&HookId> {
        self.hook_id.as_ref()
    }

    pub fn is_selected(&self, category: &str) -> bool {
        self.selected.contains(category)
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> DialogAction {
        if self.busy {
            return DialogAction::None;
        }
        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => DialogAction::Close,
            KeyCode::Char('j') | KeyCode::Down => {
                if self.cursor + 1 < self.categories.len() {
                    self.cursor += 1;
                }
                DialogAction::None
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.cursor = self.cursor.saturating_sub(1);
                DialogAction::None
            }
            KeyCode::Char(' ') | KeyCode::Enter => {
                self.toggle_current();
                DialogAction::None
            }
            KeyCode::Char('s') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.save_action()
            }
            KeyCode::Char('w') => self.save_action(),
            KeyCode::Char('d') => match self.hook_id {
                Some(ref id) => {
                    self.busy = true;
                    DialogAction::Delete(id.clone())
                }
                None => DialogAction::None,
            },
            _ => DialogAction::None,
        }
    }

    fn toggle_current(&mut self) {
        if let Some(category) = self.categories.get(self.cursor) {
            if !self.selected.remove(category) {
                self.selected.insert(category.clone());
            }
        }
    }

    fn save_action(&mut self) -> DialogAction {
        if self.selected.is_empty() {
            return DialogAction::None;
        }
        self.busy = true;
        DialogAction::Save(self.selected.iter().cloned().collect())
    }
}

/// Applies a finished save through the dialog's mutators. Returns true when the dialog should close.
pub fn apply_saved(
    result: Result<Option<WebhookRecord>>,
    mutator: &mut dyn WebhookMutator,
    current_hook: Option<&HookId>,
    snackbar: &mut Snackbar,
) -> bool {
    match result {
        Ok(Some(record)) => {
            let created = current_hook != Some(&record.hook_id);
            mutator.set_subscriptions(&record.subscriptions);
            if created {
                mutator.reset_events(record.events);
            }
            mutator.set_hook_id(Some(record.hook_id));
            snackbar.set(Severity::Success, "Webhook updated successfully!");
            true
        }
        Ok(None) => {
            snackbar.set(Severity::Error, "Error updating webhook!");
            false
        }
        Err(e) => {
            tracing::warn!(error = %e, "webhook save failed");
            snackbar.set(Severity::Error, "Error updating webhook!");
            false
        }
    }
}

pub fn apply_deleted(
    result: Result<()>,
    mutator: &mut dyn WebhookMutator,
    snackbar: &mut Snackbar,
) -> bool {
    match result {
        Ok(()) => {
            mutator.set_hook_id(None);
            mutator.set_subscriptions(&[]);
            mutator.reset_events(Vec::new());
            snackbar.set(Severity::Success, "Webhook deleted successfully!");
            true
        }
        Err(e) => {
            tracing::warn!(error = %e, "webhook delete failed");
            snackbar.set(Severity::Error, "Error deleting webhook!");
            false
        }
    }
}

pub struct WebhookDialog<'a> {
    pub state: &'a WebhookDialogState,
    pub room: &'a str,
}

impl<'a> Widget for WebhookDialog<'a> {
    fn render(self, area: Rect, buf: &mut Buf) {
        let popup = crate::ui::centered_rect(50, 70, area);
        Clear.render(popup, buf);

        let hook = match self.state.hook_id {
            Some(ref id) => format!("hook {id}"),
            None => "no webhook".to_string(),
        };
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme::ACTIVE_BORDER))
            .title(format!(" Webhook: {} ({hook}) ", self.room));
        let inner = block.inner(popup);
        block.render(popup, buf);

        if inner.height < 2 {
            return;
        }

        let list_h = inner.height.saturating_sub(2) as usize;
        let offset = self.state.cursor.saturating_sub(list_h.saturating_sub(1));
        for (row, (idx, category)) in self
            .state
            .categories
            .iter()
            .enumerate()
            .skip(offset)
            .take(list_h)
            .enumerate()
        {
            let mark = if self.state.is_selected(category) { "[x]" } else { "[ ]" };
            let mut style = Style::default().fg(theme::event_kind_color(category));
            if idx == self.state.cursor {
                style = style.bg(theme::SELECTED_BG).add_modifier(Modifier::BOLD);
            }
            let line = Line::from(Span::styled(format!(" {mark} {category}"), style));
            buf.set_line(inner.x, inner.y + row as u16, &line, inner.width);
        }

        let footer = if self.state.busy {
            " saving\u{2026}".to_string()
        } else {
            " space toggle  w save  d delete  esc close".to_string()
        };
        let line = Line::from(Span::styled(footer, Style::default().fg(theme::DIM_TEXT)));
        buf.set_line(inner.x, inner.bottom().saturating_sub(1), &line, inner.width);
    }
}
