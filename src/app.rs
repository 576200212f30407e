use crate::activity::backend::ActivityBackend;
use crate::activity::gate::{self, SettingsAccess};
use crate::activity::sync::FeedSynchronizer;
use crate::config::Config;
use crate::event::AppEvent;
use crate::oauth::Redirector;
use crate::room::RoomId;
use crate::session::SessionJar;
use crate::ui::{
    activity_pane::ActivityPane,
    header_bar::HeaderBar,
    help_panel::HelpPanel,
    input::{self, Action},
    status_bar::StatusBar,
    toast::{CloseReason, Severity, Snackbar, Toast},
    webhook_dialog::{self, DialogAction, WebhookDialog, WebhookDialogState},
};
use ratatui::{
    layout::{Constraint, Direction, Layout},
    Frame,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

#[derive(Debug)]
pub enum Overlay {
    None,
    Help,
    Webhook(WebhookDialogState),
}

pub struct App {
    pub config: Config,
    pub jar: SessionJar,
    pub room: RoomId,
    pub sync: FeedSynchronizer,
    pub snackbar: Snackbar,
    pub overlay: Overlay,
    redirector: Arc<dyn Redirector>,
    tx: mpsc::UnboundedSender<AppEvent>,

    pub selected: usize,
    pub scroll: usize,

    pub should_quit: bool,
}

impl App {
    pub fn new(
        config: Config,
        jar: SessionJar,
        room: RoomId,
        backend: Arc<dyn ActivityBackend>,
        redirector: Arc<dyn Redirector>,
        tx: mpsc::UnboundedSender<AppEvent>,
    ) -> Self {
        let snackbar = Snackbar::new(Duration::from_millis(config.snackbar_ttl_ms));
        Self {
            sync: FeedSynchronizer::new(backend, tx.clone()),
            config,
            jar,
            room,
            snackbar,
            overlay: Overlay::None,
            redirector,
            tx,
            selected: 0,
            scroll: 0,
            should_quit: false,
        }
    }

    pub fn start(&mut self) {
        self.sync.initialize(&self.room);
    }

    pub fn shutdown(&mut self) {
        self.sync.stop();
    }

    pub fn handle_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::Key(key) => {
                if let Overlay::Webhook(ref mut dialog) = self.overlay {
                    let action = dialog.handle_key(key);
                    self.handle_dialog_action(action);
                    return;
                }
                if matches!(self.overlay, Overlay::Help) {
                    self.overlay = Overlay::None;
                    return;
                }
                self.handle_action(input::map_key(key));
            }
            AppEvent::Click => self.snackbar.close(CloseReason::ClickAway),
            AppEvent::Resize => {}
            AppEvent::Tick => self.snackbar.tick(Instant::now()),
            AppEvent::Snapshot { generation, result } => {
                self.sync.apply_snapshot(generation, result);
                self.clamp_selection();
            }
            AppEvent::Activity { connection, event } => {
                let inserted = self.sync.push_stream_event(connection, event);
                // keep the highlighted event in place while reading further down
                if inserted && self.selected > 0 {
                    self.selected += 1;
                }
                self.clamp_selection();
            }
            AppEvent::StreamClosed { connection, reason } => {
                self.sync.stream_closed(connection, reason);
            }
            AppEvent::WebhookSaved(result) => {
                let current = self.sync.hook_id().cloned();
                let close = webhook_dialog::apply_saved(
                    result,
                    &mut self.sync,
                    current.as_ref(),
                    &mut self.snackbar,
                );
                self.finish_dialog(close);
            }
            AppEvent::WebhookDeleted(result) => {
                let close = webhook_dialog::apply_deleted(result, &mut self.sync, &mut self.snackbar);
                self.finish_dialog(close);
            }
        }
    }

    fn finish_dialog(&mut self, close: bool) {
        if close {
            self.overlay = Overlay::None;
            self.clamp_selection();
        } else if let Overlay::Webhook(ref mut dialog) = self.overlay {
            dialog.busy = false;
        }
    }

    fn handle_action(&mut self, action: Action) {
        match action {
            Action::Quit | Action::ClosePopup => self.should_quit = true,
            Action::ScrollDown => {
                if self.selected + 1 < self.sync.events().len() {
                    self.selected += 1;
                }
            }
            Action::ScrollUp => self.selected = self.selected.saturating_sub(1),
            Action::Top => self.selected = 0,
            Action::Settings => self.open_settings(),
            Action::Refresh => self.sync.refresh(),
            Action::DismissToast => self.snackbar.close(CloseReason::Explicit),
            Action::Help => self.overlay = Overlay::Help,
            Action::None => {}
        }
    }

    fn open_settings(&mut self) {
        let access = gate::request_settings_access(
            &mut self.jar,
            &self.config,
            self.redirector.as_ref(),
            &self.sync,
            self.room.path(),
        );
        match access {
            Ok(SettingsAccess::Open(dialog)) => self.overlay = Overlay::Webhook(dialog),
            Ok(SettingsAccess::Redirected(url)) => self.snackbar.set(
                Severity::Info,
                format!("Grant private repository access at {url}, then reopen settings"),
            ),
            Err(e) => {
                tracing::warn!(error = %e, "scope upgrade redirect failed");
                self.snackbar
                    .set(Severity::Error, format!("Could not start authorization: {e}"));
            }
        }
    }

    fn handle_dialog_action(&mut self, action: DialogAction) {
        match action {
            DialogAction::None => {}
            DialogAction::Close => self.overlay = Overlay::None,
            DialogAction::Save(subscriptions) => {
                let backend = self.sync.backend();
                let room = self.room.clone();
                let tx = self.tx.clone();
                tokio::spawn(async move {
                    let result = backend.save_webhook(&room, &subscriptions).await;
                    let _ = tx.send(AppEvent::WebhookSaved(result));
                });
            }
            DialogAction::Delete(hook_id) => {
                let backend = self.sync.backend();
                let tx = self.tx.clone();
                tokio::spawn(async move {
                    let result = backend.delete_webhook(&hook_id).await;
                    let _ = tx.send(AppEvent::WebhookDeleted(result));
                });
            }
        }
    }

    fn clamp_selection(&mut self) {
        let len = self.sync.events().len();
        self.selected = if len == 0 { 0 } else { self.selected.min(len - 1) };
    }

    pub fn render(&mut self, frame: &mut Frame) {
        let size = frame.area();

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Min(1),
                Constraint::Length(1),
            ])
            .split(size);

        self.ensure_scroll_bounds(chunks[1].height as usize);

        // community rooms mirror an owner, not a repository
        let repo = if self.room.is_community() {
            String::new()
        } else {
            self.room.repo_slug()
        };
        frame.render_widget(
            HeaderBar {
                room: self.room.name(),
                repo: &repo,
                event_count: self.sync.events().len(),
            },
            chunks[0],
        );

        frame.render_widget(
            ActivityPane {
                events: self.sync.events(),
                has_webhook: self.sync.hook_id().is_some(),
                scroll: self.scroll,
                selected: self.selected,
            },
            chunks[1],
        );

        frame.render_widget(
            StatusBar {
                hook_id: self.sync.hook_id(),
                live: self.sync.is_live(),
                subscriptions: self.sync.subscriptions(),
            },
            chunks[2],
        );

        match self.overlay {
            Overlay::Help => frame.render_widget(HelpPanel, size),
            Overlay::Webhook(ref dialog) => frame.render_widget(
                WebhookDialog {
                    state: dialog,
                    room: self.room.name(),
                },
                size,
            ),
            Overlay::None => {}
        }

        if let Some(notification) = self.snackbar.current() {
            frame.render_widget(Toast { notification }, size);
        }
    }

    fn ensure_scroll_bounds(&mut self, visible_height: usize) {
        if visible_height == 0 {
            return;
        }
        if self.selected >= self.scroll + visible_height {
            self.scroll = self.selected - visible_height + 1;
        }
        if self.selected < self.scroll {
            self.scroll = self.selected;
        }
    }
}
