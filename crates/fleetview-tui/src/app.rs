//! Application core: event loop and action dispatch.

use std::sync::Arc;
use std::time::Duration;

use color_eyre::eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    Frame,
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, Paragraph},
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use fleetview_core::{Controller, FilterPatch, FleetSource, OrderedView};

use crate::action::Action;
use crate::component::Component;
use crate::data_bridge::spawn_data_bridge;
use crate::event::{Event, EventReader};
use crate::screens::FleetScreen;
use crate::theme;
use crate::tui::Tui;

/// Top-level application state and event loop.
pub struct App<S: FleetSource> {
    controller: Controller<S>,
    screen: FleetScreen,
    running: bool,
    help_visible: bool,
    /// Locales the label catalog knows, cycled by `l`.
    locales: Vec<String>,
    action_tx: mpsc::UnboundedSender<Action>,
    action_rx: mpsc::UnboundedReceiver<Action>,
    /// Controller-bound actions, applied one at a time in order.
    command_tx: Option<mpsc::UnboundedSender<Action>>,
}

impl<S: FleetSource> App<S> {
    pub fn new(controller: Controller<S>, locales: Vec<String>) -> Self {
        let (action_tx, action_rx) = mpsc::unbounded_channel();
        let screen = FleetScreen::new(Arc::clone(controller.translator()), 24);
        Self {
            controller,
            screen,
            running: true,
            help_visible: false,
            locales,
            action_tx,
            action_rx,
            command_tx: None,
        }
    }

    pub async fn run(&mut self) -> Result<()> {
        let mut tui = Tui::new()?;
        tui.enter()?;
        self.screen.init(self.action_tx.clone())?;
        let (w, h) = tui.size().unwrap_or((80, 24));
        self.action_tx.send(Action::Resize(w, h))?;

        let cancel = CancellationToken::new();
        let bridge = tokio::spawn(spawn_data_bridge(
            self.controller.clone(),
            self.action_tx.clone(),
            cancel.clone(),
        ));
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        self.command_tx = Some(command_tx);
        let worker = tokio::spawn(command_worker(
            self.controller.clone(),
            self.locales.clone(),
            command_rx,
            self.action_tx.clone(),
        ));

        let mut events = EventReader::new(Duration::from_secs(1), Duration::from_millis(33));
        info!("TUI event loop started");

        while self.running {
            let Some(event) = events.next().await else {
                break;
            };
            match event {
                Event::Key(key) => {
                    if let Some(action) = self.handle_key_event(key)? {
                        self.action_tx.send(action)?;
                    }
                }
                Event::Resize(w, h) => self.action_tx.send(Action::Resize(w, h))?,
                Event::Tick => self.action_tx.send(Action::Tick)?,
                Event::Render => self.action_tx.send(Action::Render)?,
            }

            while let Ok(action) = self.action_rx.try_recv() {
                if let Action::Render = action {
                    tui.draw(|frame| self.render(frame))?;
                } else {
                    self.process_action(&action)?;
                }
            }
        }

        events.stop();
        cancel.cancel();
        self.command_tx = None;
        let _ = bridge.await;
        let _ = worker.await;
        info!("TUI event loop ended");
        Ok(())
    }

    fn handle_key_event(&mut self, key: KeyEvent) -> Result<Option<Action>> {
        if self.screen.editing() {
            return self.screen.handle_key_event(key);
        }
        if self.help_visible {
            return Ok(match key.code {
                KeyCode::Esc | KeyCode::Char('?') => Some(Action::ToggleHelp),
                _ => None,
            });
        }
        match (key.modifiers, key.code) {
            (KeyModifiers::CONTROL, KeyCode::Char('c')) | (KeyModifiers::NONE, KeyCode::Char('q')) => {
                Ok(Some(Action::Quit))
            }
            (KeyModifiers::NONE, KeyCode::Char('?')) => Ok(Some(Action::ToggleHelp)),
            (KeyModifiers::NONE, KeyCode::Esc) => Ok(Some(Action::HoverLeave)),
            _ => self.screen.handle_key_event(key),
        }
    }

    fn process_action(&mut self, action: &Action) -> Result<()> {
        match action {
            Action::Quit => self.running = false,
            Action::ToggleHelp => self.help_visible = !self.help_visible,
            Action::SearchInput(_)
            | Action::ApplyFilter(_)
            | Action::Sort(_)
            | Action::ResetFilters
            | Action::BestServers
            | Action::CycleLocale
            | Action::Refresh
            | Action::RowsVisible(_)
            | Action::HoverEnter(_)
            | Action::HoverLeave => {
                if let Some(tx) = &self.command_tx {
                    tx.send(action.clone())?;
                }
            }
            _ => {}
        }

        if let Some(follow_up) = self.screen.update(action)? {
            self.action_tx.send(follow_up)?;
        }
        Ok(())
    }

    fn render(&self, frame: &mut Frame) {
        let area = frame.area();
        self.screen.render(frame, area);
        if self.help_visible {
            Self::render_help_overlay(frame, area);
        }
    }

    fn render_help_overlay(frame: &mut Frame, area: Rect) {
        let width = 56u16.min(area.width.saturating_sub(4));
        let height = 20u16.min(area.height.saturating_sub(4));
        let help_area = Rect::new(
            area.x + area.width.saturating_sub(width) / 2,
            area.y + area.height.saturating_sub(height) / 2,
            width,
            height,
        );
        frame.render_widget(Clear, help_area);

        let block = Block::default()
            .title(" Keyboard Shortcuts ")
            .title_style(theme::title_style())
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(theme::border_focused())
            .style(Style::default().bg(theme::BG_DARK));

        let entry = |key: &'static str, text: &'static str| {
            Line::from(vec![
                Span::styled(format!("  {key:<10}"), theme::key_hint_key()),
                Span::styled(text, theme::key_hint()),
            ])
        };
        let lines = vec![
            Line::from(""),
            entry("j/k ↑/↓", "Move selection (shows details)"),
            entry("Ctrl+d/u", "Page down / up"),
            entry("g/G", "Top / bottom"),
            entry("Enter", "Fetch details again"),
            entry("Esc", "Hide details"),
            Line::from(""),
            entry("/", "Search hostname, IP, region"),
            entry("p", "Next provider"),
            entry("1 2 3 4", "CPU / IO / NIC / congestion limit"),
            entry("c", "Toggle the selected row's country"),
            entry("s / S", "Next sort column / flip direction"),
            entry("b", "Best servers"),
            entry("x", "Reset filters"),
            entry("l", "Next language"),
            entry("r", "Refresh now"),
            entry("q", "Quit"),
        ];
        frame.render_widget(Paragraph::new(lines).block(block), help_area);
    }
}

/// Applies controller-bound actions in arrival order, so keystrokes that
/// change the view land in the order they were typed.
async fn command_worker<S: FleetSource>(
    controller: Controller<S>,
    locales: Vec<String>,
    mut commands: mpsc::UnboundedReceiver<Action>,
    action_tx: mpsc::UnboundedSender<Action>,
) {
    while let Some(command) = commands.recv().await {
        let view: Option<OrderedView> = match command {
            Action::SearchInput(keyword) => Some(controller.apply_filter(FilterPatch::keyword(keyword)).await),
            Action::ApplyFilter(patch) => Some(controller.apply_filter(patch).await),
            Action::Sort(key) => Some(controller.apply_sort(key).await),
            Action::ResetFilters => Some(controller.reset_filters().await),
            Action::BestServers => Some(controller.apply_best_server_preset().await),
            Action::CycleLocale => {
                let current = controller.preferences().await.locale;
                let next = next_locale(&locales, &current);
                Some(controller.set_locale(&next).await)
            }
            Action::Refresh => {
                let controller = controller.clone();
                let action_tx = action_tx.clone();
                tokio::spawn(async move {
                    if let Err(e) = controller.refresh().await {
                        let _ = action_tx.send(Action::Notify(e.to_string()));
                    }
                });
                None
            }
            Action::RowsVisible(ids) => {
                for id in &ids {
                    // Prefetch runs detached; its outcome only warms the cache.
                    drop(controller.on_visible(id));
                }
                None
            }
            Action::HoverEnter(id) => {
                let pending = controller.on_hover_enter(&id);
                let action_tx = action_tx.clone();
                tokio::spawn(async move {
                    match pending.await {
                        Ok(Some(card)) => {
                            let _ = action_tx.send(Action::HoverLoaded(Box::new(card)));
                        }
                        Ok(None) => debug!(node_id = %id, "hover result no longer wanted"),
                        Err(e) => {
                            warn!(error = %e, "detail fetch for hover failed");
                            let _ = action_tx.send(Action::HoverFailed(id));
                        }
                    }
                });
                None
            }
            Action::HoverLeave => {
                controller.on_hover_leave();
                None
            }
            _ => None,
        };
        if let Some(view) = view {
            debug!(rows = view.nodes.len(), patches = view.patches.len(), "view recomputed");
        }
    }
}

/// The locale after `current`, wrapping around.
fn next_locale(locales: &[String], current: &str) -> String {
    let idx = locales.iter().position(|l| l == current);
    idx.and_then(|i| locales.get(i + 1))
        .or_else(|| locales.first())
        .cloned()
        .unwrap_or_else(|| current.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locales_wrap_around() {
        let locales = vec!["en".to_owned(), "ja".to_owned(), "zh-TW".to_owned()];
        assert_eq!(next_locale(&locales, "en"), "ja");
        assert_eq!(next_locale(&locales, "zh-TW"), "en");
        assert_eq!(next_locale(&locales, "fr"), "en");
        assert_eq!(next_locale(&[], "en"), "en");
    }
}
