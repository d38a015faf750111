//! Fleet screen: filter bar, node table and the detail card of the
//! selected row.
//!
//! The selected row stands in for the mouse: moving the selection is a
//! hover, and the rows inside the table viewport are the visible ones.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use color_eyre::eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, Cell, Paragraph, Row, Table, TableState, Wrap};
use tokio::sync::mpsc::UnboundedSender;

use fleetview_core::normalize::parse_metric_value;
use fleetview_core::{
    BrandFilter, Ceiling, FilterPatch, HoverCard, MetricChannel, NodeId, SortDirection, SortKey,
    TableSource, Translator, ViewState,
};

use crate::action::Action;
use crate::component::Component;
use crate::theme;
use crate::widgets::age::fmt_age;

/// Lines around the table body: filter bar, table borders and header,
/// key hints and status bar.
const CHROME_ROWS: u16 = 7;

/// Order `s` walks the sort keys in.
const SORT_ORDER: [SortKey; 9] = [
    SortKey::Region,
    SortKey::Provider,
    SortKey::Ip,
    SortKey::Id,
    SortKey::CpuLoad,
    SortKey::IoWait,
    SortKey::NicError,
    SortKey::Network,
    SortKey::Congestion,
];

/// Ceiling presets the `1`-`4` keys cycle through.
const CEILING_PRESETS: [Ceiling; 5] = [
    Ceiling::Inactive,
    Ceiling::Max(0.0),
    Ceiling::Max(1.0),
    Ceiling::Max(5.0),
    Ceiling::Max(20.0),
];

#[derive(Debug, Clone, PartialEq)]
enum HoverPanel {
    Hidden,
    Fetching(NodeId),
    Loaded(Box<HoverCard>),
    Failed(NodeId),
}

pub struct FleetScreen {
    action_tx: Option<UnboundedSender<Action>>,
    translator: Arc<dyn Translator>,
    view: Arc<ViewState>,
    selected: usize,
    offset: usize,
    page_rows: usize,
    /// Keyword being typed; `None` when the search box is closed.
    search: Option<String>,
    hover: HoverPanel,
    hovered: Option<NodeId>,
    notice: Option<String>,
    now: DateTime<Utc>,
}

impl FleetScreen {
    pub fn new(translator: Arc<dyn Translator>, height: u16) -> Self {
        Self {
            action_tx: None,
            translator,
            view: Arc::new(ViewState::default()),
            selected: 0,
            offset: 0,
            page_rows: usize::from(height.saturating_sub(CHROME_ROWS).max(1)),
            search: None,
            hover: HoverPanel::Hidden,
            hovered: None,
            notice: None,
            now: Utc::now(),
        }
    }

    fn t(&self, path: &str) -> String {
        self.translator.t(&self.view.prefs.locale, path, &[])
    }

    fn send(&self, action: Action) {
        if let Some(tx) = &self.action_tx {
            let _ = tx.send(action);
        }
    }

    fn selected_id(&self) -> Option<&NodeId> {
        self.view.rows.get(self.selected).map(|r| r.node_id())
    }

    fn visible_ids(&self) -> Vec<NodeId> {
        self.view
            .rows
            .iter()
            .skip(self.offset)
            .take(self.page_rows)
            .map(|r| r.node_id().clone())
            .collect()
    }

    fn select(&mut self, idx: usize) {
        let len = self.view.rows.len();
        self.selected = if len == 0 { 0 } else { idx.min(len - 1) };
        if self.selected < self.offset {
            self.offset = self.selected;
        } else if self.selected >= self.offset + self.page_rows {
            self.offset = self.selected + 1 - self.page_rows;
        }
        self.offset = self.offset.min(len.saturating_sub(self.page_rows));
    }

    fn move_selection(&mut self, delta: isize) {
        self.select(self.selected.saturating_add_signed(delta));
        self.sync_viewport();
    }

    /// Report visible rows and move the hover to the selected row.
    fn sync_viewport(&mut self) {
        let visible = self.visible_ids();
        if !visible.is_empty() {
            self.send(Action::RowsVisible(visible));
        }

        let selected = self.selected_id().cloned();
        if selected == self.hovered {
            return;
        }
        match selected {
            Some(id) => {
                self.hover = HoverPanel::Fetching(id.clone());
                self.hovered = Some(id.clone());
                self.send(Action::HoverEnter(id));
            }
            None => {
                self.hover = HoverPanel::Hidden;
                self.hovered = None;
                self.send(Action::HoverLeave);
            }
        }
    }

    fn apply_view(&mut self, view: Arc<ViewState>) {
        let keep = self
            .hovered
            .as_ref()
            .and_then(|id| view.rows.iter().position(|r| r.node_id() == id));
        self.view = view;
        self.select(keep.unwrap_or(self.selected));
        self.sync_viewport();
    }

    fn next_brand(&self) -> BrandFilter {
        let current = &self.view.prefs.filter.brand;
        let brands = &self.view.brands;
        let next = match current {
            BrandFilter::All => brands.first(),
            BrandFilter::Brand(b) => brands
                .iter()
                .position(|x| x == b)
                .and_then(|i| brands.get(i + 1)),
        };
        next.map_or(BrandFilter::All, |b| BrandFilter::Brand(b.clone()))
    }

    fn next_ceiling(&self, channel: MetricChannel) -> Ceiling {
        let current = self.view.prefs.filter.ceilings.get(channel);
        let idx = CEILING_PRESETS.iter().position(|c| *c == current);
        idx.and_then(|i| CEILING_PRESETS.get(i + 1))
            .copied()
            .unwrap_or(Ceiling::Inactive)
    }

    fn toggle_country(&self) -> Option<BTreeSet<String>> {
        let code = self.view.rows.get(self.selected)?.content().country_code.clone();
        let mut countries = self.view.prefs.filter.countries.clone();
        if !countries.remove(&code) {
            countries.insert(code);
        }
        Some(countries)
    }

    fn next_sort_key(&self) -> SortKey {
        let current = self.view.prefs.sort.key;
        let idx = SORT_ORDER.iter().position(|k| *k == current).unwrap_or(0);
        SORT_ORDER[(idx + 1) % SORT_ORDER.len()]
    }

    fn handle_search_key(&mut self, key: KeyEvent) -> Option<Action> {
        let query = self.search.as_mut()?;
        match key.code {
            KeyCode::Esc | KeyCode::Enter => {
                self.search = None;
                Some(Action::CloseSearch)
            }
            KeyCode::Backspace => {
                query.pop();
                Some(Action::SearchInput(query.clone()))
            }
            KeyCode::Char(c) => {
                query.push(c);
                Some(Action::SearchInput(query.clone()))
            }
            _ => None,
        }
    }

    // ── Rendering ────────────────────────────────────────────────

    fn render_filter_bar(&self, frame: &mut Frame, area: Rect) {
        let filter = &self.view.prefs.filter;
        let chip = |active: bool| if active { theme::filter_active() } else { theme::key_hint() };
        let mut spans = vec![Span::raw(" ")];

        let brand = match &filter.brand {
            BrandFilter::All => self.t("provider.all"),
            BrandFilter::Brand(b) => b.clone(),
        };
        spans.push(Span::styled(
            format!("{}: {brand}  ", self.t("provider.filterLabel")),
            chip(filter.brand != BrandFilter::All),
        ));

        let keyword = self.search.as_deref().unwrap_or(&filter.keyword);
        let cursor = if self.search.is_some() { "▏" } else { "" };
        spans.push(Span::styled(
            format!("{}: {keyword}{cursor}  ", self.t("search.label")),
            chip(!keyword.is_empty() || self.search.is_some()),
        ));

        for (channel, label) in [
            (MetricChannel::CpuLoad, "load.cpu"),
            (MetricChannel::IoWait, "load.io"),
            (MetricChannel::NicError, "load.nic"),
            (MetricChannel::Congestion, "load.congestion"),
        ] {
            let bound = match filter.ceilings.get(channel) {
                Ceiling::Inactive => self.t("load.any"),
                Ceiling::Max(v) => format!("≤{v}"),
            };
            spans.push(Span::styled(
                format!("{} {bound}  ", self.t(label)),
                chip(filter.ceilings.get(channel).is_active()),
            ));
        }

        let countries = if filter.countries.is_empty() {
            self.t("country.all")
        } else {
            let count = filter.countries.len().to_string();
            self.translator
                .t(&self.view.prefs.locale, "country.selected", &[("count", &count)])
        };
        spans.push(Span::styled(format!("{countries}  "), chip(!filter.countries.is_empty())));

        if self.view.best_server {
            spans.push(Span::styled(self.t("buttons.best"), theme::filter_active()));
        }
        frame.render_widget(Paragraph::new(Line::from(spans)), area);
    }

    fn header_cell(&self, key: SortKey) -> Cell<'static> {
        let label = self.t(&format!("table.headers.{key}"));
        let sort = self.view.prefs.sort;
        if sort.key == key {
            let arrow = match sort.direction {
                SortDirection::Asc => "▲",
                SortDirection::Desc => "▼",
            };
            Cell::from(format!("{label} {arrow}")).style(theme::table_header_sorted())
        } else {
            Cell::from(label).style(theme::table_header())
        }
    }

    fn render_table(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default()
            .title(" fleetview ")
            .title_style(theme::title_style())
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(if self.search.is_some() {
                theme::border_default()
            } else {
                theme::border_focused()
            });

        if let Some(message) = &self.view.placeholder {
            let inner = block.inner(area);
            frame.render_widget(block, area);
            frame.render_widget(
                Paragraph::new(Line::from(Span::styled(message.as_str(), theme::table_row()))).centered(),
                inner,
            );
            return;
        }

        let header = Row::new(SORT_ORDER.iter().map(|k| self.header_cell(*k)).collect::<Vec<_>>());
        let rows: Vec<Row> = self
            .view
            .rows
            .iter()
            .map(|row| {
                let content = row.content();
                let mut cells = vec![
                    Cell::from(content.region.clone()).style(Style::default().fg(theme::NEON_CYAN)),
                    Cell::from(content.provider.clone()),
                    Cell::from(content.ip.clone()).style(Style::default().fg(theme::CORAL)),
                    Cell::from(row.node_id().to_string()),
                ];
                for text in &content.metrics {
                    let color = theme::load_color(parse_metric_value(text));
                    cells.push(Cell::from(text.clone()).style(Style::default().fg(color)));
                }
                Row::new(cells).style(theme::table_row())
            })
            .collect();

        let widths = [
            Constraint::Fill(3),
            Constraint::Fill(2),
            Constraint::Length(16),
            Constraint::Length(8),
            Constraint::Length(8),
            Constraint::Length(10),
            Constraint::Length(11),
            Constraint::Length(13),
            Constraint::Length(12),
        ];
        let table = Table::new(rows, widths)
            .header(header)
            .block(block)
            .row_highlight_style(theme::table_selected());

        let mut state = TableState::default()
            .with_offset(self.offset)
            .with_selected(Some(self.selected));
        frame.render_stateful_widget(table, area, &mut state);
    }

    fn render_hover(&self, frame: &mut Frame, area: Rect) {
        let (title, lines) = match &self.hover {
            HoverPanel::Hidden => return,
            HoverPanel::Fetching(id) => (format!(" {id} "), vec![Line::from(self.t("hover.fetching"))]),
            HoverPanel::Failed(id) => (
                format!(" {id} "),
                vec![
                    Line::from(Span::styled(self.t("hover.fetchFailed"), Style::default().fg(theme::ERROR_RED))),
                    Line::from(Span::styled(self.t("hover.retryLater"), theme::key_hint())),
                ],
            ),
            HoverPanel::Loaded(card) => {
                let lines = if card.rows.is_empty() {
                    vec![Line::from(self.t("hover.noDetails"))]
                } else {
                    card.rows
                        .iter()
                        .map(|r| {
                            Line::from(vec![
                                Span::styled(format!("  {:<18}", r.label), Style::default().fg(theme::DIM_WHITE)),
                                Span::styled(r.value.replace('\n', " · "), Style::default().fg(theme::NEON_CYAN)),
                            ])
                        })
                        .collect()
                };
                (format!(" {} · {} ", card.node.hostname(), card.node.id()), lines)
            }
        };

        let block = Block::default()
            .title(title)
            .title_style(theme::title_style())
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(theme::border_default());
        frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }).block(block), area);
    }

    fn render_status(&self, frame: &mut Frame, area: Rect) {
        let locale = &self.view.prefs.locale;
        let shown = self.view.rows.len().to_string();
        let total = self.view.total.to_string();
        let mut spans = vec![
            Span::raw(" "),
            Span::styled(
                self.translator
                    .t(locale, "status.count", &[("shown", &shown), ("total", &total)]),
                theme::key_hint_key(),
            ),
        ];
        if let (Some(as_of), Some(source)) = (self.view.as_of, self.view.source) {
            let age = fmt_age(as_of, self.now);
            let (path, color) = match source {
                TableSource::Cache => ("status.cached", theme::ELECTRIC_YELLOW),
                TableSource::Live => ("status.live", theme::SUCCESS_GREEN),
            };
            spans.push(Span::styled(
                format!("  ● {}", self.translator.t(locale, path, &[("age", &age)])),
                Style::default().fg(color),
            ));
        }
        if let Some(notice) = &self.notice {
            spans.push(Span::styled(format!("  │ {notice}"), Style::default().fg(theme::ERROR_RED)));
        }
        frame.render_widget(Paragraph::new(Line::from(spans)), area);
    }

    fn render_hints(frame: &mut Frame, area: Rect) {
        let hints = [
            ("j/k", "move"),
            ("/", "search"),
            ("p", "provider"),
            ("1-4", "limits"),
            ("c", "country"),
            ("s/S", "sort"),
            ("b", "best"),
            ("x", "reset"),
            ("l", "lang"),
            ("r", "refresh"),
            ("?", "help"),
        ];
        let mut spans = vec![Span::raw(" ")];
        for (key, label) in hints {
            spans.push(Span::styled(format!("{key} "), theme::key_hint_key()));
            spans.push(Span::styled(format!("{label}  "), theme::key_hint()));
        }
        frame.render_widget(Paragraph::new(Line::from(spans)), area);
    }
}

impl Component for FleetScreen {
    fn init(&mut self, action_tx: UnboundedSender<Action>) -> Result<()> {
        self.action_tx = Some(action_tx);
        Ok(())
    }

    fn handle_key_event(&mut self, key: KeyEvent) -> Result<Option<Action>> {
        if self.search.is_some() {
            return Ok(self.handle_search_key(key));
        }

        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        #[allow(clippy::cast_possible_wrap, clippy::as_conversions)]
        let page = self.page_rows as isize;

        let action = match key.code {
            KeyCode::Char('j') | KeyCode::Down => {
                self.move_selection(1);
                None
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.move_selection(-1);
                None
            }
            KeyCode::Char('d') if ctrl => {
                self.move_selection(page);
                None
            }
            KeyCode::PageDown => {
                self.move_selection(page);
                None
            }
            KeyCode::Char('u') if ctrl => {
                self.move_selection(-page);
                None
            }
            KeyCode::PageUp => {
                self.move_selection(-page);
                None
            }
            KeyCode::Char('g') | KeyCode::Home => {
                self.select(0);
                self.sync_viewport();
                None
            }
            KeyCode::Char('G') | KeyCode::End => {
                self.select(usize::MAX);
                self.sync_viewport();
                None
            }
            KeyCode::Char('/') => {
                self.search = Some(self.view.prefs.filter.keyword.clone());
                Some(Action::OpenSearch)
            }
            KeyCode::Char('p') => Some(Action::ApplyFilter(FilterPatch::brand(self.next_brand()))),
            KeyCode::Char(c @ '1'..='4') => {
                let channel = match c {
                    '1' => MetricChannel::CpuLoad,
                    '2' => MetricChannel::IoWait,
                    '3' => MetricChannel::NicError,
                    _ => MetricChannel::Congestion,
                };
                Some(Action::ApplyFilter(FilterPatch::ceiling(channel, self.next_ceiling(channel))))
            }
            KeyCode::Char('c') => self
                .toggle_country()
                .map(|set| Action::ApplyFilter(FilterPatch::countries(set))),
            KeyCode::Char('s') => Some(Action::Sort(self.next_sort_key())),
            KeyCode::Char('S') => Some(Action::Sort(self.view.prefs.sort.key)),
            KeyCode::Char('b') => Some(Action::BestServers),
            KeyCode::Char('x') => Some(Action::ResetFilters),
            KeyCode::Char('l') => Some(Action::CycleLocale),
            KeyCode::Char('r') => Some(Action::Refresh),
            KeyCode::Enter => {
                // Ask again, e.g. after a failed fetch.
                self.hovered = None;
                self.sync_viewport();
                None
            }
            _ => None,
        };
        Ok(action)
    }

    fn update(&mut self, action: &Action) -> Result<Option<Action>> {
        match action {
            Action::ViewUpdated(view) => self.apply_view(Arc::clone(view)),
            Action::HoverLoaded(card) => {
                if self.hovered.as_ref() == Some(card.node.id()) {
                    self.hover = HoverPanel::Loaded(card.clone());
                }
            }
            Action::HoverFailed(id) => {
                if self.hovered.as_ref() == Some(id) {
                    self.hover = HoverPanel::Failed(id.clone());
                }
            }
            Action::Resize(_, h) => {
                self.page_rows = usize::from(h.saturating_sub(CHROME_ROWS).max(1));
                self.select(self.selected);
                self.sync_viewport();
            }
            Action::HoverLeave => self.hover = HoverPanel::Hidden,
            Action::Tick => self.now = Utc::now(),
            Action::Notify(message) => self.notice = Some(message.clone()),
            Action::Refresh => self.notice = None,
            _ => {}
        }
        Ok(None)
    }

    fn render(&self, frame: &mut Frame, area: Rect) {
        let hover_height = if self.hover == HoverPanel::Hidden { 0 } else { 12 };
        let layout = Layout::vertical([
            Constraint::Length(1),
            Constraint::Min(3),
            Constraint::Length(hover_height),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(area);

        self.render_filter_bar(frame, layout[0]);
        self.render_table(frame, layout[1]);
        self.render_hover(frame, layout[2]);
        Self::render_hints(frame, layout[3]);
        self.render_status(frame, layout[4]);
    }

    fn editing(&self) -> bool {
        self.search.is_some()
    }
}
