//! All possible UI actions. Actions are the sole mechanism for state mutation.

use std::fmt;
use std::sync::Arc;

use fleetview_core::{FilterPatch, HoverCard, NodeId, SortKey, ViewState};

#[derive(Clone)]
pub enum Action {
    // ── Lifecycle ───────────────────────────────────────────────
    Quit,
    Tick,
    Render,
    Resize(u16, u16),
    ToggleHelp,

    // ── Data ────────────────────────────────────────────────────
    /// The controller published a new view.
    ViewUpdated(Arc<ViewState>),
    Refresh,

    // ── View preferences ────────────────────────────────────────
    OpenSearch,
    /// Live keyword while the search box is open.
    SearchInput(String),
    CloseSearch,
    ApplyFilter(FilterPatch),
    Sort(SortKey),
    ResetFilters,
    BestServers,
    CycleLocale,

    // ── Detail ──────────────────────────────────────────────────
    /// Rows currently inside the table viewport.
    RowsVisible(Vec<NodeId>),
    HoverEnter(NodeId),
    HoverLeave,
    HoverLoaded(Box<HoverCard>),
    HoverFailed(NodeId),

    /// One-line message for the status bar.
    Notify(String),
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Quit => write!(f, "Quit"),
            Self::Tick => write!(f, "Tick"),
            Self::Render => write!(f, "Render"),
            Self::Resize(w, h) => write!(f, "Resize({w}, {h})"),
            Self::ToggleHelp => write!(f, "ToggleHelp"),
            Self::ViewUpdated(v) => write!(f, "ViewUpdated(rev {}, {} rows)", v.revision, v.rows.len()),
            Self::Refresh => write!(f, "Refresh"),
            Self::OpenSearch => write!(f, "OpenSearch"),
            Self::SearchInput(q) => write!(f, "SearchInput({q:?})"),
            Self::CloseSearch => write!(f, "CloseSearch"),
            Self::ApplyFilter(p) => write!(f, "ApplyFilter({p:?})"),
            Self::Sort(k) => write!(f, "Sort({k})"),
            Self::ResetFilters => write!(f, "ResetFilters"),
            Self::BestServers => write!(f, "BestServers"),
            Self::CycleLocale => write!(f, "CycleLocale"),
            Self::RowsVisible(ids) => write!(f, "RowsVisible({} rows)", ids.len()),
            Self::HoverEnter(id) => write!(f, "HoverEnter({id})"),
            Self::HoverLeave => write!(f, "HoverLeave"),
            Self::HoverLoaded(card) => write!(f, "HoverLoaded({})", card.node.id()),
            Self::HoverFailed(id) => write!(f, "HoverFailed({id})"),
            Self::Notify(msg) => write!(f, "Notify({msg})"),
        }
    }
}
