// ── Lazily loaded per-node detail ──
//
// `DetailCache` deduplicates fetches, `VisibilityScheduler` prefetches when
// a row first scrolls into view, `HoverGuard` drops results for rows the
// user has already left, and `card` lays a record out for display.

pub(crate) mod cache;
mod card;
mod hover;
mod visibility;

pub use cache::DetailCache;
pub use card::{DetailRow, HoverCard, detail_rows};
pub use hover::{HoverGuard, HoverTicket};
pub use visibility::{RowObserver, SubscriptionId, SubscriptionState, VisibilityScheduler};
