use std::sync::atomic::{AtomicU64, Ordering};

use crate::model::NodeId;

/// Proof that a hover began; checked before applying its async result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HoverTicket {
    epoch: u64,
    node: NodeId,
}

impl HoverTicket {
    pub fn node(&self) -> &NodeId {
        &self.node
    }
}

/// Epoch counter for the hovered/focused row.
///
/// Every enter or leave bumps the epoch, so a ticket is current only until
/// the pointer (or selection) moves on.
#[derive(Debug, Default)]
pub struct HoverGuard {
    epoch: AtomicU64,
}

impl HoverGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&self, node: &NodeId) -> HoverTicket {
        let epoch = self.epoch.fetch_add(1, Ordering::AcqRel) + 1;
        HoverTicket {
            epoch,
            node: node.clone(),
        }
    }

    pub fn leave(&self) {
        self.epoch.fetch_add(1, Ordering::AcqRel);
    }

    pub fn is_current(&self, ticket: &HoverTicket) -> bool {
        self.epoch.load(Ordering::Acquire) == ticket.epoch
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newer_hover_invalidates_older_ticket() {
        let guard = HoverGuard::new();
        let first = guard.begin(&NodeId::from("1"));
        assert!(guard.is_current(&first));

        let second = guard.begin(&NodeId::from("2"));
        assert!(!guard.is_current(&first));
        assert!(guard.is_current(&second));

        guard.leave();
        assert!(!guard.is_current(&second));
    }

    #[test]
    fn re_entering_same_row_needs_new_ticket() {
        let guard = HoverGuard::new();
        let first = guard.begin(&NodeId::from("1"));
        let again = guard.begin(&NodeId::from("1"));
        assert!(!guard.is_current(&first));
        assert!(guard.is_current(&again));
        assert_eq!(again.node().as_str(), "1");
    }
}
