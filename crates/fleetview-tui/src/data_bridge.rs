//! Data bridge: connects the [`Controller`] view channel to TUI actions.
//!
//! Runs as a background task: bootstraps the controller, then forwards
//! every published view as an [`Action`] until cancelled.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use fleetview_core::{Controller, FleetSource};

use crate::action::Action;

pub async fn spawn_data_bridge<S: FleetSource>(
    controller: Controller<S>,
    action_tx: mpsc::UnboundedSender<Action>,
    cancel: CancellationToken,
) {
    let mut views = controller.subscribe_view();
    let _ = action_tx.send(Action::ViewUpdated(views.borrow_and_update().clone()));

    // Bootstrap may wait on the network when there is no cached snapshot;
    // views published meanwhile (the loading placeholder) still flow.
    let boot = {
        let controller = controller.clone();
        let action_tx = action_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = controller.bootstrap().await {
                warn!(error = %e, "bootstrap failed");
                let _ = action_tx.send(Action::Notify(e.to_string()));
            }
        })
    };

    loop {
        tokio::select! {
            biased;

            () = cancel.cancelled() => break,

            Ok(()) = views.changed() => {
                let view = views.borrow_and_update().clone();
                debug!(revision = view.revision, rows = view.rows.len(), "dispatching ViewUpdated");
                let _ = action_tx.send(Action::ViewUpdated(view));
            }
        }
    }

    boot.abort();
    controller.shutdown().await;
    debug!("data bridge shut down");
}
