//! Session Projection
//!
//! Follows one gateway's auth-state notifications and publishes the merged
//! principal + profile view. One projection runs per page session.

use std::sync::{Arc, Mutex};

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use crate::domain::entity::{principal::Principal, session_view::SessionView};
use crate::domain::gateway::IdentityGateway;
use crate::domain::repository::ProfileRepository;

type RefreshAck = oneshot::Sender<Option<SessionView>>;

/// Handle to a running projection task
pub struct SessionProjection {
    view: watch::Receiver<Option<SessionView>>,
    refresh_tx: mpsc::Sender<RefreshAck>,
    /// Taken by the first `shutdown()`
    stop: Mutex<Option<(oneshot::Sender<()>, JoinHandle<()>)>>,
}

impl SessionProjection {
    /// Subscribe to `gateway` and start projecting. The gateway's current
    /// state is projected before any change is awaited.
    pub fn start<G, P>(gateway: &G, profiles: Arc<P>) -> Self
    where
        G: IdentityGateway,
        P: ProfileRepository + Send + Sync + 'static,
    {
        let auth = gateway.subscribe();
        let (view_tx, view) = watch::channel(None);
        let (refresh_tx, refresh_rx) = mpsc::channel(8);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let task = tokio::spawn(run(auth, profiles, view_tx, refresh_rx, shutdown_rx));

        Self {
            view,
            refresh_tx,
            stop: Mutex::new(Some((shutdown_tx, task))),
        }
    }

    /// Last published view
    pub fn current(&self) -> Option<SessionView> {
        self.view.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<SessionView>> {
        self.view.clone()
    }

    /// Re-project the gateway's current principal and return the result.
    /// Used once a profile has been written.
    pub async fn refresh(&self) -> Option<SessionView> {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.refresh_tx.send(ack_tx).await.is_err() {
            return self.current();
        }
        match ack_rx.await {
            Ok(view) => view,
            Err(_) => self.current(),
        }
    }

    /// Stop following the gateway and wait for the task to end.
    /// Later calls return immediately.
    pub async fn shutdown(&self) {
        let stop = match self.stop.lock() {
            Ok(mut stop) => stop.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        let Some((shutdown_tx, task)) = stop else {
            return;
        };

        let _ = shutdown_tx.send(());
        if let Err(e) = task.await {
            tracing::error!(error = %e, "Session projection task failed");
        }
    }
}

async fn run<P>(
    mut auth: watch::Receiver<Option<Principal>>,
    profiles: Arc<P>,
    view_tx: watch::Sender<Option<SessionView>>,
    mut refresh_rx: mpsc::Receiver<RefreshAck>,
    mut shutdown_rx: oneshot::Receiver<()>,
) where
    P: ProfileRepository + Send + Sync + 'static,
{
    let initial = auth.borrow_and_update().clone();
    project(profiles.as_ref(), initial.as_ref(), &view_tx).await;

    loop {
        tokio::select! {
            // Also fires when the handle is dropped
            _ = &mut shutdown_rx => break,
            changed = auth.changed() => {
                if changed.is_err() {
                    tracing::debug!("Identity gateway dropped, projection ends");
                    break;
                }
                let principal = auth.borrow_and_update().clone();
                project(profiles.as_ref(), principal.as_ref(), &view_tx).await;
            }
            Some(ack) = refresh_rx.recv() => {
                let principal = auth.borrow_and_update().clone();
                project(profiles.as_ref(), principal.as_ref(), &view_tx).await;
                let _ = ack.send(view_tx.borrow().clone());
            }
        }
    }
}

async fn project<P>(
    profiles: &P,
    principal: Option<&Principal>,
    view_tx: &watch::Sender<Option<SessionView>>,
) where
    P: ProfileRepository,
{
    let Some(principal) = principal else {
        view_tx.send_replace(None);
        return;
    };

    match profiles.find_by_principal(&principal.id).await {
        Ok(profile) => {
            if profile.is_none() {
                tracing::warn!(
                    principal_id = %principal.id,
                    "Signed in without a profile, showing placeholder code"
                );
            }
            view_tx.send_replace(Some(SessionView::merge(principal, profile.as_ref())));
        }
        Err(e) => {
            // Previous view stays published
            tracing::error!(
                principal_id = %principal.id,
                error = %e,
                "Failed to load profile"
            );
        }
    }
}
