// session-server/src/directory.rs
use actix::Addr;
use dashmap::DashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::actors::flow_actor::SignatureFlowActor;

/// Live sessions, one per connected browser
#[derive(Clone, Default)]
pub struct SessionDirectory {
    sessions: Arc<DashMap<Uuid, Addr<SignatureFlowActor>>>,
}

impl SessionDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, client_id: Uuid, addr: Addr<SignatureFlowActor>) {
        self.sessions.insert(client_id, addr);
        tracing::info!("Session registered: {} ({} live)", client_id, self.sessions.len());
    }

    pub fn remove(&self, client_id: &Uuid) -> bool {
        let removed = self.sessions.remove(client_id).is_some();
        if removed {
            tracing::info!("Session removed: {}", client_id);
        }
        removed
    }

    pub fn get(&self, client_id: &Uuid) -> Option<Addr<SignatureFlowActor>> {
        self.sessions.get(client_id).map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
