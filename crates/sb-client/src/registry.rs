//! Server registry
//!
//! The registry is a projection of the last `server_list` snapshot plus the
//! `server_status_update` patches that followed it, in arrival order. It
//! never errors on unknown ids.

use sb_protocol::{Server, ServerId};

/// Table of known servers plus the current selection
#[derive(Debug, Default, Clone)]
pub struct ServerRegistry {
    /// Servers in snapshot order
    servers: Vec<Server>,
    selected: Option<ServerId>,
}

impl ServerRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the table with a fresh snapshot.
    ///
    /// A selection that no longer exists is cleared; then, if nothing is
    /// selected, the first server becomes selected.
    pub fn apply_snapshot(&mut self, servers: Vec<Server>) {
        self.servers = servers;

        if let Some(id) = self.selected {
            if !self.contains(id) {
                tracing::debug!(server_id = %id, "Selected server left the snapshot");
                self.selected = None;
            }
        }
        if self.selected.is_none() {
            self.selected = self.servers.first().map(|s| s.id);
        }
    }

    /// Update one server's status. Returns `false` for an unknown id.
    pub fn apply_status_patch(&mut self, id: ServerId, status: bool) -> bool {
        match self.servers.iter_mut().find(|s| s.id == id) {
            Some(server) => {
                if server.status != status {
                    tracing::info!(
                        server_id = %id,
                        "Server {} {}",
                        server.name,
                        if status { "connected" } else { "disconnected" }
                    );
                }
                server.status = status;
                true
            }
            None => {
                tracing::debug!(server_id = %id, "Status patch for unknown server ignored");
                false
            }
        }
    }

    /// Insert or replace a server after an acknowledged create or update
    pub fn upsert(&mut self, server: Server) {
        match self.servers.iter_mut().find(|s| s.id == server.id) {
            Some(existing) => *existing = server,
            None => self.servers.push(server),
        }
        if self.selected.is_none() {
            self.selected = self.servers.first().map(|s| s.id);
        }
    }

    /// Drop a server after an acknowledged delete
    pub fn remove(&mut self, id: ServerId) -> Option<Server> {
        let index = self.servers.iter().position(|s| s.id == id)?;
        let removed = self.servers.remove(index);
        if self.selected == Some(id) {
            self.selected = self.servers.first().map(|s| s.id);
        }
        Some(removed)
    }

    /// Select a server. Unknown ids leave the selection unchanged.
    pub fn select(&mut self, id: ServerId) -> bool {
        if self.contains(id) {
            self.selected = Some(id);
            true
        } else {
            false
        }
    }

    pub fn get(&self, id: ServerId) -> Option<&Server> {
        self.servers.iter().find(|s| s.id == id)
    }

    pub fn contains(&self, id: ServerId) -> bool {
        self.get(id).is_some()
    }

    pub fn list(&self) -> &[Server] {
        &self.servers
    }

    pub fn selected(&self) -> Option<ServerId> {
        self.selected
    }

    /// Whether the server is known and connected
    pub fn is_connected(&self, id: ServerId) -> bool {
        self.get(id).map(|s| s.status).unwrap_or(false)
    }

    /// Ids of connected servers, in table order
    pub fn connected_ids(&self) -> Vec<ServerId> {
        self.servers
            .iter()
            .filter(|s| s.status)
            .map(|s| s.id)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.servers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sb_protocol::ServerType;

    fn server(id: u64, status: bool) -> Server {
        Server {
            id: ServerId(id),
            name: format!("srv-{}", id),
            host: "localhost".to_string(),
            port: 8080,
            server_type: ServerType::Api,
            api_key: None,
            status,
        }
    }

    #[test]
    fn test_snapshot_selects_first_when_nothing_selected() {
        let mut registry = ServerRegistry::new();
        registry.apply_snapshot(vec![server(4, false), server(2, true)]);
        assert_eq!(registry.selected(), Some(ServerId(4)));
    }

    #[test]
    fn test_snapshot_keeps_existing_selection() {
        let mut registry = ServerRegistry::new();
        registry.apply_snapshot(vec![server(1, false), server(2, false)]);
        assert!(registry.select(ServerId(2)));
        registry.apply_snapshot(vec![server(1, true), server(2, true)]);
        assert_eq!(registry.selected(), Some(ServerId(2)));
    }

    #[test]
    fn test_snapshot_clears_vanished_selection() {
        let mut registry = ServerRegistry::new();
        registry.apply_snapshot(vec![server(1, false), server(2, false)]);
        registry.select(ServerId(2));
        registry.apply_snapshot(vec![server(3, false)]);
        assert_eq!(registry.selected(), Some(ServerId(3)));

        registry.apply_snapshot(Vec::new());
        assert_eq!(registry.selected(), None);
    }

    #[test]
    fn test_patches_apply_in_order() {
        let mut registry = ServerRegistry::new();
        registry.apply_snapshot(vec![server(1, false), server(2, false)]);

        assert!(registry.apply_status_patch(ServerId(1), true));
        assert!(registry.apply_status_patch(ServerId(2), true));
        assert!(registry.apply_status_patch(ServerId(1), false));

        assert!(!registry.is_connected(ServerId(1)));
        assert!(registry.is_connected(ServerId(2)));
        assert_eq!(registry.connected_ids(), vec![ServerId(2)]);
    }

    #[test]
    fn test_patch_for_unknown_id_is_noop() {
        let mut registry = ServerRegistry::new();
        registry.apply_snapshot(vec![server(1, false)]);
        let before = registry.list().to_vec();

        assert!(!registry.apply_status_patch(ServerId(99), true));
        assert_eq!(registry.list(), before.as_slice());
    }

    #[test]
    fn test_select_unknown_id_keeps_selection() {
        let mut registry = ServerRegistry::new();
        registry.apply_snapshot(vec![server(1, false)]);
        assert!(!registry.select(ServerId(7)));
        assert_eq!(registry.selected(), Some(ServerId(1)));
    }

    #[test]
    fn test_upsert_and_remove() {
        let mut registry = ServerRegistry::new();
        registry.upsert(server(1, false));
        registry.upsert(server(2, false));

        let mut renamed = server(1, false);
        renamed.name = "renamed".to_string();
        registry.upsert(renamed);

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get(ServerId(1)).unwrap().name, "renamed");

        assert!(registry.remove(ServerId(1)).is_some());
        assert_eq!(registry.selected(), Some(ServerId(2)));
        assert!(registry.remove(ServerId(1)).is_none());
    }
}
