//! In-memory prefix index over the enabled services.
//!
//! The index is rebuilt wholesale from a store snapshot after every admin
//! mutation and swapped in atomically (the holder is an
//! `Arc<ArcSwap<RuntimeIndex>>`), so readers never observe a partial rebuild
//! and never block each other.
use std::collections::HashMap;

use crate::core::model::Service;

/// Immutable longest-prefix routing table.
///
/// Holds only enabled services. `order` keeps prefixes sorted by length
/// descending so the first string-prefix hit is the longest match.
#[derive(Debug, Default)]
pub struct RuntimeIndex {
    by_prefix: HashMap<String, Service>,
    order: Vec<String>,
}

impl RuntimeIndex {
    /// Build an index from an enabled-only snapshot. Disabled services in the
    /// input are skipped.
    pub fn from_snapshot(services: Vec<Service>) -> Self {
        let mut by_prefix = HashMap::new();
        for svc in services {
            if svc.enabled {
                by_prefix.insert(svc.public_prefix.clone(), svc);
            }
        }
        let mut order: Vec<String> = by_prefix.keys().cloned().collect();
        order.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        Self { by_prefix, order }
    }

    /// Find the service whose registered prefix is the longest string prefix
    /// of `path`. Returns the service and the remainder (always `/`-rooted).
    pub fn match_path(&self, path: &str) -> Option<(&Service, String)> {
        for prefix in &self.order {
            if let Some(rest) = path.strip_prefix(prefix.as_str()) {
                let remainder = if rest.starts_with('/') {
                    rest.to_string()
                } else {
                    format!("/{rest}")
                };
                return Some((&self.by_prefix[prefix], remainder));
            }
        }
        None
    }

    /// Number of mounted prefixes.
    pub fn len(&self) -> usize {
        self.by_prefix.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_prefix.is_empty()
    }

    /// Registered prefixes, longest first.
    pub fn prefixes(&self) -> &[String] {
        &self.order
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::core::model::Protocol;

    fn service(prefix: &str, enabled: bool) -> Service {
        Service {
            id: prefix.trim_matches('/').replace('/', "-"),
            name: prefix.to_string(),
            description: String::new(),
            public_prefix: prefix.to_string(),
            base_url: "http://backend:8080".to_string(),
            swagger_url: String::new(),
            protocol: Protocol::Http,
            grpc_target: String::new(),
            enabled,
            swagger_json: None,
            last_refreshed_at: None,
            last_health_at: None,
            last_status: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_longest_prefix_wins() {
        let index = RuntimeIndex::from_snapshot(vec![
            service("/api/", true),
            service("/api/users/", true),
        ]);

        let (svc, remainder) = index.match_path("/api/users/42").unwrap();
        assert_eq!(svc.public_prefix, "/api/users/");
        assert_eq!(remainder, "/42");

        let (svc, remainder) = index.match_path("/api/orders/7").unwrap();
        assert_eq!(svc.public_prefix, "/api/");
        assert_eq!(remainder, "/orders/7");
    }

    #[test]
    fn test_remainder_is_slash_rooted() {
        let index = RuntimeIndex::from_snapshot(vec![service("/api/users/", true)]);
        let (_, remainder) = index.match_path("/api/users/").unwrap();
        assert_eq!(remainder, "/");
        let (_, remainder) = index.match_path("/api/users/42/orders").unwrap();
        assert_eq!(remainder, "/42/orders");
    }

    #[test]
    fn test_no_match() {
        let index = RuntimeIndex::from_snapshot(vec![service("/api/users/", true)]);
        assert!(index.match_path("/other/path").is_none());
    }

    #[test]
    fn test_disabled_services_excluded() {
        let index = RuntimeIndex::from_snapshot(vec![
            service("/api/users/", false),
            service("/api/orders/", true),
        ]);
        assert_eq!(index.len(), 1);
        assert!(index.match_path("/api/users/42").is_none());
    }

    #[test]
    fn test_rebuild_replaces_contents() {
        let first = RuntimeIndex::from_snapshot(vec![service("/api/users/", true)]);
        assert!(first.match_path("/api/users/1").is_some());

        let second = RuntimeIndex::from_snapshot(vec![service("/api/orders/", true)]);
        assert!(second.match_path("/api/users/1").is_none());
        assert!(second.match_path("/api/orders/1").is_some());
    }
}
