//! Client-side cache of key listings.

use std::collections::HashMap;

use crate::models::api_key::{ApiKeyResponse, ListApiKeysQuery, PaginatedApiKeys};

#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub page: PaginatedApiKeys,
    /// `false` once a mutation settled after this page was fetched.
    pub fresh: bool,
}

/// Handed out when a fetch starts and redeemed when it finishes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    query: ListApiKeysQuery,
    seq: u64,
}

/// One entry per listing query, plus the fetch bookkeeping that decides
/// whether a finished fetch may still write its result.
#[derive(Debug, Default)]
pub struct KeyListCache {
    entries: HashMap<ListApiKeysQuery, CacheEntry>,
    /// Sequence number of the newest fetch started per query.
    latest_fetch: HashMap<ListApiKeysQuery, u64>,
    next_seq: u64,
}

impl KeyListCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, query: &ListApiKeysQuery) -> Option<&CacheEntry> {
        self.entries.get(query)
    }

    pub fn begin_fetch(&mut self, query: &ListApiKeysQuery) -> FetchTicket {
        self.next_seq += 1;
        self.latest_fetch.insert(query.clone(), self.next_seq);
        FetchTicket {
            query: query.clone(),
            seq: self.next_seq,
        }
    }

    /// Store a fetched page unless a newer fetch of the same query started
    /// meanwhile. Returns whether the page was stored.
    pub fn complete_fetch(&mut self, ticket: FetchTicket, page: PaginatedApiKeys) -> bool {
        if self.latest_fetch.get(&ticket.query) != Some(&ticket.seq) {
            return false;
        }

        self.entries
            .insert(ticket.query, CacheEntry { page, fresh: true });
        true
    }

    /// Every fetch started before this call completes without storing its page.
    pub fn cancel_fetches(&mut self) {
        self.latest_fetch.clear();
    }

    /// Mark every entry stale. Stale pages stay readable until refetched.
    pub fn invalidate_all(&mut self) {
        for entry in self.entries.values_mut() {
            entry.fresh = false;
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.latest_fetch.clear();
    }

    /// The cached copy of key `id` in every page that holds it.
    pub fn records_for(&self, id: i64) -> Vec<(ListApiKeysQuery, ApiKeyResponse)> {
        self.entries
            .iter()
            .filter_map(|(query, entry)| {
                entry
                    .page
                    .items
                    .iter()
                    .find(|k| k.id == id)
                    .map(|k| (query.clone(), k.clone()))
            })
            .collect()
    }

    /// Overwrite key `record.id` in the page cached for `query`, if it is there.
    pub fn put_record(&mut self, query: &ListApiKeysQuery, record: ApiKeyResponse) {
        if let Some(entry) = self.entries.get_mut(query) {
            if let Some(slot) = entry.page.items.iter_mut().find(|k| k.id == record.id) {
                *slot = record;
            }
        }
    }

    /// Overwrite key `record.id` in every cached page.
    pub fn put_record_everywhere(&mut self, record: &ApiKeyResponse) {
        for entry in self.entries.values_mut() {
            for slot in entry.page.items.iter_mut().filter(|k| k.id == record.id) {
                *slot = record.clone();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn record(id: i64, name: &str) -> ApiKeyResponse {
        ApiKeyResponse {
            id,
            key_hash: format!("hash-{}", id),
            name: name.to_string(),
            comment: None,
            is_active: true,
            created_at: Utc::now(),
            created_by: 1,
        }
    }

    fn page(items: Vec<ApiKeyResponse>) -> PaginatedApiKeys {
        PaginatedApiKeys {
            total: items.len() as i64,
            items,
            page: 1,
            size: 10,
        }
    }

    #[test]
    fn older_fetch_cannot_overwrite_newer_one() {
        let mut cache = KeyListCache::new();
        let query = ListApiKeysQuery::default();

        let first = cache.begin_fetch(&query);
        let second = cache.begin_fetch(&query);

        assert!(cache.complete_fetch(second, page(vec![record(1, "new")])));
        assert!(!cache.complete_fetch(first, page(vec![record(1, "old")])));

        assert_eq!(cache.get(&query).unwrap().page.items[0].name, "new");
    }

    #[test]
    fn fetches_of_different_queries_do_not_interfere() {
        let mut cache = KeyListCache::new();
        let first_page = ListApiKeysQuery::default();
        let second_page = ListApiKeysQuery {
            page: 2,
            ..Default::default()
        };

        let a = cache.begin_fetch(&first_page);
        let b = cache.begin_fetch(&second_page);
        assert!(cache.complete_fetch(b, page(vec![record(11, "k")])));
        assert!(cache.complete_fetch(a, page(vec![record(1, "k")])));
    }

    #[test]
    fn cancelled_fetches_are_not_stored() {
        let mut cache = KeyListCache::new();
        let first_page = ListApiKeysQuery::default();
        let second_page = ListApiKeysQuery {
            page: 2,
            ..Default::default()
        };

        let a = cache.begin_fetch(&first_page);
        let b = cache.begin_fetch(&second_page);
        cache.cancel_fetches();

        assert!(!cache.complete_fetch(a, page(vec![record(1, "k")])));
        assert!(!cache.complete_fetch(b, page(vec![record(11, "k")])));
        assert!(cache.get(&first_page).is_none());

        let again = cache.begin_fetch(&first_page);
        assert!(cache.complete_fetch(again, page(vec![record(1, "k")])));
    }

    #[test]
    fn invalidation_keeps_data_readable() {
        let mut cache = KeyListCache::new();
        let query = ListApiKeysQuery::default();
        let ticket = cache.begin_fetch(&query);
        cache.complete_fetch(ticket, page(vec![record(1, "a")]));

        cache.invalidate_all();

        let entry = cache.get(&query).unwrap();
        assert!(!entry.fresh);
        assert_eq!(entry.page.items.len(), 1);
    }

    #[test]
    fn records_are_found_and_replaced_per_page() {
        let mut cache = KeyListCache::new();
        let by_id = ListApiKeysQuery::default();
        let by_name = ListApiKeysQuery {
            sort_by: Some("name".to_string()),
            ..Default::default()
        };
        for query in [&by_id, &by_name] {
            let ticket = cache.begin_fetch(query);
            cache.complete_fetch(ticket, page(vec![record(1, "a"), record(2, "b")]));
        }

        assert_eq!(cache.records_for(2).len(), 2);
        assert!(cache.records_for(3).is_empty());

        cache.put_record(&by_name, record(2, "renamed"));
        assert_eq!(cache.get(&by_name).unwrap().page.items[1].name, "renamed");
        assert_eq!(cache.get(&by_id).unwrap().page.items[1].name, "b");

        cache.put_record_everywhere(&record(2, "everywhere"));
        assert_eq!(cache.get(&by_id).unwrap().page.items[1].name, "everywhere");
    }
}
