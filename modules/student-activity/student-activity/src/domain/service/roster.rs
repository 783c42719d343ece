use std::collections::{HashMap, VecDeque};
use std::hash::Hash;
use std::sync::Arc;

use parking_lot::Mutex;
use student_activity_sdk::{EnrolmentSource, Participant, RosterQuery, SortDirection, SortField};
use tracing::{debug, instrument};
use uuid::Uuid;

use super::ServiceConfig;
use crate::domain::error::DomainError;

/// Enrolled-user listings for the report.
///
/// "All participants" and "members of one group" are the same query with
/// and without a group filter; both go through [`RosterSession`].
pub struct Roster {
    enrolments: Arc<dyn EnrolmentSource>,
    default_page_size: u32,
    max_page_size: u32,
    cache_capacity: usize,
}

impl Roster {
    #[must_use]
    pub fn new(enrolments: Arc<dyn EnrolmentSource>, config: &ServiceConfig) -> Self {
        Self {
            enrolments,
            default_page_size: config.default_page_size,
            max_page_size: config.max_page_size,
            cache_capacity: config.roster_cache_capacity,
        }
    }

    /// Start a request-scoped session. Its cache dies with it.
    #[must_use]
    pub fn session(&self) -> RosterSession {
        RosterSession {
            enrolments: Arc::clone(&self.enrolments),
            default_page_size: self.default_page_size,
            max_page_size: self.max_page_size,
            pages: Mutex::new(BoundedCache::new(self.cache_capacity)),
            totals: Mutex::new(BoundedCache::new(self.cache_capacity)),
        }
    }
}

/// One request's view of the roster, with memoized pages and totals.
pub struct RosterSession {
    enrolments: Arc<dyn EnrolmentSource>,
    default_page_size: u32,
    max_page_size: u32,
    pages: Mutex<BoundedCache<RosterQuery, Arc<Vec<Participant>>>>,
    totals: Mutex<BoundedCache<(Uuid, Option<Uuid>), u64>>,
}

impl RosterSession {
    /// Build a query with the page size clamped to `[1, max_page_size]`.
    /// A missing or zero page size falls back to the configured default.
    #[must_use]
    pub fn query(
        &self,
        course_id: Uuid,
        group_id: Option<Uuid>,
        sort: SortField,
        direction: SortDirection,
        page: u32,
        per_page: Option<u32>,
    ) -> RosterQuery {
        let per_page = match per_page {
            None | Some(0) => self.default_page_size,
            Some(n) => n,
        }
        .clamp(1, self.max_page_size.max(1));
        RosterQuery {
            course_id,
            group_id,
            sort,
            direction,
            page,
            per_page,
        }
    }

    /// One page of participants.
    ///
    /// # Errors
    ///
    /// Propagates enrolment source failures.
    #[instrument(skip(self), fields(course_id = %query.course_id, page = query.page))]
    pub async fn page(&self, query: &RosterQuery) -> Result<Arc<Vec<Participant>>, DomainError> {
        if let Some(hit) = self.pages.lock().get(query) {
            debug!("roster page cache hit");
            return Ok(hit);
        }
        let rows = Arc::new(self.enrolments.enrolled_users(query).await?);
        self.pages.lock().insert(query.clone(), Arc::clone(&rows));
        Ok(rows)
    }

    /// Total participants, optionally limited to one group.
    ///
    /// # Errors
    ///
    /// Propagates enrolment source failures.
    pub async fn total(&self, course_id: Uuid, group_id: Option<Uuid>) -> Result<u64, DomainError> {
        let key = (course_id, group_id);
        if let Some(total) = self.totals.lock().get(&key) {
            return Ok(total);
        }
        let total = self
            .enrolments
            .count_enrolled_users(course_id, group_id)
            .await?;
        self.totals.lock().insert(key, total);
        Ok(total)
    }

    /// Number of cached pages.
    #[must_use]
    pub fn cached_pages(&self) -> usize {
        self.pages.lock().len()
    }
}

/// Insertion-ordered map that evicts its oldest entry once full.
struct BoundedCache<K, V> {
    capacity: usize,
    order: VecDeque<K>,
    entries: HashMap<K, V>,
}

impl<K: Eq + Hash + Clone, V: Clone> BoundedCache<K, V> {
    fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            order: VecDeque::new(),
            entries: HashMap::new(),
        }
    }

    fn get(&self, key: &K) -> Option<V> {
        self.entries.get(key).cloned()
    }

    fn insert(&mut self, key: K, value: V) {
        if self.entries.insert(key.clone(), value).is_some() {
            return;
        }
        self.order.push_back(key);
        while self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.entries.remove(&oldest);
            }
        }
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}
