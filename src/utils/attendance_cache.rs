use chrono::NaiveDate;
use moka::future::Cache;
use std::time::Duration;

use crate::model::attendance::TodayStatus;

/// Server-side copy of each employee's daily check-in state.
///
/// Entries are overwritten on every check-in/check-out write, so reads never
/// trail the database by more than the TTL even if a write bypasses the API.
#[derive(Clone)]
pub struct AttendanceCache {
    inner: Cache<(i64, NaiveDate), TodayStatus>,
}

impl AttendanceCache {
    pub fn new(max_capacity: u64, ttl: Duration) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(max_capacity)
                .time_to_live(ttl)
                .build(),
        }
    }

    pub async fn get(&self, employee_id: i64, date: NaiveDate) -> Option<TodayStatus> {
        self.inner.get(&(employee_id, date)).await
    }

    pub async fn put(&self, employee_id: i64, status: TodayStatus) {
        self.inner.insert((employee_id, status.work_date), status).await;
    }

    pub async fn invalidate(&self, employee_id: i64, date: NaiveDate) {
        self.inner.invalidate(&(employee_id, date)).await;
    }
}

impl Default for AttendanceCache {
    fn default() -> Self {
        Self::new(50_000, Duration::from_secs(3600))
    }
}
