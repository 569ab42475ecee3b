//! Fast "is this login email taken?" checks for registration.
//!
//! Lookup order: cuckoo filter (a miss means definitely free), then a moka
//! cache of recently seen logins (a hit means definitely taken), then the
//! database.

use anyhow::{Result, anyhow};
use autoscale_cuckoo_filter::CuckooFilter;
use futures_util::StreamExt;
use moka::future::Cache;
use once_cell::sync::Lazy;
use sqlx::PgPool;
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

const FILTER_CAPACITY: usize = 100_000;
const FALSE_POSITIVE_RATE: f64 = 0.001;

static LOGIN_FILTER: Lazy<RwLock<CuckooFilter<String>>> =
    Lazy::new(|| RwLock::new(CuckooFilter::new(FILTER_CAPACITY, FALSE_POSITIVE_RATE)));

/// Recently active logins; every entry means "taken".
static RECENT_LOGINS: Lazy<Cache<String, ()>> = Lazy::new(|| {
    Cache::builder()
        .max_capacity(500_000)
        .time_to_live(Duration::from_secs(86_400))
        .build()
});

#[inline]
pub fn normalize(email: &str) -> String {
    email.trim().to_lowercase()
}

/// False positives possible, false negatives not.
pub fn might_exist(email: &str) -> bool {
    let email = normalize(email);
    LOGIN_FILTER
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .contains(&email)
}

/// Records a newly created login in both tiers.
pub async fn mark_taken(email: &str) {
    let email = normalize(email);
    LOGIN_FILTER
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .add(&email);
    RECENT_LOGINS.insert(email, ()).await;
}

pub async fn is_cached(email: &str) -> bool {
    RECENT_LOGINS.contains_key(&normalize(email))
}

/// true  => email AVAILABLE
/// false => email TAKEN
pub async fn is_available(email: &str, pool: &PgPool) -> bool {
    let email = normalize(email);

    if !might_exist(&email) {
        return true;
    }

    if is_cached(&email).await {
        return false;
    }

    let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
        .bind(&email)
        .fetch_one(pool)
        .await
        .unwrap_or(true); // fail closed

    !exists
}

/// Loads every login into the filter and recent ones into the cache.
pub async fn warmup(pool: &PgPool, recent_days: i32, batch_size: usize) -> Result<()> {
    let mut stream = sqlx::query_as::<_, (String, bool)>(
        r#"
        SELECT email, COALESCE(last_login_at >= NOW() - make_interval(days => $1), FALSE)
        FROM users
        "#,
    )
    .bind(recent_days)
    .fetch(pool);

    let mut batch = Vec::with_capacity(batch_size);
    let mut recent = Vec::new();
    let mut total = 0usize;

    while let Some(row) = stream.next().await {
        let (email, is_recent) = row.map_err(|e| anyhow!("login row fetch failed: {}", e))?;
        let email = normalize(&email);
        if is_recent {
            recent.push(email.clone());
        }
        batch.push(email);
        total += 1;

        if batch.len() == batch_size {
            insert_batch(&batch);
            batch.clear();
        }
    }

    if !batch.is_empty() {
        insert_batch(&batch);
    }

    let inserts: Vec<_> = recent
        .iter()
        .map(|email| RECENT_LOGINS.insert(email.clone(), ()))
        .collect();
    let recent_count = inserts.len();
    futures::future::join_all(inserts).await;

    log::info!(
        "Login registry warmup complete: {} logins, {} recent (last {} days)",
        total,
        recent_count,
        recent_days
    );
    Ok(())
}

fn insert_batch(emails: &[String]) {
    let mut filter = LOGIN_FILTER.write().unwrap_or_else(PoisonError::into_inner);
    for email in emails {
        filter.add(email);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_trims_and_lowercases() {
        assert_eq!(normalize("  Jane.Doe@Company.COM "), "jane.doe@company.com");
    }

    #[actix_web::test]
    async fn marked_login_is_seen_by_both_tiers() {
        let email = "Registry.Test@Example.com";
        mark_taken(email).await;
        assert!(might_exist("registry.test@example.com"));
        assert!(is_cached("REGISTRY.TEST@EXAMPLE.COM").await);
    }

    #[test]
    fn unseen_login_is_definitely_free() {
        assert!(!might_exist("nobody-has-this-address-7f3a@example.com"));
    }
}
