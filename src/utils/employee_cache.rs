use anyhow::Result;
use futures_util::StreamExt;
use moka::future::Cache;
use sqlx::MySqlPool;
use std::future::Future;
use std::time::Duration;

use crate::model::employee::EmployeeSnapshot;

/// Employee id -> the fields payroll and attendance read on every request.
///
/// Entries expire after the configured TTL; writers to `employees` go through
/// [`EmployeeCache::write_through`] so a salary change is never served stale.
#[derive(Clone)]
pub struct EmployeeCache {
    inner: Cache<u64, EmployeeSnapshot>,
}

impl EmployeeCache {
    pub fn new(capacity: u64, ttl: Duration) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(capacity)
                .time_to_live(ttl)
                .build(),
        }
    }

    pub async fn get(&self, employee_id: u64) -> Option<EmployeeSnapshot> {
        self.inner.get(&employee_id).await
    }

    pub async fn insert(&self, snapshot: EmployeeSnapshot) {
        self.inner.insert(snapshot.id, snapshot).await;
    }

    pub async fn invalidate(&self, employee_id: u64) {
        self.inner.invalidate(&employee_id).await;
    }

    /// Runs a write to the employee row, dropping the cached entry before and
    /// after it. A reader that loaded the old row while the write was in
    /// flight cannot leave it behind.
    pub async fn write_through<F, T>(&self, employee_id: u64, write: F) -> T
    where
        F: Future<Output = T>,
    {
        self.invalidate(employee_id).await;
        let result = write.await;
        self.invalidate(employee_id).await;
        result
    }

    async fn insert_batch(&self, batch: &mut Vec<EmployeeSnapshot>) {
        let inserts: Vec<_> = batch.drain(..).map(|s| self.inner.insert(s.id, s)).collect();
        futures::future::join_all(inserts).await;
    }

    /// Streams active employees into the cache in batches.
    pub async fn warmup(&self, pool: &MySqlPool, batch_size: usize) -> Result<()> {
        let mut stream = sqlx::query_as::<_, EmployeeSnapshot>(
            r#"
            SELECT id, first_name, last_name, salary, department_id, status
            FROM employees
            WHERE status = 'active'
            "#,
        )
        .fetch(pool);

        let mut batch = Vec::with_capacity(batch_size);
        let mut total = 0usize;

        while let Some(row) = stream.next().await {
            batch.push(row?);
            total += 1;

            if batch.len() >= batch_size {
                self.insert_batch(&mut batch).await;
            }
        }

        if !batch.is_empty() {
            self.insert_batch(&mut batch).await;
        }

        log::info!("Employee cache warmup complete: {} active employees", total);
        Ok(())
    }
}
