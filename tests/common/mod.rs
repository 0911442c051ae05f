//! Shared fixtures: a call-counting session over the seeded test database.

#![allow(dead_code)]

use app_lib::error::AppError;
use app_lib::infra::db::init_test_db;
use app_lib::infra::{DbSession, SqliteSession};
use app_lib::query::{Dataset, Query};
use chrono::NaiveDate;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub struct CountingSession {
    inner: SqliteSession,
    calls: AtomicUsize,
    seen: Mutex<Vec<Query>>,
}

impl CountingSession {
    pub fn new(inner: SqliteSession) -> Arc<Self> {
        Arc::new(Self {
            inner,
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        })
    }

    pub fn seeded() -> Arc<Self> {
        Self::new(init_test_db())
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn queries(&self) -> Vec<Query> {
        self.seen.lock().unwrap().clone()
    }

    pub fn inner(&self) -> &SqliteSession {
        &self.inner
    }
}

impl DbSession for CountingSession {
    fn execute(&self, query: &Query) -> Result<Dataset, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(query.clone());
        self.inner.execute(query)
    }

    fn close(&self) -> Result<(), AppError> {
        self.inner.close()
    }
}

pub fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}
