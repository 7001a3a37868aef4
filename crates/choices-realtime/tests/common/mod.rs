//! Shared helpers for realtime integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use async_trait::async_trait;
use choices_core::{Error, Result, SystemMetrics};
use choices_realtime::MetricsSource;

static TRACING: Once = Once::new();

/// Install a test subscriber honoring `RUST_LOG`.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Metrics source returning scripted snapshots after scripted delays.
/// When the script runs out it returns an immediate default snapshot.
#[derive(Default)]
pub struct ScriptedMetrics {
    script: Mutex<VecDeque<(Duration, u64)>>,
    fail: bool,
    calls: AtomicUsize,
}

impl ScriptedMetrics {
    pub fn new(script: Vec<(Duration, u64)>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            ..Default::default()
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail: true,
            ..Default::default()
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MetricsSource for ScriptedMetrics {
    async fn fetch_metrics(&self) -> Result<SystemMetrics> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(Error::Request("metrics endpoint unreachable".to_string()));
        }
        let (delay, topics) = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or((Duration::ZERO, 0));
        tokio::time::sleep(delay).await;
        Ok(SystemMetrics {
            total_topics: topics,
            ..Default::default()
        })
    }
}

/// Poll `condition` until it holds, sleeping between checks.
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not met within 2s");
}
