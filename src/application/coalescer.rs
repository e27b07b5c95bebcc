//! Request Coalescer - 并发请求合并 + 持久化缓存
//!
//! 同一进程内，同一个 key 同时最多只有一个生产者在运行：
//! - 缓存命中直接返回
//! - 已有在途请求则等待它的结果（成功或失败都共享）
//! - 否则登记新的在途请求，运行生产者，成功后写入缓存
//!
//! 在途请求在后台任务中驱动，即使所有调用方都放弃等待也会完成并写入缓存。

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures_util::future::{BoxFuture, FutureExt, Shared};
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::oneshot;

use crate::application::error::ApplicationError;
use crate::application::ports::ArtifactStorePort;

type ProducerFuture = BoxFuture<'static, Result<Vec<u8>, ApplicationError>>;

type SharedResult = Shared<ProducerFuture>;

/// 在途请求表
type InFlightTable = Arc<DashMap<String, SharedResult>>;

/// 请求结束时（成功、失败或 panic）从在途表中移除
struct InFlightGuard {
    table: InFlightTable,
    key: String,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.table.remove(&self.key);
    }
}

#[derive(Clone)]
pub struct RequestCoalescer {
    store: Arc<dyn ArtifactStorePort>,
    in_flight: InFlightTable,
}

impl RequestCoalescer {
    pub fn new(store: Arc<dyn ArtifactStorePort>) -> Self {
        Self {
            store,
            in_flight: Arc::new(DashMap::new()),
        }
    }

    pub fn store(&self) -> &Arc<dyn ArtifactStorePort> {
        &self.store
    }

    /// 当前在途请求数
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    /// 读取缓存；读失败按未命中处理
    pub async fn fetch_cached(&self, key: &str) -> Option<Vec<u8>> {
        match self.store.get(key).await {
            Ok(hit) => hit,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Artifact store read failed, treating as miss");
                None
            }
        }
    }

    /// 缓存命中 → 合并到在途请求 → 运行生产者
    pub async fn fetch_or_compute<F, Fut>(
        &self,
        key: &str,
        producer: F,
    ) -> Result<Vec<u8>, ApplicationError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<u8>, ApplicationError>> + Send + 'static,
    {
        if let Some(hit) = self.fetch_cached(key).await {
            tracing::debug!(key = %key, "Artifact cache hit");
            return Ok(hit);
        }

        // 生产者在释放 DashMap 分片锁之后才创建，先登记一个等待生产者的占位 future
        let (work_tx, work_rx) = oneshot::channel();
        let (shared, leader) = match self.in_flight.entry(key.to_string()) {
            Entry::Occupied(entry) => (entry.get().clone(), false),
            Entry::Vacant(entry) => {
                let shared = self.start(key, work_rx);
                entry.insert(shared.clone());
                (shared, true)
            }
        };

        if leader {
            tracing::debug!(key = %key, "Started in-flight request");
            tokio::spawn(shared.clone());
            // 接收端只会随在途 future 一起释放，发送失败可以忽略
            let _ = work_tx.send(producer().boxed());
        } else {
            tracing::debug!(key = %key, "Joined in-flight request");
        }

        shared.await
    }

    fn start(&self, key: &str, work: oneshot::Receiver<ProducerFuture>) -> SharedResult {
        let store = self.store.clone();
        let guard = InFlightGuard {
            table: self.in_flight.clone(),
            key: key.to_string(),
        };

        async move {
            let guard = guard;
            let work = async {
                match work.await {
                    Ok(work) => work.await,
                    Err(_) => Err(ApplicationError::internal(format!(
                        "producer dropped for key {}",
                        guard.key
                    ))),
                }
            };
            let result = match AssertUnwindSafe(work).catch_unwind().await {
                Ok(result) => result,
                Err(_) => Err(ApplicationError::internal(format!(
                    "producer panicked for key {}",
                    guard.key
                ))),
            };

            if let Ok(payload) = &result {
                if let Err(e) = store.put(&guard.key, payload.clone()).await {
                    tracing::warn!(key = %guard.key, error = %e, "Failed to store artifact");
                }
            }
            result
        }
        .boxed()
        .shared()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{StoreError, StoreStats};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct FakeStore {
        entries: Mutex<HashMap<String, Vec<u8>>>,
        fail_puts: bool,
    }

    #[async_trait]
    impl ArtifactStorePort for FakeStore {
        async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
            Ok(self.entries.lock().unwrap().get(key).cloned())
        }

        async fn put(&self, key: &str, payload: Vec<u8>) -> Result<(), StoreError> {
            if self.fail_puts {
                return Err(StoreError::DatabaseError("disk full".to_string()));
            }
            self.entries.lock().unwrap().insert(key.to_string(), payload);
            Ok(())
        }

        async fn remove(&self, key: &str) -> Result<(), StoreError> {
            self.entries.lock().unwrap().remove(key);
            Ok(())
        }

        async fn purge_expired(&self) -> Result<usize, StoreError> {
            Ok(0)
        }

        async fn stats(&self) -> StoreStats {
            StoreStats {
                total_entries: self.entries.lock().unwrap().len(),
                ..StoreStats::default()
            }
        }
    }

    fn counting_producer(
        calls: &Arc<AtomicUsize>,
        result: Result<Vec<u8>, ApplicationError>,
    ) -> impl FnOnce() -> BoxFuture<'static, Result<Vec<u8>, ApplicationError>> {
        let calls = calls.clone();
        move || {
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(50)).await;
                result
            }
            .boxed()
        }
    }

    #[tokio::test]
    async fn test_concurrent_requests_share_one_producer() {
        let store = Arc::new(FakeStore::default());
        let coalescer = RequestCoalescer::new(store.clone());
        let calls = Arc::new(AtomicUsize::new(0));

        let requests = (0..10).map(|_| {
            let coalescer = coalescer.clone();
            let producer = counting_producer(&calls, Ok(vec![7, 7, 7]));
            async move { coalescer.fetch_or_compute("k", producer).await }
        });
        let results = futures_util::future::join_all(requests).await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        for result in results {
            assert_eq!(result.unwrap(), vec![7, 7, 7]);
        }
        assert_eq!(coalescer.in_flight_count(), 0);
        assert_eq!(store.get("k").await.unwrap(), Some(vec![7, 7, 7]));
    }

    #[tokio::test]
    async fn test_failure_is_shared_then_retry_succeeds() {
        let store = Arc::new(FakeStore::default());
        let coalescer = RequestCoalescer::new(store.clone());
        let calls = Arc::new(AtomicUsize::new(0));
        let failure = ApplicationError::internal("boom");

        let requests = (0..10).map(|_| {
            let coalescer = coalescer.clone();
            let producer = counting_producer(&calls, Err(failure.clone()));
            async move { coalescer.fetch_or_compute("k", producer).await }
        });
        let results = futures_util::future::join_all(requests).await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(results.iter().all(|r| r.as_ref() == Err(&failure)));
        assert_eq!(coalescer.in_flight_count(), 0);
        assert_eq!(store.get("k").await.unwrap(), None);

        // 失败后不残留在途请求，可以重试
        let retry = coalescer
            .fetch_or_compute("k", counting_producer(&calls, Ok(vec![1])))
            .await;
        assert_eq!(retry.unwrap(), vec![1]);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_store_hit_skips_producer() {
        let store = Arc::new(FakeStore::default());
        store.put("k", vec![9]).await.unwrap();
        let coalescer = RequestCoalescer::new(store);
        let calls = Arc::new(AtomicUsize::new(0));

        let result = coalescer
            .fetch_or_compute("k", counting_producer(&calls, Ok(vec![1])))
            .await;
        assert_eq!(result.unwrap(), vec![9]);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_store_write_failure_is_not_fatal() {
        let store = Arc::new(FakeStore {
            fail_puts: true,
            ..FakeStore::default()
        });
        let coalescer = RequestCoalescer::new(store);
        let calls = Arc::new(AtomicUsize::new(0));

        let result = coalescer
            .fetch_or_compute("k", counting_producer(&calls, Ok(vec![3])))
            .await;
        assert_eq!(result.unwrap(), vec![3]);
    }

    #[tokio::test]
    async fn test_abandoned_request_still_populates_store() {
        let store = Arc::new(FakeStore::default());
        let coalescer = RequestCoalescer::new(store.clone());
        let calls = Arc::new(AtomicUsize::new(0));

        let abandoned = tokio::time::timeout(
            Duration::from_millis(5),
            coalescer.fetch_or_compute("k", counting_producer(&calls, Ok(vec![5]))),
        )
        .await;
        assert!(abandoned.is_err());

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(store.get("k").await.unwrap(), Some(vec![5]));
        assert_eq!(coalescer.in_flight_count(), 0);
    }

    #[tokio::test]
    async fn test_panicking_producer_clears_entry() {
        let store = Arc::new(FakeStore::default());
        let coalescer = RequestCoalescer::new(store);

        let result = coalescer
            .fetch_or_compute("k", || async {
                if true {
                    panic!("producer exploded");
                }
                Ok(vec![])
            })
            .await;
        assert!(matches!(result, Err(ApplicationError::InternalError(_))));
        assert_eq!(coalescer.in_flight_count(), 0);
    }

    #[test]
    fn test_producer_created_outside_table_lock() {
        // 生产者闭包同步访问在途表，若仍持有分片写锁会死锁
        let (done_tx, done_rx) = std::sync::mpsc::channel();
        std::thread::spawn(move || {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            let result = runtime.block_on(async {
                let coalescer = RequestCoalescer::new(Arc::new(FakeStore::default()));
                let observer = coalescer.clone();
                coalescer
                    .fetch_or_compute("k", move || {
                        let seen = observer.in_flight_count();
                        async move { Ok(vec![seen as u8]) }
                    })
                    .await
            });
            let _ = done_tx.send(result);
        });

        let result = done_rx
            .recv_timeout(Duration::from_secs(5))
            .expect("producer deadlocked on the in-flight table");
        assert_eq!(result.unwrap(), vec![1]);
    }

    #[tokio::test]
    async fn test_producer_setup_panic_clears_entry() {
        let coalescer = RequestCoalescer::new(Arc::new(FakeStore::default()));
        let calls = Arc::new(AtomicUsize::new(0));

        let leader = {
            let coalescer = coalescer.clone();
            tokio::spawn(async move {
                coalescer
                    .fetch_or_compute("k", || -> BoxFuture<'static, Result<Vec<u8>, ApplicationError>> {
                        panic!("producer setup failed")
                    })
                    .await
            })
        };
        assert!(leader.await.is_err());

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(coalescer.in_flight_count(), 0);
        let retry = coalescer
            .fetch_or_compute("k", counting_producer(&calls, Ok(vec![2])))
            .await;
        assert_eq!(retry.unwrap(), vec![2]);
    }
}
