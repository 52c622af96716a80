//! In-Memory Job Stream - 进程内消费组流
//!
//! 用于测试与单机运行；记录 ID 形如 `<seq>-0`，按 seq 顺序投递。

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::{Mutex, Notify};
use tokio::time::Instant;

use crate::application::ports::{JobStreamPort, StreamError, StreamRecord};

/// 无新记录时的轮询粒度（空闲超时的待处理记录不会触发通知）
const POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, Clone)]
enum EntryState {
    New,
    Pending {
        consumer: String,
        delivered_at: Instant,
        delivery_count: u32,
    },
}

#[derive(Debug, Clone)]
struct Entry {
    payload: String,
    state: EntryState,
}

/// 内存 Job Stream
pub struct InMemoryJobStream {
    entries: DashMap<u64, Entry>,
    next_seq: AtomicU64,
    notify: Notify,
    /// 串行化领取，避免两个消费者拿到同一条记录
    claim_lock: Mutex<()>,
    redelivery_idle: Duration,
}

impl InMemoryJobStream {
    pub fn new(redelivery_idle: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            next_seq: AtomicU64::new(1),
            notify: Notify::new(),
            claim_lock: Mutex::new(()),
            redelivery_idle,
        }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    fn parse_id(record_id: &str) -> Option<u64> {
        record_id.split('-').next()?.parse().ok()
    }

    async fn claim(&self, consumer: &str, count: usize) -> Vec<StreamRecord> {
        let _guard = self.claim_lock.lock().await;
        let now = Instant::now();

        let mut seqs: Vec<u64> = self.entries.iter().map(|e| *e.key()).collect();
        seqs.sort_unstable();

        let mut records = Vec::new();
        for seq in seqs {
            if records.len() >= count {
                break;
            }
            let Some(mut entry) = self.entries.get_mut(&seq) else {
                continue;
            };
            let delivery_count = match &entry.state {
                EntryState::New => 1,
                EntryState::Pending {
                    delivered_at,
                    delivery_count,
                    consumer: previous,
                } => {
                    if now.duration_since(*delivered_at) < self.redelivery_idle {
                        continue;
                    }
                    tracing::debug!(
                        record_id = seq,
                        from = %previous,
                        to = consumer,
                        "Reclaiming idle stream record"
                    );
                    delivery_count + 1
                }
            };
            entry.state = EntryState::Pending {
                consumer: consumer.to_string(),
                delivered_at: now,
                delivery_count,
            };
            records.push(StreamRecord {
                id: format!("{}-0", seq),
                payload: entry.payload.clone(),
                delivery_count,
            });
        }
        records
    }
}

impl Default for InMemoryJobStream {
    fn default() -> Self {
        Self::new(Duration::from_secs(60))
    }
}

#[async_trait]
impl JobStreamPort for InMemoryJobStream {
    async fn publish(&self, payload: String) -> Result<String, StreamError> {
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        self.entries.insert(
            seq,
            Entry {
                payload,
                state: EntryState::New,
            },
        );
        self.notify.notify_waiters();
        tracing::debug!(record_id = seq, "Published stream record");
        Ok(format!("{}-0", seq))
    }

    async fn read(
        &self,
        consumer: &str,
        count: usize,
        block: Duration,
    ) -> Result<Vec<StreamRecord>, StreamError> {
        let deadline = Instant::now() + block;
        loop {
            let records = self.claim(consumer, count).await;
            if !records.is_empty() {
                return Ok(records);
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(records);
            }
            let wait = (deadline - now).min(POLL_INTERVAL);
            let _ = tokio::time::timeout(wait, self.notify.notified()).await;
        }
    }

    async fn ack(&self, record_id: &str) -> Result<bool, StreamError> {
        let Some(seq) = Self::parse_id(record_id) else {
            return Ok(false);
        };
        let removed = self
            .entries
            .remove_if(&seq, |_, entry| matches!(entry.state, EntryState::Pending { .. }))
            .is_some();
        if removed {
            tracing::debug!(record_id, "Acked stream record");
        }
        Ok(removed)
    }

    async fn pending_count(&self) -> Result<usize, StreamError> {
        Ok(self.entries.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_read_delivers_in_order_once() {
        let stream = InMemoryJobStream::default();
        let first = stream.publish("a".into()).await.unwrap();
        stream.publish("b".into()).await.unwrap();

        let records = stream.read("c1", 10, Duration::ZERO).await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, first);
        assert_eq!(records[0].payload, "a");
        assert_eq!(records[0].delivery_count, 1);

        // 已领取但未确认，其他消费者读不到
        let other = stream.read("c2", 10, Duration::ZERO).await.unwrap();
        assert!(other.is_empty());
    }

    #[tokio::test]
    async fn test_ack_removes_pending_only() {
        let stream = InMemoryJobStream::default();
        let id = stream.publish("a".into()).await.unwrap();

        // 未投递的记录不能确认
        assert!(!stream.ack(&id).await.unwrap());
        stream.read("c1", 1, Duration::ZERO).await.unwrap();
        assert!(stream.ack(&id).await.unwrap());
        assert!(!stream.ack(&id).await.unwrap());
        assert_eq!(stream.pending_count().await.unwrap(), 0);
        assert!(!stream.ack("garbage").await.unwrap());
    }

    #[tokio::test]
    async fn test_unacked_record_is_redelivered_after_idle() {
        let stream = InMemoryJobStream::new(Duration::from_millis(20));
        stream.publish("a".into()).await.unwrap();

        stream.read("c1", 1, Duration::ZERO).await.unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;

        let records = stream.read("c2", 1, Duration::ZERO).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].delivery_count, 2);
        assert_eq!(stream.pending_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_blocking_read_wakes_on_publish() {
        let stream = InMemoryJobStream::default().arc();
        let reader = {
            let stream = stream.clone();
            tokio::spawn(async move { stream.read("c1", 1, Duration::from_secs(5)).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        stream.publish("late".into()).await.unwrap();

        let records = reader.await.unwrap().unwrap();
        assert_eq!(records[0].payload, "late");
    }

    #[tokio::test]
    async fn test_read_respects_count() {
        let stream = InMemoryJobStream::default();
        for i in 0..5 {
            stream.publish(i.to_string()).await.unwrap();
        }
        assert_eq!(stream.read("c1", 2, Duration::ZERO).await.unwrap().len(), 2);
        assert_eq!(stream.read("c1", 10, Duration::ZERO).await.unwrap().len(), 3);
    }
}
