use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const QUEUE_KEY: &str = "shorts:tasks";
const PROCESSING_KEY: &str = "shorts:processing";

/// Task payload serialized into Redis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QueuedTask {
    /// Run the full pipeline for a pending job.
    ProcessJob { job_id: Uuid },
    /// Upload one rendered short with the given account's credentials.
    UploadShort { short_id: Uuid, account_email: String },
}

impl QueuedTask {
    pub fn kind(&self) -> &'static str {
        match self {
            QueuedTask::ProcessJob { .. } => "process_job",
            QueuedTask::UploadShort { .. } => "upload_short",
        }
    }
}

/// A dequeued task together with the exact payload parked in the processing list.
#[derive(Debug, Clone)]
pub struct ClaimedTask {
    pub task: QueuedTask,
    payload: String,
}

/// Redis-backed task queue.
///
/// Dequeued payloads move atomically into a processing list and stay there
/// until [`TaskQueue::complete`], so a crash mid-task leaves a trace that the
/// next worker start can recover.
pub struct TaskQueue {
    client: redis::Client,
}

impl TaskQueue {
    pub fn new(redis_url: &str) -> Result<Self, QueueError> {
        let client = redis::Client::open(redis_url).map_err(QueueError::Redis)?;
        Ok(Self { client })
    }

    async fn connection(&self) -> Result<redis::aio::MultiplexedConnection, QueueError> {
        Ok(self.client.get_multiplexed_async_connection().await?)
    }

    pub async fn enqueue(&self, task: &QueuedTask) -> Result<(), QueueError> {
        let mut conn = self.connection().await?;
        let payload = serde_json::to_string(task)?;
        conn.lpush::<_, _, ()>(QUEUE_KEY, &payload).await?;
        Ok(())
    }

    /// Pop the oldest task, parking it in the processing list.
    pub async fn dequeue(&self) -> Result<Option<ClaimedTask>, QueueError> {
        let mut conn = self.connection().await?;
        let result: Option<String> = conn.rpoplpush(QUEUE_KEY, PROCESSING_KEY).await?;

        match result {
            Some(payload) => match serde_json::from_str(&payload) {
                Ok(task) => Ok(Some(ClaimedTask { task, payload })),
                Err(e) => {
                    // Drop unreadable payloads instead of looping on them forever.
                    conn.lrem::<_, _, ()>(PROCESSING_KEY, 1, &payload).await?;
                    Err(QueueError::Serialize(e))
                }
            },
            None => Ok(None),
        }
    }

    /// Remove a finished task from the processing list.
    pub async fn complete(&self, claimed: &ClaimedTask) -> Result<(), QueueError> {
        let mut conn = self.connection().await?;
        conn.lrem::<_, _, ()>(PROCESSING_KEY, 1, &claimed.payload).await?;
        Ok(())
    }

    /// Put a claimed task back on the queue for another delivery.
    pub async fn requeue(&self, claimed: &ClaimedTask) -> Result<(), QueueError> {
        let mut conn = self.connection().await?;
        let _: () = redis::pipe()
            .atomic()
            .lrem(PROCESSING_KEY, 1, &claimed.payload)
            .ignore()
            .lpush(QUEUE_KEY, &claimed.payload)
            .ignore()
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    /// Number of claimed tasks not yet completed or requeued.
    pub async fn in_flight(&self) -> Result<u64, QueueError> {
        let mut conn = self.connection().await?;
        let count: u64 = conn.llen(PROCESSING_KEY).await?;
        Ok(count)
    }

    /// Move everything left in the processing list back onto the queue.
    /// Returns how many tasks were recovered.
    pub async fn recover_processing(&self) -> Result<u64, QueueError> {
        let mut conn = self.connection().await?;
        let mut recovered = 0;
        loop {
            let moved: Option<String> = conn.rpoplpush(PROCESSING_KEY, QUEUE_KEY).await?;
            if moved.is_none() {
                break;
            }
            recovered += 1;
        }
        Ok(recovered)
    }

    /// Drop every queued and in-flight task.
    pub async fn purge(&self) -> Result<(), QueueError> {
        let mut conn = self.connection().await?;
        conn.del::<_, ()>(&[QUEUE_KEY, PROCESSING_KEY][..]).await?;
        Ok(())
    }

    /// Check Redis connectivity (for health checks).
    pub async fn health_check(&self) -> Result<(), QueueError> {
        let mut conn = self.connection().await?;
        redis::cmd("PING").query_async::<String>(&mut conn).await?;
        Ok(())
    }

    /// Get the current queue depth (pending tasks).
    pub async fn queue_depth(&self) -> Result<u64, QueueError> {
        let mut conn = self.connection().await?;
        let depth: u64 = conn.llen(QUEUE_KEY).await?;
        Ok(depth)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}
