use serde::Serialize;
use std::{collections::HashMap, future::Future, io::ErrorKind, path::PathBuf, sync::Arc, time::Duration};
use tokio::{
    sync::RwLock,
    task::JoinHandle,
    time::Instant,
};
use uuid::Uuid;

/// Records and files older than this are reaped.
pub const RETENTION: Duration = Duration::from_secs(60 * 60);
pub const REAP_INTERVAL: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Processing,
    Completed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskRecord {
    pub status: TaskStatus,
    pub progress: u8,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_path: Option<PathBuf>,
    #[serde(skip)]
    pub created_at: Instant,
}

impl TaskRecord {
    pub fn new(message: &str) -> Self {
        Self {
            status: TaskStatus::Processing,
            progress: 0,
            message: message.to_owned(),
            file_path: None,
            created_at: Instant::now(),
        }
    }

    pub fn complete(&mut self, message: &str, file_path: PathBuf) {
        self.status = TaskStatus::Completed;
        self.progress = 100;
        self.message = message.to_owned();
        self.file_path = Some(file_path);
    }

    pub fn fail(&mut self, message: String) {
        self.status = TaskStatus::Failed;
        self.progress = 0;
        self.message = message;
    }
}

/**
 * Storage of generation task records.
 * Ids are opaque strings handed out by `create`.
 */
pub trait TaskStore: Send + Sync {
    fn create(&self, message: &str) -> impl Future<Output = String> + Send;

    /// Apply `f` to the record, `false` when the id is unknown.
    fn update<F>(&self, id: &str, f: F) -> impl Future<Output = bool> + Send
    where
        F: FnOnce(&mut TaskRecord) + Send;

    fn get(&self, id: &str) -> impl Future<Output = Option<TaskRecord>> + Send;

    /// Records created more than `retention` ago.
    fn expired(&self, retention: Duration) -> impl Future<Output = Vec<(String, TaskRecord)>> + Send;

    fn remove(&self, id: &str) -> impl Future<Output = Option<TaskRecord>> + Send;
}

#[derive(Debug, Default)]
pub struct MemoryTaskStore {
    tasks: RwLock<HashMap<String, TaskRecord>>,
}

impl TaskStore for MemoryTaskStore {
    async fn create(&self, message: &str) -> String {
        let id = Uuid::new_v4().to_string();
        self.tasks
            .write()
            .await
            .insert(id.clone(), TaskRecord::new(message));
        id
    }

    async fn update<F>(&self, id: &str, f: F) -> bool
    where
        F: FnOnce(&mut TaskRecord) + Send,
    {
        match self.tasks.write().await.get_mut(id) {
            Some(record) => {
                f(record);
                true
            }
            None => false,
        }
    }

    async fn get(&self, id: &str) -> Option<TaskRecord> {
        self.tasks.read().await.get(id).cloned()
    }

    async fn expired(&self, retention: Duration) -> Vec<(String, TaskRecord)> {
        self.tasks
            .read()
            .await
            .iter()
            .filter(|(_, record)| record.created_at.elapsed() > retention)
            .map(|(id, record)| (id.clone(), record.clone()))
            .collect()
    }

    async fn remove(&self, id: &str) -> Option<TaskRecord> {
        self.tasks.write().await.remove(id)
    }
}

/// Remove expired records and their files, returns how many went away.
pub async fn reap<S: TaskStore>(store: &S, retention: Duration) -> usize {
    let expired = store.expired(retention).await;
    let count = expired.len();

    for (id, record) in expired {
        if let Some(path) = &record.file_path {
            match tokio::fs::remove_file(path).await {
                Ok(()) => log::debug!("removed {}", path.display()),
                Err(err) if err.kind() == ErrorKind::NotFound => {}
                Err(err) => log::warn!("remove {}: {}", path.display(), err),
            }
        }
        store.remove(&id).await;
    }
    count
}

/// Run [`reap`] every `every` until the runtime shuts down.
pub fn spawn_reaper<S>(store: Arc<S>, retention: Duration, every: Duration) -> JoinHandle<()>
where
    S: TaskStore + 'static,
{
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;
            let reaped = reap(store.as_ref(), retention).await;
            if reaped > 0 {
                log::info!("reaped {} expired tasks", reaped);
            }
        }
    })
}
