//! The per-store serial writer thread.

use crate::commit::WriteOutcome;
use std::io;
use std::sync::mpsc;
use std::thread;

/// Unit of work run on the writer thread.
pub(crate) type Job = Box<dyn FnOnce() + Send + 'static>;

/// Runs after a non-blocking write finishes. Observational only.
pub(crate) type Continuation = Box<dyn FnOnce(WriteOutcome) + Send + 'static>;

/// Background thread that runs submitted jobs one at a time, in order.
/// Dropping the queue lets already submitted jobs finish, then joins the thread.
pub(crate) struct WriteQueue {
    tx: Option<mpsc::Sender<Job>>,
    join_handle: Option<thread::JoinHandle<()>>,
}

impl WriteQueue {
    /// Spawn the writer thread.
    pub(crate) fn start(name: &str) -> io::Result<Self> {
        let (tx, rx) = mpsc::channel::<Job>();
        let join_handle = thread::Builder::new()
            .name(format!("json-prefs-writer:{name}"))
            .spawn(move || {
                while let Ok(job) = rx.recv() {
                    job();
                }
            })?;

        Ok(Self {
            tx: Some(tx),
            join_handle: Some(join_handle),
        })
    }

    /// Queue a job behind everything submitted before it. Hands the job back
    /// if the writer thread is gone.
    pub(crate) fn submit(&self, job: Job) -> Result<(), Job> {
        match &self.tx {
            Some(tx) => tx.send(job).map_err(|mpsc::SendError(job)| job),
            None => Err(job),
        }
    }
}

impl Drop for WriteQueue {
    fn drop(&mut self) {
        drop(self.tx.take());
        if let Some(h) = self.join_handle.take() {
            if h.join().is_err() {
                log::error!("writer thread panicked");
            }
        }
    }
}

impl std::fmt::Debug for WriteQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriteQueue")
            .field("running", &self.tx.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[test]
    fn jobs_run_in_submission_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        {
            let queue = WriteQueue::start("order").unwrap();
            for i in 0..20 {
                let seen = Arc::clone(&seen);
                assert!(queue.submit(Box::new(move || seen.lock().push(i))).is_ok());
            }
        }
        assert_eq!(*seen.lock(), (0..20).collect::<Vec<_>>());
    }

    #[test]
    fn drop_drains_pending_jobs() {
        let count = Arc::new(Mutex::new(0));
        let queue = WriteQueue::start("drain").unwrap();
        for _ in 0..5 {
            let count = Arc::clone(&count);
            let _ = queue.submit(Box::new(move || *count.lock() += 1));
        }
        drop(queue);
        assert_eq!(*count.lock(), 5);
    }
}
