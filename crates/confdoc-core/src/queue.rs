//! Per-document write slot
//!
//! Mutations join a FIFO line when they are issued. Awaiting any ticket
//! drives the line from the front until that ticket's own job has run, so
//! jobs run in issue order whichever ticket is awaited first. A job left
//! half-run by a dropped driver stays in the slot and the next driver
//! resumes it. Dropping a ticket before its job starts removes the job.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;
use std::task::Poll;

use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::Mutex;
use tokio::sync::oneshot::{self, error::TryRecvError};

struct Job<T> {
    id: u64,
    reply: oneshot::Sender<T>,
    work: BoxFuture<'static, T>,
}

impl<T: Send + 'static> Job<T> {
    fn start(self) -> BoxFuture<'static, ()> {
        let Self { reply, work, .. } = self;
        async move {
            // Receiver is gone when its ticket was dropped mid-run
            let _ = reply.send(work.await);
        }
        .boxed()
    }
}

struct Line<T> {
    next_id: u64,
    waiting: VecDeque<Job<T>>,
    running: bool,
}

/// FIFO write slot shared by a document and its bypass views
pub(crate) struct WriteQueue<T> {
    line: Mutex<Line<T>>,
    slot: tokio::sync::Mutex<Option<BoxFuture<'static, ()>>>,
}

impl<T> Default for WriteQueue<T> {
    fn default() -> Self {
        Self {
            line: Mutex::new(Line {
                next_id: 0,
                waiting: VecDeque::new(),
                running: false,
            }),
            slot: tokio::sync::Mutex::new(None),
        }
    }
}

impl<T: Send + 'static> WriteQueue<T> {
    /// Put `work` at the back of the line
    pub(crate) fn submit(
        self: &Arc<Self>,
        work: impl Future<Output = T> + Send + 'static,
    ) -> Ticket<T> {
        let (reply, receiver) = oneshot::channel();
        let mut line = self.line.lock();
        let id = line.next_id;
        line.next_id += 1;
        line.waiting.push_back(Job {
            id,
            reply,
            work: work.boxed(),
        });
        Ticket {
            queue: Arc::clone(self),
            id,
            receiver,
        }
    }

    /// Jobs issued and not yet finished
    pub(crate) fn pending(&self) -> u64 {
        let line = self.line.lock();
        line.waiting.len() as u64 + u64::from(line.running)
    }

    fn start_next(&self) -> Option<BoxFuture<'static, ()>> {
        let mut line = self.line.lock();
        let job = line.waiting.pop_front()?;
        line.running = true;
        Some(job.start())
    }

    fn finish(&self) {
        self.line.lock().running = false;
    }
}

/// Place in a [`WriteQueue`]
pub(crate) struct Ticket<T> {
    queue: Arc<WriteQueue<T>>,
    id: u64,
    receiver: oneshot::Receiver<T>,
}

impl<T: Send + 'static> Ticket<T> {
    /// Run queued jobs up to and including this one
    ///
    /// `None` if the job ended without producing a value.
    pub(crate) async fn outcome(mut self) -> Option<T> {
        if let Poll::Ready(done) = self.settled() {
            return done;
        }
        let queue = Arc::clone(&self.queue);
        let mut slot = queue.slot.lock().await;
        loop {
            if let Poll::Ready(done) = self.settled() {
                return done;
            }
            if slot.is_none() {
                *slot = queue.start_next();
            }
            let running = slot.as_mut()?;
            running.await;
            *slot = None;
            queue.finish();
        }
    }

    fn settled(&mut self) -> Poll<Option<T>> {
        match self.receiver.try_recv() {
            Ok(value) => Poll::Ready(Some(value)),
            Err(TryRecvError::Closed) => Poll::Ready(None),
            Err(TryRecvError::Empty) => Poll::Pending,
        }
    }
}

impl<T> Drop for Ticket<T> {
    fn drop(&mut self) {
        let id = self.id;
        self.queue.line.lock().waiting.retain(|job| job.id != id);
    }
}
