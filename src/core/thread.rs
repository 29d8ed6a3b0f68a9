use std::sync::Arc;
use std::thread::{self, ThreadId};

use crossbeam::channel::{self, Receiver, Sender};
use parking_lot::RwLock;
use tracing::{error, trace};

/// Work item executed on the UI thread against the context `C`.
pub type UiTask<C> = Box<dyn FnOnce(&C) + Send + 'static>;

/// Called after a task is posted so the owning event loop wakes up.
pub type Waker = Arc<dyn Fn() + Send + Sync>;

/// FIFO task queue owned by the UI thread.
///
/// Any thread may post; only the thread that created the runner drains it.
pub struct UiTaskRunner<C> {
    inner: Arc<Inner<C>>,
}

struct Inner<C> {
    owner: ThreadId,
    sender: Sender<UiTask<C>>,
    receiver: Receiver<UiTask<C>>,
    waker: RwLock<Option<Waker>>,
}

impl<C> UiTaskRunner<C> {
    /// Binds the runner to the calling thread.
    pub fn new() -> Self {
        let (sender, receiver) = channel::unbounded();
        Self {
            inner: Arc::new(Inner {
                owner: thread::current().id(),
                sender,
                receiver,
                waker: RwLock::new(None),
            }),
        }
    }

    pub fn belongs_to_current_thread(&self) -> bool {
        thread::current().id() == self.inner.owner
    }

    pub fn set_waker<F>(&self, waker: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        *self.inner.waker.write() = Some(Arc::new(waker));
    }

    pub fn post_task<F>(&self, task: F)
    where
        F: FnOnce(&C) + Send + 'static,
    {
        // Both channel ends live in `inner`, so the send cannot fail.
        let _ = self.inner.sender.send(Box::new(task));
        trace!("Posted UI task ({} pending)", self.inner.receiver.len());

        let waker = self.inner.waker.read().clone();
        if let Some(wake) = waker {
            wake();
        }
    }

    pub fn pending(&self) -> usize {
        self.inner.receiver.len()
    }

    /// Runs queued tasks in posting order, including tasks posted while
    /// draining. Returns how many ran.
    pub fn run_pending(&self, context: &C) -> usize {
        if !self.belongs_to_current_thread() {
            error!("UI tasks can only be run on the UI thread");
            return 0;
        }

        let mut ran = 0;
        while let Ok(task) = self.inner.receiver.try_recv() {
            task(context);
            ran += 1;
        }
        ran
    }
}

impl<C> Clone for UiTaskRunner<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C> Default for UiTaskRunner<C> {
    fn default() -> Self {
        Self::new()
    }
}
