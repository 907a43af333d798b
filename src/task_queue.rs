// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! FIFO task queue with a single worker.
//!
//! The worker task owns the queue state `S` exclusively and hands each task a
//! `&mut S`, so tasks run strictly one after another in submission order and
//! nothing else can touch `S` while they do.
//!
//! # Flow
//! 1. `submit()` pushes a task onto an unbounded channel and returns at once
//! 2. the worker pops the head task and awaits it to completion
//! 3. when the last pending task finishes, the drain hook runs and idle
//!    waiters are woken
//!
//! A task that panics is logged and its submitter sees
//! [`QueueError::TaskDropped`]; the worker keeps draining.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::sync::{mpsc, oneshot, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, error};

use crate::error::QueueError;

type Task<S> = Box<dyn for<'a> FnOnce(&'a mut S) -> BoxFuture<'a, ()> + Send>;
type DrainHook<S> = Box<dyn for<'a> FnMut(&'a mut S) -> BoxFuture<'a, ()> + Send>;

enum Message<S> {
    Run(Task<S>),
    Shutdown,
}

struct Shared {
    pending: AtomicUsize,
    idle: Notify,
}

impl Shared {
    /// Mark one task as finished; wake idle waiters when none are left.
    fn release(&self) {
        if self.pending.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.idle.notify_waiters();
        }
    }
}

pub struct TaskQueueBuilder<S> {
    state: S,
    on_drain: Option<DrainHook<S>>,
}

impl<S: Send + 'static> TaskQueueBuilder<S> {
    /// Run `hook` on the state every time the queue becomes empty.
    pub fn on_drain<F>(mut self, hook: F) -> Self
    where
        F: for<'a> FnMut(&'a mut S) -> BoxFuture<'a, ()> + Send + 'static,
    {
        self.on_drain = Some(Box::new(hook));
        self
    }

    /// Start the worker. Must be called inside a Tokio runtime.
    pub fn spawn(self) -> TaskQueue<S> {
        let (sender, receiver) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared {
            pending: AtomicUsize::new(0),
            idle: Notify::new(),
        });

        let worker = tokio::spawn(run_worker(
            self.state,
            receiver,
            shared.clone(),
            self.on_drain,
        ));

        TaskQueue {
            sender,
            shared,
            worker: Mutex::new(Some(worker)),
        }
    }
}

pub struct TaskQueue<S> {
    sender: mpsc::UnboundedSender<Message<S>>,
    shared: Arc<Shared>,
    worker: Mutex<Option<JoinHandle<S>>>,
}

impl<S: Send + 'static> TaskQueue<S> {
    pub fn builder(state: S) -> TaskQueueBuilder<S> {
        TaskQueueBuilder {
            state,
            on_drain: None,
        }
    }

    /// Queue a task without waiting for it.
    pub fn submit<F>(&self, task: F) -> Result<(), QueueError>
    where
        F: for<'a> FnOnce(&'a mut S) -> BoxFuture<'a, ()> + Send + 'static,
    {
        self.shared.pending.fetch_add(1, Ordering::AcqRel);
        if self.sender.send(Message::Run(Box::new(task))).is_err() {
            self.shared.release();
            return Err(QueueError::Closed);
        }
        Ok(())
    }

    /// Queue a task and get a future for its output.
    ///
    /// The task is enqueued when `execute` is called, not when the returned
    /// future is first polled. Dropping the future does not cancel the task.
    pub fn execute<T, F>(&self, task: F) -> impl Future<Output = Result<T, QueueError>> + Send + 'static
    where
        T: Send + 'static,
        F: for<'a> FnOnce(&'a mut S) -> BoxFuture<'a, T> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let submitted = self.submit(move |state| {
            Box::pin(async move {
                let output = task(state).await;
                let _ = tx.send(output);
            })
        });

        async move {
            submitted?;
            rx.await.map_err(|_| QueueError::TaskDropped)
        }
    }

    /// Number of submitted tasks that have not finished yet.
    pub fn pending(&self) -> usize {
        self.shared.pending.load(Ordering::Acquire)
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Wait until every task submitted so far has finished.
    pub async fn idle(&self) {
        loop {
            let notified = self.shared.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.pending() == 0 {
                return;
            }
            notified.await;
        }
    }

    /// Stop accepting work, finish everything already queued and hand the
    /// state back. Only the first call gets the state.
    pub async fn shutdown(&self) -> Result<S, QueueError> {
        let worker = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(worker) = worker else {
            return Err(QueueError::Closed);
        };

        let _ = self.sender.send(Message::Shutdown);
        worker.await.map_err(|_| QueueError::TaskDropped)
    }
}

async fn run_worker<S>(
    mut state: S,
    mut receiver: mpsc::UnboundedReceiver<Message<S>>,
    shared: Arc<Shared>,
    mut on_drain: Option<DrainHook<S>>,
) -> S {
    while let Some(message) = receiver.recv().await {
        match message {
            Message::Run(task) => {
                let outcome = AssertUnwindSafe(async { task(&mut state).await })
                    .catch_unwind()
                    .await;
                if let Err(panic) = outcome {
                    error!(panic = panic_message(panic.as_ref()), "Queued task panicked");
                }

                if shared.pending.load(Ordering::Acquire) == 1 {
                    if let Some(hook) = on_drain.as_mut() {
                        let outcome = AssertUnwindSafe(async { hook(&mut state).await })
                            .catch_unwind()
                            .await;
                        if let Err(panic) = outcome {
                            error!(panic = panic_message(panic.as_ref()), "Drain hook panicked");
                        }
                    }
                    debug!("Task queue drained");
                }
                shared.release();
            }
            Message::Shutdown => {
                // Already-queued messages are still delivered after close().
                receiver.close();
            }
        }
    }
    state
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&'static str>() {
        *s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic"
    }
}
