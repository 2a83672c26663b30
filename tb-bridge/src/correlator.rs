//! Matching replies to the requests waiting for them.
//!
//! Flow:
//! 1. The session calls [`Correlator::register`] and gets a [`PendingHandle`]
//!    carrying a fresh correlation tag.
//! 2. The request goes out with that tag.
//! 3. Whatever delivers replies (the stream reader task, the HTTP call, the
//!    native completion forwarder) calls [`Correlator::on_frame_received`].
//! 4. The caller awaits [`PendingHandle::wait`], bounded by its deadline.
//!
//! Tags are allocated from a counter starting at 1; tag 0 is reserved for the
//! session handshake. A request that timed out or whose handle was dropped
//! leaves its tag abandoned until the late reply shows up. The counter wraps
//! back to 1 only once nothing is outstanding or abandoned, so a tag is never
//! reused while a reply for it may still arrive. A reply for a tag that is no
//! longer pending is logged and discarded.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use tokio::sync::{oneshot, OwnedSemaphorePermit};

use crate::error::{ClientError, PacketStatus, ProtocolError, Result};
use crate::event::{Event, EventSink};
use crate::protocol::Operation;

/// A reply as read off the transport.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Reply {
    /// Operation code echoed by the server.
    pub operation: u16,
    /// Reply status.
    pub status: PacketStatus,
    /// Encoded result records.
    pub payload: Vec<u8>,
}

impl Reply {
    /// A successful reply.
    pub fn ok(operation: Operation, payload: Vec<u8>) -> Self {
        Self {
            operation: operation.code(),
            status: PacketStatus::Ok,
            payload,
        }
    }
}

struct Pending {
    operation: Operation,
    submitted_at: Instant,
    deadline: Instant,
    sender: oneshot::Sender<Result<Vec<u8>>>,
    // Frees the session's in-flight slot when the entry goes away.
    _permit: Option<OwnedSemaphorePermit>,
}

struct Inner {
    pending: HashMap<u32, Pending>,
    // Tags given up on whose reply may still arrive.
    abandoned: HashSet<u32>,
    next_tag: u64,
    closed: Option<ClientError>,
}

/// Per-session table of in-flight requests.
pub struct Correlator {
    inner: Mutex<Inner>,
    tag_limit: u32,
    sink: Arc<dyn EventSink>,
}

impl Correlator {
    /// Create a correlator using the full `u32` tag space.
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self::with_tag_limit(sink, u32::MAX)
    }

    /// Create a correlator whose tags run from 1 to `tag_limit`.
    pub fn with_tag_limit(sink: Arc<dyn EventSink>, tag_limit: u32) -> Self {
        Self {
            inner: Mutex::new(Inner {
                pending: HashMap::new(),
                abandoned: HashSet::new(),
                next_tag: 1,
                closed: None,
            }),
            tag_limit: tag_limit.max(1),
            sink,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // The table stays consistent even if a holder panicked.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Register a request and allocate its tag.
    ///
    /// `permit` is released when the entry is resolved, timed out or dropped.
    /// Fails with [`ClientError::Busy`] when the tag space is exhausted by
    /// outstanding or abandoned requests, or with the session's error once
    /// [`fail_all`](Self::fail_all) has run.
    pub fn register(
        self: &Arc<Self>,
        operation: Operation,
        timeout: Duration,
        permit: Option<OwnedSemaphorePermit>,
    ) -> Result<PendingHandle> {
        let now = Instant::now();
        let deadline = now + timeout;
        let (sender, receiver) = oneshot::channel();

        let tag = {
            let mut inner = self.lock();
            if let Some(err) = &inner.closed {
                return Err(err.clone());
            }
            if inner.next_tag > self.tag_limit as u64 {
                if !inner.pending.is_empty() || !inner.abandoned.is_empty() {
                    return Err(ClientError::Busy(format!(
                        "correlation tags exhausted with {} requests outstanding and {} abandoned",
                        inner.pending.len(),
                        inner.abandoned.len()
                    )));
                }
                inner.next_tag = 1;
            }
            let tag = inner.next_tag as u32;
            inner.next_tag += 1;
            inner.pending.insert(
                tag,
                Pending {
                    operation,
                    submitted_at: now,
                    deadline,
                    sender,
                    _permit: permit,
                },
            );
            tag
        };

        Ok(PendingHandle {
            tag,
            operation,
            deadline,
            receiver,
            correlator: Arc::clone(self),
            settled: false,
        })
    }

    /// Deliver a reply to whoever waits on `tag`.
    ///
    /// Returns false if nobody does; the reply is then dropped.
    pub fn on_frame_received(&self, tag: u32, reply: Reply) -> bool {
        let removed = {
            let mut inner = self.lock();
            let removed = inner.pending.remove(&tag);
            if removed.is_none() {
                inner.abandoned.remove(&tag);
            }
            removed
        };
        let Some(pending) = removed else {
            self.sink.record(Event::LateReply { tag });
            return false;
        };

        let bytes = reply.payload.len();
        let result = if reply.operation != pending.operation.code() {
            Err(ClientError::Protocol(ProtocolError::UnexpectedReply))
        } else if reply.status != PacketStatus::Ok {
            Err(ClientError::Rejected(reply.status))
        } else {
            Ok(reply.payload)
        };

        self.sink.record(Event::FrameReceived {
            operation: pending.operation,
            tag,
            bytes,
            elapsed: pending.submitted_at.elapsed(),
        });
        // The receiver may be gone if the caller gave up; nothing to do then.
        let _ = pending.sender.send(result);
        true
    }

    /// Resolve `tag` with an error instead of a reply.
    pub fn fail(&self, tag: u32, error: ClientError) -> bool {
        match self.lock().pending.remove(&tag) {
            Some(pending) => {
                let _ = pending.sender.send(Err(error));
                true
            }
            None => false,
        }
    }

    /// Give up on `tag` without resolving it.
    ///
    /// The tag stays reserved until its late reply arrives.
    pub fn forget(&self, tag: u32) -> bool {
        let mut inner = self.lock();
        if inner.pending.remove(&tag).is_some() {
            inner.abandoned.insert(tag);
            true
        } else {
            false
        }
    }

    /// Drop `tag` for a request that never reached the transport.
    ///
    /// No reply can arrive, so the tag is free for reuse right away.
    pub fn discard(&self, tag: u32) -> bool {
        self.lock().pending.remove(&tag).is_some()
    }

    /// Fail every outstanding request with `error` and refuse new ones.
    ///
    /// Returns the number of requests failed.
    pub fn fail_all(&self, error: ClientError) -> usize {
        let drained: Vec<Pending> = {
            let mut inner = self.lock();
            if inner.closed.is_none() {
                inner.closed = Some(error.clone());
            }
            inner.abandoned.clear();
            inner.pending.drain().map(|(_, p)| p).collect()
        };
        let count = drained.len();
        for pending in drained {
            let _ = pending.sender.send(Err(error.clone()));
        }
        count
    }

    /// Time out every request whose deadline is at or before `now`.
    ///
    /// Returns the number of requests removed.
    pub fn remove_expired(&self, now: Instant) -> usize {
        let expired: Vec<(u32, Pending)> = {
            let mut inner = self.lock();
            let tags: Vec<u32> = inner
                .pending
                .iter()
                .filter(|(_, p)| p.deadline <= now)
                .map(|(tag, _)| *tag)
                .collect();
            let expired: Vec<(u32, Pending)> = tags
                .into_iter()
                .filter_map(|tag| inner.pending.remove(&tag).map(|p| (tag, p)))
                .collect();
            inner.abandoned.extend(expired.iter().map(|(tag, _)| *tag));
            expired
        };
        let count = expired.len();
        for (tag, pending) in expired {
            self.sink.record(Event::Timeout {
                operation: pending.operation,
                tag,
            });
            let _ = pending.sender.send(Err(ClientError::Timeout));
        }
        count
    }

    /// Number of requests currently pending.
    pub fn outstanding(&self) -> usize {
        self.lock().pending.len()
    }

    /// Number of abandoned tags still waiting for their late reply.
    pub fn abandoned(&self) -> usize {
        self.lock().abandoned.len()
    }

    /// Returns true if `tag` is pending.
    pub fn is_pending(&self, tag: u32) -> bool {
        self.lock().pending.contains_key(&tag)
    }

    /// Returns true once [`fail_all`](Self::fail_all) has run.
    pub fn is_closed(&self) -> bool {
        self.lock().closed.is_some()
    }
}

/// Caller's side of a pending request.
///
/// Dropping an unresolved handle removes its entry from the correlator.
pub struct PendingHandle {
    tag: u32,
    operation: Operation,
    deadline: Instant,
    receiver: oneshot::Receiver<Result<Vec<u8>>>,
    correlator: Arc<Correlator>,
    settled: bool,
}

impl PendingHandle {
    /// Correlation tag of the request.
    pub fn tag(&self) -> u32 {
        self.tag
    }

    /// Operation of the request.
    pub fn operation(&self) -> Operation {
        self.operation
    }

    /// When the request times out.
    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Release the entry of a request the transport never accepted.
    pub fn discard(mut self) {
        self.settled = true;
        self.correlator.discard(self.tag);
    }

    /// Wait for the reply payload until the deadline.
    pub async fn wait(mut self) -> Result<Vec<u8>> {
        let deadline = tokio::time::Instant::from_std(self.deadline);
        let outcome = tokio::time::timeout_at(deadline, &mut self.receiver).await;
        self.settled = true;
        match outcome {
            Ok(Ok(result)) => result,
            // Sender dropped without a value: the correlator went away.
            Ok(Err(_)) => Err(ClientError::Shutdown),
            Err(_) => {
                if self.correlator.forget(self.tag) {
                    self.correlator.sink.record(Event::Timeout {
                        operation: self.operation,
                        tag: self.tag,
                    });
                    return Err(ClientError::Timeout);
                }
                // Resolved between the timer firing and the removal.
                match self.receiver.try_recv() {
                    Ok(result) => result,
                    Err(_) => Err(ClientError::Timeout),
                }
            }
        }
    }
}

impl Drop for PendingHandle {
    fn drop(&mut self) {
        if !self.settled {
            self.correlator.forget(self.tag);
        }
    }
}

impl std::fmt::Debug for PendingHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingHandle")
            .field("tag", &self.tag)
            .field("operation", &self.operation)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::NoopSink;
    use crate::testing::RecordingSink;
    use std::collections::HashSet;
    use tokio::sync::Semaphore;

    fn correlator() -> Arc<Correlator> {
        Arc::new(Correlator::new(Arc::new(NoopSink)))
    }

    const LONG: Duration = Duration::from_secs(30);

    #[tokio::test]
    async fn test_reply_resolves_waiter() {
        let correlator = correlator();
        let handle = correlator
            .register(Operation::LookupAccounts, LONG, None)
            .unwrap();
        assert_eq!(handle.tag(), 1);
        assert_eq!(correlator.outstanding(), 1);

        assert!(correlator.on_frame_received(1, Reply::ok(Operation::LookupAccounts, vec![1, 2])));
        assert_eq!(handle.wait().await.unwrap(), vec![1, 2]);
        assert_eq!(correlator.outstanding(), 0);
    }

    #[tokio::test]
    async fn test_tags_unique_while_outstanding() {
        let correlator = correlator();
        let handles: Vec<_> = (0..1000)
            .map(|_| {
                correlator
                    .register(Operation::CreateTransfers, LONG, None)
                    .unwrap()
            })
            .collect();
        let tags: HashSet<u32> = handles.iter().map(|h| h.tag()).collect();
        assert_eq!(tags.len(), 1000);
        assert!(!tags.contains(&0));
    }

    #[tokio::test]
    async fn test_tags_unique_across_threads() {
        let correlator = correlator();
        let mut tasks = Vec::new();
        for _ in 0..8 {
            let correlator = Arc::clone(&correlator);
            tasks.push(tokio::spawn(async move {
                (0..100)
                    .map(|_| {
                        correlator
                            .register(Operation::LookupTransfers, LONG, None)
                            .unwrap()
                    })
                    .collect::<Vec<_>>()
            }));
        }
        let mut tags = HashSet::new();
        let mut handles = Vec::new();
        for task in tasks {
            for handle in task.await.unwrap() {
                assert!(tags.insert(handle.tag()));
                handles.push(handle);
            }
        }
        assert_eq!(correlator.outstanding(), 800);
    }

    #[tokio::test]
    async fn test_wraps_only_when_drained() {
        let correlator = Arc::new(Correlator::with_tag_limit(Arc::new(NoopSink), 3));
        let a = correlator.register(Operation::LookupAccounts, LONG, None).unwrap();
        let b = correlator.register(Operation::LookupAccounts, LONG, None).unwrap();
        let c = correlator.register(Operation::LookupAccounts, LONG, None).unwrap();
        assert_eq!((a.tag(), b.tag(), c.tag()), (1, 2, 3));

        // Tag 1 was answered, but tag 3 is still in flight.
        correlator.on_frame_received(1, Reply::ok(Operation::LookupAccounts, vec![]));
        assert!(a.wait().await.is_ok());
        let busy = correlator.register(Operation::LookupAccounts, LONG, None);
        assert!(matches!(busy, Err(ClientError::Busy(_))));

        correlator.on_frame_received(2, Reply::ok(Operation::LookupAccounts, vec![]));
        correlator.on_frame_received(3, Reply::ok(Operation::LookupAccounts, vec![]));
        drop(b);
        drop(c);
        let d = correlator.register(Operation::LookupAccounts, LONG, None).unwrap();
        assert_eq!(d.tag(), 1);
    }

    #[tokio::test]
    async fn test_timed_out_tags_are_not_reused_before_late_reply() {
        let correlator = Arc::new(Correlator::with_tag_limit(Arc::new(NoopSink), 2));
        let short = Duration::from_millis(20);
        let a = correlator.register(Operation::LookupAccounts, short, None).unwrap();
        let b = correlator.register(Operation::LookupAccounts, short, None).unwrap();
        assert_eq!(a.wait().await, Err(ClientError::Timeout));
        assert_eq!(b.wait().await, Err(ClientError::Timeout));
        assert_eq!(correlator.outstanding(), 0);
        assert_eq!(correlator.abandoned(), 2);

        // Both replies may still arrive, so neither tag can be handed out.
        let busy = correlator.register(Operation::LookupAccounts, LONG, None);
        assert!(matches!(busy, Err(ClientError::Busy(_))));

        assert!(!correlator.on_frame_received(1, Reply::ok(Operation::LookupAccounts, vec![0xAA])));
        let busy = correlator.register(Operation::LookupAccounts, LONG, None);
        assert!(matches!(busy, Err(ClientError::Busy(_))));

        assert!(!correlator.on_frame_received(2, Reply::ok(Operation::LookupAccounts, vec![0xBB])));
        assert_eq!(correlator.abandoned(), 0);
        let fresh = correlator.register(Operation::LookupAccounts, LONG, None).unwrap();
        assert_eq!(fresh.tag(), 1);
        correlator.on_frame_received(1, Reply::ok(Operation::LookupAccounts, vec![0xCC]));
        assert_eq!(fresh.wait().await.unwrap(), vec![0xCC]);
    }

    #[tokio::test]
    async fn test_swept_and_discarded_tags() {
        let correlator = Arc::new(Correlator::with_tag_limit(Arc::new(NoopSink), 2));
        let swept = correlator
            .register(Operation::LookupAccounts, Duration::from_millis(1), None)
            .unwrap();
        let unsent = correlator.register(Operation::LookupAccounts, LONG, None).unwrap();

        assert_eq!(correlator.remove_expired(Instant::now() + Duration::from_millis(10)), 1);
        assert_eq!(swept.wait().await, Err(ClientError::Timeout));
        assert_eq!(correlator.abandoned(), 1);

        // A request that never went out leaves nothing behind.
        unsent.discard();
        assert_eq!(correlator.abandoned(), 1);
        assert!(correlator.register(Operation::LookupAccounts, LONG, None).is_err());

        correlator.fail_all(ClientError::Shutdown);
        assert_eq!(correlator.abandoned(), 0);
    }

    #[tokio::test]
    async fn test_timeout_then_late_reply_is_dropped() {
        let sink = Arc::new(RecordingSink::default());
        let correlator = Arc::new(Correlator::new(sink.clone()));

        let slow = correlator
            .register(Operation::LookupAccounts, Duration::from_millis(50), None)
            .unwrap();
        let slow_tag = slow.tag();
        assert_eq!(slow.wait().await, Err(ClientError::Timeout));
        assert!(!correlator.is_pending(slow_tag));

        let next = correlator
            .register(Operation::LookupAccounts, LONG, None)
            .unwrap();
        assert_ne!(next.tag(), slow_tag);

        // The stray reply for the timed out request must not reach `next`.
        assert!(!correlator.on_frame_received(
            slow_tag,
            Reply::ok(Operation::LookupAccounts, vec![0xAA])
        ));
        assert!(correlator.is_pending(next.tag()));
        assert!(sink.events().contains(&Event::LateReply { tag: slow_tag }));
        assert!(sink.events().iter().any(|e| matches!(e, Event::Timeout { tag, .. } if *tag == slow_tag)));

        correlator.on_frame_received(next.tag(), Reply::ok(Operation::LookupAccounts, vec![0xBB]));
        assert_eq!(next.wait().await.unwrap(), vec![0xBB]);
    }

    #[tokio::test]
    async fn test_operation_mismatch() {
        let correlator = correlator();
        let handle = correlator
            .register(Operation::LookupAccounts, LONG, None)
            .unwrap();
        let tag = handle.tag();
        correlator.on_frame_received(tag, Reply::ok(Operation::LookupTransfers, vec![]));
        assert_eq!(
            handle.wait().await,
            Err(ClientError::Protocol(ProtocolError::UnexpectedReply))
        );
    }

    #[tokio::test]
    async fn test_rejected_status() {
        let correlator = correlator();
        let handle = correlator
            .register(Operation::CreateAccounts, LONG, None)
            .unwrap();
        let tag = handle.tag();
        correlator.on_frame_received(
            tag,
            Reply {
                operation: Operation::CreateAccounts.code(),
                status: PacketStatus::TooMuchData,
                payload: vec![],
            },
        );
        assert_eq!(
            handle.wait().await,
            Err(ClientError::Rejected(PacketStatus::TooMuchData))
        );
    }

    #[tokio::test]
    async fn test_fail_all() {
        let correlator = correlator();
        let a = correlator.register(Operation::LookupAccounts, LONG, None).unwrap();
        let b = correlator.register(Operation::CreateAccounts, LONG, None).unwrap();

        let err = ClientError::Transport("connection closed".into());
        assert_eq!(correlator.fail_all(err.clone()), 2);
        assert_eq!(a.wait().await, Err(err.clone()));
        assert_eq!(b.wait().await, Err(err.clone()));

        assert!(correlator.is_closed());
        let after = correlator.register(Operation::LookupAccounts, LONG, None);
        assert_eq!(after.unwrap_err(), err);
    }

    #[tokio::test]
    async fn test_fail_single() {
        let correlator = correlator();
        let a = correlator.register(Operation::LookupAccounts, LONG, None).unwrap();
        let b = correlator.register(Operation::LookupAccounts, LONG, None).unwrap();
        assert!(correlator.fail(a.tag(), ClientError::Busy("no packets".into())));
        assert!(matches!(a.wait().await, Err(ClientError::Busy(_))));
        assert!(correlator.is_pending(b.tag()));
    }

    #[tokio::test]
    async fn test_remove_expired() {
        let correlator = correlator();
        let short = correlator
            .register(Operation::LookupAccounts, Duration::from_millis(1), None)
            .unwrap();
        let long = correlator.register(Operation::LookupAccounts, LONG, None).unwrap();

        let removed = correlator.remove_expired(Instant::now() + Duration::from_millis(10));
        assert_eq!(removed, 1);
        assert!(!correlator.is_pending(short.tag()));
        assert!(correlator.is_pending(long.tag()));
        assert_eq!(short.wait().await, Err(ClientError::Timeout));
    }

    #[tokio::test]
    async fn test_dropped_handle_is_forgotten() {
        let correlator = correlator();
        let handle = correlator.register(Operation::LookupAccounts, LONG, None).unwrap();
        let tag = handle.tag();
        drop(handle);
        assert!(!correlator.is_pending(tag));
        assert!(!correlator.on_frame_received(tag, Reply::ok(Operation::LookupAccounts, vec![])));
    }

    #[tokio::test]
    async fn test_permit_released_on_completion() {
        let correlator = correlator();
        let slots = Arc::new(Semaphore::new(1));
        let permit = slots.clone().try_acquire_owned().unwrap();
        let handle = correlator
            .register(Operation::LookupAccounts, LONG, Some(permit))
            .unwrap();
        assert_eq!(slots.available_permits(), 0);

        correlator.on_frame_received(handle.tag(), Reply::ok(Operation::LookupAccounts, vec![]));
        assert_eq!(slots.available_permits(), 1);
        assert!(handle.wait().await.unwrap().is_empty());
    }
}
