use super::{RenderError, RenderSession, SessionFactory};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, warn};
use url::Url;

/// A bounded pool of reusable browser sessions
///
/// Sessions live in a fixed arena of slots, one per allowed concurrent session.
/// A semaphore with one permit per slot bounds concurrent leases, so `acquire`
/// suspends when every slot is leased. Sessions are launched lazily; a slot
/// whose session crashed is marked invalid and gets a fresh session on its next
/// lease.
#[derive(Clone)]
pub struct BrowserPool {
    shared: Arc<PoolShared>,
}

struct PoolShared {
    factory: Arc<dyn SessionFactory>,
    permits: Arc<Semaphore>,
    slots: Mutex<SlotArena>,
}

struct SlotArena {
    slots: Vec<Slot>,
    idle: Vec<usize>,
    closed: bool,
}

enum Slot {
    /// Never launched
    Vacant,
    /// Healthy session waiting for a lease
    Idle(Box<dyn RenderSession>),
    /// Checked out by a lease
    Leased,
    /// Session was discarded; relaunch on next lease
    Invalid,
}

impl BrowserPool {
    /// Creates a pool with room for `max_sessions` concurrent sessions
    pub fn new(factory: Arc<dyn SessionFactory>, max_sessions: usize) -> Self {
        let size = max_sessions.max(1);
        let slots = (0..size).map(|_| Slot::Vacant).collect();

        Self {
            shared: Arc::new(PoolShared {
                factory,
                permits: Arc::new(Semaphore::new(size)),
                slots: Mutex::new(SlotArena {
                    slots,
                    idle: Vec::new(),
                    closed: false,
                }),
            }),
        }
    }

    /// Leases a session, waiting while the pool is saturated
    ///
    /// Reuses an idle session when one exists, otherwise launches a new one
    /// into a vacant or invalid slot.
    ///
    /// # Errors
    ///
    /// Returns `RenderError::PoolClosed` after `shutdown`, or the factory's
    /// error if a new session could not be launched. A failed launch leaves the
    /// slot invalid and frees its permit.
    pub async fn acquire(&self) -> Result<BrowserLease, RenderError> {
        let permit = Arc::clone(&self.shared.permits)
            .acquire_owned()
            .await
            .map_err(|_| RenderError::PoolClosed)?;

        let (slot, reused) = {
            let mut arena = self.shared.lock();
            if arena.closed {
                return Err(RenderError::PoolClosed);
            }

            match arena.take_idle() {
                Some((slot, session)) => (slot, Some(session)),
                None => match arena.claim_empty() {
                    Some(slot) => (slot, None),
                    None => {
                        return Err(RenderError::Launch(
                            "no free session slot despite available permit".to_string(),
                        ))
                    }
                },
            }
        };

        let session = match reused {
            Some(session) => session,
            None => {
                let claim = SlotClaim {
                    shared: &*self.shared,
                    slot,
                };
                match self.shared.factory.launch().await {
                    Ok(session) => {
                        debug!("Launched browser session in slot {}", slot);
                        claim.keep();
                        session
                    }
                    Err(e) => {
                        warn!("Failed to launch browser session: {}", e);
                        return Err(e);
                    }
                }
            }
        };

        Ok(BrowserLease {
            shared: Arc::clone(&self.shared),
            slot,
            session: Some(session),
            _permit: permit,
        })
    }

    /// Returns a leased session to the pool
    ///
    /// A healthy session goes back on the free list. An unhealthy one is closed
    /// and its slot marked invalid, to be replaced on a later acquire.
    pub async fn release(&self, mut lease: BrowserLease, healthy: bool) {
        let Some(session) = lease.session.take() else {
            return;
        };

        let discarded = {
            let mut arena = self.shared.lock();
            if healthy && !arena.closed {
                arena.slots[lease.slot] = Slot::Idle(session);
                arena.idle.push(lease.slot);
                None
            } else {
                arena.slots[lease.slot] = Slot::Invalid;
                Some(session)
            }
        };

        if let Some(session) = discarded {
            debug!("Discarding browser session in slot {}", lease.slot);
            session.close().await;
        }
        // Permit is released when the lease drops here
    }

    /// Closes the pool and every idle session
    ///
    /// Pending and future acquires fail with `RenderError::PoolClosed`. Leased
    /// sessions are closed as their leases are released.
    pub async fn shutdown(&self) {
        let sessions: Vec<Box<dyn RenderSession>> = {
            let mut arena = self.shared.lock();
            arena.closed = true;
            let idle = std::mem::take(&mut arena.idle);
            idle.into_iter()
                .filter_map(|slot| {
                    match std::mem::replace(&mut arena.slots[slot], Slot::Vacant) {
                        Slot::Idle(session) => Some(session),
                        _ => None,
                    }
                })
                .collect()
        };
        self.shared.permits.close();

        for session in sessions {
            session.close().await;
        }
    }

    /// Number of slots (the concurrent session ceiling)
    pub fn capacity(&self) -> usize {
        self.shared.lock().slots.len()
    }

    /// Number of healthy sessions waiting on the free list
    pub fn idle_sessions(&self) -> usize {
        self.shared.lock().idle.len()
    }

    /// Number of sessions currently leased
    pub fn leased_sessions(&self) -> usize {
        self.shared
            .lock()
            .slots
            .iter()
            .filter(|slot| matches!(slot, Slot::Leased))
            .count()
    }
}

impl PoolShared {
    fn lock(&self) -> MutexGuard<'_, SlotArena> {
        self.slots.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl SlotArena {
    fn take_idle(&mut self) -> Option<(usize, Box<dyn RenderSession>)> {
        while let Some(slot) = self.idle.pop() {
            if let Slot::Idle(session) = std::mem::replace(&mut self.slots[slot], Slot::Leased) {
                return Some((slot, session));
            }
        }
        None
    }

    fn claim_empty(&mut self) -> Option<usize> {
        let slot = self
            .slots
            .iter()
            .position(|slot| matches!(slot, Slot::Vacant | Slot::Invalid))?;
        self.slots[slot] = Slot::Leased;
        Some(slot)
    }
}

/// A slot claimed for a session that is still launching
///
/// Dropping the claim, whether the launch failed or the acquiring future was
/// cancelled mid-launch, marks the slot invalid so a later acquire can reuse it.
struct SlotClaim<'a> {
    shared: &'a PoolShared,
    slot: usize,
}

impl SlotClaim<'_> {
    fn keep(self) {
        std::mem::forget(self);
    }
}

impl Drop for SlotClaim<'_> {
    fn drop(&mut self) {
        self.shared.lock().slots[self.slot] = Slot::Invalid;
    }
}

/// Exclusive checkout of one pooled browser session
///
/// Hand it back with [`BrowserPool::release`]. A lease dropped without being
/// released invalidates its slot, since the session state is unknown.
pub struct BrowserLease {
    shared: Arc<PoolShared>,
    slot: usize,
    session: Option<Box<dyn RenderSession>>,
    _permit: OwnedSemaphorePermit,
}

impl BrowserLease {
    /// Index of the arena slot this lease holds
    pub fn slot(&self) -> usize {
        self.slot
    }

    /// Renders a URL with the leased session
    pub async fn render(&mut self, url: &Url) -> Result<String, RenderError> {
        match self.session.as_mut() {
            Some(session) => session.render(url).await,
            None => Err(RenderError::PoolClosed),
        }
    }
}

impl Drop for BrowserLease {
    fn drop(&mut self) {
        if self.session.take().is_some() {
            warn!("Browser lease for slot {} dropped without release", self.slot);
            self.shared.lock().slots[self.slot] = Slot::Invalid;
        }
    }
}
