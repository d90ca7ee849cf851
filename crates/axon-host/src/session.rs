//! Several host sessions side by side.
//!
//! A host that drives more than one network names each session by a
//! [`ContextId`]. Every [`open`](ContextTable::open) stamps its slot with a
//! fresh serial number, so an id kept past [`close`](ContextTable::close)
//! never reaches the session that later reuses the slot.
//!
//! Failures come back as [`HostStatus`] codes, the only error channel a
//! host has. A closed or unknown id reads as [`HostStatus::NoNetwork`].

use std::fmt;

use axon_arena::{BlockAllocator, HeapAllocator};
use axon_core::NnResult;
use log::{debug, warn};

use crate::context::HostContext;
use crate::status::HostStatus;

/// Names one session in a [`ContextTable`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ContextId {
    slot: usize,
    serial: u64,
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session {}#{}", self.slot, self.serial)
    }
}

struct Session<A: BlockAllocator> {
    serial: u64,
    context: HostContext<A>,
}

/// Independent [`HostContext`]s addressed by [`ContextId`].
pub struct ContextTable<A: BlockAllocator = HeapAllocator> {
    sessions: Vec<Option<Session<A>>>,
    next_serial: u64,
}

impl<A: BlockAllocator> ContextTable<A> {
    /// Create an empty table.
    pub const fn new() -> Self {
        Self {
            sessions: Vec::new(),
            next_serial: 1,
        }
    }

    /// Take ownership of `context` in the lowest free slot.
    pub fn open(&mut self, context: HostContext<A>) -> ContextId {
        let serial = self.next_serial;
        self.next_serial = self.next_serial.wrapping_add(1);
        let session = Some(Session { serial, context });
        let slot = match self.sessions.iter().position(Option::is_none) {
            Some(slot) => {
                self.sessions[slot] = session;
                slot
            }
            None => {
                self.sessions.push(session);
                self.sessions.len() - 1
            }
        };
        let id = ContextId { slot, serial };
        debug!("host {id} opened");
        id
    }

    fn session(&self, id: ContextId) -> Option<&Session<A>> {
        self.sessions
            .get(id.slot)?
            .as_ref()
            .filter(|s| s.serial == id.serial)
    }

    fn session_mut(&mut self, id: ContextId) -> Option<&mut Session<A>> {
        self.sessions
            .get_mut(id.slot)?
            .as_mut()
            .filter(|s| s.serial == id.serial)
    }

    /// The context behind `id`, if its session is open.
    pub fn get(&self, id: ContextId) -> Option<&HostContext<A>> {
        self.session(id).map(|s| &s.context)
    }

    /// Mutable access to the context behind `id`.
    pub fn get_mut(&mut self, id: ContextId) -> Option<&mut HostContext<A>> {
        self.session_mut(id).map(|s| &mut s.context)
    }

    /// Sticky status of the session behind `id`.
    pub fn status(&self, id: ContextId) -> HostStatus {
        self.get(id).map_or(HostStatus::NoNetwork, |ctx| ctx.error())
    }

    /// Run `op` against the session behind `id`.
    ///
    /// A closed or unknown id fails with [`HostStatus::NoNetwork`] without
    /// running `op`. An error from `op` comes back as its status code.
    pub fn with<T>(
        &mut self,
        id: ContextId,
        op: impl FnOnce(&mut HostContext<A>) -> NnResult<T>,
    ) -> Result<T, HostStatus> {
        let Some(session) = self.session_mut(id) else {
            warn!("no open host {id}");
            return Err(HostStatus::NoNetwork);
        };
        op(&mut session.context).map_err(|e| HostStatus::from(&e))
    }

    /// End the session behind `id` and hand back its context.
    pub fn close(&mut self, id: ContextId) -> Result<HostContext<A>, HostStatus> {
        self.session(id).ok_or(HostStatus::NoNetwork)?;
        let session = self.sessions[id.slot].take().ok_or(HostStatus::NoNetwork)?;
        debug!("host {id} closed");
        Ok(session.context)
    }

    /// Number of open sessions.
    pub fn len(&self) -> usize {
        self.sessions.iter().flatten().count()
    }

    /// Whether no session is open.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<A: BlockAllocator> Default for ContextTable<A> {
    fn default() -> Self {
        Self::new()
    }
}
