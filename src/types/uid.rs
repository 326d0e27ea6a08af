// Copyright (c) 2024 Mike Tsao

//! Identifiers for processing nodes, automatable parameters, and sends, and
//! the factory that keeps them unique within a context.

use core::sync::atomic::Ordering;
use core::{hash::Hash, marker::PhantomData, sync::atomic::AtomicUsize};
use serde::{Deserialize, Serialize};
use synonym::Synonym;

/// Identifies a node in a processing context's graph. A [NodeId] is a
/// non-owning handle; the context owns the node.
#[derive(Synonym, Serialize, Deserialize, Eq, PartialEq)]
// See
// https://doc.rust-lang.org/stable/std/marker/trait.StructuralPartialEq.html
// for explanation why we derive PartialEq rather than letting Synonym do it.
#[synonym(skip(PartialEq))]
#[serde(rename_all = "kebab-case")]
pub struct NodeId(pub usize);
impl IsUid for NodeId {
    fn as_usize(&self) -> usize {
        self.0
    }
}

/// Identifies an automatable parameter owned by some node. Envelopes hold
/// these, not the parameters themselves.
#[derive(Synonym, Serialize, Deserialize, Eq, PartialEq)]
#[synonym(skip(PartialEq))]
#[serde(rename_all = "kebab-case")]
pub struct ParamId(pub usize);
impl IsUid for ParamId {
    fn as_usize(&self) -> usize {
        self.0
    }
}

/// Identifies one send within a bus's send manager.
#[derive(Synonym, Serialize, Deserialize, Eq, PartialEq)]
#[synonym(skip(PartialEq))]
#[serde(rename_all = "kebab-case")]
pub struct SendId(pub usize);
impl IsUid for SendId {
    fn as_usize(&self) -> usize {
        self.0
    }
}

/// Common behavior of the identifier newtypes.
pub trait IsUid: Eq + Hash + Clone + From<usize> {
    /// Returns the raw uid.
    fn as_usize(&self) -> usize;
}

/// Generates unique uids.
#[derive(Debug)]
pub struct UidFactory<U: IsUid> {
    next_uid_value: AtomicUsize,
    _phantom: PhantomData<U>,
}
impl<U: IsUid> Default for UidFactory<U> {
    fn default() -> Self {
        Self::new(Self::FIRST_UID)
    }
}
impl<U: IsUid> UidFactory<U> {
    /// Zero is never handed out so that a default-constructed id stands out
    /// in logs.
    pub const FIRST_UID: usize = 1;

    /// Creates a new [UidFactory] starting with the given value.
    pub fn new(first_uid: usize) -> Self {
        Self {
            next_uid_value: AtomicUsize::new(first_uid),
            _phantom: Default::default(),
        }
    }

    /// Generates the next unique uid.
    pub fn mint_next(&self) -> U {
        let uid_value = self.next_uid_value.fetch_add(1, Ordering::Relaxed);
        U::from(uid_value)
    }
}
