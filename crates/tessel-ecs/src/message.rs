//! Per-tick message queues.
//!
//! Messages are broadcast: any number of systems may read the same queue
//! during a tick and nothing is consumed by reading. Every queue is emptied
//! by [`World::refresh`](crate::World::refresh).

use std::fmt;

use bytemuck::Pod;

use crate::{
    registry::{MessageId, ShapeInfo},
    storage::DenseStore,
};

/// Marker trait for types that can be sent as messages.
pub trait Message: Pod {}

impl<T: Pod> Message for T {}

/// Everything sent for one message shape since the last refresh.
pub struct MessageQueue {
    id: MessageId,
    store: DenseStore,
}

impl MessageQueue {
    #[must_use]
    pub fn new(id: MessageId, info: ShapeInfo) -> Self {
        Self {
            id,
            store: DenseStore::new(info),
        }
    }

    #[must_use]
    pub const fn id(&self) -> MessageId {
        self.id
    }

    #[must_use]
    pub const fn info(&self) -> &ShapeInfo {
        self.store.info()
    }

    /// Append a payload.
    ///
    /// # Panics
    ///
    /// Panics if `T` is not this queue's shape.
    pub fn send<T: Message>(&mut self, message: T) {
        self.store.push(message);
    }

    /// Everything sent this tick, in send order.
    #[must_use]
    pub fn read_all<T: Message>(&self) -> &[T] {
        self.store.as_slice()
    }

    pub fn iter<T: Message>(&self) -> std::slice::Iter<'_, T> {
        self.read_all().iter()
    }

    /// The first payload sent this tick.
    #[must_use]
    pub fn first<T: Message>(&self) -> Option<&T> {
        self.store.get(0)
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.store.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Drop every payload, keeping the allocation.
    pub fn clear(&mut self) {
        self.store.clear();
    }
}

impl fmt::Debug for MessageQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageQueue")
            .field("id", &self.id)
            .field("shape", &self.info().name())
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use bytemuck::{Pod, Zeroable};

    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
    #[repr(C)]
    struct Damage {
        amount: u32,
    }

    fn queue() -> MessageQueue {
        MessageQueue::new(MessageId::from_raw(0), ShapeInfo::of::<Damage>())
    }

    #[test]
    fn test_send_order_preserved() {
        let mut queue = queue();

        for amount in [3, 1, 2] {
            queue.send(Damage { amount });
        }

        let amounts: Vec<_> = queue.iter::<Damage>().map(|d| d.amount).collect();
        assert_eq!(amounts, vec![3, 1, 2]);
        assert_eq!(queue.first::<Damage>(), Some(&Damage { amount: 3 }));
    }

    #[test]
    fn test_reads_do_not_consume() {
        let mut queue = queue();
        queue.send(Damage { amount: 5 });

        assert_eq!(queue.read_all::<Damage>().len(), 1);
        assert_eq!(queue.read_all::<Damage>().len(), 1);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_clear() {
        let mut queue = queue();
        queue.send(Damage { amount: 5 });
        queue.send(Damage { amount: 5 });

        queue.clear();

        assert!(queue.is_empty());
        assert_eq!(queue.first::<Damage>(), None);
        assert!(queue.read_all::<Damage>().is_empty());
    }

    #[test]
    #[should_panic(expected = "shape mismatch")]
    fn test_send_rejects_foreign_shape() {
        let mut queue = queue();
        queue.send(7_u64);
    }
}
