//! Fixed-size customer queue, e.g. the line in front of a register.

use barkeep_ecs::EntityId;
use serde::{Deserialize, Serialize};

/// Maximum customers waiting in one line.
pub const MAX_QUEUE_SIZE: usize = 3;

/// A line of up to [`MAX_QUEUE_SIZE`] customers. Position 0 is the front.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HasWaitingQueue {
    ppl_in_line: [EntityId; MAX_QUEUE_SIZE],
    next_line_position: usize,
}

impl Default for HasWaitingQueue {
    fn default() -> Self {
        Self {
            ppl_in_line: [EntityId::INVALID; MAX_QUEUE_SIZE],
            next_line_position: 0,
        }
    }
}

impl HasWaitingQueue {
    /// Returns `true` when no one else fits.
    #[must_use]
    pub fn is_full(&self) -> bool {
        !self.has_space()
    }

    /// Returns `true` when another customer fits.
    #[must_use]
    pub fn has_space(&self) -> bool {
        self.next_line_position < MAX_QUEUE_SIZE
    }

    /// Position the next customer will get, which is also the line length.
    #[must_use]
    pub fn get_next_pos(&self) -> usize {
        self.next_line_position
    }

    /// Appends a customer and returns their position.
    ///
    /// # Panics
    ///
    /// Panics if the line is full; check [`HasWaitingQueue::has_space`]
    /// first.
    pub fn add_customer(&mut self, customer: EntityId) -> usize {
        assert!(self.has_space(), "queue is full, cannot add {customer}");
        let position = self.next_line_position;
        self.ppl_in_line[position] = customer;
        self.next_line_position += 1;
        position
    }

    /// Removes the customer at `index`; everyone behind moves up one spot.
    pub fn erase(&mut self, index: usize) {
        if index >= self.next_line_position {
            tracing::warn!(index, len = self.next_line_position, "erase past end of queue");
            return;
        }
        self.ppl_in_line.copy_within(index + 1.., index);
        self.ppl_in_line[MAX_QUEUE_SIZE - 1] = EntityId::INVALID;
        self.next_line_position -= 1;
    }

    /// Customer at `index`, if any.
    #[must_use]
    pub fn person(&self, index: usize) -> Option<EntityId> {
        (index < self.next_line_position).then(|| self.ppl_in_line[index])
    }

    /// Returns `true` if `id` stands at `index`.
    #[must_use]
    pub fn matching_id(&self, id: EntityId, index: usize) -> bool {
        self.person(index) == Some(id)
    }

    /// Returns `true` if `id` is anywhere in the line.
    #[must_use]
    pub fn has_matching_person(&self, id: EntityId) -> bool {
        self.position_of(id).is_some()
    }

    /// Where `id` stands.
    #[must_use]
    pub fn position_of(&self, id: EntityId) -> Option<usize> {
        self.ppl_in_line[..self.next_line_position]
            .iter()
            .position(|p| *p == id)
    }

    /// Everyone in line, front first.
    pub fn people(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.ppl_in_line[..self.next_line_position].iter().copied()
    }

    /// Drops everyone for whom `keep` is false, preserving order.
    pub fn retain(&mut self, mut keep: impl FnMut(EntityId) -> bool) {
        let mut index = 0;
        while index < self.next_line_position {
            if keep(self.ppl_in_line[index]) {
                index += 1;
            } else {
                self.erase(index);
            }
        }
    }

    /// Empties the line.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

component!(HasWaitingQueue);
