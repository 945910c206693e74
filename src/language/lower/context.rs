use crate::runtime::environment::SlotId;

/// Slots holding the arrays that nested destructuring groups read from.
/// Only the top entry is consulted.
#[derive(Debug, Default)]
pub struct DestructureStack {
    slots: Vec<SlotId>,
    deepest: usize,
}

impl DestructureStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active(&self) -> Option<SlotId> {
        self.slots.last().copied()
    }

    pub fn depth(&self) -> usize {
        self.slots.len()
    }

    /// Greatest depth reached so far.
    pub fn deepest(&self) -> usize {
        self.deepest
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Runs `f` with `slot` active and pops it afterwards, whether or not
    /// `f` succeeded.
    pub fn within<R>(&mut self, slot: SlotId, f: impl FnOnce(&mut Self) -> R) -> R {
        self.slots.push(slot);
        self.deepest = self.deepest.max(self.slots.len());
        let result = f(self);
        self.slots.pop();
        result
    }
}
