use crate::runtime::value::Value;
use std::collections::HashMap;
use std::fmt;

/// Stable reference to one local variable slot of a callable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SlotId(usize);

impl SlotId {
    pub fn new(index: usize) -> Self {
        SlotId(index)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}", self.0)
    }
}

/// Hands out local slots while a parameter list is lowered.
pub trait SlotAllocator {
    /// Returns the slot for `name`, creating it on first use.
    fn slot_for(&mut self, name: &str) -> SlotId;

    /// A fresh slot no user code can name.
    fn synthetic_slot(&mut self) -> SlotId;
}

#[derive(Clone, Debug)]
struct SlotInfo {
    name: String,
    synthetic: bool,
}

/// Slot layout of one callable's frame.
#[derive(Clone, Debug, Default)]
pub struct FrameDescriptor {
    slots: Vec<SlotInfo>,
    by_name: HashMap<String, SlotId>,
}

impl FrameDescriptor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn find_slot(&self, name: &str) -> Option<SlotId> {
        self.by_name.get(name).copied()
    }

    pub fn name_of(&self, slot: SlotId) -> Option<&str> {
        self.slots.get(slot.index()).map(|info| info.name.as_str())
    }

    pub fn is_synthetic(&self, slot: SlotId) -> bool {
        self.slots
            .get(slot.index())
            .map(|info| info.synthetic)
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// User-visible slots in allocation order.
    pub fn visible_slots(&self) -> impl Iterator<Item = (SlotId, &str)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, info)| !info.synthetic)
            .map(|(index, info)| (SlotId(index), info.name.as_str()))
    }

    pub fn new_frame(&self) -> Frame {
        Frame::with_slots(self.slots.len())
    }

    fn push(&mut self, name: String, synthetic: bool) -> SlotId {
        let slot = SlotId(self.slots.len());
        self.slots.push(SlotInfo { name, synthetic });
        slot
    }
}

impl SlotAllocator for FrameDescriptor {
    fn slot_for(&mut self, name: &str) -> SlotId {
        if let Some(slot) = self.by_name.get(name) {
            return *slot;
        }
        let slot = self.push(name.to_string(), false);
        self.by_name.insert(name.to_string(), slot);
        slot
    }

    fn synthetic_slot(&mut self) -> SlotId {
        let name = format!("%destructure{}", self.slots.len());
        self.push(name, true)
    }
}

/// Per-call local storage. Unwritten slots read as nil.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Frame {
    values: Vec<Value>,
}

impl Frame {
    pub fn with_slots(count: usize) -> Self {
        Self {
            values: vec![Value::Nil; count],
        }
    }

    pub fn get(&self, slot: SlotId) -> Option<&Value> {
        self.values.get(slot.index())
    }

    pub fn value(&self, slot: SlotId) -> Value {
        self.get(slot).cloned().unwrap_or(Value::Nil)
    }

    pub fn set(&mut self, slot: SlotId, value: Value) {
        let index = slot.index();
        if index >= self.values.len() {
            self.values.resize(index + 1, Value::Nil);
        }
        self.values[index] = value;
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
