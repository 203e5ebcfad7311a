//! Slot table: stable indices for concurrently active pop-ups.
//!
//! A slot index identifies one pop-up for its whole lifetime. Inserting reuses the first
//! empty slot, or appends one; the table never shrinks.

#[derive(Debug)]
pub struct SlotTable<T> {
    slots: Vec<Option<T>>,
}

impl<T> SlotTable<T> {
    pub fn with_capacity(capacity: usize) -> Self {
        SlotTable {
            slots: (0..capacity).map(|_| None).collect(),
        }
    }

    /// Store `value` in the first free slot and return its index.
    pub fn insert(&mut self, value: T) -> usize {
        match self.slots.iter().position(Option::is_none) {
            Some(index) => {
                self.slots[index] = Some(value);
                index
            }
            None => {
                self.slots.push(Some(value));
                self.slots.len() - 1
            }
        }
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.slots.get_mut(index).and_then(Option::as_mut)
    }

    pub fn release(&mut self, index: usize) -> Option<T> {
        self.slots.get_mut(index).and_then(Option::take)
    }

    /// Empty every slot; capacity is kept.
    pub fn clear(&mut self) {
        self.slots.iter_mut().for_each(|slot| *slot = None);
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of occupied slots.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &T)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.as_ref().map(|value| (index, value)))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (usize, &mut T)> {
        self.slots
            .iter_mut()
            .enumerate()
            .filter_map(|(index, slot)| slot.as_mut().map(|value| (index, value)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_fills_first_free_slot() {
        let mut table = SlotTable::with_capacity(3);
        assert_eq!(table.insert("a"), 0);
        assert_eq!(table.insert("b"), 1);
        assert_eq!(table.insert("c"), 2);
        table.release(1);
        assert_eq!(table.insert("d"), 1);
        assert_eq!(table.get(1), Some(&"d"));
    }

    #[test]
    fn grows_when_full_and_never_shrinks() {
        let mut table = SlotTable::with_capacity(1);
        table.insert(1);
        assert_eq!(table.insert(2), 1);
        assert_eq!(table.capacity(), 2);
        table.release(0);
        table.release(1);
        assert!(table.is_empty());
        assert_eq!(table.capacity(), 2);
    }

    #[test]
    fn zero_capacity_table_appends() {
        let mut table = SlotTable::with_capacity(0);
        assert_eq!(table.insert('x'), 0);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn iter_skips_empty_slots() {
        let mut table = SlotTable::with_capacity(4);
        table.insert(10);
        table.insert(20);
        table.insert(30);
        table.release(1);
        let seen: Vec<_> = table.iter().map(|(i, v)| (i, *v)).collect();
        assert_eq!(seen, vec![(0, 10), (2, 30)]);
    }

    #[test]
    fn release_of_empty_slot_is_none() {
        let mut table: SlotTable<u8> = SlotTable::with_capacity(2);
        assert!(table.release(0).is_none());
        assert!(table.release(99).is_none());
    }

    #[test]
    fn clear_keeps_capacity() {
        let mut table = SlotTable::with_capacity(2);
        table.insert(1);
        table.insert(2);
        table.insert(3);
        table.clear();
        assert_eq!(table.len(), 0);
        assert_eq!(table.capacity(), 3);
    }
}
