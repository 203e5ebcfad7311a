//! Vertical stacking of slide-enabled pop-ups.
//!
//! Every active pop-up with a slide count has an entry: its slot, pixel height, and the
//! slide frames it has left. A pop-up's offset is the sum of the heights of the entries
//! added before it, each scaled either by that entry's live grow rate (grow-up pop-ups)
//! or by the measured pop-up's own remaining slide fraction (everything else). Newer
//! pop-ups are pushed clear of older ones; the oldest entry never moves.

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StackEntry {
    pub slot: usize,
    pub height: f64,
    pub remaining: u32,
}

#[derive(Debug, Default)]
pub struct StackLayout {
    /// Oldest first.
    entries: Vec<StackEntry>,
}

impl StackLayout {
    pub fn new() -> Self {
        StackLayout { entries: Vec::new() }
    }

    pub fn push(&mut self, slot: usize, height: f64, slide_count: u32) {
        self.remove(slot);
        self.entries.push(StackEntry {
            slot,
            height,
            remaining: slide_count,
        });
    }

    pub fn remove(&mut self, slot: usize) {
        self.entries.retain(|entry| entry.slot != slot);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn entries(&self) -> &[StackEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Offset magnitude for the pop-up in `slot`, summed over the entries older than it.
    /// `grow_rate` returns the current vertical scale of a sibling that uses the grow-up
    /// pattern, `None` for any other pattern.
    pub fn offset_for(&self, slot: usize, slide_count: u32, grow_rate: impl Fn(usize) -> Option<f64>) -> f64 {
        let Some(own) = self.entries.iter().find(|entry| entry.slot == slot) else {
            return 0.0;
        };
        let fraction = if slide_count == 0 {
            0.0
        } else {
            own.remaining as f64 / slide_count as f64
        };

        self.entries
            .iter()
            .rev()
            .skip_while(|entry| entry.slot != slot)
            .skip(1)
            .map(|entry| match grow_rate(entry.slot) {
                Some(rate) => entry.height * rate,
                None => entry.height * fraction,
            })
            .sum()
    }

    /// Age every entry by one frame, floored at zero.
    pub fn advance(&mut self) {
        for entry in &mut self.entries {
            entry.remaining = entry.remaining.saturating_sub(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_growth(_: usize) -> Option<f64> {
        None
    }

    #[test]
    fn lone_entry_has_no_offset() {
        let mut stack = StackLayout::new();
        stack.push(0, 36.0, 60);
        assert_eq!(stack.offset_for(0, 60, no_growth), 0.0);
    }

    #[test]
    fn unknown_slot_has_no_offset() {
        let mut stack = StackLayout::new();
        stack.push(0, 36.0, 60);
        assert_eq!(stack.offset_for(5, 60, no_growth), 0.0);
    }

    #[test]
    fn sibling_contribution_decays_with_own_slide_frames() {
        let mut stack = StackLayout::new();
        stack.push(0, 40.0, 60);
        stack.push(1, 30.0, 60);
        assert_eq!(stack.offset_for(1, 60, no_growth), 40.0);

        for _ in 0..30 {
            stack.advance();
        }
        assert_eq!(stack.offset_for(1, 60, no_growth), 20.0);

        for _ in 0..40 {
            stack.advance();
        }
        assert_eq!(stack.offset_for(1, 60, no_growth), 0.0);
        assert!(stack.entries().iter().all(|e| e.remaining == 0));
    }

    #[test]
    fn grow_up_sibling_uses_its_rate() {
        let mut stack = StackLayout::new();
        stack.push(0, 40.0, 60);
        stack.push(1, 30.0, 60);
        let rate = |slot: usize| (slot == 0).then_some(0.25);
        assert_eq!(stack.offset_for(1, 60, rate), 10.0);
        let rate = |slot: usize| (slot == 0).then_some(0.75);
        assert_eq!(stack.offset_for(1, 60, rate), 30.0);
    }

    #[test]
    fn contributions_sum_over_older_entries() {
        let mut stack = StackLayout::new();
        stack.push(0, 10.0, 10);
        stack.push(1, 20.0, 10);
        stack.push(2, 30.0, 10);
        assert_eq!(stack.offset_for(2, 10, no_growth), 30.0);
        assert_eq!(stack.offset_for(1, 10, no_growth), 10.0);
        assert_eq!(stack.offset_for(0, 10, no_growth), 0.0);
    }

    #[test]
    fn newer_entries_do_not_push_older_ones() {
        let mut stack = StackLayout::new();
        stack.push(0, 40.0, 60);
        stack.push(1, 30.0, 60);
        let rate = |slot: usize| (slot == 1).then_some(0.5);
        assert_eq!(stack.offset_for(0, 60, rate), 0.0);
        assert_eq!(stack.offset_for(0, 60, no_growth), 0.0);
    }

    #[test]
    fn remove_drops_entry() {
        let mut stack = StackLayout::new();
        stack.push(0, 10.0, 10);
        stack.push(1, 20.0, 10);
        stack.remove(0);
        assert_eq!(stack.len(), 1);
        assert_eq!(stack.offset_for(1, 10, no_growth), 0.0);
    }
}
