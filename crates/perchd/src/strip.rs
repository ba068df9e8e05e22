use perchd_core::item::{Container, Item, ItemId};

/// A commit could not find room for every item involved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitError {
    CapacityExceeded,
}

/// The fixed-capacity seat strip. Seats are indexed 0..capacity; every seat is
/// either empty or holds exactly one item. All mutation goes through the
/// commit/relocate operations here so the seat invariants hold in one place.
#[derive(Debug)]
pub struct Strip {
    seats: Vec<Option<Item>>,
}

impl Strip {
    pub fn new(capacity: usize) -> Self {
        Self {
            seats: (0..capacity).map(|_| None).collect(),
        }
    }

    /// Seed a strip from persisted items. Each item lands on its recorded
    /// seat when free, otherwise on the first empty seat; items that fit
    /// nowhere are dropped.
    pub fn from_items(capacity: usize, items: Vec<Item>) -> Self {
        let mut strip = Self::new(capacity);
        for mut item in items {
            let seat = match item.slot {
                Some(seat) if seat < capacity && strip.seats[seat].is_none() => Some(seat),
                _ => strip.first_empty(),
            };
            if let Some(seat) = seat {
                item.container = Container::Strip;
                item.visible = true;
                strip.seats[seat] = Some(item);
            }
        }
        strip.sync_slots();
        strip
    }

    pub fn capacity(&self) -> usize {
        self.seats.len()
    }

    pub fn get(&self, seat: usize) -> Option<&Item> {
        self.seats.get(seat).and_then(|s| s.as_ref())
    }

    pub fn visible_count(&self) -> usize {
        self.seats
            .iter()
            .filter(|s| s.as_ref().is_some_and(|i| i.visible))
            .count()
    }

    pub fn occupied_count(&self) -> usize {
        self.seats.iter().filter(|s| s.is_some()).count()
    }

    pub fn find_seat(&self, id: ItemId) -> Option<usize> {
        self.seats
            .iter()
            .position(|s| s.as_ref().is_some_and(|i| i.id == id))
    }

    /// First seat occupied by a hidden entry (a mid-drag placeholder).
    pub fn hidden_seat(&self) -> Option<usize> {
        self.seats
            .iter()
            .position(|s| s.as_ref().is_some_and(|i| !i.visible))
    }

    pub fn first_empty(&self) -> Option<usize> {
        self.seats.iter().position(|s| s.is_none())
    }

    /// Empty seat closest to `seat`, ties broken toward lower indices.
    pub fn nearest_empty(&self, seat: usize) -> Option<usize> {
        self.seats
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_none())
            .min_by_key(|(i, _)| seat.abs_diff(*i))
            .map(|(i, _)| i)
    }

    pub fn set_visible(&mut self, seat: usize, visible: bool) {
        if let Some(Some(item)) = self.seats.get_mut(seat) {
            item.visible = visible;
        }
    }

    /// Move the occupant of `from` so it ends up at index `to`, shifting the
    /// seats in between by one. A single remove + insert; never a re-sort.
    pub fn relocate(&mut self, from: usize, to: usize) {
        if from == to || from >= self.seats.len() || to >= self.seats.len() {
            return;
        }
        let entry = self.seats.remove(from);
        self.seats.insert(to, entry);
        self.sync_slots();
    }

    /// Make `seat` empty by sliding an existing empty seat into its place.
    /// Returns false when the strip has no empty seat at all.
    pub fn make_room_at(&mut self, seat: usize) -> bool {
        if self.seats[seat].is_none() {
            return true;
        }
        let Some(empty) = self.first_empty() else {
            return false;
        };
        self.seats.remove(empty);
        self.seats.insert(seat, None);
        self.sync_slots();
        true
    }

    /// Place a hidden placeholder occupying `seat`, reserving it for an
    /// in-flight external drag.
    pub fn reserve_placeholder(&mut self, mut item: Item, seat: usize) -> bool {
        if self.find_seat(item.id).is_some() || !self.make_room_at(seat) {
            return false;
        }
        item.container = Container::Strip;
        item.visible = false;
        self.seats[seat] = Some(item);
        self.sync_slots();
        true
    }

    /// Place `item` at `seat` (clamped to capacity), evicting a different
    /// occupant to the nearest empty seat. Placing an item already on that
    /// seat is a no-op apart from marking it visible.
    pub fn commit_placement(&mut self, mut item: Item, seat: usize) -> Result<usize, CommitError> {
        let seat = seat.min(self.capacity().saturating_sub(1));

        if let Some(current) = self.find_seat(item.id) {
            self.relocate(current, seat);
            if let Some(entry) = &mut self.seats[seat] {
                entry.visible = true;
                entry.container = Container::Strip;
            }
            self.sync_slots();
            return Ok(seat);
        }

        if self.seats[seat].is_some() {
            let empty = self
                .nearest_empty(seat)
                .ok_or(CommitError::CapacityExceeded)?;
            let occupant = self.seats[seat].take();
            self.seats[empty] = occupant;
        }
        item.container = Container::Strip;
        item.visible = true;
        self.seats[seat] = Some(item);
        self.sync_slots();
        Ok(seat)
    }

    /// Place a batch after its primary item: batch member `i` (0-based) takes
    /// seat `(base + i + 1) % capacity`, consuming one empty seat per member
    /// so no two members ever share a seat.
    pub fn commit_batch(&mut self, base: usize, batch: Vec<Item>) -> Result<Vec<usize>, CommitError> {
        let cap = self.capacity();
        let mut placed = Vec::with_capacity(batch.len());
        for (i, mut item) in batch.into_iter().enumerate() {
            let target = (base + i + 1) % cap;
            if !self.make_room_at(target) {
                return Err(CommitError::CapacityExceeded);
            }
            item.container = Container::Strip;
            item.visible = true;
            self.seats[target] = Some(item);
            placed.push(target);
        }
        self.sync_slots();
        Ok(placed)
    }

    /// Replace the shortcut at `target_seat` with a new folder containing it
    /// and the dragged shortcut (plus any batch members). The dragged item's
    /// own seat is freed. Returns the folder's seat, or None if either side
    /// is not a shortcut.
    pub fn commit_folder_creation(
        &mut self,
        mut dragged: Item,
        target_seat: usize,
        folder_id: ItemId,
        batch: Vec<Item>,
    ) -> Option<usize> {
        let dest_ok = self
            .get(target_seat)
            .is_some_and(|i| i.is_shortcut() && i.visible && i.id != dragged.id);
        if !dest_ok || !dragged.is_shortcut() {
            return None;
        }

        if let Some(seat) = self.find_seat(dragged.id) {
            self.seats[seat] = None;
        }
        let mut dest = self.seats[target_seat].take()?;
        dest.visible = true;
        dragged.visible = true;

        let mut folder = Item::folder(folder_id, "Unnamed folder", vec![dest, dragged]);
        for mut member in batch {
            if let Some(seat) = self.find_seat(member.id) {
                self.seats[seat] = None;
            }
            member.visible = true;
            folder.absorb(member);
        }
        self.seats[target_seat] = Some(folder);
        self.sync_slots();
        Some(target_seat)
    }

    /// Append the dragged shortcut (plus batch members) to the folder at
    /// `target_seat`. The acceptance check is re-run defensively; false means
    /// nothing changed.
    pub fn commit_merge(&mut self, mut dragged: Item, target_seat: usize, batch: Vec<Item>) -> bool {
        let accepts = self
            .get(target_seat)
            .is_some_and(|f| f.accepts(&dragged));
        if !accepts {
            return false;
        }

        if let Some(seat) = self.find_seat(dragged.id) {
            self.seats[seat] = None;
        }
        let batch_seats: Vec<Option<usize>> =
            batch.iter().map(|b| self.find_seat(b.id)).collect();
        for seat in batch_seats.into_iter().flatten() {
            self.seats[seat] = None;
        }

        let Some(folder) = self.seats[target_seat].as_mut() else {
            return false;
        };
        dragged.visible = true;
        folder.absorb(dragged);
        for mut member in batch {
            member.visible = true;
            folder.absorb(member);
        }
        self.sync_slots();
        true
    }

    /// Drop hidden leftovers (stale placeholders) and renumber every
    /// surviving occupant. Idempotent; run at the end of every gesture.
    pub fn sweep_hidden(&mut self) {
        for seat in &mut self.seats {
            if seat.as_ref().is_some_and(|i| !i.visible) {
                *seat = None;
            }
        }
        self.sync_slots();
    }

    pub fn visible_items(&self) -> impl Iterator<Item = (usize, &Item)> {
        self.seats
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.as_ref().map(|item| (i, item)))
            .filter(|(_, item)| item.visible)
    }

    pub fn occupants(&self) -> impl Iterator<Item = (usize, &Item)> {
        self.seats
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.as_ref().map(|item| (i, item)))
    }

    fn sync_slots(&mut self) {
        for (i, seat) in self.seats.iter_mut().enumerate() {
            if let Some(item) = seat {
                item.slot = Some(i);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shortcut(id: ItemId) -> Item {
        Item::shortcut(id, format!("app-{id}"))
    }

    /// Strip of [A=1, B=2, _, _, C=3], the recurring test layout.
    fn sample_strip() -> Strip {
        let mut strip = Strip::new(5);
        strip.commit_placement(shortcut(1), 0).unwrap();
        strip.commit_placement(shortcut(2), 1).unwrap();
        strip.commit_placement(shortcut(3), 4).unwrap();
        strip
    }

    fn ids(strip: &Strip) -> Vec<Option<ItemId>> {
        (0..strip.capacity())
            .map(|i| strip.get(i).map(|item| item.id))
            .collect()
    }

    // --- placement ---

    #[test]
    fn placement_fills_empty_seat() {
        let mut strip = sample_strip();
        strip.commit_placement(shortcut(4), 2).unwrap();
        assert_eq!(ids(&strip), vec![Some(1), Some(2), Some(4), None, Some(3)]);
        assert_eq!(strip.get(2).unwrap().slot, Some(2));
    }

    #[test]
    fn placement_is_idempotent() {
        let mut strip = sample_strip();
        strip.commit_placement(shortcut(4), 2).unwrap();
        let before = ids(&strip);
        strip.commit_placement(shortcut(4), 2).unwrap();
        assert_eq!(ids(&strip), before);
    }

    #[test]
    fn placement_clamps_seat_to_capacity() {
        let mut strip = sample_strip();
        strip.commit_placement(shortcut(4), 99).unwrap();
        // seat 4 occupied by C, which gets evicted to the nearest empty seat
        assert_eq!(strip.find_seat(4), Some(4));
        assert_eq!(strip.find_seat(3), Some(3));
    }

    #[test]
    fn placement_evicts_occupant_to_nearest_empty() {
        let mut strip = sample_strip();
        strip.commit_placement(shortcut(4), 1).unwrap();
        assert_eq!(strip.find_seat(4), Some(1));
        // B was at 1; nearest empty to 1 is 2
        assert_eq!(strip.find_seat(2), Some(2));
    }

    #[test]
    fn placement_fails_when_full() {
        let mut strip = sample_strip();
        strip.commit_placement(shortcut(4), 2).unwrap();
        strip.commit_placement(shortcut(5), 3).unwrap();
        let err = strip.commit_placement(shortcut(6), 0).unwrap_err();
        assert_eq!(err, CommitError::CapacityExceeded);
        assert_eq!(strip.visible_count(), 5);
    }

    #[test]
    fn placement_of_existing_item_relocates() {
        let mut strip = sample_strip();
        strip.commit_placement(shortcut(1), 3).unwrap();
        // A moved from 0 toward 3; B slides left into the vacated run
        assert_eq!(strip.find_seat(1), Some(3));
        assert_eq!(strip.visible_count(), 3);
    }

    #[test]
    fn visible_population_never_exceeds_capacity() {
        let mut strip = Strip::new(3);
        for id in 0..10 {
            let _ = strip.commit_placement(shortcut(id), (id % 3) as usize);
        }
        assert!(strip.visible_count() <= 3);
    }

    // --- relocate ---

    #[test]
    fn relocate_forward_shifts_between() {
        let mut strip = sample_strip();
        strip.relocate(0, 3);
        assert_eq!(ids(&strip), vec![Some(2), None, None, Some(1), Some(3)]);
    }

    #[test]
    fn relocate_backward_shifts_between() {
        let mut strip = sample_strip();
        strip.relocate(4, 0);
        assert_eq!(ids(&strip), vec![Some(3), Some(1), Some(2), None, None]);
    }

    #[test]
    fn relocate_same_seat_is_noop() {
        let mut strip = sample_strip();
        let before = ids(&strip);
        strip.relocate(1, 1);
        assert_eq!(ids(&strip), before);
    }

    #[test]
    fn relocate_updates_slots() {
        let mut strip = sample_strip();
        strip.relocate(0, 3);
        for (seat, item) in strip.occupants() {
            assert_eq!(item.slot, Some(seat));
        }
    }

    // --- room making / placeholders ---

    #[test]
    fn make_room_at_empty_seat_is_trivial() {
        let mut strip = sample_strip();
        assert!(strip.make_room_at(2));
        assert_eq!(ids(&strip), vec![Some(1), Some(2), None, None, Some(3)]);
    }

    #[test]
    fn make_room_slides_empty_into_place() {
        let mut strip = sample_strip();
        assert!(strip.make_room_at(0));
        assert!(strip.get(0).is_none());
        assert_eq!(strip.occupied_count(), 3);
    }

    #[test]
    fn make_room_fails_when_full() {
        let mut strip = sample_strip();
        strip.commit_placement(shortcut(4), 2).unwrap();
        strip.commit_placement(shortcut(5), 3).unwrap();
        assert!(!strip.make_room_at(0));
    }

    #[test]
    fn reserve_placeholder_occupies_hidden() {
        let mut strip = sample_strip();
        assert!(strip.reserve_placeholder(shortcut(9), 1));
        assert_eq!(strip.hidden_seat(), Some(1));
        assert_eq!(strip.visible_count(), 3);
        assert_eq!(strip.occupied_count(), 4);
    }

    #[test]
    fn reserve_placeholder_refuses_duplicate() {
        let mut strip = sample_strip();
        assert!(!strip.reserve_placeholder(shortcut(1), 2));
    }

    // --- batch ---

    #[test]
    fn batch_places_after_base() {
        let mut strip = Strip::new(5);
        strip.commit_placement(shortcut(1), 0).unwrap();
        let placed = strip
            .commit_batch(0, vec![shortcut(2), shortcut(3)])
            .unwrap();
        assert_eq!(placed, vec![1, 2]);
        assert_eq!(strip.find_seat(2), Some(1));
        assert_eq!(strip.find_seat(3), Some(2));
    }

    #[test]
    fn batch_wraps_past_capacity() {
        let mut strip = Strip::new(5);
        strip.commit_placement(shortcut(1), 4).unwrap();
        let placed = strip.commit_batch(4, vec![shortcut(2)]).unwrap();
        assert_eq!(placed, vec![0]);
    }

    #[test]
    fn batch_never_doubles_up_seats() {
        let mut strip = Strip::new(5);
        strip.commit_placement(shortcut(1), 2).unwrap();
        let placed = strip
            .commit_batch(2, vec![shortcut(2), shortcut(3), shortcut(4)])
            .unwrap();
        let mut sorted = placed.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), placed.len());
        assert_eq!(strip.visible_count(), 4);
    }

    #[test]
    fn batch_fails_without_room() {
        let mut strip = sample_strip();
        strip.commit_placement(shortcut(4), 2).unwrap();
        strip.commit_placement(shortcut(5), 3).unwrap();
        assert_eq!(
            strip.commit_batch(0, vec![shortcut(6)]),
            Err(CommitError::CapacityExceeded)
        );
    }

    // --- folder creation ---

    #[test]
    fn folder_creation_replaces_target_and_frees_source() {
        let mut strip = sample_strip();
        // simulate mid-drag: A hidden on its seat
        strip.set_visible(0, false);
        let dragged = strip.get(0).unwrap().clone();
        let seat = strip.commit_folder_creation(dragged, 1, 100, Vec::new());
        assert_eq!(seat, Some(1));
        assert!(strip.get(0).is_none());
        let folder = strip.get(1).unwrap();
        assert!(folder.is_folder());
        let member_ids: Vec<ItemId> = folder.members.iter().map(|m| m.id).collect();
        assert_eq!(member_ids, vec![2, 1]);
    }

    #[test]
    fn folder_creation_refuses_folder_target() {
        let mut strip = sample_strip();
        strip
            .commit_folder_creation(strip.get(0).unwrap().clone(), 1, 100, Vec::new())
            .unwrap();
        // seat 1 now holds a folder; creating over it must refuse
        let other = shortcut(7);
        assert_eq!(strip.commit_folder_creation(other, 1, 101, Vec::new()), None);
    }

    #[test]
    fn folder_creation_absorbs_batch() {
        let mut strip = sample_strip();
        let dragged = strip.get(0).unwrap().clone();
        let batch = vec![shortcut(8), shortcut(9)];
        strip.commit_folder_creation(dragged, 1, 100, batch).unwrap();
        let folder = strip.get(1).unwrap();
        assert_eq!(folder.members.len(), 4);
    }

    // --- merge ---

    #[test]
    fn merge_appends_member_and_frees_source() {
        let mut strip = sample_strip();
        let dragged = strip.get(0).unwrap().clone();
        strip.commit_folder_creation(dragged, 1, 100, Vec::new()).unwrap();
        let c = strip.get(4).unwrap().clone();
        assert!(strip.commit_merge(c, 1, Vec::new()));
        assert!(strip.get(4).is_none());
        assert_eq!(strip.get(1).unwrap().members.len(), 3);
    }

    #[test]
    fn merge_refuses_non_folder_target() {
        let mut strip = sample_strip();
        let c = strip.get(4).unwrap().clone();
        assert!(!strip.commit_merge(c, 0, Vec::new()));
        assert_eq!(strip.find_seat(3), Some(4));
    }

    // --- sweep ---

    #[test]
    fn sweep_drops_hidden_entries() {
        let mut strip = sample_strip();
        strip.reserve_placeholder(shortcut(9), 2);
        strip.sweep_hidden();
        assert_eq!(strip.occupied_count(), 3);
        assert_eq!(strip.hidden_seat(), None);
    }

    #[test]
    fn sweep_is_idempotent() {
        let mut strip = sample_strip();
        strip.sweep_hidden();
        let before = ids(&strip);
        strip.sweep_hidden();
        assert_eq!(ids(&strip), before);
    }

    // --- from_items ---

    #[test]
    fn from_items_honors_recorded_seats() {
        let mut a = shortcut(1);
        a.slot = Some(3);
        let mut b = shortcut(2);
        b.slot = Some(0);
        let strip = Strip::from_items(5, vec![a, b]);
        assert_eq!(strip.find_seat(1), Some(3));
        assert_eq!(strip.find_seat(2), Some(0));
    }

    #[test]
    fn from_items_resolves_collisions_to_first_empty() {
        let mut a = shortcut(1);
        a.slot = Some(0);
        let mut b = shortcut(2);
        b.slot = Some(0);
        let strip = Strip::from_items(5, vec![a, b]);
        assert_eq!(strip.find_seat(1), Some(0));
        assert_eq!(strip.find_seat(2), Some(1));
    }

    #[test]
    fn from_items_drops_overflow() {
        let items = (0..7).map(shortcut).collect();
        let strip = Strip::from_items(5, items);
        assert_eq!(strip.visible_count(), 5);
    }
}
