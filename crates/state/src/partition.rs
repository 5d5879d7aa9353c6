//! Fixed-capacity, randomly-selectable partitions of items keyed in the
//! trie (spec.md §4.2, §4.7.2): blobbers, validators, and challenge-ready
//! blobbers are each stored as a `PartitionedSet`, grounded on the original
//! source's `smartcontract/partitions` package and its
//! `(partitionIndex, itemIndex)` locator pair.
//!
//! Items are packed into fixed-size partition nodes; removing an item
//! swaps in the last item of the last partition so partitions never carry
//! gaps, matching the original's swap-remove compaction.

use parity_scale_codec::{Decode, Encode};

use meridian_api::state::{StateAccess, StateError};

/// Default items per partition. Chosen to match the original source's
/// typical blobber/validator partition size; callers needing a different
/// capacity use `PartitionedSet::with_capacity`.
pub const DEFAULT_PARTITION_CAPACITY: usize = 50;

/// Locates one item within a `PartitionedSet`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Encode, Decode)]
pub struct ItemRef {
    pub partition_index: u64,
    pub item_index: u64,
}

#[derive(Debug, Clone, Default, Encode, Decode)]
struct Meta {
    num_partitions: u64,
    last_partition_len: u64,
}

/// A named collection of items spread across fixed-capacity partitions.
pub struct PartitionedSet<T> {
    name: String,
    capacity: usize,
    _marker: std::marker::PhantomData<T>,
}

impl<T: Encode + Decode + Clone> PartitionedSet<T> {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_capacity(name, DEFAULT_PARTITION_CAPACITY)
    }

    pub fn with_capacity(name: impl Into<String>, capacity: usize) -> Self {
        Self {
            name: name.into(),
            capacity: capacity.max(1),
            _marker: std::marker::PhantomData,
        }
    }

    fn meta_key(&self) -> Vec<u8> {
        meridian_types::keys::partition_meta_key(&self.name)
    }

    fn partition_key(&self, index: u64) -> Vec<u8> {
        meridian_types::keys::partition_node_key(&self.name, index)
    }

    fn load_meta(&self, state: &dyn StateAccess) -> Result<Meta, StateError> {
        match state.get(&self.meta_key())? {
            Some(bytes) => Meta::decode(&mut bytes.as_slice())
                .map_err(|e| StateError::InvalidValue(e.to_string())),
            None => Ok(Meta::default()),
        }
    }

    fn save_meta(&self, state: &mut dyn StateAccess, meta: &Meta) -> Result<(), StateError> {
        state.insert(&self.meta_key(), &meta.encode())
    }

    fn load_partition(&self, state: &dyn StateAccess, index: u64) -> Result<Vec<T>, StateError> {
        match state.get(&self.partition_key(index))? {
            Some(bytes) => {
                Vec::<T>::decode(&mut bytes.as_slice()).map_err(|e| StateError::InvalidValue(e.to_string()))
            }
            None => Ok(Vec::new()),
        }
    }

    fn save_partition(
        &self,
        state: &mut dyn StateAccess,
        index: u64,
        items: &[T],
    ) -> Result<(), StateError> {
        state.insert(&self.partition_key(index), &items.to_vec().encode())
    }

    /// Appends `item`, opening a new partition if the current one is full.
    pub fn add(&self, state: &mut dyn StateAccess, item: T) -> Result<ItemRef, StateError> {
        let mut meta = self.load_meta(state)?;
        if meta.num_partitions == 0 || meta.last_partition_len as usize >= self.capacity {
            meta.num_partitions += 1;
            meta.last_partition_len = 0;
        }
        let partition_index = meta.num_partitions - 1;
        let mut items = self.load_partition(state, partition_index)?;
        let item_index = items.len() as u64;
        items.push(item);
        self.save_partition(state, partition_index, &items)?;

        meta.last_partition_len += 1;
        self.save_meta(state, &meta)?;

        Ok(ItemRef {
            partition_index,
            item_index,
        })
    }

    pub fn get(&self, state: &dyn StateAccess, item_ref: ItemRef) -> Result<Option<T>, StateError> {
        let items = self.load_partition(state, item_ref.partition_index)?;
        Ok(items.get(item_ref.item_index as usize).cloned())
    }

    pub fn update(
        &self,
        state: &mut dyn StateAccess,
        item_ref: ItemRef,
        item: T,
    ) -> Result<(), StateError> {
        let mut items = self.load_partition(state, item_ref.partition_index)?;
        let slot = items
            .get_mut(item_ref.item_index as usize)
            .ok_or_else(|| StateError::InvalidValue("item ref out of range".into()))?;
        *slot = item;
        self.save_partition(state, item_ref.partition_index, &items)
    }

    /// Removes the item at `item_ref`, swapping in the last item of the
    /// set's last partition to keep every partition but the last full.
    /// Returns the swapped-in item's new `ItemRef` if one moved.
    pub fn remove(
        &self,
        state: &mut dyn StateAccess,
        item_ref: ItemRef,
    ) -> Result<Option<ItemRef>, StateError> {
        let mut meta = self.load_meta(state)?;
        if meta.num_partitions == 0 {
            return Ok(None);
        }
        let last_index = meta.num_partitions - 1;
        let mut last_items = self.load_partition(state, last_index)?;
        let Some(moved_item) = last_items.pop() else {
            return Ok(None);
        };

        let moved_ref = if last_index == item_ref.partition_index
            && last_items.len() as u64 == item_ref.item_index
        {
            // Removing the last item of the last partition directly: nothing moves.
            None
        } else if last_index == item_ref.partition_index {
            // Removed slot is inside the last partition; overwrite and shrink.
            if let Some(slot) = last_items.get_mut(item_ref.item_index as usize) {
                *slot = moved_item;
            }
            Some(item_ref)
        } else {
            let mut target_items = self.load_partition(state, item_ref.partition_index)?;
            if let Some(slot) = target_items.get_mut(item_ref.item_index as usize) {
                *slot = moved_item;
            }
            self.save_partition(state, item_ref.partition_index, &target_items)?;
            Some(item_ref)
        };

        self.save_partition(state, last_index, &last_items)?;

        meta.last_partition_len = last_items.len() as u64;
        if meta.last_partition_len == 0 && meta.num_partitions > 1 {
            state.delete(&self.partition_key(last_index))?;
            meta.num_partitions -= 1;
            let new_last = self.load_partition(state, meta.num_partitions - 1)?;
            meta.last_partition_len = new_last.len() as u64;
        }
        self.save_meta(state, &meta)?;

        Ok(moved_ref)
    }

    pub fn len(&self, state: &dyn StateAccess) -> Result<u64, StateError> {
        let meta = self.load_meta(state)?;
        if meta.num_partitions == 0 {
            return Ok(0);
        }
        Ok((meta.num_partitions - 1) * self.capacity as u64 + meta.last_partition_len)
    }

    pub fn is_empty(&self, state: &dyn StateAccess) -> Result<bool, StateError> {
        Ok(self.len(state)? == 0)
    }

    /// Deterministically selects one item using `seed`, so every replaying
    /// node picks the same item for the same round seed (spec.md §4.7.2's
    /// blobber/validator selection).
    pub fn random_item(
        &self,
        state: &dyn StateAccess,
        seed: u64,
    ) -> Result<Option<(ItemRef, T)>, StateError> {
        let total = self.len(state)?;
        if total == 0 {
            return Ok(None);
        }
        let pick = splitmix64(seed) % total;
        let meta = self.load_meta(state)?;
        let (mut partition_index, mut remaining) = (0u64, pick);
        loop {
            let partition_len = if partition_index == meta.num_partitions - 1 {
                meta.last_partition_len
            } else {
                self.capacity as u64
            };
            if remaining < partition_len {
                let item_ref = ItemRef {
                    partition_index,
                    item_index: remaining,
                };
                let item = self
                    .get(state, item_ref)?
                    .ok_or_else(|| StateError::InvalidValue("random_item selected a gap".into()))?;
                return Ok(Some((item_ref, item)));
            }
            remaining -= partition_len;
            partition_index += 1;
        }
    }

    /// Draws up to `count` distinct items, deterministically from `seed`.
    pub fn random_distinct(
        &self,
        state: &dyn StateAccess,
        seed: u64,
        count: usize,
    ) -> Result<Vec<(ItemRef, T)>, StateError> {
        let total = self.len(state)? as usize;
        let mut picked = std::collections::BTreeSet::new();
        let mut out = Vec::new();
        for attempt in 0..(total.max(count) * 4).max(1) {
            if out.len() >= count || picked.len() >= total {
                break;
            }
            let derived = splitmix64(seed ^ (attempt as u64).wrapping_mul(0x9E3779B97F4A7C15));
            if let Some((item_ref, item)) = self.random_item(state, derived)? {
                let key = (item_ref.partition_index, item_ref.item_index);
                if picked.insert(key) {
                    out.push((item_ref, item));
                }
            }
        }
        Ok(out)
    }
}

/// A small, fast, deterministic mixing function (Steele/Vigna's splitmix64)
/// used to derive pseudo-random indices from a round seed without pulling
/// in a general-purpose RNG whose output could differ across targets.
fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E3779B97F4A7C15);
    let mut z = x;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^ (z >> 31)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trie_backend::TrieStateAccess;
    use meridian_trie::prelude::InMemoryTrieNodeStore;

    #[test]
    fn add_then_get_roundtrips() {
        let store = InMemoryTrieNodeStore::new();
        let mut access = TrieStateAccess::new(&store, None);
        let set: PartitionedSet<u64> = PartitionedSet::with_capacity("blobbers", 2);

        let a = set.add(&mut access, 100).expect("add");
        let b = set.add(&mut access, 200).expect("add");
        assert_eq!(set.get(&access, a).expect("get"), Some(100));
        assert_eq!(set.get(&access, b).expect("get"), Some(200));
        assert_eq!(set.len(&access).expect("len"), 2);
    }

    #[test]
    fn exceeding_capacity_opens_a_new_partition() {
        let store = InMemoryTrieNodeStore::new();
        let mut access = TrieStateAccess::new(&store, None);
        let set: PartitionedSet<u64> = PartitionedSet::with_capacity("validators", 2);

        let refs: Vec<ItemRef> = (0..5)
            .map(|i| set.add(&mut access, i).expect("add"))
            .collect();
        assert_eq!(refs[2].partition_index, 1);
        assert_eq!(set.len(&access).expect("len"), 5);
    }

    #[test]
    fn remove_compacts_by_swapping_last_item() {
        let store = InMemoryTrieNodeStore::new();
        let mut access = TrieStateAccess::new(&store, None);
        let set: PartitionedSet<u64> = PartitionedSet::with_capacity("validators", 2);

        let a = set.add(&mut access, 10).expect("add");
        set.add(&mut access, 20).expect("add");
        let c = set.add(&mut access, 30).expect("add");

        set.remove(&mut access, a).expect("remove");
        assert_eq!(set.len(&access).expect("len"), 2);
        // `c` (30), the last item, should now have moved into `a`'s old slot.
        assert_eq!(set.get(&access, a).expect("get"), Some(30));
        let _ = c;
    }

    #[test]
    fn random_item_is_deterministic_for_the_same_seed() {
        let store = InMemoryTrieNodeStore::new();
        let mut access = TrieStateAccess::new(&store, None);
        let set: PartitionedSet<u64> = PartitionedSet::with_capacity("blobbers", 3);
        for i in 0..7u64 {
            set.add(&mut access, i).expect("add");
        }

        let first = set.random_item(&access, 42).expect("random_item");
        let second = set.random_item(&access, 42).expect("random_item");
        assert_eq!(first, second);
    }
}
