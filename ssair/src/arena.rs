use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::ops::{Index, IndexMut};

/// Handle of a node in a `SlotArena`. The generation distinguishes a live
/// node from an earlier occupant of the same slot.
pub struct Handle<T> {
    index: u32,
    generation: u32,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Handle<T> {
    pub fn index(self) -> usize {
        self.index as usize
    }

    pub fn generation(self) -> u32 {
        self.generation
    }
}

impl<T> Copy for Handle<T> {}

impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index && self.generation == other.generation
    }
}

impl<T> Eq for Handle<T> {}

impl<T> PartialOrd for Handle<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Handle<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.index, self.generation).cmp(&(other.index, other.generation))
    }
}

impl<T> Hash for Handle<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.index.hash(state);
        self.generation.hash(state);
    }
}

impl<T> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "#{}.{}", self.index, self.generation)
    }
}

struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

/// Vector of slots plus a stack of free slot indices. Released slots are
/// handed out again by later allocations with a bumped generation, so stale
/// handles are caught on access.
pub struct SlotArena<T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    len: usize,
}

impl<T> SlotArena<T> {
    pub fn new() -> SlotArena<T> {
        SlotArena {
            slots: Vec::new(),
            free: Vec::new(),
            len: 0,
        }
    }

    pub fn alloc(&mut self, value: T) -> Handle<T> {
        self.len += 1;

        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            debug_assert!(slot.value.is_none());
            slot.value = Some(value);

            Handle {
                index,
                generation: slot.generation,
                _marker: PhantomData,
            }
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 0,
                value: Some(value),
            });

            Handle {
                index,
                generation: 0,
                _marker: PhantomData,
            }
        }
    }

    /// Releases the node and returns it. The slot goes back on the free stack.
    pub fn free(&mut self, handle: Handle<T>) -> T {
        let slot = &mut self.slots[handle.index()];
        assert_eq!(slot.generation, handle.generation, "stale handle {:?}", handle);
        let value = match slot.value.take() {
            Some(value) => value,
            None => panic!("double free of {:?}", handle),
        };
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(handle.index);
        self.len -= 1;
        value
    }

    pub fn contains(&self, handle: Handle<T>) -> bool {
        match self.slots.get(handle.index()) {
            Some(slot) => slot.generation == handle.generation && slot.value.is_some(),
            None => false,
        }
    }

    pub fn get(&self, handle: Handle<T>) -> Option<&T> {
        let slot = self.slots.get(handle.index())?;
        if slot.generation == handle.generation {
            slot.value.as_ref()
        } else {
            None
        }
    }

    pub fn get_mut(&mut self, handle: Handle<T>) -> Option<&mut T> {
        let slot = self.slots.get_mut(handle.index())?;
        if slot.generation == handle.generation {
            slot.value.as_mut()
        } else {
            None
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of slots ever allocated, live or free.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Handle<T>, &T)> + '_ {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.value.as_ref().map(|value| {
                (
                    Handle {
                        index: index as u32,
                        generation: slot.generation,
                        _marker: PhantomData,
                    },
                    value,
                )
            })
        })
    }

    pub fn handles(&self) -> Vec<Handle<T>> {
        self.iter().map(|(handle, _)| handle).collect()
    }
}

impl<T> Default for SlotArena<T> {
    fn default() -> SlotArena<T> {
        SlotArena::new()
    }
}

impl<T> Index<Handle<T>> for SlotArena<T> {
    type Output = T;

    fn index(&self, handle: Handle<T>) -> &T {
        match self.get(handle) {
            Some(value) => value,
            None => panic!("access through stale handle {:?}", handle),
        }
    }
}

impl<T> IndexMut<Handle<T>> for SlotArena<T> {
    fn index_mut(&mut self, handle: Handle<T>) -> &mut T {
        match self.get_mut(handle) {
            Some(value) => value,
            None => panic!("access through stale handle {:?}", handle),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alloc_and_free() {
        let mut arena = SlotArena::new();
        let a = arena.alloc(1);
        let b = arena.alloc(2);
        assert_eq!(2, arena.len());
        assert_eq!(1, arena[a]);
        assert_eq!(2, arena[b]);

        assert_eq!(1, arena.free(a));
        assert_eq!(1, arena.len());
        assert!(!arena.contains(a));
        assert!(arena.contains(b));
    }

    #[test]
    fn test_freed_slot_is_reused_with_new_generation() {
        let mut arena = SlotArena::new();
        let a = arena.alloc("a");
        arena.free(a);
        let c = arena.alloc("c");

        assert_eq!(a.index(), c.index());
        assert_ne!(a, c);
        assert_eq!(None, arena.get(a));
        assert_eq!(Some(&"c"), arena.get(c));
        assert_eq!(1, arena.capacity());
    }

    #[test]
    #[should_panic]
    fn test_stale_handle_panics() {
        let mut arena = SlotArena::new();
        let a = arena.alloc(10);
        arena.free(a);
        arena.alloc(20);
        let _ = arena[a];
    }

    #[test]
    fn test_iter_skips_free_slots() {
        let mut arena = SlotArena::new();
        let a = arena.alloc(1);
        let b = arena.alloc(2);
        let c = arena.alloc(3);
        arena.free(b);

        assert_eq!(vec![a, c], arena.handles());
        let values: Vec<i32> = arena.iter().map(|(_, v)| *v).collect();
        assert_eq!(vec![1, 3], values);
    }
}
