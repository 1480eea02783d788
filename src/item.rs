/*
 * opsis - view item module.
 *
 * Copyright 2026 Opsis contributors
 *
 * This file is part of opsis.
 *
 * opsis is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * opsis is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with opsis. If not, see <http://www.gnu.org/licenses/>.
 */

/*!
 * Per-message view records and the arena that owns them.
 *
 * A [`ViewItem`] is the derived record one view keeps per visible message:
 * the parent link reconstructed by the thread linker, selection and focus
 * bits, a cached color and a cached copy of the message's flags. Items live
 * in an [`ItemArena`] and refer to each other through [`ItemHandle`]s, so a
 * removed item can never leave a dangling reference behind — a stale handle
 * simply stops resolving.
 */

use std::ops::Index;

use fnv::FnvHashMap;

use crate::message::{Flag, MessageHash};

crate::declare_u64_newtype!(
    /// Stable handle of one [`ViewItem`] inside its arena.
    ItemHandle
);

bitflags! {
    #[derive(Default, Serialize, Deserialize)]
    pub struct ItemFlags: u8 {
        const SELECTED = 0b01;
        const FOCUSED  = 0b10;
    }
}

#[derive(Debug, Clone)]
pub struct ViewItem {
    pub message: MessageHash,
    pub parent: Option<ItemHandle>,
    pub flags: ItemFlags,
    /// First matching color rule, evaluated lazily.
    pub color: Option<u32>,
    /// Copy of the message's flags taken when the item was last refreshed,
    /// compared against the live flags to detect relevant changes cheaply.
    pub message_flags: Flag,
    /// Creation sequence number; the stable tie-break of the sorter.
    pub seq: u64,
}

impl ViewItem {
    pub fn new(message: MessageHash, message_flags: Flag) -> Self {
        ViewItem {
            message,
            parent: None,
            flags: ItemFlags::empty(),
            color: None,
            message_flags,
            seq: 0,
        }
    }

    pub fn is_selected(&self) -> bool {
        self.flags.contains(ItemFlags::SELECTED)
    }

    pub fn is_focused(&self) -> bool {
        self.flags.contains(ItemFlags::FOCUSED)
    }

    pub fn set_flags(&mut self, flags: ItemFlags, mask: ItemFlags) {
        self.flags = (flags & mask) | (self.flags & !mask);
    }
}

#[derive(Debug, Clone, Default)]
pub struct ItemArena {
    items: FnvHashMap<ItemHandle, ViewItem>,
    next: u64,
}

impl ItemArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        ItemArena {
            items: FnvHashMap::with_capacity_and_hasher(capacity, Default::default()),
            next: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn insert(&mut self, mut item: ViewItem) -> ItemHandle {
        self.next += 1;
        let handle = ItemHandle(self.next);
        item.seq = self.next;
        self.items.insert(handle, item);
        handle
    }

    pub fn get(&self, handle: ItemHandle) -> Option<&ViewItem> {
        self.items.get(&handle)
    }

    pub fn get_mut(&mut self, handle: ItemHandle) -> Option<&mut ViewItem> {
        self.items.get_mut(&handle)
    }

    pub fn remove(&mut self, handle: ItemHandle) -> Option<ViewItem> {
        self.items.remove(&handle)
    }

    pub fn contains(&self, handle: ItemHandle) -> bool {
        self.items.contains_key(&handle)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ItemHandle, &ViewItem)> {
        self.items.iter().map(|(h, item)| (*h, item))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (ItemHandle, &mut ViewItem)> {
        self.items.iter_mut().map(|(h, item)| (*h, item))
    }

    /// Thread depth: the length of the parent chain.
    pub fn level(&self, handle: ItemHandle) -> usize {
        let mut level = 0;
        let mut current = handle;
        while let Some(parent) = self.items.get(&current).and_then(|item| item.parent) {
            level += 1;
            current = parent;
        }
        level
    }

    /// Walk `handle` up to the ancestor sitting at `level`. Callers must not
    /// ask for a level deeper than the handle's own.
    pub fn ancestor_at_level(&self, handle: ItemHandle, level: usize) -> ItemHandle {
        let mut current = handle;
        let mut depth = self.level(handle);
        while depth > level {
            current = match self.items.get(&current).and_then(|item| item.parent) {
                Some(parent) => parent,
                None => break,
            };
            depth -= 1;
        }
        current
    }

    /// Does `ancestor` appear in `handle`'s parent chain (or equal it)?
    pub fn is_ancestor(&self, ancestor: ItemHandle, handle: ItemHandle) -> bool {
        let mut current = Some(handle);
        while let Some(h) = current {
            if h == ancestor {
                return true;
            }
            current = self.items.get(&h).and_then(|item| item.parent);
        }
        false
    }
}

impl Index<ItemHandle> for ItemArena {
    type Output = ViewItem;

    fn index(&self, handle: ItemHandle) -> &ViewItem {
        self.items.get(&handle).expect("item handle out of bounds")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levels_and_ancestry() {
        let mut arena = ItemArena::new();
        let root = arena.insert(ViewItem::new(MessageHash(1), Flag::default()));
        let child = arena.insert(ViewItem::new(MessageHash(2), Flag::default()));
        let grandchild = arena.insert(ViewItem::new(MessageHash(3), Flag::default()));
        arena.get_mut(child).unwrap().parent = Some(root);
        arena.get_mut(grandchild).unwrap().parent = Some(child);

        assert_eq!(arena.level(root), 0);
        assert_eq!(arena.level(child), 1);
        assert_eq!(arena.level(grandchild), 2);
        assert_eq!(arena.ancestor_at_level(grandchild, 0), root);
        assert_eq!(arena.ancestor_at_level(grandchild, 1), child);
        assert!(arena.is_ancestor(root, grandchild));
        assert!(arena.is_ancestor(grandchild, grandchild));
        assert!(!arena.is_ancestor(grandchild, root));
    }

    #[test]
    fn test_seq_is_monotonic() {
        let mut arena = ItemArena::new();
        let a = arena.insert(ViewItem::new(MessageHash(1), Flag::default()));
        let b = arena.insert(ViewItem::new(MessageHash(2), Flag::default()));
        assert!(arena[a].seq < arena[b].seq);
    }

    #[test]
    fn test_set_flags_masked() {
        let mut item = ViewItem::new(MessageHash(1), Flag::default());
        item.set_flags(ItemFlags::SELECTED, ItemFlags::SELECTED);
        assert!(item.is_selected() && !item.is_focused());
        item.set_flags(ItemFlags::FOCUSED, ItemFlags::FOCUSED);
        assert!(item.is_selected() && item.is_focused());
        item.set_flags(ItemFlags::empty(), ItemFlags::SELECTED);
        assert!(!item.is_selected() && item.is_focused());
    }
}
