/*
 * opsis - sorting module.
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
 * Column-driven, thread-aware ordering.
 *
 * A [`SortSpec`] names the column to sort by, the direction, and whether
 * items group into thread forests. The [`SortContext`] precomputes one
 * [`SortKey`](crate::column::SortKey) per item and exposes the pairwise
 * comparison the view sorts and binary-searches with.
 *
 * In thread mode every item must appear after its parent and before any
 * item outside its own subtree, so the comparator never compares two items
 * directly: it normalizes both sides to ancestors under a common parent and
 * compares those. An ancestor/descendant pair orders ancestor-first no
 * matter the direction; the direction only inverts the column comparison.
 */

use std::cmp::Ordering;
use std::str::FromStr;

use fnv::FnvHashMap;

use crate::column::{Column, SortKey};
use crate::error::Result;
use crate::folder::Folder;
use crate::item::{ItemArena, ItemHandle};

#[derive(Debug, Clone, PartialEq, Eq, Copy, Deserialize, Serialize)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl Default for SortOrder {
    fn default() -> Self {
        SortOrder::Asc
    }
}

impl FromStr for SortOrder {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim() {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct SortSpec {
    /// Index into the view's column list.
    pub column: usize,
    pub order: SortOrder,
    pub threaded: bool,
}

impl Default for SortSpec {
    fn default() -> Self {
        SortSpec {
            column: 1,
            order: SortOrder::Asc,
            threaded: false,
        }
    }
}

impl SortSpec {
    pub fn new(column: usize, order: SortOrder, threaded: bool) -> Self {
        SortSpec {
            column,
            order,
            threaded,
        }
    }
}

pub struct SortContext<'a> {
    arena: &'a ItemArena,
    keys: FnvHashMap<ItemHandle, SortKey>,
    order: SortOrder,
    threaded: bool,
}

impl<'a> SortContext<'a> {
    /// Precompute the sort key of every item currently in the arena.
    pub fn new(arena: &'a ItemArena, folder: &Folder, column: &Column, spec: SortSpec) -> Result<Self> {
        let messages = folder.read()?;
        let mut keys =
            FnvHashMap::with_capacity_and_hasher(arena.len(), Default::default());
        for (handle, item) in arena.iter() {
            let key = match messages.get(&item.message) {
                Some(message) => column.sort_key(message, folder),
                /* A message evicted mid-delta sorts as empty text until the
                 * item goes away too. */
                None => SortKey::Text(String::new()),
            };
            keys.insert(handle, key);
        }
        Ok(SortContext {
            arena,
            keys,
            order: spec.order,
            threaded: spec.threaded,
        })
    }

    /// Total order over the current item set.
    pub fn compare(&self, lhs: ItemHandle, rhs: ItemHandle) -> Ordering {
        if !self.threaded {
            return self.compare_keys(lhs, rhs);
        }

        let lhs_level = self.arena.level(lhs);
        let rhs_level = self.arena.level(rhs);
        let common = lhs_level.min(rhs_level);
        let lhs_norm = self.arena.ancestor_at_level(lhs, common);
        let rhs_norm = self.arena.ancestor_at_level(rhs, common);

        if lhs_norm == rhs_norm {
            /* One side is an ancestor of the other (or both are the same
             * item): the ancestor always sorts first. */
            return lhs_level.cmp(&rhs_level);
        }

        /* Walk both sides up in lockstep until they become siblings under a
         * common parent, then compare those siblings by column. */
        let (mut lhs_norm, mut rhs_norm) = (lhs_norm, rhs_norm);
        loop {
            let lhs_parent = self.arena[lhs_norm].parent;
            let rhs_parent = self.arena[rhs_norm].parent;
            if lhs_parent == rhs_parent {
                break;
            }
            match (lhs_parent, rhs_parent) {
                (Some(lp), Some(rp)) => {
                    lhs_norm = lp;
                    rhs_norm = rp;
                }
                /* Equal levels guarantee both chains end together. */
                _ => break,
            }
        }
        self.compare_keys(lhs_norm, rhs_norm)
    }

    fn compare_keys(&self, lhs: ItemHandle, rhs: ItemHandle) -> Ordering {
        let mut ord = match (self.keys.get(&lhs), self.keys.get(&rhs)) {
            (Some(a), Some(b)) => a.compare(b),
            (Some(_), None) => Ordering::Greater,
            (None, Some(_)) => Ordering::Less,
            (None, None) => Ordering::Equal,
        };
        if self.threaded && ord == Ordering::Equal {
            /* Binary-search insertion needs a total order; the creation
             * sequence is the stable tie-break. */
            ord = self.arena[lhs].seq.cmp(&self.arena[rhs].seq);
        }
        match self.order {
            SortOrder::Asc => ord,
            SortOrder::Desc => ord.reverse(),
        }
    }
}

/// Sort `order` in place. The sort is stable, so in non-thread mode equal
/// keys keep their previous relative order.
pub fn sort_order(order: &mut [ItemHandle], ctx: &SortContext) {
    order.sort_by(|&a, &b| ctx.compare(a, b));
}

/// The position `handle` belongs at in the already sorted `order`.
pub fn insertion_point(order: &[ItemHandle], ctx: &SortContext, handle: ItemHandle) -> usize {
    order.partition_point(|&existing| ctx.compare(existing, handle) == Ordering::Less)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::{Column, ColumnFlags, ColumnKind};
    use crate::folder::{FolderHash, FolderKind};
    use crate::item::ViewItem;
    use crate::message::{Flag, Message, MessageHash};

    fn fixture() -> (Folder, ItemArena, Vec<ItemHandle>) {
        let folder = Folder::new(FolderHash(1), "inbox", "mail", FolderKind::Incoming);
        let mut arena = ItemArena::new();
        let mut handles = Vec::new();
        for (n, ts) in [(1u64, 100u64), (2, 200), (3, 300)] {
            let mut msg = Message::new(MessageHash(n));
            msg.set_datetime(ts).set_subject("same");
            folder.insert(msg).unwrap();
            handles.push(arena.insert(ViewItem::new(MessageHash(n), Flag::default())));
        }
        (folder, arena, handles)
    }

    fn date_column() -> Column {
        Column::new("Date", ColumnKind::Date, ColumnFlags::empty(), 16)
    }

    #[test]
    fn test_flat_date_sort_both_directions() {
        let (folder, arena, mut handles) = fixture();
        handles.reverse();

        let spec = SortSpec::new(0, SortOrder::Asc, false);
        let ctx = SortContext::new(&arena, &folder, &date_column(), spec).unwrap();
        sort_order(&mut handles, &ctx);
        let dates: Vec<u64> = handles.iter().map(|&h| arena[h].message.to_u64()).collect();
        assert_eq!(dates, vec![1, 2, 3]);

        let spec = SortSpec::new(0, SortOrder::Desc, false);
        let ctx = SortContext::new(&arena, &folder, &date_column(), spec).unwrap();
        sort_order(&mut handles, &ctx);
        let dates: Vec<u64> = handles.iter().map(|&h| arena[h].message.to_u64()).collect();
        assert_eq!(dates, vec![3, 2, 1]);
    }

    #[test]
    fn test_sort_is_idempotent_on_ties() {
        let (folder, arena, mut handles) = fixture();
        let subject = Column::new("Subject", ColumnKind::Subject, ColumnFlags::empty(), 20);
        let spec = SortSpec::new(0, SortOrder::Asc, false);
        let ctx = SortContext::new(&arena, &folder, &subject, spec).unwrap();
        sort_order(&mut handles, &ctx);
        let first = handles.clone();
        sort_order(&mut handles, &ctx);
        assert_eq!(first, handles);
    }

    #[test]
    fn test_threaded_child_follows_parent() {
        let (folder, mut arena, mut handles) = fixture();
        /* message 3 (latest) replies to message 1 (earliest) */
        let parent = handles[0];
        let child = handles[2];
        arena.get_mut(child).unwrap().parent = Some(parent);

        let spec = SortSpec::new(0, SortOrder::Asc, true);
        let ctx = SortContext::new(&arena, &folder, &date_column(), spec).unwrap();
        sort_order(&mut handles, &ctx);
        let order: Vec<u64> = handles.iter().map(|&h| arena[h].message.to_u64()).collect();
        assert_eq!(order, vec![1, 3, 2]);

        /* flipping the direction reorders roots but keeps the child glued
         * behind its parent */
        let spec = SortSpec::new(0, SortOrder::Desc, true);
        let ctx = SortContext::new(&arena, &folder, &date_column(), spec).unwrap();
        sort_order(&mut handles, &ctx);
        let order: Vec<u64> = handles.iter().map(|&h| arena[h].message.to_u64()).collect();
        assert_eq!(order, vec![2, 1, 3]);
    }

    #[test]
    fn test_insertion_point_matches_sort() {
        let (folder, arena, mut handles) = fixture();
        let spec = SortSpec::new(0, SortOrder::Asc, false);
        let ctx = SortContext::new(&arena, &folder, &date_column(), spec).unwrap();
        sort_order(&mut handles, &ctx);
        let middle = handles[1];
        let rest: Vec<ItemHandle> = handles
            .iter()
            .copied()
            .filter(|&h| h != middle)
            .collect();
        assert_eq!(insertion_point(&rest, &ctx, middle), 1);
    }
}
