/*
 * opsis - thread linking module.
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
 * Reply-relationship reconstruction.
 *
 * [`link_parents`] rebuilds the parent links of a view's item set from the
 * messages' reference identifiers. Each message names the message it
 * replies to by id; candidates are found through a binary search over the
 * items ordered by message-id hash. Hash equality alone is never trusted:
 * an exact string comparison decides the match, and a link that would make
 * an item its own ancestor is dropped rather than applied.
 *
 * Linking runs over the item set the view displays. With a filter active a
 * hidden parent is simply absent here, so its visible replies stay roots.
 */

use crate::error::Result;
use crate::folder::Folder;
use crate::item::{ItemArena, ItemHandle};
use crate::message::msgid_hash;

/// One entry of the message-id-hash ordering: ties between identical hashes
/// resolve by item sequence number, so candidate lookup is deterministic.
#[derive(Debug, Clone, Copy)]
struct HashEntry {
    msgid_hash: u64,
    seq: u64,
    handle: ItemHandle,
}

/// Recompute the parent link of every item in `order`, in place. Items
/// whose reference identifier matches no present item (or only itself)
/// become roots.
pub fn link_parents(arena: &mut ItemArena, order: &[ItemHandle], folder: &Folder) -> Result<()> {
    let messages = folder.read()?;

    let mut by_msgid_hash: Vec<HashEntry> = Vec::with_capacity(order.len());
    for &handle in order {
        let item = match arena.get(handle) {
            Some(item) => item,
            None => continue,
        };
        let message = match messages.get(&item.message) {
            Some(message) => message,
            None => continue,
        };
        by_msgid_hash.push(HashEntry {
            msgid_hash: message.message_id_hash(),
            seq: item.seq,
            handle,
        });
    }
    by_msgid_hash.sort_by(|a, b| (a.msgid_hash, a.seq).cmp(&(b.msgid_hash, b.seq)));

    for &handle in order {
        if arena.get(handle).is_none() {
            continue;
        }
        if let Some(item) = arena.get_mut(handle) {
            item.parent = None;
        }

        let (reference, reference_hash) = {
            let item = match arena.get(handle) {
                Some(item) => item,
                None => continue,
            };
            let message = match messages.get(&item.message) {
                Some(message) => message,
                None => continue,
            };
            match message.reference() {
                Some(reference) => (reference.to_string(), msgid_hash(reference)),
                None => continue,
            }
        };
        if reference_hash == 0 {
            continue;
        }

        let parent = find_parent(
            arena,
            &by_msgid_hash,
            handle,
            &reference,
            reference_hash,
            |hash| {
                messages
                    .get(&hash)
                    .map(|message| message.message_id().to_string())
            },
        );
        if let Some(parent) = parent {
            if let Some(item) = arena.get_mut(handle) {
                item.parent = Some(parent);
            }
        }
    }
    Ok(())
}

/// Locate the item `reference` points at, or `None` if no present item
/// carries that message-id or accepting the link would form a cycle.
fn find_parent<F>(
    arena: &ItemArena,
    by_msgid_hash: &[HashEntry],
    item: ItemHandle,
    reference: &str,
    reference_hash: u64,
    message_id_of: F,
) -> Option<ItemHandle>
where
    F: Fn(crate::message::MessageHash) -> Option<String>,
{
    let mut pos = by_msgid_hash.partition_point(|entry| entry.msgid_hash < reference_hash);
    while let Some(entry) = by_msgid_hash.get(pos) {
        if entry.msgid_hash != reference_hash {
            break;
        }
        pos += 1;
        /* An item can never be linked as its own parent. */
        if entry.handle == item {
            continue;
        }
        /* Colliding hashes across unrelated message-ids resolve by exact
         * comparison. */
        let candidate_msgid = match arena
            .get(entry.handle)
            .and_then(|candidate| message_id_of(candidate.message))
        {
            Some(msgid) => msgid,
            None => continue,
        };
        if candidate_msgid != reference {
            continue;
        }
        /* Reject links that would close a cycle: the candidate must not
         * already descend from this item. */
        if arena.is_ancestor(item, entry.handle) {
            continue;
        }
        return Some(entry.handle);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::folder::{FolderHash, FolderKind};
    use crate::item::ViewItem;
    use crate::message::{Flag, Message, MessageHash};

    fn folder_with(messages: Vec<Message>) -> Folder {
        let folder = Folder::new(FolderHash(1), "inbox", "mail", FolderKind::Incoming);
        for message in messages {
            folder.insert(message).unwrap();
        }
        folder
    }

    fn message(hash: u64, msgid: &str, reference: Option<&str>) -> Message {
        let mut msg = Message::new(MessageHash(hash));
        msg.set_message_id(msgid);
        if let Some(reference) = reference {
            msg.push_reference(reference);
        }
        msg
    }

    fn build_items(arena: &mut ItemArena, folder: &Folder) -> Vec<ItemHandle> {
        folder
            .message_hashes()
            .unwrap()
            .into_iter()
            .map(|hash| arena.insert(ViewItem::new(hash, Flag::default())))
            .collect()
    }

    #[test]
    fn test_reply_links_to_parent() {
        let folder = folder_with(vec![
            message(1, "<a@x>", None),
            message(2, "<b@x>", Some("<a@x>")),
            message(3, "<c@x>", Some("<b@x>")),
            message(4, "<d@x>", Some("<missing@x>")),
        ]);
        let mut arena = ItemArena::new();
        let handles = build_items(&mut arena, &folder);
        link_parents(&mut arena, &handles, &folder).unwrap();

        assert_eq!(arena[handles[0]].parent, None);
        assert_eq!(arena[handles[1]].parent, Some(handles[0]));
        assert_eq!(arena[handles[2]].parent, Some(handles[1]));
        /* a reference to an absent message leaves the item a root */
        assert_eq!(arena[handles[3]].parent, None);
    }

    #[test]
    fn test_self_reference_stays_root() {
        let folder = folder_with(vec![message(1, "<a@x>", Some("<a@x>"))]);
        let mut arena = ItemArena::new();
        let handles = build_items(&mut arena, &folder);
        link_parents(&mut arena, &handles, &folder).unwrap();
        assert_eq!(arena[handles[0]].parent, None);
    }

    #[test]
    fn test_mutual_references_do_not_cycle() {
        let folder = folder_with(vec![
            message(1, "<a@x>", Some("<b@x>")),
            message(2, "<b@x>", Some("<a@x>")),
        ]);
        let mut arena = ItemArena::new();
        let handles = build_items(&mut arena, &folder);
        link_parents(&mut arena, &handles, &folder).unwrap();

        /* exactly one direction of the pair survives */
        let linked = [handles[0], handles[1]]
            .iter()
            .filter(|&&h| arena[h].parent.is_some())
            .count();
        assert_eq!(linked, 1);
        for &h in &handles {
            assert!(!walk_revisits(&arena, h));
        }
    }

    #[test]
    fn test_duplicate_message_ids_resolve_deterministically() {
        /* two items share a message-id; the reply must link to the one with
         * the lower sequence number every time */
        let folder = folder_with(vec![
            message(1, "<dup@x>", None),
            message(2, "<dup@x>", None),
            message(3, "<c@x>", Some("<dup@x>")),
        ]);
        let mut arena = ItemArena::new();
        let handles = build_items(&mut arena, &folder);
        link_parents(&mut arena, &handles, &folder).unwrap();
        assert_eq!(arena[handles[2]].parent, Some(handles[0]));

        link_parents(&mut arena, &handles, &folder).unwrap();
        assert_eq!(arena[handles[2]].parent, Some(handles[0]));
    }

    fn walk_revisits(arena: &ItemArena, start: ItemHandle) -> bool {
        let mut seen = vec![start];
        let mut current = start;
        while let Some(parent) = arena[current].parent {
            if seen.contains(&parent) {
                return true;
            }
            seen.push(parent);
            current = parent;
        }
        false
    }
}
