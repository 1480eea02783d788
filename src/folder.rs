/*
 * opsis - folder module.
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
 * The folder collaborator.
 *
 * A [`Folder`] is a cheaply clonable handle to one mailbox: its messages
 * live in a shared store behind a read/write lock so that a background
 * synchronization context can mutate it while a view reads it. Every
 * mutation returns the matching [`FolderEvent`] values; the caller routes
 * them to the folder's view, in production order, to keep it in sync.
 *
 * Only this module mutates messages. Views read them through
 * [`MessageRef`] guards and request changes back through the folder API
 * ([`Folder::set_flag`], [`Folder::set_label`]).
 */

use std::ops::Deref;
use std::sync::{Arc, RwLock, RwLockReadGuard};

use indexmap::IndexMap;
use smallvec::SmallVec;

use crate::error::Result;
use crate::message::{Flag, Message, MessageHash};

crate::declare_u64_newtype!(
    /// Stable identity of one [`Folder`].
    FolderHash
);

/// Mailbox direction. An outgoing-semantics folder (sent mail, drafts,
/// queue) displays the peer address instead of the author in the
/// from-or-to column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FolderKind {
    Incoming,
    Outgoing,
}

impl Default for FolderKind {
    fn default() -> Self {
        FolderKind::Incoming
    }
}

/// A change notification produced by a folder mutation. Notifications from
/// one folder must be applied in the order they were produced; there is no
/// reordering support.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FolderEvent {
    Added(MessageHash),
    Removed(MessageHash),
    Changed(MessageHash),
    Refreshed,
    UnseenCountChanged(i64),
    Destroyed,
}

pub type MessageStore = Arc<RwLock<IndexMap<MessageHash, Message>>>;

#[derive(Debug, Clone)]
pub struct Folder {
    hash: FolderHash,
    name: String,
    class: String,
    kind: FolderKind,
    messages: MessageStore,
}

/// Shared reference to one message, holding the store's read lock for its
/// lifetime.
pub struct MessageRef<'g> {
    guard: RwLockReadGuard<'g, IndexMap<MessageHash, Message>>,
    hash: MessageHash,
}

impl Deref for MessageRef<'_> {
    type Target = Message;

    fn deref(&self) -> &Message {
        /* Existence was checked before the guard was handed out. */
        self.guard.get(&self.hash).unwrap()
    }
}

impl Folder {
    pub fn new(hash: FolderHash, name: &str, class: &str, kind: FolderKind) -> Self {
        Folder {
            hash,
            name: name.to_string(),
            class: class.to_string(),
            kind,
            messages: Arc::new(RwLock::new(IndexMap::new())),
        }
    }

    pub fn hash(&self) -> FolderHash {
        self.hash
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The message-class key this folder's column/sort defaults are stored
    /// under.
    pub fn class(&self) -> &str {
        &self.class
    }

    pub fn kind(&self) -> FolderKind {
        self.kind
    }

    pub fn is_outgoing(&self) -> bool {
        self.kind == FolderKind::Outgoing
    }

    pub fn read(&self) -> Result<RwLockReadGuard<'_, IndexMap<MessageHash, Message>>> {
        Ok(self.messages.read()?)
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.read()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.read()?.is_empty())
    }

    pub fn contains(&self, hash: MessageHash) -> Result<bool> {
        Ok(self.read()?.contains_key(&hash))
    }

    /// The folder's message identities, in storage order.
    pub fn message_hashes(&self) -> Result<Vec<MessageHash>> {
        Ok(self.read()?.keys().copied().collect())
    }

    pub fn message(&self, hash: MessageHash) -> Result<Option<MessageRef<'_>>> {
        let guard = self.messages.read()?;
        if !guard.contains_key(&hash) {
            return Ok(None);
        }
        Ok(Some(MessageRef { guard, hash }))
    }

    pub fn unseen_count(&self) -> Result<usize> {
        Ok(self.read()?.values().filter(|m| !m.is_seen()).count())
    }

    pub fn insert(&self, message: Message) -> Result<SmallVec<[FolderEvent; 2]>> {
        let hash = message.hash();
        let unseen = !message.is_seen();
        self.messages.write()?.insert(hash, message);
        let mut events: SmallVec<[FolderEvent; 2]> = SmallVec::new();
        events.push(FolderEvent::Added(hash));
        if unseen {
            events.push(FolderEvent::UnseenCountChanged(1));
        }
        Ok(events)
    }

    pub fn remove(&self, hash: MessageHash) -> Result<SmallVec<[FolderEvent; 2]>> {
        let mut events: SmallVec<[FolderEvent; 2]> = SmallVec::new();
        if let Some(message) = self.messages.write()?.shift_remove(&hash) {
            events.push(FolderEvent::Removed(hash));
            if !message.is_seen() {
                events.push(FolderEvent::UnseenCountChanged(-1));
            }
        }
        Ok(events)
    }

    pub fn set_flag(
        &self,
        hash: MessageHash,
        flag: Flag,
        value: bool,
    ) -> Result<SmallVec<[FolderEvent; 2]>> {
        let mut events: SmallVec<[FolderEvent; 2]> = SmallVec::new();
        let mut guard = self.messages.write()?;
        if let Some(message) = guard.get_mut(&hash) {
            let was_seen = message.is_seen();
            message.set_flag(flag, value);
            events.push(FolderEvent::Changed(hash));
            let is_seen = message.is_seen();
            if was_seen && !is_seen {
                events.push(FolderEvent::UnseenCountChanged(1));
            } else if !was_seen && is_seen {
                events.push(FolderEvent::UnseenCountChanged(-1));
            }
        }
        Ok(events)
    }

    pub fn set_label(&self, hash: MessageHash, label: &str) -> Result<Option<FolderEvent>> {
        let mut guard = self.messages.write()?;
        if let Some(message) = guard.get_mut(&hash) {
            message.set_label(label);
            return Ok(Some(FolderEvent::Changed(hash)));
        }
        Ok(None)
    }

    /// Wholesale re-synchronization: replace the entire message set. The
    /// matching view reacts with a full rebuild.
    pub fn refresh(&self, messages: Vec<Message>) -> Result<FolderEvent> {
        let mut guard = self.messages.write()?;
        guard.clear();
        for message in messages {
            guard.insert(message.hash(), message);
        }
        Ok(FolderEvent::Refreshed)
    }

    pub fn destroy(&self) -> FolderEvent {
        FolderEvent::Destroyed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(hash: u64, seen: bool) -> Message {
        let mut msg = Message::new(MessageHash(hash));
        msg.set_flag(Flag::SEEN, seen);
        msg
    }

    #[test]
    fn test_insert_remove_events() {
        let folder = Folder::new(FolderHash(1), "inbox", "mail", FolderKind::Incoming);
        let events = folder.insert(message(1, false)).unwrap();
        assert_eq!(
            events.as_slice(),
            &[
                FolderEvent::Added(MessageHash(1)),
                FolderEvent::UnseenCountChanged(1)
            ]
        );
        let events = folder.insert(message(2, true)).unwrap();
        assert_eq!(events.as_slice(), &[FolderEvent::Added(MessageHash(2))]);
        assert_eq!(folder.unseen_count().unwrap(), 1);

        let events = folder.remove(MessageHash(1)).unwrap();
        assert_eq!(
            events.as_slice(),
            &[
                FolderEvent::Removed(MessageHash(1)),
                FolderEvent::UnseenCountChanged(-1)
            ]
        );
        /* removing an unknown message is a no-op */
        assert!(folder.remove(MessageHash(77)).unwrap().is_empty());
    }

    #[test]
    fn test_set_flag_events() {
        let folder = Folder::new(FolderHash(1), "inbox", "mail", FolderKind::Incoming);
        folder.insert(message(1, false)).unwrap();
        let events = folder.set_flag(MessageHash(1), Flag::SEEN, true).unwrap();
        assert_eq!(
            events.as_slice(),
            &[
                FolderEvent::Changed(MessageHash(1)),
                FolderEvent::UnseenCountChanged(-1)
            ]
        );
        /* no seen transition, no unseen delta */
        let events = folder
            .set_flag(MessageHash(1), Flag::FLAGGED, true)
            .unwrap();
        assert_eq!(events.as_slice(), &[FolderEvent::Changed(MessageHash(1))]);
    }
}
