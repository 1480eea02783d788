/*
 * opsis - message module.
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
 * The message record a list view works with.
 *
 * A [`Message`] holds the header data a message list needs: identity, the
 * message-id and reference chain the thread linker consumes, flags, subject,
 * addresses, a label, a timestamp and a size. The raw mail itself lives
 * elsewhere; this record is what the folder collaborator shares with every
 * view that displays it.
 */

use std::fmt;
use std::hash::Hasher;

use fnv::FnvHasher;
use smallvec::SmallVec;

use crate::datetime::UnixTimestamp;

crate::declare_u64_newtype!(
    /// Stable identity of one [`Message`] within its folder.
    MessageHash
);

bitflags! {
    #[derive(Default, Serialize, Deserialize)]
    pub struct Flag: u8 {
        const SEEN    = 0b0000_0001;
        const REPLIED = 0b0000_0010;
        const FLAGGED = 0b0000_0100;
        const MARKED  = 0b0000_1000;
        const DELETED = 0b0001_0000;
        const DRAFT   = 0b0010_0000;
    }
}

macro_rules! flag_impl {
    (fn $name:ident, $val:expr) => {
        pub fn $name(&self) -> bool {
            self.contains($val)
        }
    };
}

impl Flag {
    flag_impl!(fn is_seen, Flag::SEEN);
    flag_impl!(fn is_replied, Flag::REPLIED);
    flag_impl!(fn is_flagged, Flag::FLAGGED);
    flag_impl!(fn is_marked, Flag::MARKED);
    flag_impl!(fn is_deleted, Flag::DELETED);
    flag_impl!(fn is_draft, Flag::DRAFT);
}

impl PartialEq<&str> for Flag {
    fn eq(&self, other: &&str) -> bool {
        (other.eq_ignore_ascii_case("seen") && self.contains(Flag::SEEN))
            || (other.eq_ignore_ascii_case("read") && self.contains(Flag::SEEN))
            || (other.eq_ignore_ascii_case("unseen") && !self.contains(Flag::SEEN))
            || (other.eq_ignore_ascii_case("unread") && !self.contains(Flag::SEEN))
            || (other.eq_ignore_ascii_case("replied") && self.contains(Flag::REPLIED))
            || (other.eq_ignore_ascii_case("flagged") && self.contains(Flag::FLAGGED))
            || (other.eq_ignore_ascii_case("marked") && self.contains(Flag::MARKED))
            || (other.eq_ignore_ascii_case("deleted") && self.contains(Flag::DELETED))
            || (other.eq_ignore_ascii_case("trashed") && self.contains(Flag::DELETED))
            || (other.eq_ignore_ascii_case("draft") && self.contains(Flag::DRAFT))
    }
}

/// FNV hash of a message-id string. Zero is reserved for "no identifier";
/// hash equality is necessary but never sufficient, callers must fall back
/// to an exact string comparison before trusting a match.
pub fn msgid_hash(msgid: &str) -> u64 {
    if msgid.is_empty() {
        return 0;
    }
    let mut hasher = FnvHasher::default();
    hasher.write(msgid.as_bytes());
    hasher.finish()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub display_name: String,
    pub address: String,
}

impl Address {
    pub fn new(display_name: &str, address: &str) -> Self {
        Address {
            display_name: display_name.to_string(),
            address: address.to_string(),
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.display_name.is_empty() {
            write!(f, "{}", self.address)
        } else {
            write!(f, "{} <{}>", self.display_name, self.address)
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub hash: MessageHash,
    pub message_id: String,
    pub references: SmallVec<[String; 8]>,
    pub subject: String,
    pub from: SmallVec<[Address; 1]>,
    pub to: SmallVec<[Address; 1]>,
    pub label: String,
    pub timestamp: UnixTimestamp,
    pub size: usize,
    pub flags: Flag,
}

impl Default for Message {
    fn default() -> Self {
        Message::new(MessageHash::NULL)
    }
}

impl Message {
    pub fn new(hash: MessageHash) -> Self {
        Message {
            hash,
            message_id: String::new(),
            references: SmallVec::new(),
            subject: String::new(),
            from: SmallVec::new(),
            to: SmallVec::new(),
            label: String::new(),
            timestamp: 0,
            size: 0,
            flags: Flag::default(),
        }
    }

    pub fn hash(&self) -> MessageHash {
        self.hash
    }

    pub fn message_id(&self) -> &str {
        &self.message_id
    }

    pub fn message_id_hash(&self) -> u64 {
        msgid_hash(&self.message_id)
    }

    /// The identifier of the message this one replies to: the last entry of
    /// the reference chain.
    pub fn reference(&self) -> Option<&str> {
        self.references.last().map(String::as_str)
    }

    pub fn reference_hash(&self) -> u64 {
        self.reference().map(msgid_hash).unwrap_or(0)
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn from(&self) -> &[Address] {
        self.from.as_slice()
    }

    pub fn to(&self) -> &[Address] {
        self.to.as_slice()
    }

    pub fn field_from_to_string(&self) -> String {
        join_addresses(&self.from)
    }

    pub fn field_to_to_string(&self) -> String {
        join_addresses(&self.to)
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn date(&self) -> UnixTimestamp {
        self.timestamp
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn flags(&self) -> Flag {
        self.flags
    }

    pub fn is_seen(&self) -> bool {
        self.flags.contains(Flag::SEEN)
    }

    pub fn set_message_id(&mut self, new_val: &str) -> &mut Self {
        self.message_id = new_val.trim().to_string();
        self
    }

    pub fn push_reference(&mut self, new_ref: &str) -> &mut Self {
        let new_ref = new_ref.trim();
        if new_ref.is_empty() {
            return self;
        }
        if let Some(pos) = self.references.iter().position(|r| r == new_ref) {
            if pos + 1 == self.references.len() {
                return self;
            }
            self.references.remove(pos);
        }
        self.references.push(new_ref.to_string());
        self
    }

    pub fn set_subject(&mut self, new_val: &str) -> &mut Self {
        self.subject = new_val.to_string();
        self
    }

    pub fn set_from(&mut self, new_val: SmallVec<[Address; 1]>) -> &mut Self {
        self.from = new_val;
        self
    }

    pub fn set_to(&mut self, new_val: SmallVec<[Address; 1]>) -> &mut Self {
        self.to = new_val;
        self
    }

    pub fn set_label(&mut self, new_val: &str) -> &mut Self {
        self.label = new_val.to_string();
        self
    }

    pub fn set_datetime(&mut self, new_val: UnixTimestamp) -> &mut Self {
        self.timestamp = new_val;
        self
    }

    pub fn set_size(&mut self, new_val: usize) -> &mut Self {
        self.size = new_val;
        self
    }

    pub fn set_flag(&mut self, f: Flag, value: bool) -> &mut Self {
        self.flags.set(f, value);
        self
    }

    pub fn set_flags(&mut self, f: Flag) -> &mut Self {
        self.flags = f;
        self
    }
}

impl Eq for Message {}

impl PartialEq for Message {
    fn eq(&self, other: &Message) -> bool {
        self.hash == other.hash
    }
}

fn join_addresses(list: &[Address]) -> String {
    list.iter().fold(String::new(), |mut acc, x| {
        if !acc.is_empty() {
            acc.push_str(", ");
        }
        acc.push_str(&x.to_string());
        acc
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_msgid_hash() {
        assert_eq!(msgid_hash(""), 0);
        assert_eq!(msgid_hash("<a@b>"), msgid_hash("<a@b>"));
        assert_ne!(msgid_hash("<a@b>"), msgid_hash("<b@a>"));
    }

    #[test]
    fn test_reference_chain() {
        let mut msg = Message::new(MessageHash(1));
        assert!(msg.reference().is_none());
        msg.push_reference("<root@example.com>")
            .push_reference("<mid@example.com>");
        assert_eq!(msg.reference(), Some("<mid@example.com>"));
        /* re-pushing an existing entry moves it to the tail instead of
         * duplicating it */
        msg.push_reference("<root@example.com>");
        assert_eq!(msg.references.len(), 2);
        assert_eq!(msg.reference(), Some("<root@example.com>"));
    }

    #[test]
    fn test_flag_str_eq() {
        let mut flags = Flag::default();
        assert!(flags == "unseen");
        flags.set(Flag::SEEN, true);
        assert!(flags == "seen");
        assert!(flags == "read");
        assert!(!(flags == "flagged"));
    }
}
