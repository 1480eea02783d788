/*
 * opsis - lib.rs
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

//! Message list view engine for mail clients.
//!
//! `opsis` takes a mutable, shared collection of mail messages belonging to
//! one folder and produces a stable, sorted, optionally thread-grouped,
//! optionally filtered, selectable projection of that collection:
//!
//! - Hold a [`Message`] with the header data a list view needs. (see module
//!   [`message`])
//! - Share messages between a [`Folder`](folder::Folder) and its views, and
//!   apply the folder's change notifications to the view. (see module
//!   [`folder`])
//! - Reconstruct reply relationships between messages from their reference
//!   identifiers. (see module [`thread`])
//! - Produce a total, thread-consistent order driven by a [`Column`]. (see
//!   modules [`sort`] and [`column`])
//! - Keep one ordered, selectable item list per folder in sync with folder
//!   deltas, preserving focus identity across rebuilds. (see module [`view`])
//! - Keep one view per folder, track the current one, and persist column and
//!   sort layouts per message class. (see modules [`manager`] and
//!   [`settings`])

#![deny(
    /* groups */
    clippy::correctness,
    clippy::suspicious,
    clippy::complexity,
    clippy::perf,
    /* restriction */
    clippy::dbg_macro,
    clippy::rc_buffer,
    /* rustdoc */
    rustdoc::broken_intra_doc_links
)]
#![allow(clippy::option_if_let_else, clippy::cognitive_complexity)]

#[macro_use]
extern crate serde_derive;
#[macro_use]
extern crate bitflags;
pub extern crate crossbeam;
pub extern crate fnv;
pub extern crate indexmap;
pub extern crate log;
pub extern crate smallvec;

/// Declare a newtype around `u64` used as a stable identity, with the trait
/// soup such identities need.
#[macro_export]
macro_rules! declare_u64_newtype {
    ($(#[$outer:meta])* $name:ident) => {
        $(#[$outer])*
        #[derive(
            Hash, Eq, PartialEq, Ord, PartialOrd, Debug, Clone, Copy, Serialize, Deserialize,
            Default,
        )]
        #[repr(transparent)]
        pub struct $name(pub u64);

        impl $name {
            pub const NULL: Self = Self(0);

            #[inline(always)]
            pub const fn to_u64(self) -> u64 {
                self.0
            }

            #[inline(always)]
            pub const fn is_null(self) -> bool {
                self.0 == 0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
                write!(fmt, "{}", self.0)
            }
        }
    };
}

pub mod color;
pub mod column;
pub mod datetime;
pub mod error;
pub mod folder;
pub mod item;
pub mod manager;
pub mod message;
pub mod parsec;
pub mod search;
pub mod settings;
pub mod sort;
pub mod thread;
pub mod view;

pub use color::{ColorRule, ColorRules};
pub use column::{Column, ColumnFlags, ColumnKind, SortKey, SortKind};
pub use datetime::UnixTimestamp;
pub use error::{Error, Result};
pub use folder::{Folder, FolderEvent, FolderHash, FolderKind};
pub use item::{ItemArena, ItemFlags, ItemHandle, ViewItem};
pub use manager::{ManagerEvent, ViewModelManager};
pub use message::{msgid_hash, Address, Flag, Message, MessageHash};
pub use search::{Filter, Query};
pub use settings::{ColumnSpec, FolderState, SelectionMode, SettingsStore, ViewSettings};
pub use sort::{SortOrder, SortSpec};
pub use view::{ViewEvent, ViewModel, ViewSnapshot};
