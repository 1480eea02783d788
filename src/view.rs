/*
 * opsis - view model module.
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
 * The per-folder view model.
 *
 * A [`ViewModel`] owns the ordered, selectable projection of one folder:
 * which messages are visible (filter), how they are ordered (sort spec and
 * thread links), and which rows are selected and focused. It consumes the
 * folder's [`FolderEvent`]s and emits [`ViewEvent`]s to its subscribers.
 *
 * Every mutation needs `&mut self`, so all notifications for a folder
 * serialize through the view's single owner and a mutation can never
 * re-enter another one. Multi-step readers take a [`ViewSnapshot`] instead
 * of holding a lock across calls.
 *
 * A full rebuild is all-or-nothing: the new item list is built aside and
 * swapped in only once every fallible step has succeeded, so a failed
 * rebuild leaves the previous list intact.
 */

use crossbeam::channel::{unbounded, Receiver, Sender};

use crate::color::ColorRules;
use crate::column::Column;
use crate::error::{Error, Result};
use crate::folder::{Folder, FolderEvent};
use crate::item::{ItemArena, ItemFlags, ItemHandle, ViewItem};
use crate::message::MessageHash;
use crate::search::Filter;
use crate::settings::{FolderState, SelectionMode, SettingsStore, ViewSettings};
use crate::sort::{insertion_point, sort_order, SortContext, SortSpec};
use crate::thread::link_parents;

/// Change notification emitted by a view model. Indices refer to the view's
/// order at the time the event was fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewEvent {
    ItemAdded(usize),
    ItemRemoved(usize),
    ItemChanged(usize),
    SelectionChanged(usize),
    Sorted,
    /// A full rebuild replaced the item list.
    Updated,
    Destroyed,
}

/// One row of a [`ViewSnapshot`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotRow {
    pub message: MessageHash,
    pub level: usize,
    pub flags: ItemFlags,
}

/// An immutable copy of a view's order and selection state, for readers
/// that need several consistent lookups.
#[derive(Debug, Clone)]
pub struct ViewSnapshot {
    pub rows: Vec<SnapshotRow>,
    pub focused: usize,
    pub last_selection: usize,
    pub unseen: usize,
}

pub struct ViewModel {
    folder: Folder,
    columns: Vec<Column>,
    sort: SortSpec,
    filter: Option<Filter>,
    color_rules: ColorRules,
    selection_mode: SelectionMode,
    arena: ItemArena,
    order: Vec<ItemHandle>,
    focused: usize,
    last_selection: usize,
    unseen: usize,
    subscribers: Vec<Sender<ViewEvent>>,
}

impl ViewModel {
    /// Build the view for `folder` from its class defaults and, when
    /// present, the folder's saved state.
    pub fn new(
        folder: Folder,
        settings: &ViewSettings,
        state: Option<&FolderState>,
    ) -> Result<Self> {
        let columns: Vec<Column> = settings.columns.iter().map(|spec| spec.to_column()).collect();
        if columns.is_empty() {
            return Err(Error::new("view cannot be built without columns"));
        }

        let mut sort = state.map(|s| s.sort).unwrap_or(settings.sort);
        if sort.column >= columns.len() {
            sort = SortSpec::default();
        }
        if sort.column >= columns.len() {
            sort.column = 0;
        }

        let filter = state.and_then(|s| s.filter.as_deref()).and_then(|raw| {
            match Filter::new(raw, raw) {
                Ok(filter) => Some(filter),
                Err(err) => {
                    log::warn!("dropping unparsable saved filter {:?}: {}", raw, err);
                    None
                }
            }
        });

        let mut view = ViewModel {
            folder,
            columns,
            sort,
            filter,
            color_rules: ColorRules::default(),
            selection_mode: settings.selection_mode,
            arena: ItemArena::new(),
            order: Vec::new(),
            focused: 0,
            last_selection: 0,
            unseen: 0,
            subscribers: Vec::new(),
        };
        view.rebuild(false)?;

        let mut focused = state.map(|s| s.focus).unwrap_or(0);
        if focused >= view.order.len() {
            focused = view.order.len().saturating_sub(1);
        }
        view.focused = focused;
        view.last_selection = focused;
        if let Some(&handle) = view.order.get(focused) {
            if let Some(item) = view.arena.get_mut(handle) {
                item.set_flags(
                    ItemFlags::SELECTED | ItemFlags::FOCUSED,
                    ItemFlags::SELECTED | ItemFlags::FOCUSED,
                );
            }
        }
        Ok(view)
    }

    pub fn folder(&self) -> &Folder {
        &self.folder
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn unseen_count(&self) -> usize {
        self.unseen
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn set_columns(&mut self, columns: Vec<Column>) -> Result<()> {
        if columns.is_empty() {
            return Err(Error::new("view cannot be built without columns"));
        }
        self.columns = columns;
        if self.sort.column >= self.columns.len() {
            self.sort = SortSpec::default();
            if self.sort.column >= self.columns.len() {
                self.sort.column = 0;
            }
        }
        self.rebuild(true)
    }

    pub fn sort_spec(&self) -> SortSpec {
        self.sort
    }

    /// Replace the sort specification and rebuild, keeping focus and
    /// last-selection identities.
    pub fn set_sort(&mut self, spec: SortSpec) -> Result<()> {
        if spec.column >= self.columns.len() {
            return Err(Error::new(format!(
                "sort column {} out of bounds ({} columns)",
                spec.column,
                self.columns.len()
            )));
        }
        self.sort = spec;
        self.rebuild(true)?;
        self.fire(ViewEvent::Sorted);
        Ok(())
    }

    pub fn filter(&self) -> Option<&Filter> {
        self.filter.as_ref()
    }

    /// Replace the filter and rebuild, keeping focus and last-selection
    /// identities. A hidden focused item drops its state without error.
    pub fn set_filter(&mut self, filter: Option<Filter>) -> Result<()> {
        self.filter = filter;
        self.rebuild(true)
    }

    pub fn selection_mode(&self) -> SelectionMode {
        self.selection_mode
    }

    pub fn set_selection_mode(&mut self, new_val: SelectionMode) {
        self.selection_mode = new_val;
    }

    pub fn set_color_rules(&mut self, rules: ColorRules) {
        self.color_rules = rules;
        for (_, item) in self.arena.iter_mut() {
            item.color = None;
        }
        self.fire(ViewEvent::Updated);
    }

    /// Apply one folder notification. Notifications must arrive in the
    /// order the folder produced them.
    pub fn process_event(&mut self, event: &FolderEvent) -> Result<()> {
        match event {
            FolderEvent::Added(hash) => self.message_added(*hash),
            FolderEvent::Removed(hash) => self.message_removed(*hash),
            FolderEvent::Changed(hash) => self.message_changed(*hash),
            FolderEvent::Refreshed => self.rebuild(true),
            FolderEvent::UnseenCountChanged(delta) => {
                self.apply_unseen_delta(*delta);
                Ok(())
            }
            FolderEvent::Destroyed => {
                self.destroy();
                Ok(())
            }
        }
    }

    /// Recompute the whole item list from the folder's current message set:
    /// filter, thread links, sort. With `preserve_selection` the focus and
    /// last-selection follow their message identities into the new list;
    /// an identity that is gone falls back to index 0.
    pub fn rebuild(&mut self, preserve_selection: bool) -> Result<()> {
        let focused_message = if preserve_selection {
            self.message_at(self.focused)
        } else {
            None
        };
        let last_selection_message = if preserve_selection {
            self.message_at(self.last_selection)
        } else {
            None
        };

        let mut arena;
        let mut order;
        let mut unseen = 0;
        {
            let messages = self.folder.read()?;
            arena = ItemArena::with_capacity(messages.len());
            order = Vec::with_capacity(messages.len());
            for (hash, message) in messages.iter() {
                if let Some(filter) = self.filter.as_ref() {
                    if !filter.matches(message) {
                        continue;
                    }
                }
                order.push(arena.insert(ViewItem::new(*hash, message.flags())));
                if !message.is_seen() {
                    unseen += 1;
                }
            }
        }

        if self.sort.threaded {
            link_parents(&mut arena, &order, &self.folder)?;
        }
        let column = self.sort_column()?.clone();
        {
            let ctx = SortContext::new(&arena, &self.folder, &column, self.sort)?;
            sort_order(&mut order, &ctx);
        }

        log::trace!(
            "rebuilt view of folder {}: {} items, {} unseen",
            self.folder.hash(),
            order.len(),
            unseen
        );

        /* Every fallible step is behind us; swap the new list in. */
        self.arena = arena;
        self.order = order;
        self.unseen = unseen;

        self.focused = focused_message
            .and_then(|message| self.index_of(message))
            .unwrap_or(0);
        self.last_selection = last_selection_message
            .and_then(|message| self.index_of(message))
            .unwrap_or(0);
        if preserve_selection && !self.order.is_empty() {
            let focused = self.order[self.focused];
            if let Some(item) = self.arena.get_mut(focused) {
                item.set_flags(ItemFlags::FOCUSED, ItemFlags::FOCUSED);
            }
            let last = self.order[self.last_selection];
            if let Some(item) = self.arena.get_mut(last) {
                item.set_flags(ItemFlags::SELECTED, ItemFlags::SELECTED);
            }
        }

        self.fire(ViewEvent::Updated);
        Ok(())
    }

    fn message_added(&mut self, hash: MessageHash) -> Result<()> {
        if self.index_of(hash).is_some() {
            /* duplicate notification */
            return Ok(());
        }
        let (flags, reference, reference_hash, message_id, message_id_hash) = {
            let messages = self.folder.read()?;
            let message = match messages.get(&hash) {
                Some(message) => message,
                /* Notification for a message the folder no longer holds. */
                None => return Ok(()),
            };
            if let Some(filter) = self.filter.as_ref() {
                if !filter.matches(message) {
                    return Ok(());
                }
            }
            (
                message.flags(),
                message.reference().map(str::to_string),
                message.reference_hash(),
                message.message_id().to_string(),
                message.message_id_hash(),
            )
        };

        let handle = self.arena.insert(ViewItem::new(hash, flags));
        /* A failure between the arena insert and the order insert must not
         * leave a half-added item behind. */
        let pos = match self.place_new_item(handle, reference.as_deref(), reference_hash) {
            Ok(pos) => pos,
            Err(err) => {
                self.arena.remove(handle);
                return Err(err);
            }
        };

        if self.last_selection >= pos && self.last_selection + 1 < self.order.len() {
            self.last_selection += 1;
        }
        if self.focused >= pos && self.focused + 1 < self.order.len() {
            self.focused += 1;
        }
        if self.order.len() == 1 {
            if let Some(item) = self.arena.get_mut(handle) {
                item.set_flags(
                    ItemFlags::SELECTED | ItemFlags::FOCUSED,
                    ItemFlags::SELECTED | ItemFlags::FOCUSED,
                );
            }
        }

        /* The other direction of thread linking: replies that arrived
         * before this message stay roots until their parent shows up. */
        if self.sort.threaded
            && message_id_hash != 0
            && self.adopt_orphans(handle, &message_id, message_id_hash)?
        {
            self.resort_preserving_selection()?;
        }

        let pos = self.index_of(hash).unwrap_or(pos);
        self.fire(ViewEvent::ItemAdded(pos));
        Ok(())
    }

    /// Link the freshly inserted item to its thread parent (if any) and
    /// splice it into the order at the comparator's position.
    fn place_new_item(
        &mut self,
        handle: ItemHandle,
        reference: Option<&str>,
        reference_hash: u64,
    ) -> Result<usize> {
        if self.sort.threaded && reference_hash != 0 {
            if let Some(reference) = reference {
                let parent = self.find_parent_by_reference(handle, reference, reference_hash)?;
                if let Some(parent) = parent {
                    if let Some(item) = self.arena.get_mut(handle) {
                        item.parent = Some(parent);
                    }
                }
            }
        }

        let column = self.sort_column()?.clone();
        let pos = {
            let ctx = SortContext::new(&self.arena, &self.folder, &column, self.sort)?;
            insertion_point(&self.order, &ctx, handle)
        };
        self.order.insert(pos, handle);
        Ok(pos)
    }

    /// Link existing roots whose reference identifier names `message_id` to
    /// the freshly added item. Returns whether any link was made.
    fn adopt_orphans(
        &mut self,
        parent: ItemHandle,
        message_id: &str,
        message_id_hash: u64,
    ) -> Result<bool> {
        let mut orphans: Vec<ItemHandle> = Vec::new();
        {
            let messages = self.folder.read()?;
            for &handle in &self.order {
                if handle == parent {
                    continue;
                }
                let item = &self.arena[handle];
                if item.parent.is_some() {
                    continue;
                }
                let message = match messages.get(&item.message) {
                    Some(message) => message,
                    None => continue,
                };
                if message.reference_hash() != message_id_hash
                    || message.reference() != Some(message_id)
                {
                    continue;
                }
                /* the orphan must not already be an ancestor of the new
                 * item, or the link would close a cycle */
                if self.arena.is_ancestor(handle, parent) {
                    continue;
                }
                orphans.push(handle);
            }
        }
        for &handle in &orphans {
            if let Some(item) = self.arena.get_mut(handle) {
                item.parent = Some(parent);
            }
        }
        Ok(!orphans.is_empty())
    }

    fn message_removed(&mut self, hash: MessageHash) -> Result<()> {
        let index = match self.index_of(hash) {
            Some(index) => index,
            /* Already gone (filtered out or double notification): no-op. */
            None => return Ok(()),
        };
        let handle = self.order[index];
        let removed = match self.arena.remove(handle) {
            Some(item) => item,
            None => return Ok(()),
        };
        self.order.remove(index);

        /* No stale parent links may survive the eviction: demote the
         * removed item's children to roots. */
        let mut demoted = false;
        if self.sort.threaded {
            for (_, item) in self.arena.iter_mut() {
                if item.parent == Some(handle) {
                    item.parent = None;
                    demoted = true;
                }
            }
        }

        if removed.is_focused() {
            if index == self.order.len() {
                self.focused = self.order.len().saturating_sub(1);
            } else {
                self.focused = index;
            }
            if let Some(&handle) = self.order.get(self.focused) {
                if let Some(item) = self.arena.get_mut(handle) {
                    item.set_flags(ItemFlags::FOCUSED, ItemFlags::FOCUSED);
                }
            }
        } else if self.focused > index {
            self.focused -= 1;
        }

        if removed.is_selected() {
            /* selection transfers to the item that slid into the slot, or
             * to the new last item */
            let target = if index == self.order.len() {
                self.order.last().copied()
            } else {
                Some(self.order[index])
            };
            if let Some(target) = target {
                if let Some(item) = self.arena.get_mut(target) {
                    item.set_flags(ItemFlags::SELECTED, ItemFlags::SELECTED);
                }
            }
        }
        if self.last_selection == index {
            if index == self.order.len() {
                self.last_selection = self.order.len().saturating_sub(1);
            }
        } else if self.last_selection > index {
            self.last_selection -= 1;
        }

        if demoted {
            self.resort_preserving_selection()?;
        }

        self.fire(ViewEvent::ItemRemoved(index));
        Ok(())
    }

    fn message_changed(&mut self, hash: MessageHash) -> Result<()> {
        let index = match self.index_of(hash) {
            Some(index) => index,
            None => return Ok(()),
        };
        let handle = self.order[index];
        let new_flags = {
            let messages = self.folder.read()?;
            match messages.get(&hash) {
                Some(message) => message.flags(),
                None => return Ok(()),
            }
        };
        if let Some(item) = self.arena.get_mut(handle) {
            if item.message_flags != new_flags {
                item.message_flags = new_flags;
                item.color = None;
            }
        }
        self.fire(ViewEvent::ItemChanged(index));
        Ok(())
    }

    fn apply_unseen_delta(&mut self, delta: i64) {
        if delta < 0 {
            self.unseen = self.unseen.saturating_sub(delta.unsigned_abs() as usize);
        } else {
            self.unseen += delta as usize;
        }
    }

    /* Selection state. All selection operations are pure mutations of the
     * item flag bits; none touch the underlying messages. */

    pub fn is_selected(&self, index: usize) -> bool {
        self.item_at(index).map(ViewItem::is_selected).unwrap_or(false)
    }

    pub fn has_selection(&self) -> bool {
        self.order
            .iter()
            .any(|&handle| self.arena[handle].is_selected())
    }

    pub fn selected_count(&self) -> usize {
        self.order
            .iter()
            .filter(|&&handle| self.arena[handle].is_selected())
            .count()
    }

    /// The identities of all selected messages, in display order.
    pub fn selection(&self) -> Vec<MessageHash> {
        self.order
            .iter()
            .filter(|&&handle| self.arena[handle].is_selected())
            .map(|&handle| self.arena[handle].message)
            .collect()
    }

    pub fn add_selection(&mut self, index: usize) {
        if self.selection_mode == SelectionMode::Single {
            self.select(index);
            return;
        }
        self.add_selection_inner(index);
    }

    fn add_selection_inner(&mut self, index: usize) {
        let handle = match self.order.get(index) {
            Some(&handle) => handle,
            None => return,
        };
        let flipped = match self.arena.get_mut(handle) {
            Some(item) if !item.is_selected() => {
                item.set_flags(ItemFlags::SELECTED, ItemFlags::SELECTED);
                true
            }
            _ => false,
        };
        if flipped {
            self.fire(ViewEvent::SelectionChanged(index));
        }
    }

    pub fn remove_selection(&mut self, index: usize) {
        let handle = match self.order.get(index) {
            Some(&handle) => handle,
            None => return,
        };
        let flipped = match self.arena.get_mut(handle) {
            Some(item) if item.is_selected() => {
                item.set_flags(ItemFlags::empty(), ItemFlags::SELECTED);
                true
            }
            _ => false,
        };
        if flipped {
            self.fire(ViewEvent::SelectionChanged(index));
        }
    }

    /// Make `index` the only selected row.
    pub fn select(&mut self, index: usize) {
        self.clear_selection();
        self.add_selection_inner(index);
        if index < self.order.len() {
            self.last_selection = index;
        }
    }

    /// Make `start..=end` (in either order) exactly the selected rows.
    pub fn select_range(&mut self, start: usize, end: usize) {
        let (start, end) = if start > end { (end, start) } else { (start, end) };
        if self.selection_mode == SelectionMode::Single {
            self.select(end.min(self.order.len().saturating_sub(1)));
            return;
        }
        for index in 0..self.order.len() {
            if index >= start && index <= end {
                self.add_selection_inner(index);
            } else {
                self.remove_selection(index);
            }
        }
    }

    pub fn clear_selection(&mut self) {
        for index in 0..self.order.len() {
            self.remove_selection(index);
        }
    }

    pub fn last_selection(&self) -> usize {
        self.last_selection
    }

    pub fn set_last_selection(&mut self, index: usize) {
        if index < self.order.len() {
            self.last_selection = index;
        }
    }

    pub fn focused(&self) -> usize {
        self.focused
    }

    pub fn is_focused(&self, index: usize) -> bool {
        !self.order.is_empty() && index == self.focused
    }

    /// Move the focus bit to `index`.
    pub fn set_focus(&mut self, index: usize) {
        if index >= self.order.len() || index == self.focused {
            return;
        }
        let old = self.focused;
        self.focused = index;
        if let Some(&handle) = self.order.get(old) {
            if let Some(item) = self.arena.get_mut(handle) {
                item.set_flags(ItemFlags::empty(), ItemFlags::FOCUSED);
            }
        }
        let handle = self.order[index];
        if let Some(item) = self.arena.get_mut(handle) {
            item.set_flags(ItemFlags::FOCUSED, ItemFlags::FOCUSED);
        }
        self.fire(ViewEvent::SelectionChanged(old));
        self.fire(ViewEvent::SelectionChanged(index));
    }

    /* Read access. */

    pub fn message_at(&self, index: usize) -> Option<MessageHash> {
        self.order
            .get(index)
            .and_then(|&handle| self.arena.get(handle))
            .map(|item| item.message)
    }

    pub fn item_at(&self, index: usize) -> Option<&ViewItem> {
        self.order.get(index).and_then(|&handle| self.arena.get(handle))
    }

    /// Thread depth of the row at `index`.
    pub fn level(&self, index: usize) -> usize {
        self.order
            .get(index)
            .map(|&handle| self.arena.level(handle))
            .unwrap_or(0)
    }

    pub fn index_of(&self, message: MessageHash) -> Option<usize> {
        self.order
            .iter()
            .position(|&handle| self.arena[handle].message == message)
    }

    /// Render the cell at (`index`, `column`).
    pub fn display_text(&self, index: usize, column: usize) -> Result<String> {
        let column = self
            .columns
            .get(column)
            .ok_or_else(|| Error::new("column index out of bounds"))?;
        let message = self
            .message_at(index)
            .ok_or_else(|| Error::new("item index out of bounds"))?;
        let messages = self.folder.read()?;
        let message = messages
            .get(&message)
            .ok_or_else(|| Error::new("message vanished from folder"))?;
        Ok(column.display(message, &self.folder))
    }

    /// The row's color under the current color rules, computing and caching
    /// it on first access and after a flag change.
    pub fn color_at(&mut self, index: usize) -> Result<Option<u32>> {
        let handle = match self.order.get(index) {
            Some(&handle) => handle,
            None => return Ok(None),
        };
        if self.color_rules.is_empty() {
            return Ok(None);
        }
        let (message_hash, cached, cached_flags) = {
            let item = &self.arena[handle];
            (item.message, item.color, item.message_flags)
        };
        let messages = self.folder.read()?;
        let message = match messages.get(&message_hash) {
            Some(message) => message,
            None => return Ok(None),
        };
        if cached.is_some() && cached_flags == message.flags() {
            return Ok(cached);
        }
        let color = self.color_rules.color_for(message);
        let flags = message.flags();
        drop(messages);
        if let Some(item) = self.arena.get_mut(handle) {
            item.color = color;
            item.message_flags = flags;
        }
        Ok(color)
    }

    /// A consistent copy of the current order and selection state.
    pub fn snapshot(&self) -> ViewSnapshot {
        ViewSnapshot {
            rows: self
                .order
                .iter()
                .map(|&handle| SnapshotRow {
                    message: self.arena[handle].message,
                    level: self.arena.level(handle),
                    flags: self.arena[handle].flags,
                })
                .collect(),
            focused: self.focused,
            last_selection: self.last_selection,
            unseen: self.unseen,
        }
    }

    /* Events. */

    /// Register a listener; the receiver gets every subsequent event.
    pub fn subscribe(&mut self) -> Receiver<ViewEvent> {
        let (sender, receiver) = unbounded();
        self.subscribers.push(sender);
        receiver
    }

    fn fire(&mut self, event: ViewEvent) {
        self.subscribers
            .retain(|subscriber| subscriber.send(event).is_ok());
    }

    /// Announce destruction to listeners. The manager calls this before
    /// dropping the view.
    pub fn destroy(&mut self) {
        self.fire(ViewEvent::Destroyed);
    }

    /// Write the view's live state into the settings store so that
    /// [`SettingsStore::save`] persists it.
    pub fn save_state(&self, settings: &mut SettingsStore) {
        settings.set_folder_state(
            self.folder.hash(),
            FolderState {
                sort: self.sort,
                focus: self.focused,
                filter: self.filter.as_ref().map(|f| f.raw().to_string()),
            },
        );
    }

    /* Internal helpers. */

    fn sort_column(&self) -> Result<&Column> {
        self.columns
            .get(self.sort.column)
            .ok_or_else(|| Error::new("sort column out of bounds"))
    }

    /// Locate the existing item `reference` points at, for linking a newly
    /// added reply without a full relink pass.
    fn find_parent_by_reference(
        &self,
        item: ItemHandle,
        reference: &str,
        reference_hash: u64,
    ) -> Result<Option<ItemHandle>> {
        let messages = self.folder.read()?;
        for &handle in &self.order {
            if handle == item {
                continue;
            }
            let candidate = &self.arena[handle];
            let message = match messages.get(&candidate.message) {
                Some(message) => message,
                None => continue,
            };
            if message.message_id_hash() != reference_hash {
                continue;
            }
            if message.message_id() != reference {
                continue;
            }
            if self.arena.is_ancestor(item, handle) {
                continue;
            }
            return Ok(Some(handle));
        }
        Ok(None)
    }

    /// Re-sort the current list in place, keeping focus and last-selection
    /// identities. Used after demotions changed thread structure.
    fn resort_preserving_selection(&mut self) -> Result<()> {
        let focused_message = self.message_at(self.focused);
        let last_selection_message = self.message_at(self.last_selection);

        let column = self.sort_column()?.clone();
        {
            let ctx = SortContext::new(&self.arena, &self.folder, &column, self.sort)?;
            sort_order(&mut self.order, &ctx);
        }

        self.focused = focused_message
            .and_then(|message| self.index_of(message))
            .unwrap_or(0);
        self.last_selection = last_selection_message
            .and_then(|message| self.index_of(message))
            .unwrap_or(0);
        Ok(())
    }
}

impl std::fmt::Debug for ViewModel {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        fmt.debug_struct("ViewModel")
            .field("folder", &self.folder.hash())
            .field("items", &self.order.len())
            .field("sort", &self.sort)
            .field("filter", &self.filter.as_ref().map(Filter::raw))
            .field("focused", &self.focused)
            .field("unseen", &self.unseen)
            .finish()
    }
}
