/*
 * opsis - view model integration tests.
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

use std::convert::TryFrom;

use opsis::{
    Filter, Flag, Folder, FolderEvent, FolderHash, FolderKind, Message, MessageHash, SelectionMode,
    SettingsStore, SortOrder, SortSpec, ViewEvent, ViewModel, ViewModelManager, ViewSettings,
};

fn message(hash: u64, msgid: &str, reference: Option<&str>, timestamp: u64) -> Message {
    let mut msg = Message::new(MessageHash(hash));
    msg.set_message_id(msgid)
        .set_subject(&format!("message {}", hash))
        .set_datetime(timestamp)
        .set_size(1024 * hash as usize);
    if let Some(reference) = reference {
        msg.push_reference(reference);
    }
    msg
}

/// Five messages dated D1 < D2 < D3 < D4 < D5; M3 replies to M1.
fn five_messages() -> Vec<Message> {
    vec![
        message(1, "<m1@x>", None, 100),
        message(2, "<m2@x>", None, 200),
        message(3, "<m3@x>", Some("<m1@x>"), 300),
        message(4, "<m4@x>", None, 400),
        message(5, "<m5@x>", None, 500),
    ]
}

fn folder_with(messages: Vec<Message>) -> Folder {
    let folder = Folder::new(FolderHash(1), "inbox", "mail", FolderKind::Incoming);
    for msg in messages {
        folder.insert(msg).unwrap();
    }
    folder
}

fn view_of(folder: &Folder) -> ViewModel {
    ViewModel::new(folder.clone(), &ViewSettings::default(), None).unwrap()
}

/// The default layout sorts by column 1 (Date).
fn date_sort(order: SortOrder, threaded: bool) -> SortSpec {
    SortSpec::new(1, order, threaded)
}

fn visible_messages(view: &ViewModel) -> Vec<u64> {
    (0..view.len())
        .map(|n| view.message_at(n).unwrap().to_u64())
        .collect()
}

fn pump(view: &mut ViewModel, events: impl IntoIterator<Item = FolderEvent>) {
    for event in events {
        view.process_event(&event).unwrap();
    }
}

#[test]
fn test_flat_date_ascending_order() {
    /* Scenario 1 */
    let folder = folder_with(five_messages());
    let mut view = view_of(&folder);
    view.set_sort(date_sort(SortOrder::Asc, false)).unwrap();
    assert_eq!(visible_messages(&view), vec![1, 2, 3, 4, 5]);

    view.set_sort(date_sort(SortOrder::Desc, false)).unwrap();
    assert_eq!(visible_messages(&view), vec![5, 4, 3, 2, 1]);
}

#[test]
fn test_threaded_reply_follows_parent() {
    /* Scenario 2: M3 replies to M1, so it sorts into M1's subtree ahead of
     * M2 although M2's date is earlier. */
    let folder = folder_with(five_messages());
    let mut view = view_of(&folder);
    view.set_sort(date_sort(SortOrder::Asc, true)).unwrap();

    assert_eq!(visible_messages(&view), vec![1, 3, 2, 4, 5]);
    assert_eq!(view.level(0), 0);
    assert_eq!(view.level(1), 1);
    assert_eq!(view.level(2), 0);
}

#[test]
fn test_thread_contiguity_and_acyclicity() {
    let mut messages = five_messages();
    /* a second reply to M1 and a grandchild under M3 */
    messages.push(message(6, "<m6@x>", Some("<m1@x>"), 250));
    messages.push(message(7, "<m7@x>", Some("<m3@x>"), 600));
    let folder = folder_with(messages);
    let mut view = view_of(&folder);
    view.set_sort(date_sort(SortOrder::Asc, true)).unwrap();

    let snapshot = view.snapshot();
    /* every item with a parent appears after it, and the span in between
     * belongs to the parent's subtree */
    for (index, row) in snapshot.rows.iter().enumerate() {
        if row.level == 0 {
            continue;
        }
        let parent_index = (0..index)
            .rev()
            .find(|&p| snapshot.rows[p].level < row.level)
            .expect("child appears after its parent");
        for between in parent_index + 1..index {
            assert!(snapshot.rows[between].level > snapshot.rows[parent_index].level);
        }
    }
    /* no walk up the levels may revisit an index */
    for index in 0..view.len() {
        let mut level = snapshot.rows[index].level;
        let mut cursor = index;
        let mut steps = 0;
        while level > 0 {
            cursor = (0..cursor)
                .rev()
                .find(|&p| snapshot.rows[p].level < level)
                .unwrap();
            level = snapshot.rows[cursor].level;
            steps += 1;
            assert!(steps <= snapshot.rows.len());
        }
    }
}

#[test]
fn test_removing_parent_demotes_child() {
    /* Scenario 3, incremental path */
    let folder = folder_with(five_messages());
    let mut view = view_of(&folder);
    view.set_sort(date_sort(SortOrder::Asc, true)).unwrap();
    assert_eq!(view.level(1), 1);

    let events = folder.remove(MessageHash(1)).unwrap();
    pump(&mut view, events);

    assert_eq!(visible_messages(&view), vec![2, 3, 4, 5]);
    for n in 0..view.len() {
        assert_eq!(view.level(n), 0, "no item may keep the removed parent");
    }

    /* and the rebuild path agrees */
    view.rebuild(true).unwrap();
    assert_eq!(visible_messages(&view), vec![2, 3, 4, 5]);
    assert_eq!(view.level(view.index_of(MessageHash(3)).unwrap()), 0);
}

#[test]
fn test_filter_drops_hidden_selection() {
    /* Scenario 4 */
    let folder = folder_with(five_messages());
    let mut view = view_of(&folder);
    view.set_sort(date_sort(SortOrder::Asc, false)).unwrap();
    let m2 = view.index_of(MessageHash(2)).unwrap();
    view.select(m2);
    view.set_focus(m2);
    assert!(view.is_selected(m2));

    let filter = Filter::try_from("not subject:\"message 2\"").unwrap();
    view.set_filter(Some(filter)).unwrap();

    assert_eq!(view.len(), 4);
    assert!(view.index_of(MessageHash(2)).is_none());
    /* M2's selection and focus state vanished without error */
    assert_eq!(view.focused(), 0);
    assert!(view.selection().iter().all(|&m| m != MessageHash(2)));

    view.set_filter(None).unwrap();
    assert_eq!(view.len(), 5);
}

#[test]
fn test_tie_break_is_deterministic() {
    /* Scenario 5: identical sort keys keep a stable, repeatable order */
    let folder = folder_with(vec![
        message(1, "<m1@x>", None, 100),
        message(2, "<m2@x>", None, 100),
    ]);
    let mut view = view_of(&folder);
    view.set_sort(date_sort(SortOrder::Asc, false)).unwrap();
    let first = visible_messages(&view);
    view.set_sort(date_sort(SortOrder::Asc, false)).unwrap();
    assert_eq!(first, visible_messages(&view));
    view.rebuild(true).unwrap();
    assert_eq!(first, visible_messages(&view));
}

#[test]
fn test_focus_identity_survives_rebuild() {
    let folder = folder_with(five_messages());
    let mut view = view_of(&folder);
    view.set_sort(date_sort(SortOrder::Asc, false)).unwrap();
    let m3 = view.index_of(MessageHash(3)).unwrap();
    view.set_focus(m3);

    /* same messages, reversed underlying order */
    let mut reversed = five_messages();
    reversed.reverse();
    let event = folder.refresh(reversed).unwrap();
    pump(&mut view, vec![event]);

    let focused = view.focused();
    assert_eq!(view.message_at(focused), Some(MessageHash(3)));
    assert!(view.item_at(focused).unwrap().is_focused());

    /* flipping the direction keeps following the same message */
    view.set_sort(date_sort(SortOrder::Desc, false)).unwrap();
    assert_eq!(view.message_at(view.focused()), Some(MessageHash(3)));
}

#[test]
fn test_incremental_add_lands_sorted() {
    let folder = folder_with(vec![
        message(1, "<m1@x>", None, 100),
        message(3, "<m3@x>", None, 300),
    ]);
    let mut view = view_of(&folder);
    view.set_sort(date_sort(SortOrder::Asc, false)).unwrap();
    let events = view.subscribe();

    let folder_events = folder.insert(message(2, "<m2@x>", None, 200)).unwrap();
    pump(&mut view, folder_events);

    assert_eq!(visible_messages(&view), vec![1, 2, 3]);
    let fired: Vec<ViewEvent> = events.try_iter().collect();
    assert!(fired.contains(&ViewEvent::ItemAdded(1)));
}

#[test]
fn test_incremental_add_joins_thread() {
    let folder = folder_with(five_messages());
    let mut view = view_of(&folder);
    view.set_sort(date_sort(SortOrder::Asc, true)).unwrap();

    /* a late reply to M2 must insert directly under it */
    let folder_events = folder
        .insert(message(8, "<m8@x>", Some("<m2@x>"), 800))
        .unwrap();
    pump(&mut view, folder_events);

    let m8 = view.index_of(MessageHash(8)).unwrap();
    assert_eq!(view.level(m8), 1);
    assert_eq!(view.message_at(m8 - 1), Some(MessageHash(2)));
}

#[test]
fn test_late_parent_adopts_orphans() {
    /* replies can arrive before the message they answer; once the parent
     * shows up the roots must re-link under it */
    let folder = folder_with(vec![
        message(1, "<m1@x>", None, 100),
        message(3, "<m3@x>", Some("<m9@x>"), 300),
        message(4, "<m4@x>", Some("<m9@x>"), 400),
    ]);
    let mut view = view_of(&folder);
    view.set_sort(date_sort(SortOrder::Asc, true)).unwrap();
    assert!((0..view.len()).all(|n| view.level(n) == 0));

    let events = folder.insert(message(9, "<m9@x>", None, 200)).unwrap();
    pump(&mut view, events);

    assert_eq!(visible_messages(&view), vec![1, 9, 3, 4]);
    assert_eq!(view.level(view.index_of(MessageHash(9)).unwrap()), 0);
    assert_eq!(view.level(view.index_of(MessageHash(3)).unwrap()), 1);
    assert_eq!(view.level(view.index_of(MessageHash(4)).unwrap()), 1);
}

#[test]
fn test_unseen_tally() {
    let folder = folder_with(Vec::new());
    let mut view = view_of(&folder);
    assert_eq!(view.unseen_count(), 0);

    pump(
        &mut view,
        folder.insert(message(1, "<m1@x>", None, 100)).unwrap(),
    );
    pump(
        &mut view,
        folder.insert(message(2, "<m2@x>", None, 200)).unwrap(),
    );
    assert_eq!(view.unseen_count(), 2);

    pump(
        &mut view,
        folder.set_flag(MessageHash(1), Flag::SEEN, true).unwrap(),
    );
    assert_eq!(view.unseen_count(), 1);

    pump(&mut view, folder.remove(MessageHash(2)).unwrap());
    assert_eq!(view.unseen_count(), 0);

    /* a full rebuild recomputes the tally from the visible set */
    view.rebuild(true).unwrap();
    assert_eq!(view.unseen_count(), 0);
}

#[test]
fn test_flag_change_fires_item_changed() {
    let folder = folder_with(five_messages());
    let mut view = view_of(&folder);
    view.set_sort(date_sort(SortOrder::Asc, false)).unwrap();
    let events = view.subscribe();

    pump(
        &mut view,
        folder
            .set_flag(MessageHash(4), Flag::FLAGGED, true)
            .unwrap(),
    );

    let index = view.index_of(MessageHash(4)).unwrap();
    let fired: Vec<ViewEvent> = events.try_iter().collect();
    assert!(fired.contains(&ViewEvent::ItemChanged(index)));
    assert!(view.item_at(index).unwrap().message_flags.is_flagged());
}

#[test]
fn test_selection_operations() {
    let folder = folder_with(five_messages());
    let mut view = view_of(&folder);
    view.set_sort(date_sort(SortOrder::Asc, false)).unwrap();

    view.select_range(1, 3);
    assert_eq!(view.selected_count(), 3);
    assert_eq!(
        view.selection(),
        vec![MessageHash(2), MessageHash(3), MessageHash(4)]
    );
    assert!(!view.is_selected(0));

    /* ranges normalize their endpoints */
    view.select_range(3, 1);
    assert_eq!(view.selected_count(), 3);

    view.clear_selection();
    assert!(!view.has_selection());

    view.select(2);
    assert_eq!(view.selection(), vec![MessageHash(3)]);
    assert_eq!(view.last_selection(), 2);
}

#[test]
fn test_single_selection_mode_collapses_ranges() {
    let folder = folder_with(five_messages());
    let mut view = view_of(&folder);
    view.set_sort(date_sort(SortOrder::Asc, false)).unwrap();
    view.set_selection_mode(SelectionMode::Single);

    view.select_range(1, 3);
    assert_eq!(view.selected_count(), 1);
    view.add_selection(0);
    assert_eq!(view.selected_count(), 1);
    assert_eq!(view.selection(), vec![MessageHash(1)]);
}

#[test]
fn test_removal_fixes_focus_and_selection() {
    let folder = folder_with(five_messages());
    let mut view = view_of(&folder);
    view.set_sort(date_sort(SortOrder::Asc, false)).unwrap();
    view.set_focus(4);
    view.select(4);

    /* removing the focused last item moves focus to the new last row */
    pump(&mut view, folder.remove(MessageHash(5)).unwrap());
    assert_eq!(view.focused(), 3);
    assert!(view.item_at(3).unwrap().is_focused());
    assert!(view.item_at(3).unwrap().is_selected());

    /* removing an earlier item shifts the focus index down with it */
    pump(&mut view, folder.remove(MessageHash(1)).unwrap());
    assert_eq!(view.focused(), 2);
    assert_eq!(view.message_at(view.focused()), Some(MessageHash(4)));
}

#[test]
fn test_snapshot_is_consistent() {
    let folder = folder_with(five_messages());
    let mut view = view_of(&folder);
    view.set_sort(date_sort(SortOrder::Asc, true)).unwrap();
    view.select_range(0, 1);

    let snapshot = view.snapshot();
    assert_eq!(snapshot.rows.len(), view.len());
    for (index, row) in snapshot.rows.iter().enumerate() {
        assert_eq!(Some(row.message), view.message_at(index));
        assert_eq!(row.level, view.level(index));
    }
    assert!(snapshot.rows[0].flags.contains(opsis::ItemFlags::SELECTED));
    assert_eq!(snapshot.focused, view.focused());
    assert_eq!(snapshot.unseen, view.unseen_count());
}

#[test]
fn test_settings_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("views.toml");

    let mut store = SettingsStore::new(Some(&path));
    let mut settings = ViewSettings::default();
    settings.sort = SortSpec::new(3, SortOrder::Desc, true);
    settings.selection_mode = SelectionMode::Single;
    store.set_view_settings("mail", settings.clone());
    store.set_folder_state(
        FolderHash(7),
        opsis::FolderState {
            focus: 4,
            filter: Some("is:unseen".to_string()),
            sort: SortSpec::new(1, SortOrder::Asc, false),
        },
    );
    store.save().unwrap();

    let reloaded = SettingsStore::load(&path).unwrap();
    assert_eq!(reloaded.view_settings("mail"), settings);
    assert_eq!(
        reloaded.folder_state(FolderHash(7)),
        store.folder_state(FolderHash(7))
    );
    /* an unconfigured class falls back to the stock layout */
    assert_eq!(reloaded.view_settings("news"), ViewSettings::default());
}

#[test]
fn test_view_restores_saved_state() {
    let folder = folder_with(five_messages());
    let mut store = SettingsStore::new(None);

    {
        let mut view = view_of(&folder);
        view.set_sort(date_sort(SortOrder::Desc, true)).unwrap();
        view.set_focus(2);
        view.save_state(&mut store);
    }

    let state = store.folder_state(folder.hash()).cloned();
    let view = ViewModel::new(folder.clone(), &ViewSettings::default(), state.as_ref()).unwrap();
    assert_eq!(view.sort_spec(), date_sort(SortOrder::Desc, true));
    assert_eq!(view.focused(), 2);
    assert!(view.item_at(2).unwrap().is_focused());
}

#[test]
fn test_manager_registry_and_current() {
    let inbox = Folder::new(FolderHash(1), "inbox", "mail", FolderKind::Incoming);
    let sent = Folder::new(FolderHash(2), "sent", "mail", FolderKind::Outgoing);
    inbox.insert(message(1, "<m1@x>", None, 100)).unwrap();

    let mut manager = ViewModelManager::new(SettingsStore::new(None));
    let events = manager.subscribe();

    manager.set_current(Some(&inbox)).unwrap();
    assert_eq!(manager.current_folder(), Some(FolderHash(1)));
    assert_eq!(manager.current().unwrap().len(), 1);

    /* the registry holds at most one view per folder */
    manager.view_model(&inbox).unwrap();
    assert_eq!(manager.len(), 1);

    manager.set_current(Some(&sent)).unwrap();
    assert_eq!(manager.len(), 2);

    let fired: Vec<opsis::ManagerEvent> = events.try_iter().collect();
    assert_eq!(
        fired,
        vec![
            opsis::ManagerEvent::Selected {
                old: None,
                new: Some(FolderHash(1)),
            },
            opsis::ManagerEvent::Selected {
                old: Some(FolderHash(1)),
                new: Some(FolderHash(2)),
            },
        ]
    );
}

#[test]
fn test_manager_folder_destroyed() {
    let inbox = Folder::new(FolderHash(1), "inbox", "mail", FolderKind::Incoming);
    let mut manager = ViewModelManager::new(SettingsStore::new(None));
    manager.set_current(Some(&inbox)).unwrap();

    let destroyed = manager.current_mut().unwrap().subscribe();
    let events = manager.subscribe();

    manager
        .process_event(inbox.hash(), &inbox.destroy())
        .unwrap();

    assert!(manager.is_empty());
    assert!(manager.current().is_none());
    assert_eq!(
        destroyed.try_iter().collect::<Vec<_>>(),
        vec![ViewEvent::Destroyed]
    );
    assert_eq!(
        events.try_iter().collect::<Vec<_>>(),
        vec![opsis::ManagerEvent::Selected {
            old: Some(FolderHash(1)),
            new: None,
        }]
    );
}

#[test]
fn test_manager_save_and_reload() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("views.toml");
    let inbox = Folder::new(FolderHash(1), "inbox", "mail", FolderKind::Incoming);
    for msg in five_messages() {
        inbox.insert(msg).unwrap();
    }

    {
        let mut manager = ViewModelManager::with_settings_path(&path).unwrap();
        let view = manager.view_model(&inbox).unwrap();
        view.set_sort(date_sort(SortOrder::Desc, true)).unwrap();
        manager.save().unwrap();
        manager.shutdown();
    }

    let mut manager = ViewModelManager::with_settings_path(&path).unwrap();
    let view = manager.view_model(&inbox).unwrap();
    assert_eq!(view.sort_spec(), date_sort(SortOrder::Desc, true));
}

#[test]
fn test_hidden_parent_leaves_child_a_root() {
    /* Threading runs over the visible set: filtering the parent out turns
     * its reply into a root. */
    let folder = folder_with(five_messages());
    let mut view = view_of(&folder);
    view.set_sort(date_sort(SortOrder::Asc, true)).unwrap();
    assert_eq!(view.level(view.index_of(MessageHash(3)).unwrap()), 1);

    let filter = Filter::try_from("not subject:\"message 1\"").unwrap();
    view.set_filter(Some(filter)).unwrap();
    assert_eq!(view.level(view.index_of(MessageHash(3)).unwrap()), 0);
}
