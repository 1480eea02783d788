/*
 * opsis - view model manager.
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
 * One view per folder, and the notion of "the current one".
 *
 * The [`ViewModelManager`] owns the registry mapping folders to their view
 * models, constructing each lazily from the settings store the first time
 * its folder is displayed. Switching folders goes through
 * [`ViewModelManager::set_current`], which announces the old and new
 * current view to subscribers. The manager lives for the session; it is
 * created at startup and [`ViewModelManager::shutdown`] destroys every
 * owned view at the end.
 */

use std::path::Path;

use crossbeam::channel::{unbounded, Receiver, Sender};
use indexmap::IndexMap;

use crate::error::Result;
use crate::folder::{Folder, FolderEvent, FolderHash};
use crate::settings::SettingsStore;
use crate::view::ViewModel;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManagerEvent {
    /// The current view changed; `old` is `None` at startup and after the
    /// current folder was destroyed.
    Selected {
        old: Option<FolderHash>,
        new: Option<FolderHash>,
    },
}

#[derive(Debug)]
pub struct ViewModelManager {
    views: IndexMap<FolderHash, ViewModel>,
    current: Option<FolderHash>,
    settings: SettingsStore,
    subscribers: Vec<Sender<ManagerEvent>>,
}

impl ViewModelManager {
    pub fn new(settings: SettingsStore) -> Self {
        ViewModelManager {
            views: IndexMap::new(),
            current: None,
            settings,
            subscribers: Vec::new(),
        }
    }

    /// Construct a manager backed by the settings file at `path`.
    pub fn with_settings_path(path: &Path) -> Result<Self> {
        Ok(Self::new(SettingsStore::load(path)?))
    }

    pub fn settings(&self) -> &SettingsStore {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut SettingsStore {
        &mut self.settings
    }

    pub fn len(&self) -> usize {
        self.views.len()
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }

    pub fn contains(&self, folder: FolderHash) -> bool {
        self.views.contains_key(&folder)
    }

    /// The view model of `folder`, constructing it lazily from the class
    /// defaults and any saved per-folder state.
    pub fn view_model(&mut self, folder: &Folder) -> Result<&mut ViewModel> {
        if !self.views.contains_key(&folder.hash()) {
            let settings = self.settings.view_settings(folder.class());
            let state = self.settings.folder_state(folder.hash()).cloned();
            let view = ViewModel::new(folder.clone(), &settings, state.as_ref())?;
            log::debug!("created view model for folder {}", folder.hash());
            self.views.insert(folder.hash(), view);
        }
        /* just inserted above when missing */
        Ok(self.views.get_mut(&folder.hash()).unwrap())
    }

    pub fn get(&self, folder: FolderHash) -> Option<&ViewModel> {
        self.views.get(&folder)
    }

    pub fn get_mut(&mut self, folder: FolderHash) -> Option<&mut ViewModel> {
        self.views.get_mut(&folder)
    }

    pub fn current(&self) -> Option<&ViewModel> {
        self.current.and_then(|hash| self.views.get(&hash))
    }

    pub fn current_mut(&mut self) -> Option<&mut ViewModel> {
        match self.current {
            Some(hash) => self.views.get_mut(&hash),
            None => None,
        }
    }

    pub fn current_folder(&self) -> Option<FolderHash> {
        self.current
    }

    /// Switch the current view, creating the folder's view if needed, and
    /// announce the change with both the old and the new current.
    pub fn set_current(&mut self, folder: Option<&Folder>) -> Result<()> {
        if let Some(folder) = folder {
            self.view_model(folder)?;
        }
        let old = self.current;
        let new = folder.map(Folder::hash);
        self.current = new;
        self.fire(ManagerEvent::Selected { old, new });
        Ok(())
    }

    /// Route one folder notification to that folder's view, if one exists.
    /// Destruction tears the view down and clears "current" if it pointed
    /// there.
    pub fn process_event(&mut self, folder: FolderHash, event: &FolderEvent) -> Result<()> {
        if *event == FolderEvent::Destroyed {
            self.folder_destroyed(folder);
            return Ok(());
        }
        if let Some(view) = self.views.get_mut(&folder) {
            view.process_event(event)?;
        }
        Ok(())
    }

    pub fn folder_destroyed(&mut self, folder: FolderHash) {
        if let Some(mut view) = self.views.shift_remove(&folder) {
            view.destroy();
        }
        self.settings.remove_folder_state(folder);
        if self.current == Some(folder) {
            self.current = None;
            self.fire(ManagerEvent::Selected {
                old: Some(folder),
                new: None,
            });
        }
    }

    /// Flush every live view's state into the store and persist it.
    pub fn save(&mut self) -> Result<()> {
        let &mut ViewModelManager {
            ref views,
            ref mut settings,
            ..
        } = self;
        for view in views.values() {
            view.save_state(settings);
        }
        settings.save()
    }

    /// Destroy all owned views; the registry empties and "current" clears.
    pub fn shutdown(&mut self) {
        for (_, view) in self.views.iter_mut() {
            view.destroy();
        }
        self.views.clear();
        self.current = None;
    }

    pub fn subscribe(&mut self) -> Receiver<ManagerEvent> {
        let (sender, receiver) = unbounded();
        self.subscribers.push(sender);
        receiver
    }

    fn fire(&mut self, event: ManagerEvent) {
        self.subscribers
            .retain(|subscriber| subscriber.send(event).is_ok());
    }
}
