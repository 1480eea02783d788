/*
 * opsis - settings module.
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
 * Persisted view configuration.
 *
 * The [`SettingsStore`] keeps one [`ViewSettings`] record per message
 * class — the column layout, default sort and selection mode folders of
 * that class start with — and one [`FolderState`] per folder for the
 * sort/focus/filter the user last had there. The store serializes to a
 * single TOML file; saving writes a sibling temporary file first and
 * renames it over the destination, so a crash never leaves a half-written
 * store behind.
 */

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;

use crate::column::{default_columns, Column, ColumnExpr, ColumnFlags, ColumnKind, SortKind};
use crate::error::{Error, Result};
use crate::folder::FolderHash;
use crate::sort::SortSpec;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionMode {
    Single,
    Multiple,
}

impl Default for SelectionMode {
    fn default() -> Self {
        SelectionMode::Multiple
    }
}

/// Serialized form of one [`Column`]. `kind` names a built-in extraction
/// or is `"custom"`, in which case `expr` holds the expression text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub title: String,
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expr: Option<String>,
    #[serde(default)]
    pub flags: u16,
    #[serde(default)]
    pub width: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_kind: Option<SortKind>,
}

impl ColumnSpec {
    pub fn to_column(&self) -> Column {
        let kind = match self.kind.as_str() {
            "id" => ColumnKind::Id,
            "date" => ColumnKind::Date,
            "from" => ColumnKind::From,
            "to" => ColumnKind::To,
            "from-to" => ColumnKind::FromTo,
            "subject" => ColumnKind::Subject,
            "size" => ColumnKind::Size,
            "flags" => ColumnKind::Flags,
            "label" => ColumnKind::Label,
            "custom" => ColumnKind::Expr(ColumnExpr::new(self.expr.as_deref().unwrap_or(""))),
            other => {
                log::warn!("unknown column kind {:?}, treating as custom", other);
                ColumnKind::Expr(ColumnExpr::new(self.expr.as_deref().unwrap_or("")))
            }
        };
        let flags = ColumnFlags::from_bits_truncate(self.flags);
        let mut column = Column::new(&self.title, kind, flags, self.width);
        if let Some(sort_kind) = self.sort_kind {
            column.set_sort_kind(sort_kind);
        }
        column
    }

    pub fn from_column(column: &Column) -> Self {
        let (kind, expr) = match column.kind() {
            ColumnKind::Id => ("id", None),
            ColumnKind::Date => ("date", None),
            ColumnKind::From => ("from", None),
            ColumnKind::To => ("to", None),
            ColumnKind::FromTo => ("from-to", None),
            ColumnKind::Subject => ("subject", None),
            ColumnKind::Size => ("size", None),
            ColumnKind::Flags => ("flags", None),
            ColumnKind::Label => ("label", None),
            ColumnKind::Expr(expr) => ("custom", Some(expr.raw().to_string())),
        };
        let sort_kind = if column.sort_kind() == column.kind().default_sort_kind() {
            None
        } else {
            Some(column.sort_kind())
        };
        ColumnSpec {
            title: column.title().to_string(),
            kind: kind.to_string(),
            expr,
            flags: column.flags().bits(),
            width: column.width(),
            sort_kind,
        }
    }
}

/// Column layout, default sort and selection mode for one message class.
/// Plain values come before the nested tables for TOML's sake.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewSettings {
    #[serde(default)]
    pub selection_mode: SelectionMode,
    #[serde(default)]
    pub sort: SortSpec,
    #[serde(default)]
    pub columns: Vec<ColumnSpec>,
}

impl Default for ViewSettings {
    fn default() -> Self {
        ViewSettings {
            selection_mode: SelectionMode::default(),
            sort: SortSpec::default(),
            columns: default_columns().iter().map(ColumnSpec::from_column).collect(),
        }
    }
}

/// The view state one folder was left in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FolderState {
    #[serde(default)]
    pub focus: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    #[serde(default)]
    pub sort: SortSpec,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettingsStore {
    #[serde(skip)]
    path: Option<PathBuf>,
    #[serde(default)]
    classes: IndexMap<String, ViewSettings>,
    /// Keyed by the folder hash rendered as a decimal string; TOML tables
    /// take string keys only.
    #[serde(default)]
    folders: IndexMap<String, FolderState>,
}

impl SettingsStore {
    pub fn new(path: Option<&Path>) -> Self {
        SettingsStore {
            path: path.map(Path::to_path_buf),
            ..Default::default()
        }
    }

    /// Read the store from `path`. A missing file yields defaults; a
    /// malformed file is logged and yields defaults rather than failing the
    /// whole session.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new(Some(path)));
        }
        let contents = fs::read_to_string(path)?;
        let mut store: SettingsStore = match toml::from_str(&contents) {
            Ok(store) => store,
            Err(err) => {
                log::error!(
                    "could not parse view settings {}: {}",
                    path.display(),
                    err
                );
                SettingsStore::default()
            }
        };
        store.path = Some(path.to_path_buf());
        Ok(store)
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Persist atomically: serialize, write a temporary sibling, rename it
    /// over the destination.
    pub fn save(&self) -> Result<()> {
        let path = self
            .path
            .as_ref()
            .ok_or_else(|| Error::new("settings store has no backing path"))?;
        let serialized = toml::to_string_pretty(self)?;
        let tmp_path = path.with_extension("tmp");
        {
            let mut file = fs::File::create(&tmp_path)?;
            file.write_all(serialized.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&tmp_path, path)?;
        Ok(())
    }

    /// The defaults for `class`, falling back to the stock layout.
    pub fn view_settings(&self, class: &str) -> ViewSettings {
        self.classes.get(class).cloned().unwrap_or_default()
    }

    pub fn set_view_settings(&mut self, class: &str, settings: ViewSettings) {
        self.classes.insert(class.to_string(), settings);
    }

    pub fn folder_state(&self, folder: FolderHash) -> Option<&FolderState> {
        self.folders.get(&folder.to_string())
    }

    pub fn set_folder_state(&mut self, folder: FolderHash, state: FolderState) {
        self.folders.insert(folder.to_string(), state);
    }

    pub fn remove_folder_state(&mut self, folder: FolderHash) {
        self.folders.shift_remove(&folder.to_string());
    }
}
