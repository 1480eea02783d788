/*
 * opsis - column module.
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
 * Display columns.
 *
 * A [`Column`] is a declarative extraction and formatting rule applied to
 * one message: it yields a display string for rendering and a typed
 * [`SortKey`] for ordering. Built-in kinds cover the usual header fields;
 * [`ColumnKind::Expr`] columns interpolate message fields into a template
 * such as `"{label} {subject}"`. A custom expression that fails to parse
 * disables that one column instead of failing the whole column list.
 */

use std::cmp::Ordering;

use crate::datetime::{self, UnixTimestamp};
use crate::error::{Error, Result};
use crate::folder::Folder;
use crate::message::Message;

bitflags! {
    #[derive(Default, Serialize, Deserialize)]
    pub struct ColumnFlags: u16 {
        /// Indent the cell by the item's thread depth.
        const INDENT      = 0b0000_0001;
        /// Draw the thread connector line in this cell.
        const THREAD_LINE = 0b0000_0010;
        const RIGHT_ALIGN = 0b0000_0100;
        /// Render the value as an icon instead of text.
        const ICON        = 0b0000_1000;
        /// Cache the computed value on the item.
        const CACHE       = 0b0001_0000;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortKind {
    Text,
    Number,
    Date,
}

impl Default for SortKind {
    fn default() -> Self {
        SortKind::Text
    }
}

/// A typed, comparable key extracted from one message by one column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SortKey {
    Text(String),
    Number(i64),
    Date(UnixTimestamp),
}

impl SortKey {
    /// Text compares case-insensitively by code point; mixed variants fall
    /// back to a fixed variant order so the comparison stays total.
    pub fn compare(&self, other: &SortKey) -> Ordering {
        match (self, other) {
            (SortKey::Text(a), SortKey::Text(b)) => a
                .chars()
                .flat_map(char::to_lowercase)
                .cmp(b.chars().flat_map(char::to_lowercase)),
            (SortKey::Number(a), SortKey::Number(b)) => a.cmp(b),
            (SortKey::Date(a), SortKey::Date(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            SortKey::Text(_) => 0,
            SortKey::Number(_) => 1,
            SortKey::Date(_) => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ColumnKind {
    Id,
    Date,
    From,
    To,
    /// The peer address: To in an outgoing folder, From otherwise.
    FromTo,
    Subject,
    Size,
    Flags,
    Label,
    Expr(ColumnExpr),
}

impl ColumnKind {
    pub fn default_sort_kind(&self) -> SortKind {
        match self {
            ColumnKind::Id | ColumnKind::Size | ColumnKind::Flags => SortKind::Number,
            ColumnKind::Date => SortKind::Date,
            ColumnKind::From
            | ColumnKind::To
            | ColumnKind::FromTo
            | ColumnKind::Subject
            | ColumnKind::Label
            | ColumnKind::Expr(_) => SortKind::Text,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Literal(String),
    Field(Field),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Subject,
    From,
    To,
    Label,
    MessageId,
}

impl Field {
    fn parse(name: &str) -> Option<Field> {
        match name {
            "subject" => Some(Field::Subject),
            "from" => Some(Field::From),
            "to" => Some(Field::To),
            "label" => Some(Field::Label),
            "message-id" => Some(Field::MessageId),
            _ => None,
        }
    }
}

/// A custom column expression: literal text interleaved with `{field}`
/// placeholders. `segments` is `None` when the raw text failed to parse; the
/// column is then inert and extracts empty text.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnExpr {
    raw: String,
    segments: Option<Vec<Segment>>,
}

impl ColumnExpr {
    pub fn new(raw: &str) -> Self {
        let segments = match parse_expr(raw) {
            Ok(segments) => Some(segments),
            Err(err) => {
                log::warn!("disabling column expression {:?}: {}", raw, err);
                None
            }
        };
        ColumnExpr {
            raw: raw.to_string(),
            segments,
        }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn is_valid(&self) -> bool {
        self.segments.is_some()
    }

    fn eval(&self, message: &Message) -> String {
        let segments = match self.segments.as_ref() {
            Some(s) => s,
            None => return String::new(),
        };
        let mut out = String::new();
        for segment in segments {
            match segment {
                Segment::Literal(s) => out.push_str(s),
                Segment::Field(Field::Subject) => out.push_str(message.subject()),
                Segment::Field(Field::From) => out.push_str(&message.field_from_to_string()),
                Segment::Field(Field::To) => out.push_str(&message.field_to_to_string()),
                Segment::Field(Field::Label) => out.push_str(message.label()),
                Segment::Field(Field::MessageId) => out.push_str(message.message_id()),
            }
        }
        out
    }
}

fn parse_expr(raw: &str) -> Result<Vec<Segment>> {
    let mut segments = Vec::new();
    let mut rest = raw;
    while let Some(open) = rest.find('{') {
        if !rest[..open].is_empty() {
            segments.push(Segment::Literal(rest[..open].to_string()));
        }
        let after = &rest[open + 1..];
        let close = after
            .find('}')
            .ok_or_else(|| Error::new(format!("unterminated placeholder in {:?}", raw)))?;
        let name = &after[..close];
        let field = Field::parse(name)
            .ok_or_else(|| Error::new(format!("unknown field {:?} in {:?}", name, raw)))?;
        segments.push(Segment::Field(field));
        rest = &after[close + 1..];
    }
    if !rest.is_empty() {
        segments.push(Segment::Literal(rest.to_string()));
    }
    Ok(segments)
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    title: String,
    kind: ColumnKind,
    flags: ColumnFlags,
    sort_kind: SortKind,
    width: u16,
}

impl Column {
    pub fn new(title: &str, kind: ColumnKind, flags: ColumnFlags, width: u16) -> Self {
        let sort_kind = kind.default_sort_kind();
        Column {
            title: title.to_string(),
            kind,
            flags,
            sort_kind,
            width,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn kind(&self) -> &ColumnKind {
        &self.kind
    }

    pub fn flags(&self) -> ColumnFlags {
        self.flags
    }

    pub fn is_flag(&self, flag: ColumnFlags) -> bool {
        self.flags.contains(flag)
    }

    pub fn sort_kind(&self) -> SortKind {
        self.sort_kind
    }

    pub fn set_sort_kind(&mut self, new_val: SortKind) -> &mut Self {
        self.sort_kind = new_val;
        self
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn set_width(&mut self, new_val: u16) -> &mut Self {
        self.width = new_val;
        self
    }

    /// The display string this column renders for `message`.
    pub fn display(&self, message: &Message, folder: &Folder) -> String {
        match &self.kind {
            ColumnKind::Id => message.hash().to_string(),
            ColumnKind::Date => datetime::timestamp_to_string(message.date(), None),
            ColumnKind::From => message.field_from_to_string(),
            ColumnKind::To => message.field_to_to_string(),
            ColumnKind::FromTo => {
                if folder.is_outgoing() {
                    message.field_to_to_string()
                } else {
                    message.field_from_to_string()
                }
            }
            ColumnKind::Subject => message.subject().to_string(),
            ColumnKind::Size => format!("{}KB", message.size() / 1024 + 1),
            ColumnKind::Flags => format!("{}", message.flags().bits()),
            ColumnKind::Label => message.label().to_string(),
            ColumnKind::Expr(expr) => expr.eval(message),
        }
    }

    /// The key this column sorts `message` by. Sizes sort by the exact byte
    /// count even though they display rounded.
    pub fn sort_key(&self, message: &Message, folder: &Folder) -> SortKey {
        match self.sort_kind {
            SortKind::Number => match &self.kind {
                ColumnKind::Id => SortKey::Number(message.hash().to_u64() as i64),
                ColumnKind::Size => SortKey::Number(message.size() as i64),
                ColumnKind::Flags => SortKey::Number(i64::from(message.flags().bits())),
                _ => SortKey::Number(0),
            },
            /* Non-date columns forced to a date sort fall back to the
             * message timestamp. */
            SortKind::Date => SortKey::Date(message.date()),
            SortKind::Text => SortKey::Text(self.display(message, folder)),
        }
    }
}

/// The stock column layout used when no configuration exists for a message
/// class.
pub fn default_columns() -> Vec<Column> {
    vec![
        Column::new("Flags", ColumnKind::Flags, ColumnFlags::ICON, 4),
        Column::new("Date", ColumnKind::Date, ColumnFlags::empty(), 16),
        Column::new("From / To", ColumnKind::FromTo, ColumnFlags::empty(), 24),
        Column::new(
            "Subject",
            ColumnKind::Subject,
            ColumnFlags::INDENT | ColumnFlags::THREAD_LINE,
            40,
        ),
        Column::new("Size", ColumnKind::Size, ColumnFlags::RIGHT_ALIGN, 8),
    ]
}
