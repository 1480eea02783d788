/*
 * opsis - color rules.
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
 * Per-message row colors.
 *
 * A [`ColorRules`] list pairs filter queries with `0x00RRGGBB` colors; the
 * first matching rule decides a row's color. Views evaluate rules lazily
 * and cache the result on the item until its flags change.
 */

use crate::message::Message;
use crate::search::Query;

#[derive(Debug, Clone)]
pub struct ColorRule {
    pub query: Query,
    pub color: u32,
}

impl ColorRule {
    pub fn new(query: Query, color: u32) -> Self {
        ColorRule { query, color }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ColorRules {
    rules: Vec<ColorRule>,
}

impl ColorRules {
    pub fn new(rules: Vec<ColorRule>) -> Self {
        ColorRules { rules }
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn color_for(&self, message: &Message) -> Option<u32> {
        self.rules
            .iter()
            .find(|rule| rule.query.matches(message))
            .map(|rule| rule.color)
    }
}
