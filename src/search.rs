/*
 * opsis - search module.
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
 * Filter queries over messages.
 *
 * A [`Query`] is parsed from a string such as
 * `from:alice and (subject:report or is:flagged)` and matched against
 * [`Message`] values. A [`Filter`] is a named query; a view with a filter
 * set displays only the messages the filter matches.
 */

use std::convert::TryFrom;

pub use query_parser::query;

use crate::datetime::UnixTimestamp;
use crate::error::Error;
use crate::message::Message;
use crate::parsec::Parser;

#[derive(Clone, Debug, PartialEq)]
pub enum Query {
    From(String),
    To(String),
    Subject(String),
    Label(String),
    AllText(String),
    Flags(Vec<String>),
    Before(UnixTimestamp),
    After(UnixTimestamp),
    Larger { than: usize },
    Smaller { than: usize },
    And(Box<Query>, Box<Query>),
    Or(Box<Query>, Box<Query>),
    Not(Box<Query>),
}

impl Query {
    pub fn matches(&self, message: &Message) -> bool {
        use Query::*;
        match self {
            From(s) => contains_case(&message.field_from_to_string(), s),
            To(s) => contains_case(&message.field_to_to_string(), s),
            Subject(s) => contains_case(message.subject(), s),
            Label(s) => contains_case(message.label(), s),
            AllText(s) => {
                contains_case(message.subject(), s)
                    || contains_case(&message.field_from_to_string(), s)
                    || contains_case(&message.field_to_to_string(), s)
                    || contains_case(message.label(), s)
            }
            Flags(v) => v.iter().any(|s| message.flags() == s.as_str()),
            Before(timestamp) => message.date() < *timestamp,
            After(timestamp) => message.date() > *timestamp,
            Larger { than } => message.size() > *than,
            Smaller { than } => message.size() < *than,
            And(q_a, q_b) => q_a.matches(message) && q_b.matches(message),
            Or(q_a, q_b) => q_a.matches(message) || q_b.matches(message),
            Not(q) => !q.matches(message),
        }
    }
}

fn contains_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

impl TryFrom<&str> for Query {
    type Error = Error;

    fn try_from(t: &str) -> crate::error::Result<Self> {
        query()
            .parse_complete(t)
            .map(|(_, q)| q)
            .map_err(|rest| Error::new(format!("could not parse query at: {:?}", rest)))
    }
}

/// A named filter: the raw text it was parsed from survives for display and
/// persistence.
#[derive(Clone, Debug)]
pub struct Filter {
    name: String,
    raw: String,
    query: Query,
}

impl Filter {
    pub fn new(name: &str, raw: &str) -> crate::error::Result<Self> {
        Ok(Filter {
            name: name.to_string(),
            raw: raw.to_string(),
            query: Query::try_from(raw)?,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    pub fn matches(&self, message: &Message) -> bool {
        self.query.matches(message)
    }
}

impl TryFrom<&str> for Filter {
    type Error = Error;

    fn try_from(t: &str) -> crate::error::Result<Self> {
        Filter::new(t, t)
    }
}

pub mod query_parser {
    use super::*;
    use crate::parsec::*;

    fn literal<'a>() -> impl Parser<'a, String> {
        move |input| either(quoted_string(), string()).parse(input)
    }

    fn date<'a>() -> impl Parser<'a, UnixTimestamp> {
        move |input| {
            literal().parse(input).and_then(|(next_input, result)| {
                if let Ok(t) = result.parse::<UnixTimestamp>() {
                    return Ok((next_input, t));
                }
                if let Some(t) = crate::datetime::timestamp_from_date(&result) {
                    Ok((next_input, t))
                } else {
                    Err(next_input)
                }
            })
        }
    }

    fn from<'a>() -> impl Parser<'a, Query> {
        prefix(
            whitespace_wrap(match_literal("from:")),
            whitespace_wrap(literal()),
        )
        .map(Query::From)
    }

    fn to<'a>() -> impl Parser<'a, Query> {
        prefix(
            whitespace_wrap(match_literal("to:")),
            whitespace_wrap(literal()),
        )
        .map(Query::To)
    }

    fn subject<'a>() -> impl Parser<'a, Query> {
        prefix(
            whitespace_wrap(match_literal("subject:")),
            whitespace_wrap(literal()),
        )
        .map(Query::Subject)
    }

    fn label<'a>() -> impl Parser<'a, Query> {
        prefix(
            whitespace_wrap(match_literal("label:")),
            whitespace_wrap(literal()),
        )
        .map(Query::Label)
    }

    fn before<'a>() -> impl Parser<'a, Query> {
        prefix(
            whitespace_wrap(match_literal("before:")),
            whitespace_wrap(date()),
        )
        .map(Query::Before)
    }

    fn after<'a>() -> impl Parser<'a, Query> {
        prefix(
            whitespace_wrap(match_literal("after:")),
            whitespace_wrap(date()),
        )
        .map(Query::After)
    }

    fn larger<'a>() -> impl Parser<'a, Query> {
        prefix(
            whitespace_wrap(match_literal("larger:")),
            whitespace_wrap(integer()),
        )
        .map(|than| Query::Larger { than })
    }

    fn smaller<'a>() -> impl Parser<'a, Query> {
        prefix(
            whitespace_wrap(match_literal("smaller:")),
            whitespace_wrap(integer()),
        )
        .map(|than| Query::Smaller { than })
    }

    fn flags<'a>() -> impl Parser<'a, Query> {
        prefix(
            whitespace_wrap(either(
                match_literal_anycase("is:"),
                either(
                    match_literal_anycase("flag:"),
                    match_literal_anycase("flags:"),
                ),
            )),
            whitespace_wrap(literal()),
        )
        .map(|list| Query::Flags(list.split(',').map(str::to_string).collect()))
    }

    fn parentheses_query<'a>() -> impl Parser<'a, Query> {
        move |input| {
            delimited(
                whitespace_wrap(match_literal("(")),
                whitespace_wrap(query()),
                whitespace_wrap(match_literal(")")),
            )
            .parse(input)
        }
    }

    fn not<'a>() -> impl Parser<'a, Query> {
        move |input| {
            whitespace_wrap(either(
                match_literal_anycase("not"),
                match_literal_anycase("!"),
            ))
            .parse(input)
            .and_then(|(last_input, _)| query().parse(last_input))
        }
    }

    fn and<'a>() -> impl Parser<'a, Query> {
        move |input| {
            whitespace_wrap(match_literal_anycase("and"))
                .parse(input)
                .and_then(|(last_input, _)| query().parse(last_input))
        }
    }

    fn or<'a>() -> impl Parser<'a, Query> {
        move |input| {
            whitespace_wrap(match_literal_anycase("or"))
                .parse(input)
                .and_then(|(last_input, _)| query().parse(last_input))
        }
    }

    /// Parser from `&str` to [`Query`]. A bare word matches all text fields.
    pub fn query<'a>() -> impl Parser<'a, Query> {
        move |input| {
            let (rest, query_a): (&'a str, Query) = if let Ok(q) = parentheses_query()
                .parse(input)
                .or_else(|_| from().parse(input))
                .or_else(|_| to().parse(input))
                .or_else(|_| subject().parse(input))
                .or_else(|_| label().parse(input))
                .or_else(|_| before().parse(input))
                .or_else(|_| after().parse(input))
                .or_else(|_| larger().parse(input))
                .or_else(|_| smaller().parse(input))
                .or_else(|_| flags().parse(input))
            {
                Ok(q)
            } else if let Ok((rest, query_a)) = not().parse(input) {
                Ok((rest, Query::Not(Box::new(query_a))))
            } else if let Ok((rest, s)) = {
                let result = whitespace_wrap(literal()).parse(input);
                if result
                    .as_ref()
                    .map(|(_, s)| s != "and" && s != "or" && s != "not")
                    .unwrap_or(false)
                {
                    result
                } else {
                    Err("")
                }
            } {
                Ok((rest, Query::AllText(s)))
            } else {
                Err(input)
            }?;
            if rest.is_empty() {
                return Ok((rest, query_a));
            }

            if let Ok((rest, query_b)) = and().parse(rest) {
                Ok((rest, Query::And(Box::new(query_a), Box::new(query_b))))
            } else if let Ok((rest, query_b)) = or().parse(rest) {
                Ok((rest, Query::Or(Box::new(query_a), Box::new(query_b))))
            } else if let Ok((rest, query_b)) = query().parse(rest) {
                Ok((rest, Query::And(Box::new(query_a), Box::new(query_b))))
            } else {
                Ok((rest, query_a))
            }
        }
    }
}
