/*
 * opsis - error module.
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
 * An error object for `opsis`.
 */

use std::borrow::Cow;
use std::error::Error as StdError;
use std::fmt;
use std::io;
use std::result;
use std::sync::Arc;

pub type Result<T> = result::Result<T, Error>;

#[derive(Debug, Clone)]
pub struct Error {
    pub summary: Option<Cow<'static, str>>,
    pub details: Cow<'static, str>,
    pub source: Option<Arc<dyn StdError + Send + Sync + 'static>>,
}

pub trait ResultIntoError<T> {
    fn chain_err_summary<M, F>(self, msg_fn: F) -> Result<T>
    where
        F: Fn() -> M,
        M: Into<Cow<'static, str>>;
}

impl<T, I: Into<Error>> ResultIntoError<T> for result::Result<T, I> {
    #[inline]
    fn chain_err_summary<M, F>(self, msg_fn: F) -> Result<T>
    where
        F: Fn() -> M,
        M: Into<Cow<'static, str>>,
    {
        self.map_err(|err| err.into().set_summary(msg_fn()))
    }
}

impl Error {
    pub fn new<M>(msg: M) -> Error
    where
        M: Into<Cow<'static, str>>,
    {
        Error {
            summary: None,
            details: msg.into(),
            source: None,
        }
    }

    pub fn set_summary<M>(mut self, summary: M) -> Error
    where
        M: Into<Cow<'static, str>>,
    {
        self.summary = Some(summary.into());
        self
    }

    pub fn set_source(
        mut self,
        new_val: Option<Arc<dyn StdError + Send + Sync + 'static>>,
    ) -> Error {
        self.source = new_val;
        self
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if let Some(summary) = self.summary.as_ref() {
            writeln!(f, "Summary: {}", summary)?;
        }
        write!(f, "{}", self.details)?;
        if let Some(source) = self.source.as_ref() {
            write!(f, "\nCaused by: {}", source)?;
        }
        Ok(())
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source.as_ref().map(|s| &(*(*s)) as _)
    }
}

impl From<io::Error> for Error {
    #[inline]
    fn from(kind: io::Error) -> Error {
        Error::new(kind.to_string()).set_source(Some(Arc::new(kind)))
    }
}

impl From<toml::de::Error> for Error {
    #[inline]
    fn from(kind: toml::de::Error) -> Error {
        Error::new(kind.to_string()).set_source(Some(Arc::new(kind)))
    }
}

impl From<toml::ser::Error> for Error {
    #[inline]
    fn from(kind: toml::ser::Error) -> Error {
        Error::new(kind.to_string()).set_source(Some(Arc::new(kind)))
    }
}

impl<T> From<std::sync::PoisonError<T>> for Error {
    #[inline]
    fn from(kind: std::sync::PoisonError<T>) -> Error {
        Error::new(format!("{}", kind))
    }
}

impl From<std::num::ParseIntError> for Error {
    #[inline]
    fn from(kind: std::num::ParseIntError) -> Error {
        Error::new(format!("{}", kind)).set_source(Some(Arc::new(kind)))
    }
}

impl From<&str> for Error {
    #[inline]
    fn from(kind: &str) -> Error {
        Error::new(kind.to_string())
    }
}

impl From<String> for Error {
    #[inline]
    fn from(kind: String) -> Error {
        Error::new(kind)
    }
}
