//! Origin allow-listing.
//!
//! A present `Origin` must exact-match an allow-list entry: no wildcards,
//! no suffix matching, no normalization. A missing origin is its own case and
//! is decided by the configured [`OriginMode`]. An origin whose bytes are not
//! visible ASCII is present but can never match, so it is always rejected.

use std::collections::HashSet;
use std::fmt;

use crate::config::{OriginConfig, OriginMode};

/// The `Origin` header as the request declared it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeclaredOrigin<'a> {
    Absent,
    Present(&'a str),
    /// Header present but not visible ASCII. Holds a lossy rendering for logs.
    Unreadable(String),
}

impl<'a> DeclaredOrigin<'a> {
    /// Classify raw header bytes.
    pub fn from_bytes(raw: Option<&'a [u8]>) -> Self {
        let Some(bytes) = raw else {
            return DeclaredOrigin::Absent;
        };
        match std::str::from_utf8(bytes) {
            Ok(origin) if origin.bytes().all(|b| b == b'\t' || (b' '..=b'~').contains(&b)) => {
                DeclaredOrigin::Present(origin)
            }
            _ => DeclaredOrigin::Unreadable(String::from_utf8_lossy(bytes).into_owned()),
        }
    }
}

impl fmt::Display for DeclaredOrigin<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeclaredOrigin::Absent => f.write_str("<absent>"),
            DeclaredOrigin::Present(origin) => f.write_str(origin),
            DeclaredOrigin::Unreadable(lossy) => write!(f, "{lossy} <unreadable>"),
        }
    }
}

/// Why an origin was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OriginDenial {
    /// No `Origin` header in hardened mode.
    Missing,
    /// Origin not in the allow-list.
    NotAllowed(String),
}

impl OriginDenial {
    pub fn describe(&self) -> String {
        match self {
            OriginDenial::Missing => "origin header required".to_string(),
            OriginDenial::NotAllowed(origin) => format!("origin {origin:?} is not allowed"),
        }
    }
}

/// Immutable set of permitted origins.
#[derive(Debug, Clone, Default)]
pub struct OriginAllowList {
    origins: HashSet<String>,
}

impl OriginAllowList {
    pub fn new<I, S>(origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            origins: origins.into_iter().map(Into::into).collect(),
        }
    }

    pub fn contains(&self, origin: &str) -> bool {
        self.origins.contains(origin)
    }

    pub fn len(&self) -> usize {
        self.origins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.origins.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.origins.iter().map(String::as_str)
    }
}

/// Validates the declared origin of a request.
#[derive(Debug, Clone)]
pub struct OriginGuard {
    allow_list: OriginAllowList,
    mode: OriginMode,
}

impl OriginGuard {
    pub fn new(allow_list: OriginAllowList, mode: OriginMode) -> Self {
        Self { allow_list, mode }
    }

    pub fn from_config(config: &OriginConfig) -> Self {
        Self::new(OriginAllowList::new(config.allowed.iter().cloned()), config.mode)
    }

    pub fn allow_list(&self) -> &OriginAllowList {
        &self.allow_list
    }

    pub fn mode(&self) -> OriginMode {
        self.mode
    }

    /// Pure decision on the declared `Origin`.
    pub fn check(&self, declared: &DeclaredOrigin<'_>) -> Result<(), OriginDenial> {
        match declared {
            DeclaredOrigin::Absent => match self.mode {
                OriginMode::Permissive => Ok(()),
                OriginMode::Hardened => Err(OriginDenial::Missing),
            },
            DeclaredOrigin::Present(origin) if self.allow_list.contains(origin) => Ok(()),
            DeclaredOrigin::Present(origin) => Err(OriginDenial::NotAllowed((*origin).to_string())),
            DeclaredOrigin::Unreadable(lossy) => Err(OriginDenial::NotAllowed(lossy.clone())),
        }
    }
}
