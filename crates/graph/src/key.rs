// Licensed under the Apache License, Version 2.0 (see LICENSE).

use std::fmt;
use std::str::FromStr;

use crate::kind::Kind;

/// `"<kind>:<id>"`, colon-delimited, unique across the lifetime of one reaper
/// run. Used both as the in-memory map key and as the user-facing identifier
/// printed in progress output.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct GraphKey {
    kind: Kind,
    id: String,
}

impl GraphKey {
    pub fn new(kind: Kind, id: impl Into<String>) -> GraphKey {
        GraphKey {
            kind,
            id: id.into(),
        }
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

impl fmt::Display for GraphKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

impl FromStr for GraphKey {
    type Err = String;

    fn from_str(s: &str) -> Result<GraphKey, String> {
        let (kind, id) = s
            .split_once(':')
            .ok_or_else(|| format!("graph key {s:?} is missing the ':' separator"))?;
        if id.is_empty() {
            return Err(format!("graph key {s:?} has an empty id"));
        }
        Ok(GraphKey::new(kind.parse()?, id))
    }
}
