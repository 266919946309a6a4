// Copyright 2025 HyperSym Project
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::error::Error;
use std::fmt::{self, Display};

/// Typed errors surfaced by the resolver engine.
#[derive(Debug)]
pub enum ResolveError {
    /// The pagination token could not be decoded. User-visible; the
    /// message carries only a short prefix of the offending token.
    InvalidCursor(String),
    /// The set of visible uploads shrank between pages of one result
    /// stream. User-visible; clients should restart pagination.
    ConcurrentModification,
    /// The request was cancelled before it completed.
    Cancelled,
    /// A collaborator call failed; `site` names the call.
    Upstream {
        site: &'static str,
        source: anyhow::Error,
    },
    /// An internal invariant did not hold.
    Internal(String),
}

impl ResolveError {
    /// Wrap a collaborator failure with its call site. A cancellation
    /// raised inside the collaborator keeps its kind.
    pub fn upstream(site: &'static str, source: anyhow::Error) -> Self {
        match source.downcast::<ResolveError>() {
            Ok(ResolveError::Cancelled) => ResolveError::Cancelled,
            Ok(other) => other,
            Err(source) => ResolveError::Upstream { site, source },
        }
    }

    pub(crate) fn invalid_cursor(raw: &str) -> Self {
        let prefix: String = raw.chars().take(16).collect();
        if prefix.len() < raw.len() {
            ResolveError::InvalidCursor(format!("{}...", prefix))
        } else {
            ResolveError::InvalidCursor(prefix)
        }
    }
}

impl Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolveError::InvalidCursor(token) => write!(f, "invalid cursor: {:?}", token),
            ResolveError::ConcurrentModification => {
                write!(f, "result set changed while paginating")
            }
            ResolveError::Cancelled => write!(f, "request cancelled"),
            ResolveError::Upstream { site, source } => write!(f, "{}: {}", site, source),
            ResolveError::Internal(msg) => write!(f, "internal: {}", msg),
        }
    }
}

impl Error for ResolveError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ResolveError::Upstream { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}
