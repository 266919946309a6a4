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

//! Maps paths and positions between the commit a request targets and the
//! commits the indexes were built at, by shifting lines through git diff
//! hunks. Characters are never re-mapped. Parsed hunks are kept in a
//! request-scoped LRU so one page translating many locations in the same
//! file fetches its diff once.

use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use parking_lot::Mutex;

use crate::store::GitDiffClient;
use crate::types::{Position, Range};

/// One `@@ -a,b +c,d @@` header. Start lines are 1-indexed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Hunk {
    pub old_start: i64,
    pub old_lines: i64,
    pub new_start: i64,
    pub new_lines: i64,
}

type HunkCacheKey = (String, String, String);

/// Translates positions between the source commit (the one the request
/// targets) and arbitrary target commits of the same repository.
pub struct GitTreeTranslator {
    client: Arc<dyn GitDiffClient>,
    repository_id: i64,
    source_commit: String,
    source_path: String,
    // keyed by (source commit, target commit, path); access is
    // single-threaded per request, the lock only satisfies Sync
    hunk_cache: Mutex<LruCache<HunkCacheKey, Arc<Vec<Hunk>>>>,
}

impl GitTreeTranslator {
    pub fn new(
        client: Arc<dyn GitDiffClient>,
        repository_id: i64,
        source_commit: String,
        source_path: String,
        hunk_cache_size: usize,
    ) -> Self {
        Self {
            client,
            repository_id,
            source_commit,
            source_path,
            hunk_cache: Mutex::new(LruCache::new(
                NonZeroUsize::new(hunk_cache_size.max(1)).unwrap(),
            )),
        }
    }

    /// Translate the request position at the translator's path into
    /// `target_commit` coordinates (`reverse` goes the other way).
    /// `None` means the position has no equivalent in the other commit.
    pub async fn get_target_commit_position_from_source_position(
        &self,
        target_commit: &str,
        position: Position,
        reverse: bool,
    ) -> anyhow::Result<Option<(String, Position)>> {
        let path = self.source_path.clone();
        let Some(position) = self
            .translate_position(target_commit, &path, position, reverse)
            .await?
        else {
            return Ok(None);
        };
        Ok(Some((path, position)))
    }

    /// Translate a range at an explicit path. Both endpoints must have an
    /// equivalent in the other commit.
    pub async fn get_target_commit_range_from_source_range(
        &self,
        target_commit: &str,
        path: &str,
        range: Range,
        reverse: bool,
    ) -> anyhow::Result<Option<(String, Range)>> {
        let Some(start) = self
            .translate_position(target_commit, path, range.start, reverse)
            .await?
        else {
            return Ok(None);
        };
        let Some(end) = self
            .translate_position(target_commit, path, range.end, reverse)
            .await?
        else {
            return Ok(None);
        };
        Ok(Some((path.to_string(), Range { start, end })))
    }

    async fn translate_position(
        &self,
        target_commit: &str,
        path: &str,
        position: Position,
        reverse: bool,
    ) -> anyhow::Result<Option<Position>> {
        if target_commit == self.source_commit {
            return Ok(Some(position));
        }
        let hunks = self.hunks(target_commit, path).await?;
        Ok(shift_line(&hunks, position.line, !reverse).map(|line| Position {
            line,
            character: position.character,
        }))
    }

    async fn hunks(&self, target_commit: &str, path: &str) -> anyhow::Result<Arc<Vec<Hunk>>> {
        let key = (
            self.source_commit.clone(),
            target_commit.to_string(),
            path.to_string(),
        );
        if let Some(hunks) = self.hunk_cache.lock().get(&key) {
            return Ok(hunks.clone());
        }

        let diff = self
            .client
            .diff(
                self.repository_id,
                &self.source_commit,
                target_commit,
                path,
            )
            .await?;
        let hunks = Arc::new(diff.map(|d| parse_hunks(&d)).unwrap_or_default());
        self.hunk_cache.lock().put(key, hunks.clone());
        Ok(hunks)
    }
}

pub(crate) fn parse_hunks(diff: &str) -> Vec<Hunk> {
    diff.lines().filter_map(parse_hunk_header).collect()
}

fn parse_hunk_header(line: &str) -> Option<Hunk> {
    let rest = line.strip_prefix("@@ -")?;
    let end = rest.find(" @@")?;
    let mut spans = rest[..end].split(' ');
    let (old_start, old_lines) = parse_span(spans.next()?)?;
    let (new_start, new_lines) = parse_span(spans.next()?.strip_prefix('+')?)?;
    Some(Hunk {
        old_start,
        old_lines,
        new_start,
        new_lines,
    })
}

fn parse_span(span: &str) -> Option<(i64, i64)> {
    match span.split_once(',') {
        Some((start, lines)) => Some((start.parse().ok()?, lines.parse().ok()?)),
        None => Some((span.parse().ok()?, 1)),
    }
}

/// Shift a 0-indexed line through the hunks of one diff. `from_old` reads
/// each hunk old-side to new-side. Hunks arrive in ascending order, as
/// git emits them. A line inside a replaced span has no equivalent on the
/// other side.
pub(crate) fn shift_line(hunks: &[Hunk], line: i64, from_old: bool) -> Option<i64> {
    let line1 = line + 1; // hunk headers are 1-indexed
    let mut delta = 0i64;
    for hunk in hunks {
        let (start, lines, shift) = if from_old {
            (
                hunk.old_start,
                hunk.old_lines,
                hunk.new_lines - hunk.old_lines,
            )
        } else {
            (
                hunk.new_start,
                hunk.new_lines,
                hunk.old_lines - hunk.new_lines,
            )
        };
        if lines == 0 {
            // nothing on this side was touched; lines after the anchor shift
            if line1 > start {
                delta += shift;
                continue;
            }
            break;
        }
        if line1 < start {
            break;
        }
        if line1 >= start + lines {
            delta += shift;
            continue;
        }
        return None;
    }
    Some(line1 + delta - 1)
}
