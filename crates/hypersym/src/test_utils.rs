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

//! In-memory fakes for every capability the resolver consumes, exposed
//! from the library so integration tests can reuse them.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;

use crate::error::ResolveError;
use crate::store::{
    GitDiffClient, GitserverClient, IndexStore, LocationTable, SubRepoPermsChecker,
};
use crate::types::{
    Dump, Location, MonikerData, PackageInformationData, Position, QualifiedMoniker, Range,
    RepositoryCommit,
};

pub fn make_dump(id: i64, repository_id: i64, commit: &str, root: &str) -> Dump {
    Dump {
        id,
        repository_id,
        repository_name: format!("repo-{}", repository_id),
        commit: commit.to_string(),
        root: root.to_string(),
    }
}

pub fn make_range(start_line: i64, start_character: i64, end_line: i64, end_character: i64) -> Range {
    Range {
        start: Position {
            line: start_line,
            character: start_character,
        },
        end: Position {
            line: end_line,
            character: end_character,
        },
    }
}

pub fn make_location(dump_id: i64, path: &str, range: Range) -> Location {
    Location {
        dump_id,
        path: path.to_string(),
        range,
    }
}

/// `n` one-line locations in a single file, one per line starting at
/// `first_line`.
pub fn make_locations(dump_id: i64, path: &str, first_line: i64, n: usize) -> Vec<Location> {
    (0..n as i64)
        .map(|i| make_location(dump_id, path, make_range(first_line + i, 2, first_line + i, 9)))
        .collect()
}

/// Configurable in-memory index store. Paged operations slice their
/// configured rows by limit/offset and report the full count, like the
/// real store. The reference-batch operation treats `ignore_ids` as the
/// server-side hint it is; overlap with the visible uploads is handled
/// by the engine's own dedup filter.
#[derive(Default)]
pub struct FakeIndexStore {
    references: HashMap<i64, Vec<Location>>,
    implementations: HashMap<i64, Vec<Location>>,
    monikers: HashMap<i64, Vec<Vec<MonikerData>>>,
    package_information: HashMap<String, PackageInformationData>,
    definition_dumps: Vec<Dump>,
    bulk_locations: HashMap<LocationTable, Vec<Location>>,
    reference_upload_ids: Vec<i64>,
    dumps_by_id: HashMap<i64, Dump>,
    references_error: Option<String>,
    references_cancelled: bool,
}

impl FakeIndexStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_references(mut self, dump_id: i64, locations: Vec<Location>) -> Self {
        self.references.insert(dump_id, locations);
        self
    }

    pub fn with_implementations(mut self, dump_id: i64, locations: Vec<Location>) -> Self {
        self.implementations.insert(dump_id, locations);
        self
    }

    pub fn with_monikers(mut self, dump_id: i64, range_monikers: Vec<Vec<MonikerData>>) -> Self {
        self.monikers.insert(dump_id, range_monikers);
        self
    }

    pub fn with_package_information(
        mut self,
        id: &str,
        data: PackageInformationData,
    ) -> Self {
        self.package_information.insert(id.to_string(), data);
        self
    }

    pub fn with_definition_dumps(mut self, dumps: Vec<Dump>) -> Self {
        self.definition_dumps = dumps;
        self
    }

    pub fn with_bulk_locations(mut self, table: LocationTable, locations: Vec<Location>) -> Self {
        self.bulk_locations.insert(table, locations);
        self
    }

    pub fn with_reference_upload_ids(mut self, ids: Vec<i64>) -> Self {
        self.reference_upload_ids = ids;
        self
    }

    pub fn with_dumps(mut self, dumps: Vec<Dump>) -> Self {
        for dump in dumps {
            self.dumps_by_id.insert(dump.id, dump);
        }
        self
    }

    pub fn with_references_error(mut self, message: &str) -> Self {
        self.references_error = Some(message.to_string());
        self
    }

    pub fn with_references_cancellation(mut self) -> Self {
        self.references_cancelled = true;
        self
    }

    fn page(all: &[Location], limit: usize, offset: usize) -> (Vec<Location>, usize) {
        let page = all.iter().skip(offset).take(limit).cloned().collect();
        (page, all.len())
    }
}

#[async_trait]
impl IndexStore for FakeIndexStore {
    async fn get_references(
        &self,
        dump_id: i64,
        _path: &str,
        _line: i64,
        _character: i64,
        limit: usize,
        offset: usize,
    ) -> anyhow::Result<(Vec<Location>, usize)> {
        if self.references_cancelled {
            return Err(anyhow::Error::new(ResolveError::Cancelled));
        }
        if let Some(message) = &self.references_error {
            anyhow::bail!("{}", message);
        }
        let all = self.references.get(&dump_id).cloned().unwrap_or_default();
        Ok(Self::page(&all, limit, offset))
    }

    async fn get_implementations(
        &self,
        dump_id: i64,
        _path: &str,
        _line: i64,
        _character: i64,
        limit: usize,
        offset: usize,
    ) -> anyhow::Result<(Vec<Location>, usize)> {
        let all = self
            .implementations
            .get(&dump_id)
            .cloned()
            .unwrap_or_default();
        Ok(Self::page(&all, limit, offset))
    }

    async fn get_monikers_by_position(
        &self,
        dump_id: i64,
        _path: &str,
        _line: i64,
        _character: i64,
    ) -> anyhow::Result<Vec<Vec<MonikerData>>> {
        Ok(self.monikers.get(&dump_id).cloned().unwrap_or_default())
    }

    async fn get_package_information(
        &self,
        _dump_id: i64,
        _path: &str,
        package_information_id: &str,
    ) -> anyhow::Result<Option<PackageInformationData>> {
        Ok(self.package_information.get(package_information_id).cloned())
    }

    async fn get_bulk_moniker_locations(
        &self,
        table: LocationTable,
        dump_ids: &[i64],
        monikers: &[MonikerData],
        limit: usize,
        offset: usize,
    ) -> anyhow::Result<(Vec<Location>, usize)> {
        if monikers.is_empty() {
            return Ok((Vec::new(), 0));
        }
        let rows: Vec<Location> = self
            .bulk_locations
            .get(&table)
            .map(|all| {
                all.iter()
                    .filter(|l| dump_ids.contains(&l.dump_id))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Ok(Self::page(&rows, limit, offset))
    }

    async fn get_uploads_with_definitions_for_monikers(
        &self,
        monikers: &[QualifiedMoniker],
    ) -> anyhow::Result<Vec<Dump>> {
        if monikers.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self.definition_dumps.clone())
    }

    async fn get_upload_ids_with_references(
        &self,
        monikers: &[QualifiedMoniker],
        _ignore_ids: &[i64],
        _repository_id: i64,
        _commit: &str,
        limit: usize,
        offset: usize,
    ) -> anyhow::Result<(Vec<i64>, usize, usize)> {
        if monikers.is_empty() {
            return Ok((Vec::new(), 0, 0));
        }
        let total = self.reference_upload_ids.len();
        let batch: Vec<i64> = self
            .reference_upload_ids
            .iter()
            .skip(offset)
            .take(limit)
            .copied()
            .collect();
        let scanned = batch.len();
        Ok((batch, scanned, total))
    }

    async fn get_dumps_by_ids(&self, ids: &[i64]) -> anyhow::Result<Vec<Dump>> {
        Ok(ids
            .iter()
            .filter_map(|id| self.dumps_by_id.get(id).cloned())
            .collect())
    }
}

/// Diff source keyed by `(source commit, target commit, path)`; absent
/// entries mean the file is identical in both commits.
#[derive(Default)]
pub struct FakeGitDiffClient {
    diffs: HashMap<(String, String, String), String>,
}

impl FakeGitDiffClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_diff(
        mut self,
        source_commit: &str,
        target_commit: &str,
        path: &str,
        diff: &str,
    ) -> Self {
        self.diffs.insert(
            (
                source_commit.to_string(),
                target_commit.to_string(),
                path.to_string(),
            ),
            diff.to_string(),
        );
        self
    }
}

#[async_trait]
impl GitDiffClient for FakeGitDiffClient {
    async fn diff(
        &self,
        _repository_id: i64,
        source_commit: &str,
        target_commit: &str,
        path: &str,
    ) -> anyhow::Result<Option<String>> {
        Ok(self
            .diffs
            .get(&(
                source_commit.to_string(),
                target_commit.to_string(),
                path.to_string(),
            ))
            .cloned())
    }
}

/// Gitserver in which every commit resolves unless marked otherwise.
#[derive(Default)]
pub struct FakeGitserverClient {
    unresolvable: HashSet<(i64, String)>,
}

impl FakeGitserverClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_unresolvable_commit(mut self, repository_id: i64, commit: &str) -> Self {
        self.unresolvable.insert((repository_id, commit.to_string()));
        self
    }
}

#[async_trait]
impl GitserverClient for FakeGitserverClient {
    async fn commits_exist(&self, commits: &[RepositoryCommit]) -> anyhow::Result<Vec<bool>> {
        Ok(commits
            .iter()
            .map(|rc| {
                !self
                    .unresolvable
                    .contains(&(rc.repository_id, rc.commit.clone()))
            })
            .collect())
    }
}

/// Permission checker denying an explicit set of `(repository, path)`
/// pairs.
#[derive(Default)]
pub struct FakeSubRepoPermsChecker {
    enabled: bool,
    denied: HashSet<(String, String)>,
}

impl FakeSubRepoPermsChecker {
    pub fn new() -> Self {
        Self {
            enabled: true,
            denied: HashSet::new(),
        }
    }

    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn with_denied_path(mut self, repository_name: &str, path: &str) -> Self {
        self.denied
            .insert((repository_name.to_string(), path.to_string()));
        self
    }
}

impl SubRepoPermsChecker for FakeSubRepoPermsChecker {
    fn enabled(&self) -> bool {
        self.enabled
    }

    fn allow_path(&self, repository_name: &str, path: &str) -> anyhow::Result<bool> {
        Ok(!self
            .denied
            .contains(&(repository_name.to_string(), path.to_string())))
    }
}
