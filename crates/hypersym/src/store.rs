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

//! Capability traits the resolver consumes. Production implementations
//! live with the storage and gitserver layers; tests plug in the
//! in-memory fakes from `test_utils`.

use async_trait::async_trait;

use crate::types::{
    Dump, Location, MonikerData, PackageInformationData, QualifiedMoniker, RepositoryCommit,
};

/// Table selector for bulk moniker searches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LocationTable {
    Definitions,
    References,
    Implementations,
}

impl LocationTable {
    pub fn as_str(&self) -> &'static str {
        match self {
            LocationTable::Definitions => "definitions",
            LocationTable::References => "references",
            LocationTable::Implementations => "implementations",
        }
    }
}

/// Read access to the fleet of pre-built code-intelligence indexes.
///
/// Paged operations never return more than `limit` items and report the
/// total count ignoring limit and offset.
#[async_trait]
pub trait IndexStore: Send + Sync {
    async fn get_references(
        &self,
        dump_id: i64,
        path: &str,
        line: i64,
        character: i64,
        limit: usize,
        offset: usize,
    ) -> anyhow::Result<(Vec<Location>, usize)>;

    async fn get_implementations(
        &self,
        dump_id: i64,
        path: &str,
        line: i64,
        character: i64,
        limit: usize,
        offset: usize,
    ) -> anyhow::Result<(Vec<Location>, usize)>;

    /// Monikers attached to the ranges enclosing the given position,
    /// grouped by range, innermost range first.
    async fn get_monikers_by_position(
        &self,
        dump_id: i64,
        path: &str,
        line: i64,
        character: i64,
    ) -> anyhow::Result<Vec<Vec<MonikerData>>>;

    async fn get_package_information(
        &self,
        dump_id: i64,
        path: &str,
        package_information_id: &str,
    ) -> anyhow::Result<Option<PackageInformationData>>;

    /// Locations in the given dumps whose attached moniker matches any of
    /// the given monikers, read from the given table.
    async fn get_bulk_moniker_locations(
        &self,
        table: LocationTable,
        dump_ids: &[i64],
        monikers: &[MonikerData],
        limit: usize,
        offset: usize,
    ) -> anyhow::Result<(Vec<Location>, usize)>;

    /// Dumps that define any of the given monikers.
    async fn get_uploads_with_definitions_for_monikers(
        &self,
        monikers: &[QualifiedMoniker],
    ) -> anyhow::Result<Vec<Dump>>;

    /// One batch of dump ids that reference any of the given monikers,
    /// excluding `ignore_ids`. Returns `(ids, records_scanned, total_records)`.
    #[allow(clippy::too_many_arguments)]
    async fn get_upload_ids_with_references(
        &self,
        monikers: &[QualifiedMoniker],
        ignore_ids: &[i64],
        repository_id: i64,
        commit: &str,
        limit: usize,
        offset: usize,
    ) -> anyhow::Result<(Vec<i64>, usize, usize)>;

    async fn get_dumps_by_ids(&self, ids: &[i64]) -> anyhow::Result<Vec<Dump>>;
}

/// Source of git diffs between two commits of one repository.
#[async_trait]
pub trait GitDiffClient: Send + Sync {
    /// Raw unified diff output for `path` between the two commits, or
    /// `None` when the file is identical in both.
    async fn diff(
        &self,
        repository_id: i64,
        source_commit: &str,
        target_commit: &str,
        path: &str,
    ) -> anyhow::Result<Option<String>>;
}

/// Commit existence checks against gitserver.
#[async_trait]
pub trait GitserverClient: Send + Sync {
    /// Whether each commit is known to gitserver; result order matches
    /// the input order.
    async fn commits_exist(&self, commits: &[RepositoryCommit]) -> anyhow::Result<Vec<bool>>;
}

/// Path-level permission checks for the acting principal.
pub trait SubRepoPermsChecker: Send + Sync {
    fn enabled(&self) -> bool;
    fn allow_path(&self, repository_name: &str, path: &str) -> anyhow::Result<bool>;
}
