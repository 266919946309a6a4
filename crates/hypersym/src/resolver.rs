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

//! The multi-phase resolver engine. One `resolve` call produces one page
//! of a result stream: it restores state from the cursor, walks the
//! phase machine (local graph traversal, then definitions in
//! dependencies, then moniker search over dependents), translates every
//! collected location back into the commit the request targeted, and
//! hands back the re-encoded cursor.

use std::sync::Arc;

use crate::commits::CommitCache;
use crate::config::ResolverConfig;
use crate::cursor::{Cursor, CursorVisibleUpload, LocalCursor, Phase, RemoteCursor};
use crate::error::ResolveError;
use crate::loader::UploadsDataLoader;
use crate::monikers::QualifiedMonikerSet;
use crate::store::{
    GitDiffClient, GitserverClient, IndexStore, LocationTable, SubRepoPermsChecker,
};
use crate::translator::GitTreeTranslator;
use crate::types::{
    Dump, Location, MonikerData, MonikerKind, Position, QualifiedMoniker, Range,
    RepositoryCommit, RequestArgs, UploadLocation, VisibleUpload,
};

/// Maximum number of monikers gathered into either cursor array.
pub const MONIKER_LIMIT: usize = 10;

/// Maximum number of locations returned by the one-shot dependencies
/// phase.
pub const DEFINITIONS_LIMIT: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveKind {
    References,
    Implementations,
}

impl ResolveKind {
    /// The moniker kind whose definitions the dependencies phase chases.
    fn moniker_kind(&self) -> MonikerKind {
        match self {
            ResolveKind::References => MonikerKind::Import,
            ResolveKind::Implementations => MonikerKind::Implementation,
        }
    }

    /// The table the dependents phase searches.
    fn dependents_table(&self) -> LocationTable {
        match self {
            ResolveKind::References => LocationTable::References,
            ResolveKind::Implementations => LocationTable::Implementations,
        }
    }
}

/// One resolver serves one logical request; its caches die with it. The
/// same instance can be handed the cursor from a previous page as long
/// as it was seeded with the same candidate dump set.
pub struct Resolver {
    store: Arc<dyn IndexStore>,
    translator: GitTreeTranslator,
    commit_cache: CommitCache,
    data_loader: UploadsDataLoader,
    perms_checker: Option<Arc<dyn SubRepoPermsChecker>>,
    repository_id: i64,
    commit: String,
    maximum_indexes_per_moniker_search: usize,
    sub_repo_perms_enabled: bool,
}

impl Resolver {
    pub fn new(
        store: Arc<dyn IndexStore>,
        diff_client: Arc<dyn GitDiffClient>,
        gitserver: Arc<dyn GitserverClient>,
        repository_id: i64,
        commit: String,
        path: String,
        config: &ResolverConfig,
    ) -> Self {
        Self {
            store,
            translator: GitTreeTranslator::new(
                diff_client,
                repository_id,
                commit.clone(),
                path,
                config.hunk_cache_size,
            ),
            commit_cache: CommitCache::new(gitserver),
            data_loader: UploadsDataLoader::new(),
            perms_checker: None,
            repository_id,
            commit,
            maximum_indexes_per_moniker_search: config.maximum_indexes_per_moniker_search,
            sub_repo_perms_enabled: config.sub_repo_perms_enabled,
        }
    }

    pub fn with_sub_repo_checker(mut self, checker: Arc<dyn SubRepoPermsChecker>) -> Self {
        self.perms_checker = Some(checker);
        self
    }

    /// Seed the candidate dumps attached to the request's commit.
    pub fn add_uploads(&mut self, dumps: Vec<Dump>) {
        for dump in dumps {
            self.data_loader.add_upload(dump);
        }
    }

    pub async fn references(
        &mut self,
        args: RequestArgs,
    ) -> Result<(Vec<UploadLocation>, String), ResolveError> {
        self.resolve(ResolveKind::References, args).await
    }

    pub async fn implementations(
        &mut self,
        args: RequestArgs,
    ) -> Result<(Vec<UploadLocation>, String), ResolveError> {
        self.resolve(ResolveKind::Implementations, args).await
    }

    /// Resolve one page of the result stream for the given kind.
    pub async fn resolve(
        &mut self,
        kind: ResolveKind,
        args: RequestArgs,
    ) -> Result<(Vec<UploadLocation>, String), ResolveError> {
        let mut cursor = Cursor::decode(&args.raw_cursor)?;

        // Restore the visible-upload set frozen on the first page, or
        // compute and freeze it now.
        let visible_uploads = self.visible_uploads_from_cursor(&args, &mut cursor).await?;
        tracing::debug!(
            "resolving {:?} over {} visible uploads",
            kind,
            visible_uploads.len()
        );

        // Gather the moniker arrays once; later pages reuse the cursor's.
        if cursor.ordered_monikers.is_none() {
            cursor.ordered_monikers = Some(
                self.gather_ordered_monikers(&visible_uploads, kind.moniker_kind())
                    .await?,
            );
        }
        if cursor.ordered_export_monikers.is_none() {
            cursor.ordered_export_monikers = Some(
                self.gather_ordered_monikers(&visible_uploads, MonikerKind::Export)
                    .await?,
            );
        }
        tracing::debug!(
            "gathered {} {} monikers and {} export monikers",
            cursor.ordered_monikers.as_ref().map_or(0, Vec::len),
            kind.moniker_kind().as_str(),
            cursor.ordered_export_monikers.as_ref().map_or(0, Vec::len),
        );

        let mut locations: Vec<Location> = Vec::new();

        // Phase 1: traverse the graphs of the indexes attached to the
        // queried commit until the page fills or they are exhausted.
        if cursor.phase == Phase::Local {
            while locations.len() < args.limit {
                let (page, has_more) = self
                    .page_local_locations(
                        kind,
                        &visible_uploads,
                        &mut cursor.local_cursor,
                        args.limit - locations.len(),
                    )
                    .await?;
                locations.extend(page);
                if !has_more {
                    cursor.phase = Phase::Dependencies;
                    break;
                }
            }
        }

        // Phase 2: one shot over the dumps that define the gathered
        // monikers.
        if cursor.phase == Phase::Dependencies {
            let monikers = cursor.ordered_monikers.clone().unwrap_or_default();
            let uploads = self
                .uploads_with_definitions_for_monikers(&monikers)
                .await?;
            tracing::debug!("found {} uploads defining monikers", uploads.len());

            let (definitions, _) = self
                .bulk_moniker_locations(
                    LocationTable::Definitions,
                    &uploads,
                    &monikers,
                    DEFINITIONS_LIMIT,
                    0,
                )
                .await?;
            locations.extend(definitions);

            cursor.phase = Phase::Dependents;
        }

        // Phase 3: moniker search over batches of dependent indexes.
        if cursor.phase == Phase::Dependents {
            let export_monikers = cursor.ordered_export_monikers.clone().unwrap_or_default();
            while locations.len() < args.limit {
                let (page, has_more) = self
                    .page_remote_locations(
                        kind.dependents_table(),
                        &visible_uploads,
                        &export_monikers,
                        &mut cursor.remote_cursor,
                        args.limit - locations.len(),
                    )
                    .await?;
                locations.extend(page);
                if !has_more {
                    cursor.phase = Phase::Done;
                    break;
                }
            }
        }

        // Translate every location back into the commit the user is
        // looking at.
        let adjusted = self.adjust_locations(&locations).await?;
        tracing::debug!(
            "page carries {} locations ({} after adjustment)",
            locations.len(),
            adjusted.len()
        );

        let next_cursor = if cursor.phase == Phase::Done {
            String::new()
        } else {
            cursor.encode()?
        };

        Ok((adjusted, next_cursor))
    }

    /// Reconstruct the visible uploads pinned by the cursor, or compute
    /// them for the first page and pin them. A pinned dump missing from
    /// the data loader means the upload set changed under the client.
    async fn visible_uploads_from_cursor(
        &self,
        args: &RequestArgs,
        cursor: &mut Cursor,
    ) -> Result<Vec<VisibleUpload>, ResolveError> {
        if !cursor.cursors_to_visible_uploads.is_empty() {
            let mut visible = Vec::with_capacity(cursor.cursors_to_visible_uploads.len());
            for entry in &cursor.cursors_to_visible_uploads {
                let Some(dump) = self.data_loader.get(entry.dump_id) else {
                    return Err(ResolveError::ConcurrentModification);
                };
                visible.push(VisibleUpload {
                    dump: dump.clone(),
                    target_path: entry.target_path.clone(),
                    target_position: entry.target_position,
                    target_path_without_root: entry.target_path_without_root.clone(),
                });
            }
            return Ok(visible);
        }

        let visible = self.visible_uploads(args.line, args.character).await?;
        cursor.cursors_to_visible_uploads = visible
            .iter()
            .map(|u| CursorVisibleUpload {
                dump_id: u.dump.id,
                target_path: u.target_path.clone(),
                target_position: u.target_position,
                target_path_without_root: u.target_path_without_root.clone(),
            })
            .collect();
        Ok(visible)
    }

    /// Translate the request position into each candidate dump's indexed
    /// commit. Dumps the position does not survive into are dropped.
    async fn visible_uploads(
        &self,
        line: i64,
        character: i64,
    ) -> Result<Vec<VisibleUpload>, ResolveError> {
        let mut visible = Vec::with_capacity(self.data_loader.initial_uploads().len());
        for dump in self.data_loader.initial_uploads() {
            if let Some(upload) = self.visible_upload(line, character, dump).await? {
                visible.push(upload);
            }
        }
        Ok(visible)
    }

    async fn visible_upload(
        &self,
        line: i64,
        character: i64,
        dump: &Dump,
    ) -> Result<Option<VisibleUpload>, ResolveError> {
        let position = Position { line, character };
        let translated = self
            .translator
            .get_target_commit_position_from_source_position(&dump.commit, position, false)
            .await
            .map_err(|e| {
                ResolveError::upstream(
                    "git_tree_translator.get_target_commit_position_from_source_position",
                    e,
                )
            })?;
        let Some((target_path, target_position)) = translated else {
            return Ok(None);
        };

        let target_path_without_root = target_path
            .strip_prefix(&dump.root)
            .unwrap_or(&target_path)
            .to_string();
        Ok(Some(VisibleUpload {
            dump: dump.clone(),
            target_path,
            target_position,
            target_path_without_root,
        }))
    }

    /// Monikers of the given kind attached to the ranges enclosing the
    /// request position, ordered by visible upload and then by
    /// specificity (innermost ranges first), de-duplicated, capped at
    /// `MONIKER_LIMIT`.
    async fn gather_ordered_monikers(
        &self,
        visible_uploads: &[VisibleUpload],
        kind: MonikerKind,
    ) -> Result<Vec<QualifiedMoniker>, ResolveError> {
        let mut set = QualifiedMonikerSet::new();

        for upload in visible_uploads {
            let range_monikers = self
                .store
                .get_monikers_by_position(
                    upload.dump.id,
                    &upload.target_path_without_root,
                    upload.target_position.line,
                    upload.target_position.character,
                )
                .await
                .map_err(|e| ResolveError::upstream("index_store.get_monikers_by_position", e))?;

            for monikers in range_monikers {
                for moniker in monikers {
                    if moniker.package_information_id.is_empty() || moniker.kind != kind {
                        continue;
                    }

                    let package_information = self
                        .store
                        .get_package_information(
                            upload.dump.id,
                            &upload.target_path_without_root,
                            &moniker.package_information_id,
                        )
                        .await
                        .map_err(|e| {
                            ResolveError::upstream("index_store.get_package_information", e)
                        })?;
                    let Some(package_information) = package_information else {
                        continue;
                    };

                    set.add(QualifiedMoniker {
                        moniker,
                        package_information,
                    });
                    if set.len() >= MONIKER_LIMIT {
                        return Ok(set.into_monikers());
                    }
                }
            }
        }

        Ok(set.into_monikers())
    }

    /// One pass over the local result set: iterate visible uploads from
    /// the cursor's upload offset, requesting what is left of the page
    /// from each. Returns whether more local results remain.
    async fn page_local_locations(
        &self,
        kind: ResolveKind,
        visible_uploads: &[VisibleUpload],
        cursor: &mut LocalCursor,
        limit: usize,
    ) -> Result<(Vec<Location>, bool), ResolveError> {
        let mut all_locations = Vec::new();

        for (i, upload) in visible_uploads.iter().enumerate() {
            if all_locations.len() >= limit {
                // page is full
                break;
            }
            if i < cursor.upload_offset {
                // exhausted on an earlier page
                continue;
            }

            let (locations, total_count) = match kind {
                ResolveKind::References => self
                    .store
                    .get_references(
                        upload.dump.id,
                        &upload.target_path_without_root,
                        upload.target_position.line,
                        upload.target_position.character,
                        limit - all_locations.len(),
                        cursor.location_offset,
                    )
                    .await
                    .map_err(|e| ResolveError::upstream("index_store.get_references", e))?,
                ResolveKind::Implementations => self
                    .store
                    .get_implementations(
                        upload.dump.id,
                        &upload.target_path_without_root,
                        upload.target_position.line,
                        upload.target_position.character,
                        limit - all_locations.len(),
                        cursor.location_offset,
                    )
                    .await
                    .map_err(|e| ResolveError::upstream("index_store.get_implementations", e))?,
            };

            cursor.location_offset += locations.len();
            if cursor.location_offset >= total_count {
                // move to the next index on the following pass
                cursor.location_offset = 0;
                cursor.upload_offset += 1;
            }

            all_locations.extend(locations);
        }

        Ok((
            all_locations,
            cursor.upload_offset < visible_uploads.len(),
        ))
    }

    /// One pass over the remote result set: top up the batch of
    /// dependent indexes if needed, search them, and drop locations that
    /// the local phase already produced. Returns whether another page
    /// may exist (conservatively).
    async fn page_remote_locations(
        &mut self,
        table: LocationTable,
        visible_uploads: &[VisibleUpload],
        ordered_monikers: &[QualifiedMoniker],
        cursor: &mut RemoteCursor,
        limit: usize,
    ) -> Result<(Vec<Location>, bool), ResolveError> {
        while cursor.upload_batch_ids.is_empty() {
            if cursor.upload_offset < 0 {
                // no batches remaining
                return Ok((Vec::new(), false));
            }

            let ignore_ids: Vec<i64> = visible_uploads.iter().map(|u| u.dump.id).collect();
            let (ids, records_scanned, total_records) = self
                .store
                .get_upload_ids_with_references(
                    ordered_monikers,
                    &ignore_ids,
                    self.repository_id,
                    &self.commit,
                    self.maximum_indexes_per_moniker_search,
                    cursor.upload_offset as usize,
                )
                .await
                .map_err(|e| {
                    ResolveError::upstream("index_store.get_upload_ids_with_references", e)
                })?;

            cursor.upload_batch_ids = ids;
            cursor.upload_offset += records_scanned as i64;
            if cursor.upload_offset >= total_records as i64 {
                // signal exhaustion of the reference batches
                cursor.upload_offset = -1;
            }
        }

        let batch_ids = cursor.upload_batch_ids.clone();
        let uploads = self.uploads_by_ids(&batch_ids).await?;

        let (locations, total_count) = self
            .bulk_moniker_locations(table, &uploads, ordered_monikers, limit, cursor.location_offset)
            .await?;

        cursor.location_offset += locations.len();
        if cursor.location_offset >= total_count {
            // require a new batch on the next page
            cursor.location_offset = 0;
            cursor.upload_batch_ids.clear();
        }

        // Ranges enclosing the request position surface both from the
        // local graph traversal and from moniker search; keep only the
        // former.
        let filtered: Vec<Location> = locations
            .into_iter()
            .filter(|location| !is_source_location(visible_uploads, location))
            .collect();

        // Conservative: the current batch may be drained and the next
        // one empty, in which case the final page resumes to nothing.
        let has_another_page = !cursor.upload_batch_ids.is_empty() || cursor.upload_offset >= 0;

        Ok((filtered, has_another_page))
    }

    /// Dumps that define any of the given monikers, minus those whose
    /// commits gitserver no longer resolves. Only the surviving dumps
    /// enter the data loader.
    async fn uploads_with_definitions_for_monikers(
        &mut self,
        monikers: &[QualifiedMoniker],
    ) -> Result<Vec<Dump>, ResolveError> {
        let uploads = self
            .store
            .get_uploads_with_definitions_for_monikers(monikers)
            .await
            .map_err(|e| {
                ResolveError::upstream("index_store.get_uploads_with_definitions_for_monikers", e)
            })?;

        let uploads = self.remove_uploads_with_unknown_commits(uploads).await?;
        self.data_loader.set_uploads_in_cache(&uploads);
        Ok(uploads)
    }

    async fn remove_uploads_with_unknown_commits(
        &self,
        uploads: Vec<Dump>,
    ) -> Result<Vec<Dump>, ResolveError> {
        let commits: Vec<RepositoryCommit> = uploads
            .iter()
            .map(|u| RepositoryCommit {
                repository_id: u.repository_id,
                commit: u.commit.clone(),
            })
            .collect();
        let exists = self
            .commit_cache
            .are_commits_resolvable(&commits)
            .await
            .map_err(|e| ResolveError::upstream("commit_cache.are_commits_resolvable", e))?;

        Ok(uploads
            .into_iter()
            .zip(exists)
            .filter_map(|(upload, ok)| ok.then_some(upload))
            .collect())
    }

    /// Hydrate dumps by id, using the data loader as a cache. Newly
    /// fetched dumps with unresolvable commits are dropped and never
    /// cached.
    async fn uploads_by_ids(&mut self, ids: &[i64]) -> Result<Vec<Dump>, ResolveError> {
        let mut uploads = Vec::with_capacity(ids.len());
        let mut missing_ids = Vec::new();
        for id in ids {
            match self.data_loader.get(*id) {
                Some(dump) => uploads.push(dump.clone()),
                None => missing_ids.push(*id),
            }
        }

        if !missing_ids.is_empty() {
            let fetched = self
                .store
                .get_dumps_by_ids(&missing_ids)
                .await
                .map_err(|e| ResolveError::upstream("index_store.get_dumps_by_ids", e))?;
            let fetched = self.remove_uploads_with_unknown_commits(fetched).await?;
            self.data_loader.set_uploads_in_cache(&fetched);
            uploads.extend(fetched);
        }

        Ok(uploads)
    }

    async fn bulk_moniker_locations(
        &self,
        table: LocationTable,
        uploads: &[Dump],
        ordered_monikers: &[QualifiedMoniker],
        limit: usize,
        offset: usize,
    ) -> Result<(Vec<Location>, usize), ResolveError> {
        let ids: Vec<i64> = uploads.iter().map(|u| u.id).collect();
        let monikers: Vec<MonikerData> = ordered_monikers
            .iter()
            .map(|m| m.moniker.clone())
            .collect();
        tracing::debug!(
            "bulk moniker search in {} over {} uploads",
            table.as_str(),
            ids.len()
        );

        self.store
            .get_bulk_moniker_locations(table, &ids, &monikers, limit, offset)
            .await
            .map_err(|e| ResolveError::upstream("index_store.get_bulk_moniker_locations", e))
    }

    /// Translate each location into the commit the request targeted and
    /// package it with its owning dump. Locations whose dump is unknown
    /// are skipped; the sub-repo checker, when enabled, filters paths
    /// for the acting principal.
    async fn adjust_locations(
        &self,
        locations: &[Location],
    ) -> Result<Vec<UploadLocation>, ResolveError> {
        let checker = if self.sub_repo_perms_enabled {
            self.perms_checker.as_ref().filter(|c| c.enabled())
        } else {
            None
        };

        let mut upload_locations = Vec::with_capacity(locations.len());
        for location in locations {
            let Some(dump) = self.data_loader.get(location.dump_id) else {
                continue;
            };
            let adjusted = self.upload_location(dump.clone(), location).await?;

            match checker {
                None => upload_locations.push(adjusted),
                Some(checker) => {
                    let include = checker
                        .allow_path(&adjusted.dump.repository_name, &adjusted.path)
                        .map_err(|e| ResolveError::upstream("sub_repo_perms.allow_path", e))?;
                    if include {
                        upload_locations.push(adjusted);
                    }
                }
            }
        }

        Ok(upload_locations)
    }

    async fn upload_location(
        &self,
        dump: Dump,
        location: &Location,
    ) -> Result<UploadLocation, ResolveError> {
        let path = format!("{}{}", dump.root, location.path);
        let (target_commit, target_range) = self
            .source_range(dump.repository_id, &dump.commit, &path, location.range)
            .await?;

        Ok(UploadLocation {
            dump,
            path,
            target_commit,
            target_range,
        })
    }

    /// Translate a range at a dump's indexed commit back into the
    /// request commit. Falls back to the indexed commit and the original
    /// range when the range does not survive the diff, and never
    /// attempts translation across repositories.
    async fn source_range(
        &self,
        repository_id: i64,
        commit: &str,
        path: &str,
        range: Range,
    ) -> Result<(String, Range), ResolveError> {
        if repository_id != self.repository_id {
            // no diffs between distinct repositories
            return Ok((commit.to_string(), range));
        }

        let translated = self
            .translator
            .get_target_commit_range_from_source_range(commit, path, range, true)
            .await
            .map_err(|e| {
                ResolveError::upstream(
                    "git_tree_translator.get_target_commit_range_from_source_range",
                    e,
                )
            })?;

        match translated {
            Some((_, source_range)) => Ok((self.commit.clone(), source_range)),
            None => Ok((commit.to_string(), range)),
        }
    }
}

/// Whether the location encloses the request position within one of the
/// visible uploads. Store paths are dump-root-relative, so the
/// comparison uses the root-stripped target path.
fn is_source_location(visible_uploads: &[VisibleUpload], location: &Location) -> bool {
    visible_uploads.iter().any(|upload| {
        location.dump_id == upload.dump.id
            && location.path == upload.target_path_without_root
            && location.range.contains(upload.target_position)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn visible(dump_id: i64, path: &str, line: i64, character: i64) -> VisibleUpload {
        VisibleUpload {
            dump: Dump {
                id: dump_id,
                repository_id: 1,
                repository_name: "r".into(),
                commit: "aaaa".into(),
                root: "proto/".into(),
            },
            target_path: format!("proto/{}", path),
            target_position: Position { line, character },
            target_path_without_root: path.into(),
        }
    }

    fn location(dump_id: i64, path: &str, start: (i64, i64), end: (i64, i64)) -> Location {
        Location {
            dump_id,
            path: path.into(),
            range: Range {
                start: Position {
                    line: start.0,
                    character: start.1,
                },
                end: Position {
                    line: end.0,
                    character: end.1,
                },
            },
        }
    }

    #[test]
    fn source_locations_are_detected_in_stripped_coordinates() {
        let uploads = vec![visible(1, "api.go", 10, 5)];

        assert!(is_source_location(
            &uploads,
            &location(1, "api.go", (10, 0), (10, 20)),
        ));
        // other dump
        assert!(!is_source_location(
            &uploads,
            &location(2, "api.go", (10, 0), (10, 20)),
        ));
        // other file
        assert!(!is_source_location(
            &uploads,
            &location(1, "other.go", (10, 0), (10, 20)),
        ));
        // range does not enclose the position
        assert!(!is_source_location(
            &uploads,
            &location(1, "api.go", (11, 0), (12, 0)),
        ));
    }
}
