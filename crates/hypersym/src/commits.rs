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

//! Request-scoped memoization of commit-resolvability checks, batching
//! only cache misses to gitserver. Dumps whose commits have been garbage
//! collected are dropped by the resolver based on these answers.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::store::GitserverClient;
use crate::types::RepositoryCommit;

pub struct CommitCache {
    client: Arc<dyn GitserverClient>,
    cache: Mutex<HashMap<RepositoryCommit, bool>>,
}

impl CommitCache {
    pub fn new(client: Arc<dyn GitserverClient>) -> Self {
        Self {
            client,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Whether each `(repository, commit)` pair is known to gitserver.
    /// Result order matches the input order; repeated pairs hit gitserver
    /// at most once per request.
    pub async fn are_commits_resolvable(
        &self,
        commits: &[RepositoryCommit],
    ) -> anyhow::Result<Vec<bool>> {
        let mut missing: Vec<RepositoryCommit> = Vec::new();
        {
            let cache = self.cache.lock();
            for rc in commits {
                if !cache.contains_key(rc) && !missing.contains(rc) {
                    missing.push(rc.clone());
                }
            }
        }

        if !missing.is_empty() {
            let exists = self.client.commits_exist(&missing).await?;
            if exists.len() != missing.len() {
                anyhow::bail!(
                    "gitserver returned {} answers for {} commits",
                    exists.len(),
                    missing.len()
                );
            }
            let mut cache = self.cache.lock();
            for (rc, ok) in missing.into_iter().zip(exists) {
                cache.insert(rc, ok);
            }
        }

        let cache = self.cache.lock();
        Ok(commits
            .iter()
            .map(|rc| cache.get(rc).copied().unwrap_or(false))
            .collect())
    }
}
