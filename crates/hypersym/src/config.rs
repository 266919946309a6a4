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

//! Resolver configuration: defaults overridable from the environment.

use std::env;

#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Capacity of the git tree translator's hunk cache
    /// (`HYPERSYM_HUNK_CACHE_SIZE`).
    pub hunk_cache_size: usize,
    /// Batch size for the dependents-phase moniker search
    /// (`HYPERSYM_MAX_INDEXES_PER_MONIKER_SEARCH`).
    pub maximum_indexes_per_moniker_search: usize,
    /// Filter results through the sub-repo permission checker
    /// (`HYPERSYM_SUB_REPO_PERMS`).
    pub sub_repo_perms_enabled: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            hunk_cache_size: 1000,
            maximum_indexes_per_moniker_search: 500,
            sub_repo_perms_enabled: false,
        }
    }
}

impl ResolverConfig {
    /// Load configuration from environment variables. Unparseable values
    /// log a warning and keep the default.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = env::var("HYPERSYM_HUNK_CACHE_SIZE") {
            match val.parse() {
                Ok(parsed) => config.hunk_cache_size = parsed,
                Err(_) => tracing::warn!(
                    "invalid HYPERSYM_HUNK_CACHE_SIZE {:?}, using default {}",
                    val,
                    config.hunk_cache_size
                ),
            }
        }

        if let Ok(val) = env::var("HYPERSYM_MAX_INDEXES_PER_MONIKER_SEARCH") {
            match val.parse() {
                Ok(parsed) => config.maximum_indexes_per_moniker_search = parsed,
                Err(_) => tracing::warn!(
                    "invalid HYPERSYM_MAX_INDEXES_PER_MONIKER_SEARCH {:?}, using default {}",
                    val,
                    config.maximum_indexes_per_moniker_search
                ),
            }
        }

        if let Ok(val) = env::var("HYPERSYM_SUB_REPO_PERMS") {
            config.sub_repo_perms_enabled = matches!(val.as_str(), "1" | "true" | "yes");
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ResolverConfig::default();
        assert_eq!(config.hunk_cache_size, 1000);
        assert_eq!(config.maximum_indexes_per_moniker_search, 500);
        assert!(!config.sub_repo_perms_enabled);
    }
}
