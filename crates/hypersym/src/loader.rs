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

//! Per-request record of every dump the engine has seen. The initial
//! candidate set keeps its insertion order (it drives the local-phase
//! ordering); dumps discovered later are only added to the id lookup.

use std::collections::HashMap;

use crate::types::Dump;

#[derive(Default)]
pub struct UploadsDataLoader {
    uploads: Vec<Dump>,
    cache: HashMap<i64, Dump>,
}

impl UploadsDataLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an initial candidate dump. Also registered in the id lookup.
    pub fn add_upload(&mut self, dump: Dump) {
        self.cache.insert(dump.id, dump.clone());
        self.uploads.push(dump);
    }

    /// Register dumps discovered mid-request (moniker search results).
    pub fn set_uploads_in_cache(&mut self, dumps: &[Dump]) {
        for dump in dumps {
            self.cache.insert(dump.id, dump.clone());
        }
    }

    pub fn get(&self, id: i64) -> Option<&Dump> {
        self.cache.get(&id)
    }

    /// The initial candidate set, in insertion order.
    pub fn initial_uploads(&self) -> &[Dump] {
        &self.uploads
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dump(id: i64) -> Dump {
        Dump {
            id,
            repository_id: 1,
            repository_name: "r".into(),
            commit: "aaaa".into(),
            root: String::new(),
        }
    }

    #[test]
    fn initial_uploads_keep_insertion_order() {
        let mut loader = UploadsDataLoader::new();
        loader.add_upload(dump(3));
        loader.add_upload(dump(1));
        loader.add_upload(dump(2));

        let ids: Vec<i64> = loader.initial_uploads().iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![3, 1, 2]);
    }

    #[test]
    fn cached_dumps_are_not_initial_candidates() {
        let mut loader = UploadsDataLoader::new();
        loader.add_upload(dump(1));
        loader.set_uploads_in_cache(&[dump(7), dump(9)]);

        assert!(loader.get(7).is_some());
        assert!(loader.get(9).is_some());
        assert_eq!(loader.initial_uploads().len(), 1);
    }
}
