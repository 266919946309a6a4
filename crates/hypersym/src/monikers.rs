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

//! Ordered de-duplicating collector of qualified monikers. The cap on
//! collected monikers is enforced by the caller.

use std::collections::HashSet;

use crate::types::QualifiedMoniker;

#[derive(Default)]
pub struct QualifiedMonikerSet {
    monikers: Vec<QualifiedMoniker>,
    seen: HashSet<String>,
}

impl QualifiedMonikerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the moniker iff its identity has not been seen. Returns
    /// whether it was inserted.
    pub fn add(&mut self, moniker: QualifiedMoniker) -> bool {
        if !self.seen.insert(moniker.identity()) {
            return false;
        }
        self.monikers.push(moniker);
        true
    }

    pub fn len(&self) -> usize {
        self.monikers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.monikers.is_empty()
    }

    pub fn into_monikers(self) -> Vec<QualifiedMoniker> {
        self.monikers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MonikerData, MonikerKind, PackageInformationData};

    fn moniker(identifier: &str, version: &str) -> QualifiedMoniker {
        QualifiedMoniker {
            moniker: MonikerData {
                kind: MonikerKind::Export,
                scheme: "npm".into(),
                identifier: identifier.into(),
                package_information_id: "1".into(),
            },
            package_information: PackageInformationData {
                manager: "npm".into(),
                name: "left-pad".into(),
                version: version.into(),
            },
        }
    }

    #[test]
    fn keeps_first_occurrence_in_order() {
        let mut set = QualifiedMonikerSet::new();
        assert!(set.add(moniker("a", "1.0.0")));
        assert!(set.add(moniker("b", "1.0.0")));
        assert!(!set.add(moniker("a", "1.0.0")));
        // same identifier, different package version: distinct identity
        assert!(set.add(moniker("a", "2.0.0")));

        let identifiers: Vec<String> = set
            .into_monikers()
            .into_iter()
            .map(|m| format!("{}@{}", m.moniker.identifier, m.package_information.version))
            .collect();
        assert_eq!(identifiers, vec!["a@1.0.0", "b@1.0.0", "a@2.0.0"]);
    }
}
