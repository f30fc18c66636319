// This file is part of Astar.

// Copyright (C) 2019-2024 Stake Technologies Pte.Ltd.
// SPDX-License-Identifier: GPL-3.0-or-later

// Astar is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// Astar is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.

// You should have received a copy of the GNU General Public License
// along with Astar. If not, see <http://www.gnu.org/licenses/>.

//! Namespaced key-value storage backing the decision cache.

use crate::DecideResult;
use async_trait::async_trait;
use parity_scale_codec::Encode;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;


/// A keyed store scoped to one namespace.
#[async_trait]
pub trait Bucket: Send + Sync {
    /// Value stored under `key`, if any.
    async fn get(&self, key: &[u8]) -> DecideResult<Option<Vec<u8>>>;
    /// Stores `value` under `key`, replacing what was there.
    async fn put(&self, key: &[u8], value: Vec<u8>) -> DecideResult<()>;
}

/// Hands out buckets; distinct namespaces never observe each other's keys.
pub trait KeyValueStore: Send + Sync {
    /// Bucket for `namespace`. Handles on the same namespace share entries.
    fn bucket(&self, namespace: &[u8]) -> Arc<dyn Bucket>;
}

type Entries = Arc<RwLock<BTreeMap<Vec<u8>, Vec<u8>>>>;

/// Process-local store shared by every bucket it hands out.
#[derive(Clone, Default)]
pub struct InMemoryKeyValueStore {
    entries: Entries,
}

impl InMemoryKeyValueStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty store behind a trait object.
    pub fn shared() -> Arc<dyn KeyValueStore> {
        Arc::new(Self::new())
    }
}

impl KeyValueStore for InMemoryKeyValueStore {
    fn bucket(&self, namespace: &[u8]) -> Arc<dyn Bucket> {
        Arc::new(InMemoryBucket {
            namespace: namespace.to_vec(),
            entries: self.entries.clone(),
        })
    }
}

struct InMemoryBucket {
    namespace: Vec<u8>,
    entries: Entries,
}

impl InMemoryBucket {
    // Both parts are length prefixed, so ("ab", "c") and ("a", "bc") stay apart.
    fn full_key(&self, key: &[u8]) -> Vec<u8> {
        (&self.namespace, key).encode()
    }
}

#[async_trait]
impl Bucket for InMemoryBucket {
    async fn get(&self, key: &[u8]) -> DecideResult<Option<Vec<u8>>> {
        let full_key = self.full_key(key);
        Ok(self.entries.read().await.get(&full_key).cloned())
    }

    async fn put(&self, key: &[u8], value: Vec<u8>) -> DecideResult<()> {
        let full_key = self.full_key(key);
        self.entries.write().await.insert(full_key, value);
        Ok(())
    }
}
