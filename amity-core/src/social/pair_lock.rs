// SPDX-FileCopyrightText: 2026 Amity Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Per-pair mutual exclusion.
//!
//! Every relationship transition touching a pair of users runs under the
//! mutex for that unordered pair, so the multi-step check-and-mutate
//! sequences cannot interleave with a concurrent transition on the same
//! pair.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

pub(crate) struct PairLocks {
    locks: Mutex<HashMap<(String, String), Arc<Mutex<()>>>>,
}

impl PairLocks {
    pub fn new() -> Self {
        PairLocks {
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// The mutex for the unordered pair `(a, b)`. Entries are tiny and
    /// reused across transitions; they are never evicted.
    pub fn pair(&self, a: &str, b: &str) -> Arc<Mutex<()>> {
        let key = if a <= b {
            (a.to_string(), b.to_string())
        } else {
            (b.to_string(), a.to_string())
        };
        let mut locks = self.locks.lock().unwrap();
        locks.entry(key).or_default().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_lock_regardless_of_order() {
        let locks = PairLocks::new();
        let ab = locks.pair("a", "b");
        let ba = locks.pair("b", "a");
        assert!(Arc::ptr_eq(&ab, &ba));
    }

    #[test]
    fn test_distinct_pairs_get_distinct_locks() {
        let locks = PairLocks::new();
        let ab = locks.pair("a", "b");
        let ac = locks.pair("a", "c");
        assert!(!Arc::ptr_eq(&ab, &ac));
    }
}
