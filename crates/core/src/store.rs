//! In-memory result-set and sample stores.
//!
//! Each result set is keyed by sample id. Updates are guarded by the set's version so that
//! two sessions editing the same sample cannot silently overwrite each other: a caller must
//! present the version it last read, and a stale version fails with `VersionConflict`.
//!
//! The sample registry keeps each specimen's lifecycle status. Its updates are not
//! versioned; status moves are already ordered by [`SampleStatus`](crate::sample::SampleStatus).

use crate::result_set::ResultSet;
use crate::sample::Sample;
use crate::{LimsError, LimsResult};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

#[derive(Clone, Debug, Default)]
pub struct ResultSetStore {
    inner: Arc<RwLock<HashMap<String, ResultSet>>>,
}

impl ResultSetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new result set.
    ///
    /// # Errors
    ///
    /// Returns `LimsError::InvalidInput` if a set for the same sample already exists.
    pub fn insert(&self, result_set: ResultSet) -> LimsResult<()> {
        let mut map = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let key = result_set.sample_id().to_string();
        if map.contains_key(&key) {
            return Err(LimsError::InvalidInput(format!(
                "result set already exists for sample {key}"
            )));
        }
        tracing::info!(sample_id = %key, "result set created");
        map.insert(key, result_set);
        Ok(())
    }

    pub fn get(&self, sample_id: &str) -> LimsResult<ResultSet> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(sample_id)
            .cloned()
            .ok_or_else(|| LimsError::NotFound(format!("result set {sample_id}")))
    }

    /// All result sets, sorted by sample id.
    pub fn list(&self) -> Vec<ResultSet> {
        let map = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        let mut sets: Vec<ResultSet> = map.values().cloned().collect();
        sets.sort_by(|a, b| a.sample_id().cmp(b.sample_id()));
        sets
    }

    pub fn len(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Apply `f` to the stored set if its version is still `expected_version`.
    ///
    /// `f` runs on a copy; the store only keeps the result when `f` succeeds, so a failed
    /// mutation or rejected submission leaves the stored set untouched. Returns the updated
    /// set together with `f`'s output.
    pub fn update<T, F>(
        &self,
        sample_id: &str,
        expected_version: u64,
        f: F,
    ) -> LimsResult<(ResultSet, T)>
    where
        F: FnOnce(&mut ResultSet) -> LimsResult<T>,
    {
        let mut map = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let stored = map
            .get_mut(sample_id)
            .ok_or_else(|| LimsError::NotFound(format!("result set {sample_id}")))?;

        if stored.version() != expected_version {
            return Err(LimsError::VersionConflict {
                expected: expected_version,
                actual: stored.version(),
            });
        }

        let mut working = stored.clone();
        let output = f(&mut working)?;
        *stored = working.clone();
        Ok((working, output))
    }
}

/// Registered samples, in registration order.
#[derive(Clone, Debug, Default)]
pub struct SampleStore {
    inner: Arc<RwLock<Vec<Sample>>>,
}

impl SampleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a sample.
    ///
    /// # Errors
    ///
    /// Returns `LimsError::InvalidInput` if the sample id is already registered.
    pub fn insert(&self, sample: Sample) -> LimsResult<()> {
        let mut samples = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if samples.iter().any(|s| s.sample_id == sample.sample_id) {
            return Err(LimsError::InvalidInput(format!(
                "sample {} is already registered",
                sample.sample_id
            )));
        }
        tracing::info!(sample_id = %sample.sample_id, status = %sample.status(), "sample registered");
        samples.push(sample);
        Ok(())
    }

    pub fn get(&self, sample_id: &str) -> LimsResult<Sample> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|s| s.sample_id == sample_id)
            .cloned()
            .ok_or_else(|| LimsError::NotFound(format!("sample {sample_id}")))
    }

    pub fn list(&self) -> Vec<Sample> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Apply `f` to the stored sample. As with [`ResultSetStore::update`], `f` runs on a copy
    /// that is kept only when `f` succeeds.
    pub fn update<T, F>(&self, sample_id: &str, f: F) -> LimsResult<(Sample, T)>
    where
        F: FnOnce(&mut Sample) -> LimsResult<T>,
    {
        let mut samples = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let stored = samples
            .iter_mut()
            .find(|s| s.sample_id == sample_id)
            .ok_or_else(|| LimsError::NotFound(format!("sample {sample_id}")))?;

        let mut working = stored.clone();
        let output = f(&mut working)?;
        *stored = working.clone();
        Ok((working, output))
    }
}
