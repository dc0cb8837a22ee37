//! Scoped tracking of intermediate feature subsets.
//!
//! The pipeline registers each subset right after creating it. If the run
//! fails, dropping the guard deletes exactly those subsets that were
//! created and still exist; nothing else in the store is touched.

use crate::AnalysisError;
use crate::collaborators::{FeatureMerger, RecordSource};

/// Guard over the intermediate subsets created during one run.
pub struct IntermediateSubsets<'a, M: RecordSource + FeatureMerger + ?Sized> {
    store: &'a M,
    created: Vec<String>,
}

impl<'a, M: RecordSource + FeatureMerger + ?Sized> IntermediateSubsets<'a, M> {
    /// Creates an empty guard.
    pub const fn new(store: &'a M) -> Self {
        Self {
            store,
            created: Vec::new(),
        }
    }

    /// Registers a subset that was just created.
    pub fn track(&mut self, name: String) {
        self.created.push(name);
    }

    /// Names of the tracked subsets, in creation order.
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.created
    }

    /// Deletes every tracked subset and disarms the guard.
    ///
    /// # Errors
    ///
    /// Returns the first delete failure. Subsets not yet deleted remain
    /// tracked and are retried when the guard drops.
    pub fn delete_all(mut self) -> Result<(), AnalysisError> {
        while let Some(name) = self.created.first() {
            self.store.delete_subset(name)?;
            self.created.remove(0);
        }
        Ok(())
    }

    fn release(&mut self) {
        for name in self.created.drain(..) {
            match self.store.subset_exists(&name) {
                Ok(true) => match self.store.delete_subset(&name) {
                    Ok(()) => log::info!("Cleaned up intermediate subset '{name}'"),
                    Err(e) => log::warn!("Failed to clean up intermediate subset '{name}': {e}"),
                },
                Ok(false) => {}
                Err(e) => log::warn!("Could not check intermediate subset '{name}': {e}"),
            }
        }
    }
}

impl<M: RecordSource + FeatureMerger + ?Sized> Drop for IntermediateSubsets<'_, M> {
    fn drop(&mut self) {
        self.release();
    }
}
