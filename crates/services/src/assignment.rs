use rand::Rng;
use rand::seq::IndexedRandom;
use std::collections::BTreeSet;

use storage::LocalProgressStore;
use translate_core::model::{Catalog, WorkUnitId};

use crate::error::SelectionError;

/// Picks the unit a new session works on.
///
/// Units not yet in the completed set are preferred; once every unit is
/// complete any unit may be picked again, so annotators always get work.
#[derive(Clone)]
pub struct WorkAssignmentSelector {
    progress: LocalProgressStore,
}

impl WorkAssignmentSelector {
    #[must_use]
    pub fn new(progress: LocalProgressStore) -> Self {
        Self { progress }
    }

    /// Select with the thread-local RNG.
    ///
    /// # Errors
    ///
    /// Returns `SelectionError::EmptyCatalog` for an empty catalog, or a
    /// progress error if local storage cannot be read.
    pub async fn select_unit(&self, catalog: &Catalog) -> Result<WorkUnitId, SelectionError> {
        let completed = self.completed_for(catalog).await?;
        pick_unit(catalog, &completed, &mut rand::rng())
    }

    /// Select using `rng`. Every candidate is equally likely.
    ///
    /// # Errors
    ///
    /// Returns `SelectionError::EmptyCatalog` for an empty catalog, or a
    /// progress error if local storage cannot be read.
    pub async fn select_unit_with<R: Rng + ?Sized>(
        &self,
        catalog: &Catalog,
        rng: &mut R,
    ) -> Result<WorkUnitId, SelectionError> {
        let completed = self.completed_for(catalog).await?;
        pick_unit(catalog, &completed, rng)
    }

    async fn completed_for(
        &self,
        catalog: &Catalog,
    ) -> Result<BTreeSet<WorkUnitId>, SelectionError> {
        if catalog.is_empty() {
            return Err(SelectionError::EmptyCatalog);
        }
        Ok(self.progress.completed_units().await?)
    }
}

fn pick_unit<R: Rng + ?Sized>(
    catalog: &Catalog,
    completed: &BTreeSet<WorkUnitId>,
    rng: &mut R,
) -> Result<WorkUnitId, SelectionError> {
    let available: Vec<&WorkUnitId> = catalog
        .iter()
        .filter(|unit| !completed.contains(*unit))
        .collect();

    let picked = if available.is_empty() {
        tracing::info!(
            units = catalog.len(),
            "all units complete, picking from the full catalog"
        );
        catalog.units().choose(rng)
    } else {
        available.choose(rng).copied()
    };
    picked.cloned().ok_or(SelectionError::EmptyCatalog)
}
