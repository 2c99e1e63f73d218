//! One fatigue model per stratum, built from the full sample population.

use std::collections::HashMap;

use rayon::prelude::*;

use crate::domain::{CalibratorConfig, Sample};
use crate::error::AppError;
use crate::stratum::model::StratumFatigueModel;

/// Stratum models in order of each stratum's first appearance in the input.
#[derive(Debug, Clone, Default)]
pub struct FatigueModelCollection {
    models: Vec<StratumFatigueModel>,
    index: HashMap<String, usize>,
}

impl FatigueModelCollection {
    /// Group `samples` by `stratum_of` and build one calibrated model per group.
    ///
    /// Strata are independent, so their initial `processing()` runs in parallel.
    pub fn build<I, F>(samples: I, stratum_of: F, config: &CalibratorConfig) -> Self
    where
        I: IntoIterator<Item = Sample>,
        F: Fn(&Sample) -> String,
    {
        let mut groups: Vec<(String, Vec<Sample>)> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();

        for sample in samples {
            let key = stratum_of(&sample);
            match index.get(&key) {
                Some(&i) => groups[i].1.push(sample),
                None => {
                    index.insert(key.clone(), groups.len());
                    groups.push((key, vec![sample]));
                }
            }
        }

        let mut models: Vec<StratumFatigueModel> = groups
            .into_iter()
            .map(|(id, members)| StratumFatigueModel::unprocessed(id, members, config.clone()))
            .collect();
        models.par_iter_mut().for_each(|m| m.processing());

        tracing::info!(strata = models.len(), "fatigue models built");
        Self { models, index }
    }

    /// Group by each sample's own `stratum_id`.
    pub fn from_samples<I>(samples: I, config: &CalibratorConfig) -> Self
    where
        I: IntoIterator<Item = Sample>,
    {
        Self::build(samples, |s| s.stratum_id.clone(), config)
    }

    pub fn get(&self, stratum_id: &str) -> Result<&StratumFatigueModel, AppError> {
        self.index
            .get(stratum_id)
            .map(|&i| &self.models[i])
            .ok_or_else(|| AppError::StratumNotFound(stratum_id.to_string()))
    }

    pub fn get_mut(&mut self, stratum_id: &str) -> Result<&mut StratumFatigueModel, AppError> {
        match self.index.get(stratum_id) {
            Some(&i) => Ok(&mut self.models[i]),
            None => Err(AppError::StratumNotFound(stratum_id.to_string())),
        }
    }

    /// Re-run `processing()` on every stratum, e.g. after the registry
    /// mutated samples in bulk.
    pub fn reprocess_all(&mut self) {
        self.models.par_iter_mut().for_each(|m| m.processing());
    }

    /// Edit one point; only the owning stratum is refit.
    pub fn edit_point(
        &mut self,
        stratum_id: &str,
        sample_id: &str,
        new_cycle: f64,
        new_csr: f64,
    ) -> Result<(), AppError> {
        self.get_mut(stratum_id)?.edit_point(sample_id, new_cycle, new_csr)
    }

    /// Stratum that owns `sample_id`, if any.
    pub fn locate(&self, sample_id: &str) -> Option<&str> {
        self.models
            .iter()
            .find(|m| m.contains(sample_id))
            .map(|m| m.stratum_id())
    }

    pub fn iter(&self) -> impl Iterator<Item = &StratumFatigueModel> + '_ {
        self.models.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut StratumFatigueModel> + '_ {
        self.models.iter_mut()
    }

    pub fn stratum_ids(&self) -> impl Iterator<Item = &str> + '_ {
        self.models.iter().map(|m| m.stratum_id())
    }

    pub fn samples(&self) -> impl Iterator<Item = &Sample> + '_ {
        self.models.iter().flat_map(|m| m.samples().iter())
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Hand the samples back to the registry, stratum by stratum.
    pub fn into_samples(self) -> Vec<Sample> {
        self.models
            .into_iter()
            .flat_map(StratumFatigueModel::into_samples)
            .collect()
    }
}
