//! Experiment and variant modelling.
//!
//! One experiment per server process: a blind comparison of exactly two
//! runs. The first run is always the baseline variant and the second the
//! candidate -- that ordering is part of the comparison contract (the UI may
//! shuffle *display* order on its own, the server's variant identity never
//! moves).

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::run::Run;

/// Reserved variant id for the first run.
pub const BASELINE_VARIANT_ID: &str = "baseline";

/// Reserved variant id for the second run.
pub const CANDIDATE_VARIANT_ID: &str = "variant";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VariantLabel {
    Baseline,
    Variant,
}

#[derive(Debug, Clone)]
pub struct Variant {
    pub variant_id: String,
    pub label: VariantLabel,
    pub run: Run,
}

#[derive(Debug, Clone)]
pub struct Experiment {
    pub experiment_id: String,
    pub variants: Vec<Variant>,
    pub created_at: DateTime<Utc>,
}

impl Experiment {
    pub fn variant(&self, variant_id: &str) -> Option<&Variant> {
        self.variants.iter().find(|v| v.variant_id == variant_id)
    }

    /// Whether `(run_id, variant_id)` names exactly one variant of this
    /// experiment.
    pub fn matches_pair(&self, run_id: &str, variant_id: &str) -> bool {
        self.variant(variant_id)
            .is_some_and(|v| v.run.run_id == run_id)
    }

    pub fn baseline(&self) -> &Variant {
        &self.variants[0]
    }

    pub fn candidate(&self) -> &Variant {
        &self.variants[1]
    }
}

/// Holds the single experiment for the server process.
///
/// Immutable after construction; handlers read it lock-free through `Arc`.
#[derive(Debug)]
pub struct ExperimentRegistry {
    experiment: Arc<Experiment>,
}

impl ExperimentRegistry {
    /// Build the experiment from two runs, preserving caller order: the
    /// first run becomes the `baseline` variant, the second `variant`.
    pub fn create(run_a: Run, run_b: Run) -> Self {
        let experiment = Experiment {
            experiment_id: Uuid::new_v4().to_string(),
            variants: vec![
                Variant {
                    variant_id: BASELINE_VARIANT_ID.to_string(),
                    label: VariantLabel::Baseline,
                    run: run_a,
                },
                Variant {
                    variant_id: CANDIDATE_VARIANT_ID.to_string(),
                    label: VariantLabel::Variant,
                    run: run_b,
                },
            ],
            created_at: Utc::now(),
        };
        Self {
            experiment: Arc::new(experiment),
        }
    }

    pub fn get(&self, experiment_id: &str) -> Option<Arc<Experiment>> {
        (self.experiment.experiment_id == experiment_id)
            .then(|| Arc::clone(&self.experiment))
    }

    pub fn current(&self) -> Arc<Experiment> {
        Arc::clone(&self.experiment)
    }
}
