//! Pipeline orchestration: config validation, per-stage RNG derivation,
//! stage sequencing with cancellation checks, and final artifact assembly
//! (`spec.md` §4.8/§5).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::artifact::Artifact;
use crate::config::Config;
use crate::content::{Carver, ContentPlacer};
use crate::embedding::{self, EmbedderConfig};
use crate::error::{GenError, Stage};
use crate::rng::DungeonRng;
use crate::synthesis;
use crate::validator;

/// A cheap, clonable flag a caller can flip from another thread to abort
/// generation between (but not within) stages.
#[derive(Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        CancellationToken(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<(), GenError> {
        if self.is_cancelled() {
            Err(GenError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Run the full pipeline: validate, synthesise, embed, carve, populate,
/// validate again, and assemble an [`Artifact`]. `carver`/`placer` provide
/// Stage C/D's concrete behaviour; everything else is owned by this crate.
pub fn generate<C: Carver, P: ContentPlacer>(
    config: &Config,
    carver: &C,
    placer: &P,
    cancel: &CancellationToken,
) -> Result<Artifact, GenError> {
    let issues = config.validate();
    if !issues.is_empty() {
        return Err(GenError::InvalidConfig(issues));
    }

    let config_hash = config.canonical_hash();

    let mut synthesis_rng = DungeonRng::derive(config.seed, "synthesis", config_hash);
    let graph = synthesis::synthesize(&mut synthesis_rng, config)?;
    cancel.check()?;

    let mut embedding_rng = DungeonRng::derive(config.seed, "embedding", config_hash);
    let layout = embedding::embed(&mut embedding_rng, &graph, &EmbedderConfig::default())?;
    cancel.check()?;

    let mut content_rng = DungeonRng::derive(config.seed, "content", config_hash);
    let tiles = carver
        .carve(&mut content_rng, &graph, &layout)
        .map_err(|e| e.in_stage(Stage::Carving))?;
    cancel.check()?;

    let content = placer
        .place(&mut content_rng, &graph, &layout, &tiles)
        .map_err(|e| e.in_stage(Stage::Content))?;
    cancel.check()?;

    let report = validator::validate(&graph, &layout, config);
    if !report.passed {
        return Err(GenError::ConstraintsUnsatisfied(report.errors.clone())
            .in_stage(Stage::Validation));
    }

    Ok(Artifact {
        graph,
        layout,
        tiles,
        content,
        report,
    })
}
