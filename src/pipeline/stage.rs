//! Generation stage trait and pipeline orchestration.
//!
//! Each stage transforms the map in place and declares which stages must
//! run before it. The pipeline checks those dependencies at run time, so
//! custom stage lists fail fast instead of reading half-built state.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::biomes;
use crate::climate::{self, ClimateConfig};
use crate::coastline;
use crate::geometry::jittered_grid;
use crate::heightmap::{self, HeightmapConfig, Template};
use crate::hydrology::{self, HydrologyConfig};
use crate::map::Map;
use crate::rng::AleaRng;

/// Unique identifier for each generation stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StageId {
    Mesh,
    Heightmap,
    Features,
    Climate,
    Depressions,
    Hydrology,
    Biomes,
}

impl StageId {
    /// Human-readable stage name.
    pub fn name(&self) -> &'static str {
        match self {
            StageId::Mesh => "Mesh Construction",
            StageId::Heightmap => "Heightmap Synthesis",
            StageId::Features => "Feature Detection",
            StageId::Climate => "Climate Assignment",
            StageId::Depressions => "Depression Resolution",
            StageId::Hydrology => "River Generation",
            StageId::Biomes => "Biome Classification",
        }
    }
}

/// Errors that can occur during pipeline execution.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Stage '{0}' failed: {1}")]
    StageFailed(String, String),

    #[error("Stage '{0}' requires '{1}' to run first")]
    MissingDependency(String, String),

    #[error("Invalid parameter '{0}': {1}")]
    InvalidParameter(String, String),
}

/// Everything a run needs: the seed, the domain, the mesh density and the
/// per-stage configuration blocks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateOptions {
    /// Seed string for the random stream. Equal seeds with equal options
    /// reproduce the map bit for bit.
    pub seed: String,
    /// Requested cell count. The jittered grid rounds this to whole
    /// rows and columns, so the mesh may hold slightly fewer cells.
    pub cell_count: usize,
    /// Height threshold separating water from land, in [0, 1].
    pub water_level: f64,
    /// Domain width in map units.
    pub width: f64,
    /// Domain height in map units.
    pub height: f64,
    /// Sculpting recipe applied on top of the noise base.
    pub template: Template,
    pub heightmap: HeightmapConfig,
    pub climate: ClimateConfig,
    pub hydrology: HydrologyConfig,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            seed: "1".to_string(),
            cell_count: 10_000,
            water_level: 0.2,
            width: 960.0,
            height: 540.0,
            template: Template::default(),
            heightmap: HeightmapConfig::default(),
            climate: ClimateConfig::default(),
            hydrology: HydrologyConfig::default(),
        }
    }
}

impl GenerateOptions {
    /// Default options with the given seed.
    pub fn new(seed: impl Into<String>) -> Self {
        Self {
            seed: seed.into(),
            ..Self::default()
        }
    }

    /// Rejects parameter combinations no stage can work with.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.cell_count == 0 {
            return Err(PipelineError::InvalidParameter(
                "cell_count".to_string(),
                "must be at least 1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.water_level) {
            return Err(PipelineError::InvalidParameter(
                "water_level".to_string(),
                format!("{} is outside [0, 1]", self.water_level),
            ));
        }
        if self.width <= 0.0 || self.height <= 0.0 {
            return Err(PipelineError::InvalidParameter(
                "dimensions".to_string(),
                format!("{}x{} is not a usable domain", self.width, self.height),
            ));
        }
        Ok(())
    }
}

/// State threaded through every stage.
///
/// The random stream lives here rather than in any global, so the stage
/// order alone determines which draws a seed produces.
pub struct StageContext<'a> {
    pub options: &'a GenerateOptions,
    pub rng: &'a mut AleaRng,
}

/// A single stage of map generation.
pub trait GenerationStage: Send + Sync {
    /// Unique identifier for this stage.
    fn id(&self) -> StageId;

    /// Human-readable name for progress reporting.
    fn name(&self) -> &str {
        self.id().name()
    }

    /// Stages that must run before this one.
    fn dependencies(&self) -> &[StageId] {
        &[]
    }

    /// Runs the stage, mutating the map in place.
    fn execute(&self, map: &mut Map, ctx: &mut StageContext) -> Result<(), PipelineError>;
}

/// Ordered list of generation stages with dependency checking.
pub struct Pipeline {
    stages: Vec<Box<dyn GenerationStage>>,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl Pipeline {
    /// An empty pipeline. Add stages with [`add_stage`](Self::add_stage).
    pub fn new() -> Self {
        Self { stages: Vec::new() }
    }

    /// The full terrain pipeline in dependency order.
    pub fn standard() -> Self {
        let mut pipeline = Self::new();
        pipeline
            .add_stage(MeshStage)
            .add_stage(HeightmapStage)
            .add_stage(FeaturesStage)
            .add_stage(ClimateStage)
            .add_stage(DepressionsStage)
            .add_stage(HydrologyStage)
            .add_stage(BiomesStage);
        pipeline
    }

    /// Appends a stage to the pipeline.
    pub fn add_stage<S: GenerationStage + 'static>(&mut self, stage: S) -> &mut Self {
        self.stages.push(Box::new(stage));
        self
    }

    /// Number of stages in the pipeline.
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    /// Runs all stages in order, checking dependencies along the way.
    pub fn run(&self, map: &mut Map, ctx: &mut StageContext) -> Result<(), PipelineError> {
        self.run_with_callbacks(map, ctx, |_, _, _| {}, |_, _, _| {})
    }

    /// Runs all stages with progress callbacks.
    ///
    /// `on_start` fires before each stage executes and `on_complete` after,
    /// both with the stage name, its position and the total stage count.
    pub fn run_with_callbacks<F1, F2>(
        &self,
        map: &mut Map,
        ctx: &mut StageContext,
        mut on_start: F1,
        mut on_complete: F2,
    ) -> Result<(), PipelineError>
    where
        F1: FnMut(&str, usize, usize),
        F2: FnMut(&str, usize, usize),
    {
        let total = self.stages.len();
        let mut completed: Vec<StageId> = Vec::with_capacity(total);

        for (index, stage) in self.stages.iter().enumerate() {
            for dep in stage.dependencies() {
                if !completed.contains(dep) {
                    return Err(PipelineError::MissingDependency(
                        stage.name().to_string(),
                        dep.name().to_string(),
                    ));
                }
            }

            on_start(stage.name(), index + 1, total);
            debug!(stage = stage.name(), "executing");
            stage.execute(map, ctx)?;
            completed.push(stage.id());
            on_complete(stage.name(), index + 1, total);
        }

        Ok(())
    }
}

/// Scatters jittered points and installs the Voronoi mesh.
pub struct MeshStage;

impl GenerationStage for MeshStage {
    fn id(&self) -> StageId {
        StageId::Mesh
    }

    fn execute(&self, map: &mut Map, ctx: &mut StageContext) -> Result<(), PipelineError> {
        let scatter = jittered_grid(ctx.rng, map.width, map.height, ctx.options.cell_count);
        if scatter.points.len() < 3 {
            return Err(PipelineError::StageFailed(
                self.name().to_string(),
                format!(
                    "{} points cannot be triangulated, need at least 3",
                    scatter.points.len()
                ),
            ));
        }
        map.install_mesh(scatter);
        debug!(cells = map.cells.len(), "mesh installed");
        Ok(())
    }
}

/// Synthesizes the noise base and runs the sculpting template.
pub struct HeightmapStage;

impl GenerationStage for HeightmapStage {
    fn id(&self) -> StageId {
        StageId::Heightmap
    }

    fn dependencies(&self) -> &[StageId] {
        &[StageId::Mesh]
    }

    fn execute(&self, map: &mut Map, ctx: &mut StageContext) -> Result<(), PipelineError> {
        heightmap::synthesize(map, ctx.rng, &ctx.options.heightmap);
        ctx.options.template.sculpt(map, ctx.rng);
        Ok(())
    }
}

/// Labels oceans, lakes and islands and measures coast distance.
pub struct FeaturesStage;

impl GenerationStage for FeaturesStage {
    fn id(&self) -> StageId {
        StageId::Features
    }

    fn dependencies(&self) -> &[StageId] {
        &[StageId::Heightmap]
    }

    fn execute(&self, map: &mut Map, _ctx: &mut StageContext) -> Result<(), PipelineError> {
        coastline::detect_features(map);
        debug!(features = map.features.len(), "features detected");
        Ok(())
    }
}

/// Assigns temperature and precipitation to every cell.
pub struct ClimateStage;

impl GenerationStage for ClimateStage {
    fn id(&self) -> StageId {
        StageId::Climate
    }

    fn dependencies(&self) -> &[StageId] {
        &[StageId::Features]
    }

    fn execute(&self, map: &mut Map, ctx: &mut StageContext) -> Result<(), PipelineError> {
        climate::apply_climate(map, &ctx.options.climate);
        Ok(())
    }
}

/// Raises landlocked pits until meltwater can reach a coast.
pub struct DepressionsStage;

impl GenerationStage for DepressionsStage {
    fn id(&self) -> StageId {
        StageId::Depressions
    }

    fn dependencies(&self) -> &[StageId] {
        &[StageId::Climate]
    }

    fn execute(&self, map: &mut Map, ctx: &mut StageContext) -> Result<(), PipelineError> {
        let report = hydrology::resolve_depressions(map, &ctx.options.hydrology);
        debug!(
            passes = report.passes,
            unresolved = report.unresolved,
            "depressions resolved"
        );
        Ok(())
    }
}

/// Accumulates flux downhill and traces the river network.
pub struct HydrologyStage;

impl GenerationStage for HydrologyStage {
    fn id(&self) -> StageId {
        StageId::Hydrology
    }

    fn dependencies(&self) -> &[StageId] {
        &[StageId::Depressions]
    }

    fn execute(&self, map: &mut Map, ctx: &mut StageContext) -> Result<(), PipelineError> {
        hydrology::generate_rivers(map, &ctx.options.hydrology, ctx.rng);
        debug!(rivers = map.rivers.len(), "rivers generated");
        Ok(())
    }
}

/// Classifies every cell into a biome.
pub struct BiomesStage;

impl GenerationStage for BiomesStage {
    fn id(&self) -> StageId {
        StageId::Biomes
    }

    fn dependencies(&self) -> &[StageId] {
        &[StageId::Hydrology]
    }

    fn execute(&self, map: &mut Map, _ctx: &mut StageContext) -> Result<(), PipelineError> {
        biomes::assign_biomes(map);
        Ok(())
    }
}

/// Runs the standard pipeline for the given options and returns the map.
pub fn generate(options: &GenerateOptions) -> Result<Map, PipelineError> {
    options.validate()?;

    let mut rng = AleaRng::new(&options.seed);
    let mut map = Map::new(
        &options.seed,
        options.width,
        options.height,
        options.water_level,
    );
    let mut ctx = StageContext {
        options,
        rng: &mut rng,
    };
    Pipeline::standard().run(&mut map, &mut ctx)?;

    info!(
        seed = %options.seed,
        cells = map.cells.len(),
        features = map.features.len(),
        rivers = map.rivers.len(),
        "map generated"
    );
    Ok(map)
}

impl Map {
    /// Runs the standard pipeline from the three core parameters, leaving
    /// every other option at its default.
    pub fn generate(
        seed: &str,
        cell_count: usize,
        water_level: f64,
    ) -> Result<Map, PipelineError> {
        generate(&GenerateOptions {
            seed: seed.to_string(),
            cell_count,
            water_level,
            ..GenerateOptions::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_options(seed: &str) -> GenerateOptions {
        GenerateOptions {
            seed: seed.to_string(),
            cell_count: 400,
            width: 96.0,
            height: 54.0,
            ..GenerateOptions::default()
        }
    }

    #[test]
    fn test_stage_ids_have_names() {
        let ids = [
            StageId::Mesh,
            StageId::Heightmap,
            StageId::Features,
            StageId::Climate,
            StageId::Depressions,
            StageId::Hydrology,
            StageId::Biomes,
        ];
        for id in ids {
            assert!(!id.name().is_empty());
        }
    }

    #[test]
    fn test_missing_dependency_is_reported() {
        let mut pipeline = Pipeline::new();
        pipeline.add_stage(HeightmapStage);

        let options = small_options("deps");
        let mut rng = AleaRng::new(&options.seed);
        let mut map = Map::new(&options.seed, options.width, options.height, 0.2);
        let mut ctx = StageContext {
            options: &options,
            rng: &mut rng,
        };

        let err = pipeline.run(&mut map, &mut ctx).unwrap_err();
        match err {
            PipelineError::MissingDependency(stage, dep) => {
                assert_eq!(stage, "Heightmap Synthesis");
                assert_eq!(dep, "Mesh Construction");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_invalid_options_are_rejected() {
        let mut options = GenerateOptions::default();
        options.cell_count = 0;
        assert!(matches!(
            generate(&options),
            Err(PipelineError::InvalidParameter(name, _)) if name == "cell_count"
        ));

        let mut options = GenerateOptions::default();
        options.water_level = 1.5;
        assert!(matches!(
            generate(&options),
            Err(PipelineError::InvalidParameter(name, _)) if name == "water_level"
        ));

        let mut options = GenerateOptions::default();
        options.width = 0.0;
        assert!(matches!(
            generate(&options),
            Err(PipelineError::InvalidParameter(name, _)) if name == "dimensions"
        ));
    }

    #[test]
    fn test_generate_produces_complete_map() {
        let map = generate(&small_options("complete")).expect("generation should succeed");

        assert!(!map.cells.is_empty());
        assert!(!map.features.is_empty());
        assert!(map.depressions.is_some());

        for cell in &map.cells {
            assert!((0.0..=1.0).contains(&cell.height));
            assert!(cell.feature > 0, "every cell belongs to a feature");
        }
        assert!(map.cells.iter().any(|c| map.is_land(c.id)));
        assert!(map.cells.iter().any(|c| !map.is_land(c.id)));
    }

    #[test]
    fn test_map_generate_shorthand() {
        let map = Map::generate("shorthand", 400, 0.35).expect("generation should succeed");
        assert!((map.water_level() - 0.35).abs() < 1e-12);
        assert!(!map.cells.is_empty());
    }

    #[test]
    fn test_generated_land_drains() {
        let map = generate(&small_options("drainage")).expect("generation should succeed");
        let unresolved = map.depressions.map_or(u32::MAX, |r| r.unresolved);
        if unresolved > 0 {
            return;
        }

        for cell in &map.cells {
            if !map.is_land(cell.id) || cell.border {
                continue;
            }
            let min_neighbor = cell
                .neighbors
                .iter()
                .map(|&n| map.cells[n as usize].height)
                .fold(f64::INFINITY, f64::min);
            if min_neighbor >= 1.0 {
                continue;
            }
            assert!(
                min_neighbor < cell.height,
                "cell {} at {} cannot drain past {}",
                cell.id,
                cell.height,
                min_neighbor
            );
        }
    }

    #[test]
    fn test_generated_rivers_and_biomes_are_consistent() {
        let map = generate(&small_options("consistency")).expect("generation should succeed");

        for river in &map.rivers {
            assert!(
                river.cells.len() >= 3,
                "river {} spans only {} cells",
                river.id,
                river.cells.len()
            );
        }
        for cell in &map.cells {
            if !map.is_land(cell.id) {
                assert_eq!(cell.biome, 0, "water cell {} must stay marine", cell.id);
            }
        }
    }

    #[test]
    fn test_generate_is_deterministic() {
        let options = small_options("repeatable");
        let first = generate(&options).expect("first run");
        let second = generate(&options).expect("second run");

        let a = serde_json::to_string(&first).expect("serialize first");
        let b = serde_json::to_string(&second).expect("serialize second");
        assert_eq!(a, b);
    }

    #[test]
    fn test_different_seeds_differ() {
        let first = generate(&small_options("alpha")).expect("first run");
        let second = generate(&small_options("omega")).expect("second run");

        let a = serde_json::to_string(&first).expect("serialize first");
        let b = serde_json::to_string(&second).expect("serialize second");
        assert_ne!(a, b);
    }

    #[test]
    fn test_callbacks_fire_in_stage_order() {
        let options = small_options("progress");
        let mut rng = AleaRng::new(&options.seed);
        let mut map = Map::new(
            &options.seed,
            options.width,
            options.height,
            options.water_level,
        );
        let mut ctx = StageContext {
            options: &options,
            rng: &mut rng,
        };

        let mut started = Vec::new();
        let mut finished = Vec::new();
        let pipeline = Pipeline::standard();
        pipeline
            .run_with_callbacks(
                &mut map,
                &mut ctx,
                |name, index, total| started.push((name.to_string(), index, total)),
                |name, _, _| finished.push(name.to_string()),
            )
            .expect("standard pipeline should run");

        assert_eq!(started.len(), pipeline.stage_count());
        assert_eq!(started[0], ("Mesh Construction".to_string(), 1, 7));
        assert_eq!(started[6].0, "Biome Classification");
        let started_names: Vec<_> = started.iter().map(|(n, _, _)| n.clone()).collect();
        assert_eq!(started_names, finished);
    }
}
