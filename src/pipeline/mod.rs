//! Pipeline module for orchestrating map generation stages.
//!
//! Provides a trait-based architecture for modular generation stages
//! that can be composed into a complete map generation pipeline.

mod stage;

pub use stage::{
    BiomesStage, ClimateStage, DepressionsStage, FeaturesStage, GenerateOptions, GenerationStage,
    HeightmapStage, HydrologyStage, MeshStage, Pipeline, PipelineError, StageContext, StageId,
    generate,
};
