//! Deterministic planar terrain-graph generator.
//!
//! This crate builds world maps as Voronoi cell graphs over a rectangular
//! domain: a seeded PRNG drives a jittered point scatter and Delaunay
//! triangulation, fractal noise and sculpting templates shape the height
//! field, flood fill classifies oceans, lakes and islands, rainfall drains
//! into rivers once depressions are filled, and every cell receives a
//! biome. The same seed and options reproduce the same map bit for bit.

pub mod biomes;
pub mod climate;
pub mod coastline;
pub mod export;
pub mod geometry;
pub mod heightmap;
pub mod hydrology;
pub mod map;
pub mod noise;
pub mod pipeline;
pub mod rng;

pub use biomes::Biome;
pub use climate::ClimateConfig;
pub use heightmap::{HeightmapConfig, Template};
pub use hydrology::{DepressionReport, HydrologyConfig};
pub use map::{Cell, Feature, FeatureGroup, FeatureKind, Map, River};
pub use noise::FractalNoiseConfig;
pub use pipeline::{
    GenerateOptions, GenerationStage, Pipeline, PipelineError, StageContext, StageId, generate,
};
pub use rng::AleaRng;
