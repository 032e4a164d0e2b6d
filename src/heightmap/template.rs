//! Named sculpting step sequences.
//!
//! A template is an ordered list of operator steps with string-range
//! arguments, loadable from JSON or picked from the built-in presets. Steps
//! compile once into [`SculptOp`]s; randomness is drawn when they run.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::heightmap::range::RangeExpr;
use crate::heightmap::sculpt::{HeightBand, MirrorAxes, SculptOp, Sculptor};
use crate::map::Map;
use crate::rng::AleaRng;

fn default_multiply() -> f64 {
    1.0
}

/// One step of a heightmap template, as serialized.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum TemplateStep {
    Hill {
        count: String,
        height: String,
        x: String,
        y: String,
    },
    Pit {
        count: String,
        height: String,
        x: String,
        y: String,
    },
    Range {
        count: String,
        height: String,
        x: String,
        y: String,
    },
    Trough {
        count: String,
        height: String,
        x: String,
        y: String,
    },
    Strait {
        width: String,
        #[serde(default)]
        horizontal: bool,
    },
    Mask {
        power: f64,
    },
    Smooth {
        fraction: f64,
        #[serde(default)]
        add: f64,
    },
    Invert {
        chance: f64,
        #[serde(default)]
        axes: String,
    },
    Modify {
        range: String,
        #[serde(default)]
        add: f64,
        #[serde(default = "default_multiply")]
        multiply: f64,
    },
}

/// An ordered sculpting recipe.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Template {
    pub name: String,
    pub steps: Vec<TemplateStep>,
}

impl Default for Template {
    /// The continents preset.
    fn default() -> Self {
        presets::continents()
    }
}

impl Template {
    pub fn new(name: impl Into<String>, steps: Vec<TemplateStep>) -> Self {
        Self {
            name: name.into(),
            steps,
        }
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Built-in preset by name. Hyphens and underscores are interchangeable.
    pub fn preset(name: &str) -> Option<Self> {
        let key = name.trim().to_ascii_lowercase().replace('-', "_");
        match key.as_str() {
            "volcano" => Some(presets::volcano()),
            "high_island" => Some(presets::high_island()),
            "low_island" => Some(presets::low_island()),
            "continents" => Some(presets::continents()),
            "archipelago" => Some(presets::archipelago()),
            "atoll" => Some(presets::atoll()),
            _ => None,
        }
    }

    pub fn preset_names() -> &'static [&'static str] {
        &[
            "volcano",
            "high_island",
            "low_island",
            "continents",
            "archipelago",
            "atoll",
        ]
    }

    /// Parses every step's range arguments into runnable operations.
    pub fn compile(&self) -> Vec<SculptOp> {
        self.steps.iter().map(compile_step).collect()
    }

    /// Runs the whole template against a map in one sculpting session.
    pub fn sculpt(&self, map: &mut Map, rng: &mut AleaRng) {
        let ops = self.compile();
        let mut sculptor = Sculptor::new(map, rng);
        for op in &ops {
            sculptor.apply(op);
        }
        sculptor.finish();
    }
}

fn compile_step(step: &TemplateStep) -> SculptOp {
    match step {
        TemplateStep::Hill {
            count,
            height,
            x,
            y,
        } => SculptOp::Hill {
            count: RangeExpr::parse_or_zero(count),
            height: RangeExpr::parse_or_zero(height),
            range_x: RangeExpr::parse_or_zero(x),
            range_y: RangeExpr::parse_or_zero(y),
        },
        TemplateStep::Pit {
            count,
            height,
            x,
            y,
        } => SculptOp::Pit {
            count: RangeExpr::parse_or_zero(count),
            height: RangeExpr::parse_or_zero(height),
            range_x: RangeExpr::parse_or_zero(x),
            range_y: RangeExpr::parse_or_zero(y),
        },
        TemplateStep::Range {
            count,
            height,
            x,
            y,
        } => SculptOp::Range {
            count: RangeExpr::parse_or_zero(count),
            height: RangeExpr::parse_or_zero(height),
            range_x: RangeExpr::parse_or_zero(x),
            range_y: RangeExpr::parse_or_zero(y),
        },
        TemplateStep::Trough {
            count,
            height,
            x,
            y,
        } => SculptOp::Trough {
            count: RangeExpr::parse_or_zero(count),
            height: RangeExpr::parse_or_zero(height),
            range_x: RangeExpr::parse_or_zero(x),
            range_y: RangeExpr::parse_or_zero(y),
        },
        TemplateStep::Strait { width, horizontal } => SculptOp::Strait {
            width: RangeExpr::parse_or_zero(width),
            vertical: !horizontal,
        },
        TemplateStep::Mask { power } => SculptOp::Mask { power: *power },
        TemplateStep::Smooth { fraction, add } => SculptOp::Smooth {
            fraction: *fraction,
            add: *add,
        },
        TemplateStep::Invert { chance, axes } => SculptOp::Invert {
            chance: *chance,
            axes: parse_axes(axes),
        },
        TemplateStep::Modify {
            range,
            add,
            multiply,
        } => SculptOp::Modify {
            band: parse_band(range),
            add: *add,
            multiply: *multiply,
        },
    }
}

fn parse_axes(raw: &str) -> MirrorAxes {
    match raw.trim().to_ascii_lowercase().as_str() {
        "x" => MirrorAxes::X,
        "y" => MirrorAxes::Y,
        _ => MirrorAxes::Both,
    }
}

fn parse_band(raw: &str) -> HeightBand {
    match raw.trim().to_ascii_lowercase().as_str() {
        "land" => HeightBand::Land,
        "all" => HeightBand::All,
        other => match RangeExpr::parse(other) {
            Ok(RangeExpr::Fixed { value, .. }) => HeightBand::Bounds {
                lo: value,
                hi: value,
            },
            Ok(RangeExpr::Span { lo, hi, .. }) => HeightBand::Bounds { lo, hi },
            Err(err) => {
                warn!(band = raw, %err, "malformed modify band, matching nothing");
                HeightBand::Bounds { lo: 1.0, hi: 0.0 }
            }
        },
    }
}

mod presets {
    use super::{Template, TemplateStep};

    fn hill(count: &str, height: &str, x: &str, y: &str) -> TemplateStep {
        TemplateStep::Hill {
            count: count.into(),
            height: height.into(),
            x: x.into(),
            y: y.into(),
        }
    }

    fn pit(count: &str, height: &str, x: &str, y: &str) -> TemplateStep {
        TemplateStep::Pit {
            count: count.into(),
            height: height.into(),
            x: x.into(),
            y: y.into(),
        }
    }

    fn range(count: &str, height: &str, x: &str, y: &str) -> TemplateStep {
        TemplateStep::Range {
            count: count.into(),
            height: height.into(),
            x: x.into(),
            y: y.into(),
        }
    }

    fn trough(count: &str, height: &str, x: &str, y: &str) -> TemplateStep {
        TemplateStep::Trough {
            count: count.into(),
            height: height.into(),
            x: x.into(),
            y: y.into(),
        }
    }

    fn strait(width: &str, horizontal: bool) -> TemplateStep {
        TemplateStep::Strait {
            width: width.into(),
            horizontal,
        }
    }

    fn smooth(fraction: f64) -> TemplateStep {
        TemplateStep::Smooth { fraction, add: 0.0 }
    }

    fn mask(power: f64) -> TemplateStep {
        TemplateStep::Mask { power }
    }

    fn add(value: f64, band: &str) -> TemplateStep {
        TemplateStep::Modify {
            range: band.into(),
            add: value,
            multiply: 1.0,
        }
    }

    fn multiply(factor: f64, band: &str) -> TemplateStep {
        TemplateStep::Modify {
            range: band.into(),
            add: 0.0,
            multiply: factor,
        }
    }

    pub fn volcano() -> Template {
        Template::new(
            "volcano",
            vec![
                hill("1", "90-100", "44-56", "40-60"),
                multiply(0.8, "50-100"),
                range("1.5", "30-55", "45-55", "40-60"),
                smooth(3.0),
                hill("1.5", "25-35", "25-30", "20-75"),
                hill("1", "25-35", "75-80", "25-75"),
                hill("0.5", "20-25", "10-15", "20-25"),
            ],
        )
    }

    pub fn high_island() -> Template {
        Template::new(
            "high_island",
            vec![
                hill("1", "90-100", "65-75", "47-53"),
                add(7.0, "all"),
                hill("5-6", "20-23", "25-55", "45-55"),
                range("1", "40-50", "45-55", "45-55"),
                multiply(0.8, "land"),
                mask(3.0),
                smooth(2.0),
                trough("2-3", "20-30", "20-30", "20-30"),
                trough("2-3", "20-30", "60-80", "70-80"),
                hill("1", "10-15", "60-60", "50-50"),
                hill("1.5", "13-16", "15-20", "20-75"),
                multiply(0.8, "20-100"),
                range("1.5", "30-40", "15-85", "30-40"),
                range("1.5", "30-40", "15-85", "60-70"),
                pit("2-3", "10-15", "15-85", "20-80"),
            ],
        )
    }

    pub fn low_island() -> Template {
        Template::new(
            "low_island",
            vec![
                hill("1", "90-99", "60-80", "45-55"),
                hill("4-5", "25-35", "20-65", "40-60"),
                range("1", "40-50", "45-55", "45-55"),
                smooth(3.0),
                trough("1.5", "20-30", "15-85", "20-30"),
                trough("1.5", "20-30", "15-85", "70-80"),
                hill("1.5", "10-15", "5-15", "20-80"),
                hill("1", "10-15", "85-95", "70-80"),
                pit("3-5", "10-15", "15-85", "20-80"),
                multiply(0.4, "20-100"),
            ],
        )
    }

    pub fn continents() -> Template {
        Template::new(
            "continents",
            vec![
                hill("1", "80-85", "75-80", "40-60"),
                hill("1", "80-85", "20-25", "40-60"),
                multiply(0.22, "20-100"),
                hill("5-6", "15-20", "25-75", "20-82"),
                range("0.8", "30-60", "5-15", "20-45"),
                range("0.8", "30-60", "5-15", "55-80"),
                range("0-3", "30-60", "80-90", "20-80"),
                trough("3-4", "15-20", "15-85", "20-80"),
                strait("2", false),
                smooth(2.0),
                trough("1-2", "5-10", "45-55", "45-55"),
                pit("3-4", "10-15", "15-85", "20-80"),
                mask(4.0),
            ],
        )
    }

    pub fn archipelago() -> Template {
        Template::new(
            "archipelago",
            vec![
                add(11.0, "all"),
                range("2-3", "40-60", "20-80", "20-80"),
                hill("5", "15-20", "10-90", "30-70"),
                hill("2", "10-15", "10-30", "20-80"),
                hill("2", "10-15", "60-90", "20-80"),
                smooth(3.0),
                trough("10", "20-30", "5-95", "5-95"),
                strait("2", false),
                strait("2", true),
            ],
        )
    }

    pub fn atoll() -> Template {
        Template::new(
            "atoll",
            vec![
                hill("1", "75-80", "50-60", "45-55"),
                hill("1.5", "30-50", "25-75", "30-70"),
                hill("0.5", "30-50", "25-35", "30-70"),
                smooth(1.0),
                multiply(0.2, "25-100"),
                hill("0.5", "10-20", "50-55", "48-52"),
            ],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_preset_resolves() {
        for name in Template::preset_names() {
            let template = Template::preset(name).unwrap();
            assert_eq!(&template.name, name);
            assert!(!template.steps.is_empty());
        }
        assert!(Template::preset("no_such_template").is_none());
    }

    #[test]
    fn test_preset_name_normalization() {
        let a = Template::preset("high-island").unwrap();
        let b = Template::preset("High_Island").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_compile_keeps_step_order() {
        let template = Template::preset("volcano").unwrap();
        let ops = template.compile();
        assert_eq!(ops.len(), template.steps.len());
        assert!(matches!(ops[0], SculptOp::Hill { .. }));
        assert!(matches!(ops[1], SculptOp::Modify { .. }));
    }

    #[test]
    fn test_from_json() {
        let json = r#"{
            "name": "custom",
            "steps": [
                {"op": "hill", "count": "1", "height": "50", "x": "40-60", "y": "40-60"},
                {"op": "strait", "width": "3", "horizontal": true},
                {"op": "mask", "power": 3.0},
                {"op": "modify", "range": "land", "add": 5.0}
            ]
        }"#;
        let template = Template::from_json(json).unwrap();
        assert_eq!(template.name, "custom");
        assert_eq!(template.steps.len(), 4);
        let ops = template.compile();
        assert!(matches!(
            ops[1],
            SculptOp::Strait {
                vertical: false,
                ..
            }
        ));
        assert!(matches!(
            ops[3],
            SculptOp::Modify {
                band: HeightBand::Land,
                ..
            }
        ));
    }

    #[test]
    fn test_from_json_rejects_unknown_op() {
        let json = r#"{"name": "bad", "steps": [{"op": "explode", "yield": "10"}]}"#;
        assert!(Template::from_json(json).is_err());
    }

    #[test]
    fn test_band_parsing() {
        assert_eq!(parse_band("land"), HeightBand::Land);
        assert_eq!(parse_band("ALL"), HeightBand::All);
        assert_eq!(
            parse_band("30-70"),
            HeightBand::Bounds { lo: 30.0, hi: 70.0 }
        );
        assert_eq!(
            parse_band("45"),
            HeightBand::Bounds { lo: 45.0, hi: 45.0 }
        );
        // Malformed bands match nothing.
        let HeightBand::Bounds { lo, hi } = parse_band("oops") else {
            panic!("expected bounds");
        };
        assert!(lo > hi);
    }

    #[test]
    fn test_axes_parsing() {
        assert_eq!(parse_axes("x"), MirrorAxes::X);
        assert_eq!(parse_axes("Y"), MirrorAxes::Y);
        assert_eq!(parse_axes("both"), MirrorAxes::Both);
        assert_eq!(parse_axes(""), MirrorAxes::Both);
    }

    #[test]
    fn test_preset_sculpts_land_and_water() {
        let mut map = Map::uniform_grid("volcano-test", 40, 40, 0.2);
        let mut rng = AleaRng::new("volcano-test");
        Template::preset("volcano").unwrap().sculpt(&mut map, &mut rng);
        let land = map.land_cell_count();
        assert!(land > 0, "volcano raised no land");
        assert!(land < map.cells.len(), "volcano flooded nothing");
    }

    #[test]
    fn test_template_runs_are_deterministic() {
        let run = || {
            let mut map = Map::uniform_grid("det", 30, 30, 0.2);
            let mut rng = AleaRng::new("det");
            Template::preset("archipelago")
                .unwrap()
                .sculpt(&mut map, &mut rng);
            map.cells.iter().map(|c| c.height).collect::<Vec<_>>()
        };
        assert_eq!(run(), run());
    }
}
