//! Effect catalog and filter directive definitions.
//!
//! The catalog is fixed at build time: every effect maps to an ordered
//! chain of FFmpeg audio filters that run sequentially on the stream.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::encoding::OUTPUT_SAMPLE_RATE;

/// Effect applied when a request does not name one.
pub const DEFAULT_EFFECT: &str = "youtube_slowed";

/// Legacy preset names accepted in place of a canonical id.
const BUILTIN_ALIASES: &[(&str, &str)] = &[("tiktok_lofi", "lofi"), ("chill_lofi", "lofi")];

/// A single filter parameter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum ParamValue {
    Int(i64),
    Float(f64),
    /// Raw expression passed through to the engine (e.g. `44100*0.85`, `60|120`)
    Expr(String),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Int(v) => write!(f, "{}", v),
            ParamValue::Float(v) => write!(f, "{}", v),
            ParamValue::Expr(v) => write!(f, "{}", v),
        }
    }
}

impl From<i32> for ParamValue {
    fn from(v: i32) -> Self {
        ParamValue::Int(v as i64)
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Int(v)
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Float(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Expr(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        ParamValue::Expr(v)
    }
}

/// One named signal-processing step with its parameters.
///
/// Parameter order is preserved as declared so the serialized chain is
/// deterministic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FilterDirective {
    pub name: String,
    #[serde(default)]
    pub params: Vec<(String, ParamValue)>,
}

impl FilterDirective {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
        }
    }

    /// Append a parameter.
    pub fn param(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    /// Engine syntax: `name=k=v:k=v`, or the bare name without parameters.
    pub fn to_filter_string(&self) -> String {
        if self.params.is_empty() {
            return self.name.clone();
        }
        let params: Vec<String> = self
            .params
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();
        format!("{}={}", self.name, params.join(":"))
    }
}

impl fmt::Display for FilterDirective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_filter_string())
    }
}

/// Serialize an ordered chain into a single filter graph string.
pub fn serialize_chain(chain: &[FilterDirective]) -> String {
    chain
        .iter()
        .map(FilterDirective::to_filter_string)
        .collect::<Vec<_>>()
        .join(",")
}

/// A named effect and its filter chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct EffectDefinition {
    pub id: String,
    pub name: String,
    pub description: String,
    pub chain: Vec<FilterDirective>,
}

/// Listing row for an effect.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct EffectSummary {
    pub id: String,
    pub name: String,
    pub description: String,
    pub filters: usize,
}

/// Immutable mapping from effect id to filter chain.
#[derive(Debug, Clone)]
pub struct EffectCatalog {
    effects: Vec<EffectDefinition>,
    aliases: Vec<(String, String)>,
    default_id: String,
}

impl EffectCatalog {
    /// Build a catalog from explicit definitions.
    ///
    /// Returns `None` when `default_id` is not one of the definitions.
    pub fn new(effects: Vec<EffectDefinition>, default_id: impl Into<String>) -> Option<Self> {
        let default_id = default_id.into();
        if !effects.iter().any(|e| e.id == default_id) {
            return None;
        }
        Some(Self {
            effects,
            aliases: Vec::new(),
            default_id,
        })
    }

    /// Accept `alias` as another name for the existing effect `target`.
    ///
    /// Aliases resolve on lookup but are not listed.
    pub fn with_alias(mut self, alias: impl Into<String>, target: &str) -> Self {
        if self.effects.iter().any(|e| e.id == target) {
            self.aliases.push((alias.into(), target.to_string()));
        }
        self
    }

    /// The built-in effect set.
    pub fn builtin() -> Self {
        let catalog = Self {
            effects: builtin_effects(),
            aliases: Vec::new(),
            default_id: DEFAULT_EFFECT.to_string(),
        };
        BUILTIN_ALIASES
            .iter()
            .fold(catalog, |catalog, (alias, target)| catalog.with_alias(*alias, target))
    }

    /// Canonical id for an id or alias.
    pub fn resolve(&self, id: &str) -> Option<&str> {
        if let Some(effect) = self.effects.iter().find(|e| e.id == id) {
            return Some(&effect.id);
        }
        self.aliases
            .iter()
            .find(|(alias, _)| alias == id)
            .map(|(_, target)| target.as_str())
    }

    /// Filter chain for an effect id.
    pub fn lookup(&self, id: &str) -> Option<&[FilterDirective]> {
        self.get(id).map(|e| e.chain.as_slice())
    }

    /// Full definition for an effect id or alias.
    pub fn get(&self, id: &str) -> Option<&EffectDefinition> {
        let id = self.resolve(id)?;
        self.effects.iter().find(|e| e.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn default_id(&self) -> &str {
        &self.default_id
    }

    /// Canonical effect ids in catalog order.
    pub fn ids(&self) -> Vec<String> {
        self.effects.iter().map(|e| e.id.clone()).collect()
    }

    pub fn summaries(&self) -> Vec<EffectSummary> {
        self.effects
            .iter()
            .map(|e| EffectSummary {
                id: e.id.clone(),
                name: e.name.clone(),
                description: e.description.clone(),
                filters: e.chain.len(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.effects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }
}

impl Default for EffectCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

fn effect(id: &str, name: &str, description: &str, chain: Vec<FilterDirective>) -> EffectDefinition {
    EffectDefinition {
        id: id.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        chain,
    }
}

fn bass_shelf(gain: i32) -> FilterDirective {
    FilterDirective::new("equalizer")
        .param("f", 60)
        .param("width_type", "h")
        .param("width", 100)
        .param("g", gain)
}

fn resample() -> FilterDirective {
    FilterDirective::new("aresample").param("osr", OUTPUT_SAMPLE_RATE as i64)
}

fn builtin_effects() -> Vec<EffectDefinition> {
    vec![
        effect(
            "youtube_slowed",
            "Slowed + Reverb (YouTube)",
            "Pitched-down slow tempo with a wide echo tail, warm low end and tight dynamics",
            vec![
                FilterDirective::new("asetrate").param("r", "44100*0.85"),
                resample(),
                FilterDirective::new("atempo").param("tempo", 0.95),
                FilterDirective::new("aecho")
                    .param("in_gain", 0.8)
                    .param("out_gain", 0.88)
                    .param("delays", "60|120")
                    .param("decays", "0.4|0.3"),
                bass_shelf(4),
                FilterDirective::new("acompressor")
                    .param("threshold", 0.089)
                    .param("ratio", 3)
                    .param("attack", 20)
                    .param("release", 250),
                FilterDirective::new("alimiter").param("limit", 0.95),
            ],
        ),
        effect(
            "lofi",
            "Ultimate Lo-fi",
            "Band-limited warmth, breathing vibrato and deep bass",
            vec![
                FilterDirective::new("lowpass").param("f", 3000),
                FilterDirective::new("highpass").param("f", 200),
                bass_shelf(10),
                FilterDirective::new("vibrato").param("f", 0.25).param("d", 0.3),
                FilterDirective::new("asetrate").param("r", "44100*0.97"),
                resample(),
                FilterDirective::new("alimiter").param("limit", 0.95),
            ],
        ),
        effect(
            "reverb",
            "Slowed + Reverb",
            "Actually slows the track down and adds a deep echo tail",
            vec![
                FilterDirective::new("atempo").param("tempo", 0.85),
                FilterDirective::new("asetrate").param("r", "44100*0.95"),
                resample(),
                FilterDirective::new("aecho")
                    .param("in_gain", 0.8)
                    .param("out_gain", 0.9)
                    .param("delays", "1000|1800")
                    .param("decays", "0.3|0.25"),
                bass_shelf(12),
                FilterDirective::new("alimiter").param("limit", 0.95),
            ],
        ),
        effect(
            "nightcore",
            "Nightcore",
            "Fast, energetic and high pitched",
            vec![
                FilterDirective::new("atempo").param("tempo", 1.25),
                FilterDirective::new("asetrate").param("r", "44100*1.1"),
                resample(),
                FilterDirective::new("highpass").param("f", 100),
                FilterDirective::new("equalizer")
                    .param("f", 8000)
                    .param("width_type", "h")
                    .param("width", 2000)
                    .param("g", 8),
                FilterDirective::new("alimiter").param("limit", 0.95),
            ],
        ),
        effect(
            "8d_audio",
            "8D Audio",
            "Slow left-right rotation for an immersive headphone image",
            vec![
                FilterDirective::new("apulsator").param("hz", 0.125).param("width", 0.5),
                FilterDirective::new("stereotools").param("mlev", 0.5),
                FilterDirective::new("extrastereo").param("m", 2.0),
                FilterDirective::new("aecho")
                    .param("in_gain", 0.8)
                    .param("out_gain", 0.7)
                    .param("delays", "40|80")
                    .param("decays", "0.3|0.2"),
                FilterDirective::new("volume").param("volume", 0.9),
            ],
        ),
        effect(
            "vaporwave",
            "Vaporwave",
            "Slow, pitched down and washed in echo",
            vec![
                FilterDirective::new("atempo").param("tempo", 0.9),
                FilterDirective::new("asetrate").param("r", "44100*0.93"),
                resample(),
                FilterDirective::new("aecho")
                    .param("in_gain", 0.8)
                    .param("out_gain", 0.85)
                    .param("delays", "500|900")
                    .param("decays", "0.35|0.25"),
                bass_shelf(10),
                FilterDirective::new("alimiter").param("limit", 0.95),
            ],
        ),
    ]
}
