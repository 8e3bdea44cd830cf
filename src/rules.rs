//! Classification rules loaded as data.
//!
//! The built-in rule book is compiled into the binary from
//! `rules/default.toml`. A user file passed with `--rules` replaces the
//! built-in table of every report kind it defines.

use log::debug;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::classify::{BandKey, ClassificationBand, EnumScale, ScoreScale, enum_to_band, score_to_band};
use crate::error::RulesError;
use crate::model::Rgb;

const BUILTIN_RULES: &str = include_str!("../rules/default.toml");

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RuleBookFile {
    #[serde(default)]
    kinds: BTreeMap<String, KindRules>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct KindRules {
    accent: String,
    #[serde(default)]
    scores: BTreeMap<String, Vec<ScoreBandSpec>>,
    #[serde(default)]
    enums: BTreeMap<String, EnumSpec>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ScoreBandSpec {
    threshold: f64,
    background: String,
    text: String,
    label: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct EnumSpec {
    fallback: String,
    entries: BTreeMap<String, ColorSpec>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ColorSpec {
    background: String,
    text: String,
    label: String,
}

/// The compiled colour rules for one report kind.
#[derive(Debug, Clone)]
pub struct Palette {
    kind: String,
    pub accent: Rgb,
    scores: BTreeMap<String, ScoreScale>,
    enums: BTreeMap<String, EnumScale>,
}

impl Palette {
    pub fn score_scale(&self, name: &str) -> Result<&ScoreScale, RulesError> {
        self.scores.get(name).ok_or_else(|| RulesError::MissingScale {
            kind: self.kind.clone(),
            what: "score",
            name: name.to_string(),
        })
    }

    pub fn enum_scale(&self, name: &str) -> Result<&EnumScale, RulesError> {
        self.enums.get(name).ok_or_else(|| RulesError::MissingScale {
            kind: self.kind.clone(),
            what: "enum",
            name: name.to_string(),
        })
    }

    /// Shorthand for classifying a score against a named scale.
    pub fn score_band(&self, scale: &str, score: f64) -> Result<&ClassificationBand, RulesError> {
        Ok(score_to_band(score, self.score_scale(scale)?))
    }

    /// Shorthand for classifying an enum value against a named scale.
    pub fn enum_band(&self, scale: &str, key: &str) -> Result<&ClassificationBand, RulesError> {
        Ok(enum_to_band(key, self.enum_scale(scale)?))
    }
}

#[derive(Debug, Clone)]
pub struct RuleBook {
    kinds: BTreeMap<String, Palette>,
}

impl RuleBook {
    pub fn builtin() -> Result<Self, RulesError> {
        Self::parse(BUILTIN_RULES, "built-in rules")
    }

    /// Built-in rules, with kinds from `path` (if any) replacing their built-in tables.
    pub fn load(path: Option<&Path>) -> Result<Self, RulesError> {
        let mut book = Self::builtin()?;
        if let Some(path) = path {
            let contents =
                fs::read_to_string(path).map_err(|source| RulesError::Read { path: path.to_path_buf(), source })?;
            let overrides = Self::parse(&contents, &path.display().to_string())?;
            for (kind, palette) in overrides.kinds {
                debug!("rules from {} replace kind '{}'", path.display(), kind);
                book.kinds.insert(kind, palette);
            }
        }
        Ok(book)
    }

    pub fn parse(contents: &str, origin: &str) -> Result<Self, RulesError> {
        let file: RuleBookFile = toml::from_str(contents)
            .map_err(|e| RulesError::Parse { origin: origin.to_string(), detail: e.to_string() })?;

        let mut kinds = BTreeMap::new();
        for (kind, rules) in file.kinds {
            let palette = compile_kind(&kind, rules)?;
            kinds.insert(kind, palette);
        }
        Ok(Self { kinds })
    }

    pub fn palette(&self, kind: &str) -> Result<&Palette, RulesError> {
        self.kinds.get(kind).ok_or_else(|| RulesError::MissingKind(kind.to_string()))
    }
}

fn compile_kind(kind: &str, rules: KindRules) -> Result<Palette, RulesError> {
    let accent = parse_color(&rules.accent)?;

    let mut scores = BTreeMap::new();
    for (name, specs) in rules.scores {
        let bands = specs
            .into_iter()
            .map(|spec| {
                Ok(ClassificationBand {
                    key: BandKey::Threshold(spec.threshold),
                    background: parse_color(&spec.background)?,
                    text: parse_color(&spec.text)?,
                    label: spec.label,
                })
            })
            .collect::<Result<Vec<_>, RulesError>>()?;
        let scale = ScoreScale::new(&format!("{}.{}", kind, name), bands)?;
        scores.insert(name, scale);
    }

    let mut enums = BTreeMap::new();
    for (name, spec) in rules.enums {
        let bands = spec
            .entries
            .into_iter()
            .map(|(key, color)| {
                Ok(ClassificationBand {
                    key: BandKey::Key(key),
                    background: parse_color(&color.background)?,
                    text: parse_color(&color.text)?,
                    label: color.label,
                })
            })
            .collect::<Result<Vec<_>, RulesError>>()?;
        let scale = EnumScale::new(&format!("{}.{}", kind, name), bands, &spec.fallback)?;
        enums.insert(name, scale);
    }

    Ok(Palette { kind: kind.to_string(), accent, scores, enums })
}

fn parse_color(value: &str) -> Result<Rgb, RulesError> {
    Rgb::from_hex(value).ok_or_else(|| RulesError::Color { value: value.to_string() })
}
