//! Downmix compatibility graph
//!
//! Maps a target layout to the source layouts it can be produced from, along
//! with the ffmpeg filter expression and the codec used to encode the result.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ReplexError, Result};

/// One way to produce a target layout from a set of source layouts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompatibilityRule {
    /// Source layouts this rule accepts, in declaration order
    pub sources: Vec<String>,
    /// ffmpeg audio filter expression
    pub filter: String,
    /// Encoder for the produced track
    pub codec: String,
}

impl CompatibilityRule {
    pub fn new(sources: &[&str], filter: &str, codec: &str) -> Self {
        Self {
            sources: sources.iter().map(|s| s.to_string()).collect(),
            filter: filter.to_string(),
            codec: codec.to_string(),
        }
    }

    pub fn accepts(&self, layout: &str) -> bool {
        self.sources.iter().any(|s| s == layout)
    }
}

/// A layout the planner makes sure exists in every language group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownmixTarget {
    pub layout: String,
    /// Layouts that already count as this target (the target itself is implied)
    #[serde(default)]
    pub equivalents: Vec<String>,
    pub rules: Vec<CompatibilityRule>,
}

impl DownmixTarget {
    pub fn is_satisfied_by(&self, layout: &str) -> bool {
        self.layout == layout || self.equivalents.iter().any(|e| e == layout)
    }

    pub fn accepts(&self, layout: &str) -> bool {
        self.rules.iter().any(|r| r.accepts(layout))
    }
}

/// Static target → rules configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownmixGraph {
    pub targets: Vec<DownmixTarget>,
}

impl Default for DownmixGraph {
    fn default() -> Self {
        Self {
            targets: vec![
                DownmixTarget {
                    layout: "stereo".to_string(),
                    equivalents: vec!["downmix".to_string()],
                    rules: vec![CompatibilityRule::new(
                        &["5.1", "5.1(side)", "6.1", "7.1", "7.1(wide)", "7.1(wide-side)"],
                        "pan=stereo|FL=FC+0.30*FL+0.30*BL|FR=FC+0.30*FR+0.30*BR",
                        "aac",
                    )],
                },
                DownmixTarget {
                    layout: "5.1".to_string(),
                    equivalents: vec!["5.1(side)".to_string()],
                    rules: vec![CompatibilityRule::new(
                        &["6.1", "7.1", "7.1(wide)", "7.1(wide-side)"],
                        "pan=5.1|FL=FL|FR=FR|FC=FC|LFE=LFE|BL=0.5*BL+0.5*SL|BR=0.5*BR+0.5*SR",
                        "ac3",
                    )],
                },
            ],
        }
    }
}

impl DownmixGraph {
    pub fn new(targets: Vec<DownmixTarget>) -> Result<Self> {
        let graph = Self { targets };
        graph.validate()?;
        Ok(graph)
    }

    pub fn target(&self, layout: &str) -> Option<&DownmixTarget> {
        self.targets.iter().find(|t| t.layout == layout)
    }

    /// Targets checked by the planner, in declaration order
    pub fn generated_targets(&self) -> impl Iterator<Item = &DownmixTarget> {
        self.targets.iter()
    }

    /// First rule (in declaration order) producing `target` from `source_layout`
    pub fn resolve(&self, target: &str, source_layout: &str) -> Option<&CompatibilityRule> {
        self.target(target)?
            .rules
            .iter()
            .find(|r| r.accepts(source_layout))
    }

    /// Filters `(layout, index)` candidates to those usable as a source for `target`
    pub fn compatible_sources<'a, I>(&self, target: &str, candidates: I) -> Vec<usize>
    where
        I: IntoIterator<Item = (&'a str, usize)>,
    {
        let Some(target) = self.target(target) else {
            return Vec::new();
        };
        candidates
            .into_iter()
            .filter(|(layout, _)| target.accepts(layout))
            .map(|(_, index)| index)
            .collect()
    }

    /// Whether `layout` already satisfies `target`
    pub fn is_satisfied_by(&self, target: &str, layout: &str) -> bool {
        match self.target(target) {
            Some(t) => t.is_satisfied_by(layout),
            None => target == layout,
        }
    }

    pub fn validate(&self) -> Result<()> {
        for (i, target) in self.targets.iter().enumerate() {
            if target.layout.is_empty() {
                return Err(ReplexError::Config(format!(
                    "downmix target #{} has no layout",
                    i
                )));
            }
            if self.targets[..i].iter().any(|t| t.layout == target.layout) {
                return Err(ReplexError::Config(format!(
                    "downmix target {} declared twice",
                    target.layout
                )));
            }
            for rule in &target.rules {
                if rule.sources.is_empty() {
                    return Err(ReplexError::Config(format!(
                        "downmix rule for {} has no source layouts",
                        target.layout
                    )));
                }
                if rule.filter.trim().is_empty() || rule.codec.trim().is_empty() {
                    return Err(ReplexError::Config(format!(
                        "downmix rule for {} needs a filter and a codec",
                        target.layout
                    )));
                }
            }
        }
        Ok(())
    }
}

impl fmt::Display for DownmixGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for target in &self.targets {
            writeln!(f, "- {} :", target.layout)?;
            if target.rules.is_empty() {
                writeln!(f, "  None")?;
            }
            for rule in &target.rules {
                writeln!(f, "  - {} ({})", rule.sources.join(", "), rule.codec)?;
            }
        }
        Ok(())
    }
}
