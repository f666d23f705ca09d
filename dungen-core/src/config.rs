//! Configuration schema, bounds validation, and canonical hashing.
//!
//! Grounded on the template's `engine::worldfile::Scenario` pattern: a
//! plain serde-derived struct that gets validated in a single pass before
//! anything downstream touches it.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::ConfigIssue;

/// Recognised pacing curve shapes (`spec.md` §6).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub enum PacingCurve {
    Linear,
    SCurve,
    Exponential,
    Custom { points: Vec<(f64, f64)> },
}

impl PacingCurve {
    /// Evaluate the expected difficulty at `progress` (clamped to
    /// `[0, 1]`); for `Custom`, values outside the defined domain clamp to
    /// the nearest endpoint's difficulty.
    pub fn expected(&self, progress: f64) -> f64 {
        let x = progress.clamp(0.0, 1.0);
        match self {
            PacingCurve::Linear => x,
            PacingCurve::SCurve => {
                let g = |x: f64| 1.0 / (1.0 + (-10.0 * (x - 0.5)).exp());
                let g0 = g(0.0);
                let g1 = g(1.0);
                (g(x) - g0) / (g1 - g0)
            }
            PacingCurve::Exponential => x * x,
            PacingCurve::Custom { points } => eval_piecewise_linear(points, x),
        }
    }
}

fn eval_piecewise_linear(points: &[(f64, f64)], x: f64) -> f64 {
    if points.is_empty() {
        return x;
    }
    if x <= points[0].0 {
        return points[0].1;
    }
    if x >= points[points.len() - 1].0 {
        return points[points.len() - 1].1;
    }
    for w in points.windows(2) {
        let (x0, y0) = w[0];
        let (x1, y1) = w[1];
        if x >= x0 && x <= x1 {
            if (x1 - x0).abs() < f64::EPSILON {
                return y0;
            }
            let t = (x - x0) / (x1 - x0);
            return y0 + t * (y1 - y0);
        }
    }
    points[points.len() - 1].1
}

#[derive(Copy, Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SizeConfig {
    pub rooms_min: u32,
    pub rooms_max: u32,
}

#[derive(Copy, Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct BranchingConfig {
    pub avg: f64,
    pub max: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PacingConfig {
    pub curve: PacingCurve,
    pub variance: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct KeyConfig {
    pub name: String,
    pub count: u32,
}

#[derive(Copy, Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum Severity {
    Hard,
    Soft,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Constraint {
    pub kind: String,
    pub severity: Severity,
    pub expr: String,
}

/// The top-level generation configuration (`spec.md` §6).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Config {
    pub seed: u64,
    pub size: SizeConfig,
    pub branching: BranchingConfig,
    pub pacing: PacingConfig,
    pub themes: Vec<String>,
    pub keys: Vec<KeyConfig>,
    pub constraints: Vec<Constraint>,
    pub secret_density: f64,
    pub optional_ratio: f64,
    pub allow_disconnected: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            seed: 1,
            size: SizeConfig {
                rooms_min: 20,
                rooms_max: 30,
            },
            branching: BranchingConfig { avg: 2.0, max: 4 },
            pacing: PacingConfig {
                curve: PacingCurve::Linear,
                variance: 0.1,
            },
            themes: vec!["dungeon".to_string()],
            keys: Vec::new(),
            constraints: Vec::new(),
            secret_density: 0.1,
            optional_ratio: 0.2,
            allow_disconnected: false,
        }
    }
}

fn balanced_parens(s: &str) -> bool {
    let mut depth = 0i32;
    for c in s.chars() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            }
            _ => {}
        }
    }
    depth == 0
}

impl Config {
    /// Validate every bound from `spec.md` §6's configuration table.
    /// Returns every violation found rather than failing on the first one,
    /// so a caller sees the whole picture at once.
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();

        if !(10..=300).contains(&self.size.rooms_min)
            || !(10..=300).contains(&self.size.rooms_max)
            || self.size.rooms_min > self.size.rooms_max
        {
            issues.push(ConfigIssue::new(
                "size",
                format!(
                    "roomsMin/roomsMax must satisfy 10 <= min <= max <= 300, got {}..{}",
                    self.size.rooms_min, self.size.rooms_max
                ),
            ));
        }

        if !(1.5..=3.0).contains(&self.branching.avg) {
            issues.push(ConfigIssue::new(
                "branching.avg",
                format!("must be in [1.5, 3.0], got {}", self.branching.avg),
            ));
        }
        if !(2..=5).contains(&self.branching.max) {
            issues.push(ConfigIssue::new(
                "branching.max",
                format!("must be in [2, 5], got {}", self.branching.max),
            ));
        }

        if !(0.0..0.3).contains(&self.pacing.variance) {
            issues.push(ConfigIssue::new(
                "pacing.variance",
                format!("must be in [0, 0.3), got {}", self.pacing.variance),
            ));
        }
        if let PacingCurve::Custom { points } = &self.pacing.curve {
            if points.len() < 2 {
                issues.push(ConfigIssue::new(
                    "pacing.customPoints",
                    "CUSTOM curve requires at least 2 points",
                ));
            } else {
                let mut last = f64::NEG_INFINITY;
                for (p, d) in points {
                    if *p <= last {
                        issues.push(ConfigIssue::new(
                            "pacing.customPoints",
                            "progress values must be strictly increasing",
                        ));
                    }
                    if !(0.0..=1.0).contains(p) || !(0.0..=1.0).contains(d) {
                        issues.push(ConfigIssue::new(
                            "pacing.customPoints",
                            "progress and difficulty must be in [0, 1]",
                        ));
                    }
                    last = *p;
                }
            }
        }

        if self.themes.is_empty() {
            issues.push(ConfigIssue::new("themes", "must have at least 1 theme"));
        }

        for k in &self.keys {
            if k.name.is_empty() {
                issues.push(ConfigIssue::new("keys", "key name must be non-empty"));
            }
            if !(1..=5).contains(&k.count) {
                issues.push(ConfigIssue::new(
                    "keys",
                    format!("key '{}' count must be in [1, 5], got {}", k.name, k.count),
                ));
            }
        }

        for c in &self.constraints {
            if c.expr.is_empty() || !balanced_parens(&c.expr) {
                issues.push(ConfigIssue::new(
                    "constraints",
                    format!("constraint '{}' has an empty or unbalanced expr", c.kind),
                ));
            }
        }

        if !(0.0..=0.3).contains(&self.secret_density) {
            issues.push(ConfigIssue::new(
                "secretDensity",
                format!("must be in [0, 0.3], got {}", self.secret_density),
            ));
        }
        if !(0.1..=0.4).contains(&self.optional_ratio) {
            issues.push(ConfigIssue::new(
                "optionalRatio",
                format!("must be in [0.1, 0.4], got {}", self.optional_ratio),
            ));
        }

        issues
    }

    /// Deterministic hash over every field of the config in canonical
    /// (struct-declaration) order. Vector fields (`keys`, `constraints`,
    /// `themes`) are hashed in their given order since they are ordered
    /// lists, not maps; this function never visits a hash-map, so no
    /// sorting step is needed to stay canonical.
    pub fn canonical_hash(&self) -> u64 {
        let mut hasher = Sha256::new();
        hasher.update(self.seed.to_le_bytes());
        hasher.update(self.size.rooms_min.to_le_bytes());
        hasher.update(self.size.rooms_max.to_le_bytes());
        hasher.update(self.branching.avg.to_le_bytes());
        hasher.update(self.branching.max.to_le_bytes());
        hash_pacing(&mut hasher, &self.pacing);
        hasher.update((self.themes.len() as u64).to_le_bytes());
        for t in &self.themes {
            hasher.update(t.as_bytes());
            hasher.update([0u8]);
        }
        hasher.update((self.keys.len() as u64).to_le_bytes());
        for k in &self.keys {
            hasher.update(k.name.as_bytes());
            hasher.update([0u8]);
            hasher.update(k.count.to_le_bytes());
        }
        hasher.update((self.constraints.len() as u64).to_le_bytes());
        for c in &self.constraints {
            hasher.update(c.kind.as_bytes());
            hasher.update([0u8]);
            hasher.update([matches!(c.severity, Severity::Hard) as u8]);
            hasher.update(c.expr.as_bytes());
            hasher.update([0u8]);
        }
        hasher.update(self.secret_density.to_le_bytes());
        hasher.update(self.optional_ratio.to_le_bytes());
        hasher.update([self.allow_disconnected as u8]);

        let digest = hasher.finalize();
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&digest[..8]);
        u64::from_le_bytes(bytes)
    }
}

fn hash_pacing(hasher: &mut Sha256, pacing: &PacingConfig) {
    match &pacing.curve {
        PacingCurve::Linear => hasher.update([0u8]),
        PacingCurve::SCurve => hasher.update([1u8]),
        PacingCurve::Exponential => hasher.update([2u8]),
        PacingCurve::Custom { points } => {
            hasher.update([3u8]);
            hasher.update((points.len() as u64).to_le_bytes());
            for (p, d) in points {
                hasher.update(p.to_le_bytes());
                hasher.update(d.to_le_bytes());
            }
        }
    }
    hasher.update(pacing.variance.to_le_bytes());
}
