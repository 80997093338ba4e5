//! Construction-time options for compressors.
//!
//! All values have defaults. Override via environment variables
//! (prefixed `NEXAR_`) or by constructing a custom `CompressorConfig`.

use crate::compression::{Compressor, RandomKCompressor};
use crate::error::{CompressError, Result};
use crate::momentum::VanillaMomentumCompressor;
use crate::types::DataType;

/// Which sparsifier to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressorKind {
    RandomK,
}

impl CompressorKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "randomk" | "random_k" => Some(Self::RandomK),
            _ => None,
        }
    }
}

/// How many elements a sparsifier keeps per call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum KSelect {
    /// Exactly this many.
    Count(usize),
    /// This fraction of the tensor, rounded up, at least one.
    Ratio(f64),
}

impl KSelect {
    /// Parse `NEXAR_COMPRESSOR_K`: an integer is a count, a value below 1 a ratio.
    pub fn parse(s: &str) -> Option<Self> {
        if let Ok(n) = s.parse::<usize>() {
            return Some(Self::Count(n));
        }
        match s.parse::<f64>() {
            Ok(r) if r > 0.0 && r < 1.0 => Some(Self::Ratio(r)),
            _ => None,
        }
    }

    /// Resolve against a tensor of `count` elements.
    pub fn resolve(self, count: usize) -> Result<usize> {
        let k = match self {
            KSelect::Count(k) => k,
            KSelect::Ratio(r) if r > 0.0 && r <= 1.0 => {
                ((count as f64 * r).ceil() as usize).max(1).min(count)
            }
            KSelect::Ratio(r) => {
                return Err(CompressError::Config(format!(
                    "k ratio {r} outside (0, 1]"
                )));
            }
        };
        if k == 0 || k > count {
            return Err(CompressError::InvalidK { k, len: count });
        }
        Ok(k)
    }
}

/// Momentum rule placed in front of the compressor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MomentumKind {
    Vanilla { mu: f32 },
}

/// Options deciding which compressor is instantiated for a tensor.
#[derive(Debug, Clone, PartialEq)]
pub struct CompressorConfig {
    pub kind: CompressorKind,

    pub k: KSelect,

    /// Seed for the selection stream; only used when `deterministic`.
    pub seed: u64,

    /// Reproducible selection from `seed` instead of OS entropy.
    pub deterministic: bool,

    pub momentum: Option<MomentumKind>,
}

impl Default for CompressorConfig {
    fn default() -> Self {
        Self {
            kind: CompressorKind::RandomK,
            k: KSelect::Ratio(0.01),
            seed: 0,
            deterministic: false,
            momentum: None,
        }
    }
}

const DEFAULT_MU: f32 = 0.9;

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl CompressorConfig {
    /// Load config from environment variables, falling back to defaults.
    ///
    /// Recognized variables:
    /// - `NEXAR_COMPRESSOR` (`randomk`)
    /// - `NEXAR_COMPRESSOR_K` (count, or ratio below 1)
    /// - `NEXAR_COMPRESSOR_SEED`
    /// - `NEXAR_COMPRESSOR_DETERMINISTIC`
    /// - `NEXAR_MOMENTUM` (`vanilla` or `none`)
    /// - `NEXAR_MOMENTUM_MU`
    pub fn from_env() -> Self {
        Self::from_lookup(env_var)
    }

    /// Like [`CompressorConfig::from_env`] with a custom variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut cfg = Self::default();

        if let Some(v) = lookup("NEXAR_COMPRESSOR") {
            match CompressorKind::from_name(&v) {
                Some(kind) => cfg.kind = kind,
                None => tracing::warn!(value = %v, "ignoring unknown NEXAR_COMPRESSOR"),
            }
        }
        if let Some(v) = lookup("NEXAR_COMPRESSOR_K") {
            match KSelect::parse(&v) {
                Some(k) => cfg.k = k,
                None => tracing::warn!(value = %v, "ignoring unparsable NEXAR_COMPRESSOR_K"),
            }
        }
        if let Some(v) = lookup("NEXAR_COMPRESSOR_SEED") {
            match v.parse::<u64>() {
                Ok(s) => cfg.seed = s,
                Err(_) => tracing::warn!(value = %v, "ignoring unparsable NEXAR_COMPRESSOR_SEED"),
            }
        }
        if let Some(v) = lookup("NEXAR_COMPRESSOR_DETERMINISTIC") {
            match parse_bool(&v) {
                Some(b) => cfg.deterministic = b,
                None => tracing::warn!(
                    value = %v,
                    "ignoring unparsable NEXAR_COMPRESSOR_DETERMINISTIC"
                ),
            }
        }

        let mu = match lookup("NEXAR_MOMENTUM_MU") {
            Some(v) => v.parse::<f32>().unwrap_or_else(|_| {
                tracing::warn!(value = %v, "ignoring unparsable NEXAR_MOMENTUM_MU");
                DEFAULT_MU
            }),
            None => DEFAULT_MU,
        };
        if let Some(v) = lookup("NEXAR_MOMENTUM") {
            match v.to_ascii_lowercase().as_str() {
                "vanilla" => cfg.momentum = Some(MomentumKind::Vanilla { mu }),
                "none" | "" => cfg.momentum = None,
                _ => tracing::warn!(value = %v, "ignoring unknown NEXAR_MOMENTUM"),
            }
        }

        cfg
    }

    /// Check the options that do not depend on the tensor shape.
    pub fn validate(&self) -> Result<()> {
        match self.k {
            KSelect::Count(0) => {
                return Err(CompressError::Config("k must be positive".into()));
            }
            KSelect::Ratio(r) if !(r > 0.0 && r <= 1.0) => {
                return Err(CompressError::Config(format!("k ratio {r} outside (0, 1]")));
            }
            _ => {}
        }
        if let Some(MomentumKind::Vanilla { mu }) = self.momentum {
            if !mu.is_finite() || !(0.0..1.0).contains(&mu) {
                return Err(CompressError::InvalidMomentum { mu });
            }
        }
        Ok(())
    }

    /// Build the configured compressor for a tensor of `count` elements of `dtype`.
    pub fn build(&self, count: usize, dtype: DataType) -> Result<Box<dyn Compressor>> {
        self.validate()?;
        let k = self.k.resolve(count)?;
        let compressor: Box<dyn Compressor> = match self.kind {
            CompressorKind::RandomK => Box::new(RandomKCompressor::new(
                count,
                dtype,
                k,
                self.seed,
                self.deterministic,
            )?),
        };
        let compressor: Box<dyn Compressor> = match self.momentum {
            None => compressor,
            Some(MomentumKind::Vanilla { mu }) => {
                Box::new(VanillaMomentumCompressor::vanilla(compressor, mu)?)
            }
        };
        tracing::debug!(
            compressor = compressor.name(),
            count,
            k,
            %dtype,
            "compressor built from config"
        );
        Ok(compressor)
    }
}
