//! Compilation targets.
//!
//! A target is written as `arch[-feature]*`, e.g. `host`, `host-cuda` or
//! `x86-cuda-user_context`. The architecture names the host the pipeline
//! runs on; features opt into device offload and calling conventions.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use strum::{Display, EnumString};

use crate::error::{Error, InvalidTargetSnafu, Result};

/// Host architecture of a target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum Arch {
    /// Whatever the compiling machine is.
    #[default]
    Host,
    X86,
    Arm,
}

/// Optional target feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum Feature {
    /// Offload scheduled stages to CUDA devices.
    Cuda,
    /// Kernels take a caller-supplied user context on every call.
    UserContext,
}

impl Feature {
    pub fn is_gpu(self) -> bool {
        matches!(self, Feature::Cuda)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Target {
    pub arch: Arch,
    features: BTreeSet<Feature>,
}

impl Target {
    pub fn new(arch: Arch) -> Self {
        Self { arch, features: BTreeSet::new() }
    }

    /// The host target without features.
    pub fn host() -> Self {
        Self::new(Arch::Host)
    }

    pub fn with_feature(mut self, feature: Feature) -> Self {
        self.features.insert(feature);
        self
    }

    pub fn set_feature(&mut self, feature: Feature) {
        self.features.insert(feature);
    }

    pub fn has_feature(&self, feature: Feature) -> bool {
        self.features.contains(&feature)
    }

    pub fn has_gpu_feature(&self) -> bool {
        self.features.iter().any(|f| f.is_gpu())
    }

    pub fn features(&self) -> impl Iterator<Item = Feature> + '_ {
        self.features.iter().copied()
    }
}

impl FromStr for Target {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.trim().split('-');
        let arch = parts.next().unwrap_or_default();
        let arch = Arch::from_str(arch)
            .map_err(|_| InvalidTargetSnafu { target: s, reason: format!("unknown architecture '{arch}'") }.build())?;

        let mut target = Target::new(arch);
        for part in parts {
            let feature = Feature::from_str(part)
                .map_err(|_| InvalidTargetSnafu { target: s, reason: format!("unknown feature '{part}'") }.build())?;
            target.set_feature(feature);
        }
        Ok(target)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.arch)?;
        for feature in &self.features {
            write!(f, "-{feature}")?;
        }
        Ok(())
    }
}
