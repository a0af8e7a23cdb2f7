//! City profile: the per-deployment record written by `init` and
//! `configure`, and checked by `deploy`.

use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

const PROFILE_FILE: &str = "city.json";

/// Feature modules a deployment can enable. Citizen registration is always on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CivicModule {
    Issues,
    Voting,
    Alerts,
    Budget,
    Council,
}

impl CivicModule {
    pub const ALL: [CivicModule; 5] = [
        CivicModule::Issues,
        CivicModule::Voting,
        CivicModule::Alerts,
        CivicModule::Budget,
        CivicModule::Council,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            CivicModule::Issues => "issues",
            CivicModule::Voting => "voting",
            CivicModule::Alerts => "alerts",
            CivicModule::Budget => "budget",
            CivicModule::Council => "council",
        }
    }
}

impl fmt::Display for CivicModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for CivicModule {
    type Err = CityProfileError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        CivicModule::ALL
            .into_iter()
            .find(|module| module.label() == normalized)
            .ok_or(CityProfileError::UnknownModule(normalized))
    }
}

/// Parsed `--modules` argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleSelection(BTreeSet<CivicModule>);

impl ModuleSelection {
    /// Accepts `all` or a comma separated list of module names.
    pub fn parse(raw: &str) -> Result<Self, CityProfileError> {
        if raw.trim().eq_ignore_ascii_case("all") {
            return Ok(Self(CivicModule::ALL.into_iter().collect()));
        }

        let modules = raw
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(CivicModule::from_str)
            .collect::<Result<BTreeSet<_>, _>>()?;

        if modules.is_empty() {
            return Err(CityProfileError::EmptySelection);
        }
        Ok(Self(modules))
    }

    pub fn modules(&self) -> &BTreeSet<CivicModule> {
        &self.0
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CityProfileError {
    #[error("city name must not be empty")]
    EmptyCity,
    #[error("a city profile already exists at {0} (use --force to replace it)")]
    AlreadyInitialized(PathBuf),
    #[error("no city profile found at {0}; run `init --city <name>` first")]
    NotInitialized(PathBuf),
    #[error("unknown module '{0}' (expected all or a list of issues, voting, alerts, budget, council)")]
    UnknownModule(String),
    #[error("module selection must name at least one module")]
    EmptySelection,
    #[error("no modules configured; run `configure --modules all` before deploying")]
    NoModulesConfigured,
    #[error("city profile io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("city profile is not valid JSON: {0}")]
    Format(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CityProfile {
    pub city: String,
    pub slug: String,
    pub modules: BTreeSet<CivicModule>,
    pub created_at: DateTime<Utc>,
    pub configured_at: Option<DateTime<Utc>>,
}

impl CityProfile {
    pub fn path(data_dir: &Path) -> PathBuf {
        data_dir.join(PROFILE_FILE)
    }

    /// Create and persist a fresh profile with no modules enabled.
    pub fn init(data_dir: &Path, city: &str, force: bool) -> Result<Self, CityProfileError> {
        let city = city.trim();
        if city.is_empty() {
            return Err(CityProfileError::EmptyCity);
        }

        let path = Self::path(data_dir);
        if path.exists() && !force {
            return Err(CityProfileError::AlreadyInitialized(path));
        }

        let profile = Self {
            city: city.to_string(),
            slug: slugify(city),
            modules: BTreeSet::new(),
            created_at: Utc::now(),
            configured_at: None,
        };
        profile.save(data_dir)?;
        info!(city = %profile.city, path = %path.display(), "city profile initialized");
        Ok(profile)
    }

    pub fn load(data_dir: &Path) -> Result<Self, CityProfileError> {
        let path = Self::path(data_dir);
        if !path.exists() {
            return Err(CityProfileError::NotInitialized(path));
        }
        let raw = fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn save(&self, data_dir: &Path) -> Result<(), CityProfileError> {
        fs::create_dir_all(data_dir)?;
        let payload = serde_json::to_string_pretty(self)?;
        fs::write(Self::path(data_dir), payload)?;
        Ok(())
    }

    /// Replace the enabled module set.
    pub fn configure(&mut self, selection: ModuleSelection) {
        self.modules = selection.0;
        self.configured_at = Some(Utc::now());
    }

    pub fn ensure_deployable(&self) -> Result<(), CityProfileError> {
        if self.modules.is_empty() {
            return Err(CityProfileError::NoModulesConfigured);
        }
        Ok(())
    }

    pub fn module_labels(&self) -> Vec<&'static str> {
        self.modules.iter().map(|module| module.label()).collect()
    }
}

fn slugify(city: &str) -> String {
    city.split(|ch: char| !ch.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(str::to_ascii_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}
