use std::{fs, path::Path, time::Duration};

use anyhow::{Context, Result};
use horde_defense_core::{SpawnerId, TeamId, TeamRoster, Vec3};
use horde_defense_session::SessionConfig;
use horde_defense_system_director::DirectorTuning;
use serde::Deserialize;

use crate::host::HostConfig;

/// On-disk configuration of a headless match.
///
/// Every table and key is optional; missing entries keep the library defaults.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct ConfigFile {
    pub(crate) session: SessionSection,
    pub(crate) director: DirectorSection,
    pub(crate) host: HostSection,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct SessionSection {
    pub(crate) seed: u64,
    pub(crate) spawner: u32,
    pub(crate) defenders_team: u8,
    pub(crate) horde_team: u8,
    pub(crate) defender_base: [f32; 3],
    pub(crate) horde_base: [f32; 3],
    pub(crate) deploy_timeout_secs: Option<f32>,
}

impl Default for SessionSection {
    fn default() -> Self {
        let config = SessionConfig::default();
        Self {
            seed: config.seed,
            spawner: config.spawner.get(),
            defenders_team: config.roster.defenders.get(),
            horde_team: config.roster.horde.get(),
            defender_base: config.defender_base.to_array(),
            horde_base: config.horde_base.to_array(),
            deploy_timeout_secs: None,
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct DirectorSection {
    pub(crate) outpost_count: u32,
    pub(crate) core_countdown_secs: f32,
    pub(crate) outpost_countdown_secs: f32,
    pub(crate) spawn_interval_secs: f32,
    pub(crate) max_spawn_per_objective: u32,
    pub(crate) baseline: u32,
    pub(crate) dip_min: u32,
    pub(crate) dip_max: u32,
}

impl Default for DirectorSection {
    fn default() -> Self {
        let tuning = DirectorTuning::default();
        Self {
            outpost_count: tuning.outpost_count,
            core_countdown_secs: tuning.core_countdown.as_secs_f32(),
            outpost_countdown_secs: tuning.outpost_countdown.as_secs_f32(),
            spawn_interval_secs: tuning.spawn_interval.as_secs_f32(),
            max_spawn_per_objective: tuning.max_spawn_per_objective,
            baseline: tuning.schedule.baseline,
            dip_min: tuning.schedule.dip_min,
            dip_max: tuning.schedule.dip_max,
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct HostSection {
    pub(crate) lane_half_width: f32,
    pub(crate) hill_height: f32,
    pub(crate) hill_wavelength: f32,
    pub(crate) defender_speed: f32,
    pub(crate) horde_speed: f32,
}

impl Default for HostSection {
    fn default() -> Self {
        let host = HostConfig::default();
        Self {
            lane_half_width: host.lane_half_width,
            hill_height: host.hill_height,
            hill_wavelength: host.hill_wavelength,
            defender_speed: host.defender_speed,
            horde_speed: host.horde_speed,
        }
    }
}

impl ConfigFile {
    /// Reads and parses a TOML configuration file.
    pub(crate) fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read config at {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("failed to parse config at {}", path.display()))
    }

    pub(crate) fn parse(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Builds the session configuration described by the file.
    pub(crate) fn session_config(&self) -> Result<SessionConfig> {
        let session = &self.session;
        let director = &self.director;
        let mut config = SessionConfig {
            seed: session.seed,
            spawner: SpawnerId::new(session.spawner),
            roster: TeamRoster {
                defenders: TeamId::new(session.defenders_team),
                horde: TeamId::new(session.horde_team),
            },
            defender_base: Vec3::from_array(session.defender_base),
            horde_base: Vec3::from_array(session.horde_base),
            deploy_timeout: session
                .deploy_timeout_secs
                .map(|secs| seconds("session.deploy_timeout_secs", secs))
                .transpose()?,
            ..SessionConfig::default()
        };

        config.director.outpost_count = director.outpost_count;
        config.director.core_countdown =
            seconds("director.core_countdown_secs", director.core_countdown_secs)?;
        config.director.outpost_countdown =
            seconds("director.outpost_countdown_secs", director.outpost_countdown_secs)?;
        config.director.spawn_interval =
            seconds("director.spawn_interval_secs", director.spawn_interval_secs)?;
        config.director.max_spawn_per_objective = director.max_spawn_per_objective;
        config.director.schedule.baseline = director.baseline;
        config.director.schedule.dip_min = director.dip_min;
        config.director.schedule.dip_max = director.dip_max;

        Ok(config)
    }

    /// Builds the simulated host configuration described by the file.
    pub(crate) fn host_config(&self, defenders: u32) -> HostConfig {
        HostConfig {
            defenders,
            lane_half_width: self.host.lane_half_width,
            hill_height: self.host.hill_height,
            hill_wavelength: self.host.hill_wavelength,
            defender_speed: self.host.defender_speed,
            horde_speed: self.host.horde_speed,
        }
    }
}

fn seconds(key: &str, secs: f32) -> Result<Duration> {
    Duration::try_from_secs_f32(secs)
        .with_context(|| format!("`{key}` must be a non-negative number of seconds"))
}
