//! Fixed-rate session loop

use std::time::Duration;

use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::game::{GameError, MatchSummary};
use crate::util::time::{tick_delta, Timer, SIMULATION_TPS};
use crate::world::HostWorld;

use super::GardenScene;

/// Feeds input into the scene ahead of each tick
pub trait Driver<W: HostWorld> {
    /// Returns `false` once there is nothing left to do
    fn drive(&mut self, scene: &mut GardenScene<W>) -> Result<bool, GameError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunnerSettings {
    pub tick_rate: u32,
    /// Stop after this many ticks whatever the state of the match
    pub max_ticks: u64,
    /// Pace ticks on the wall clock; otherwise run flat out
    pub realtime: bool,
}

impl RunnerSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            tick_rate: config.tick_rate,
            max_ticks: config.demo_max_ticks,
            realtime: config.demo_realtime,
        }
    }
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Self {
            tick_rate: SIMULATION_TPS,
            max_ticks: 7200,
            realtime: false,
        }
    }
}

pub struct SceneRunner<W: HostWorld, D: Driver<W>> {
    scene: GardenScene<W>,
    driver: D,
    settings: RunnerSettings,
}

impl<W: HostWorld, D: Driver<W>> SceneRunner<W, D> {
    pub fn new(scene: GardenScene<W>, driver: D, settings: RunnerSettings) -> Self {
        Self {
            scene,
            driver,
            settings,
        }
    }

    pub fn scene(&self) -> &GardenScene<W> {
        &self.scene
    }

    /// Tick until the driver is done or the budget runs out
    pub async fn run(mut self) -> Result<MatchSummary, GameError> {
        let match_id = self.scene.engine().id();
        info!(%match_id, tick_rate = self.settings.tick_rate, "Session started");

        let dt = tick_delta(self.settings.tick_rate);
        let tick_duration = Duration::from_micros(1_000_000 / self.settings.tick_rate.max(1) as u64);
        let mut tick_interval = interval(tick_duration);
        tick_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let timer = Timer::new();

        loop {
            if self.settings.realtime {
                tick_interval.tick().await;
            }

            let active = self.driver.drive(&mut self.scene)?;
            let events = self.scene.tick(dt)?;
            for event in &events {
                debug!(%match_id, ?event, "Event");
            }

            if !active {
                info!(%match_id, "Driver finished");
                break;
            }
            if self.scene.clock().ticks() >= self.settings.max_ticks {
                warn!(%match_id, ticks = self.settings.max_ticks, "Tick budget exhausted");
                break;
            }

            if !self.settings.realtime {
                tokio::task::yield_now().await;
            }
        }

        let summary = self.scene.summary();
        info!(
            %match_id,
            ticks = summary.ticks,
            wall_ms = timer.elapsed_ms(),
            ended = summary.ended,
            "Session finished"
        );
        Ok(summary)
    }
}
