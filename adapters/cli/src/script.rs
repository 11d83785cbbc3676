//! Scripted simulation runs.

use std::time::Duration;

use anyhow::{bail, Result};
use hearthvale_core::{protocol::SyncChannel, Intent, Notice};
use hearthvale_session::Session;
use serde::Deserialize;

/// Ordered steps read from a TOML script.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct Script {
    #[serde(default)]
    steps: Vec<ScriptStep>,
}

/// One step: an optional intent followed by animation frames and wall time.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ScriptStep {
    #[serde(default)]
    intent: Option<Intent>,
    #[serde(default)]
    frames: u32,
    #[serde(default)]
    wall_secs: f64,
}

impl Script {
    pub(crate) fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub(crate) fn len(&self) -> usize {
        self.steps.len()
    }

    /// Plays every step and returns the notices raised along the way.
    ///
    /// Intents are consumed on the following frame; one extra frame runs at
    /// the end if any are still queued.
    pub(crate) fn run<C: SyncChannel>(
        &self,
        session: &mut Session<C>,
        frame: Duration,
    ) -> Result<Vec<Notice>> {
        let mut notices = Vec::new();
        for (index, step) in self.steps.iter().enumerate() {
            let Ok(wall) = Duration::try_from_secs_f64(step.wall_secs) else {
                bail!("step {index}: wall_secs must be a non-negative number");
            };

            if let Some(intent) = &step.intent {
                session.submit(intent.clone());
            }
            for _ in 0..step.frames {
                session.frame(frame);
            }
            if !wall.is_zero() {
                session.advance_clock(wall);
            }
            notices.extend(session.drain_notices());
        }

        if session.queued_intents() > 0 {
            session.frame(frame);
            notices.extend(session.drain_notices());
        }
        Ok(notices)
    }
}
