use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{BeatPosition, Mode};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifecycleState {
    #[default]
    Disabled,
    Stopped,
    Running,
}

/// Read-only engine state for UI binding.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineStatus {
    pub enabled: bool,
    pub running: bool,
    /// Logical time is being taken from the external transport.
    pub following: bool,
    pub mode: Mode,
    pub position: BeatPosition,
    pub logical_time: Duration,
    /// Auto-stop boundary; zero while no score is loaded.
    pub total_duration: Duration,
    pub first_channel: Option<u8>,
    pub effect_failures: u64,
}

impl EngineStatus {
    pub fn state(&self) -> LifecycleState {
        if !self.enabled {
            LifecycleState::Disabled
        } else if self.running {
            LifecycleState::Running
        } else {
            LifecycleState::Stopped
        }
    }

    pub fn beat_index(&self) -> u32 {
        self.position.beat_index
    }

    pub fn subdivision_index(&self) -> u32 {
        self.position.subdivision_index
    }
}
