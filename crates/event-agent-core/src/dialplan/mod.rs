//! Dialplan intercept
//!
//! In park mode every inbound call is routed to a generated extension that
//! parks the channel with the configured audio treatment, so a remote
//! controller can decide what to do with it over the bus. In disabled mode the
//! engine's normal dialplan handles the call.

mod xml;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info};

use crate::error::{AgentError, Result};

pub const PARK_EXTENSION_NAME: &str = "event_agent_park";
pub const DEFAULT_CONTEXT: &str = "default";
pub const DEFAULT_MUSIC_CLASS: &str = "moh";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DialplanMode {
    Disabled,
    Park,
}

impl DialplanMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DialplanMode::Disabled => "disabled",
            DialplanMode::Park => "park",
        }
    }
}

impl fmt::Display for DialplanMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the caller hears while parked
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioMode {
    Silence,
    #[default]
    Ringback,
    Music,
}

impl AudioMode {
    pub const NAMES: [&'static str; 3] = ["silence", "ringback", "music"];

    pub fn as_str(&self) -> &'static str {
        match self {
            AudioMode::Silence => "silence",
            AudioMode::Ringback => "ringback",
            AudioMode::Music => "music",
        }
    }
}

impl fmt::Display for AudioMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AudioMode {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "silence" => Ok(AudioMode::Silence),
            "ringback" => Ok(AudioMode::Ringback),
            "music" => Ok(AudioMode::Music),
            other => Err(AgentError::InvalidArgument(format!("unknown audio mode '{}'", other))),
        }
    }
}

/// Initial dialplan settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DialplanConfig {
    /// Context name written into the generated document
    pub context: String,
    pub audio_mode: AudioMode,
    pub auto_answer: bool,
    /// Local stream class for [`AudioMode::Music`]
    pub music_class: String,
    /// Start in park mode instead of disabled
    pub park_on_start: bool,
}

impl Default for DialplanConfig {
    fn default() -> Self {
        Self {
            context: DEFAULT_CONTEXT.to_string(),
            audio_mode: AudioMode::Ringback,
            auto_answer: false,
            music_class: DEFAULT_MUSIC_CLASS.to_string(),
            park_on_start: false,
        }
    }
}

/// Point-in-time view of the manager
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DialplanStatus {
    pub mode: DialplanMode,
    pub audio_mode: AudioMode,
    pub auto_answer: bool,
    pub context: String,
    pub music_class: String,
    pub calls_intercepted: u64,
    pub calls_parked: u64,
}

/// One dialplan application call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParkAction {
    pub application: String,
    pub data: String,
}

impl ParkAction {
    pub fn new(application: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            application: application.into(),
            data: data.into(),
        }
    }

    fn bare(application: &str) -> Self {
        Self::new(application, "")
    }
}

/// Actions for one intercepted call, in execution order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParkPlan {
    pub context: String,
    pub actions: Vec<ParkAction>,
}

impl ParkPlan {
    pub fn applications(&self) -> Vec<&str> {
        self.actions.iter().map(|a| a.application.as_str()).collect()
    }
}

#[derive(Debug)]
struct DialplanState {
    mode: DialplanMode,
    audio_mode: AudioMode,
    auto_answer: bool,
    context: String,
    music_class: String,
    calls_intercepted: u64,
    calls_parked: u64,
}

impl DialplanState {
    fn park_plan(&self) -> ParkPlan {
        let mut actions = vec![
            ParkAction::new("set", "hangup_after_bridge=true"),
            ParkAction::new("set", "continue_on_fail=true"),
        ];

        if self.auto_answer {
            actions.push(ParkAction::bare("answer"));
        }

        match self.audio_mode {
            AudioMode::Silence => actions.push(ParkAction::new("set", "park_timeout=0")),
            AudioMode::Ringback => actions.push(ParkAction::bare("ring_ready")),
            AudioMode::Music if !self.music_class.is_empty() => {
                let stream = format!("local_stream://{}", self.music_class);
                actions.push(ParkAction::new("set", format!("hold_music={}", stream)));
                actions.push(ParkAction::bare("answer"));
                actions.push(ParkAction::new("playback", stream));
            }
            AudioMode::Music => {
                actions.push(ParkAction::bare("answer"));
                actions.push(ParkAction::new("playback", "$${hold_music}"));
            }
        }

        actions.push(ParkAction::bare("park"));

        ParkPlan {
            context: self.context.clone(),
            actions,
        }
    }
}

/// Park/disabled state machine shared by the dialplan commands and the
/// engine's routing callback
#[derive(Debug)]
pub struct DialplanManager {
    state: Mutex<DialplanState>,
}

impl DialplanManager {
    pub fn new(config: &DialplanConfig) -> Self {
        let context = if config.context.is_empty() {
            DEFAULT_CONTEXT.to_string()
        } else {
            config.context.clone()
        };

        Self {
            state: Mutex::new(DialplanState {
                mode: if config.park_on_start {
                    DialplanMode::Park
                } else {
                    DialplanMode::Disabled
                },
                audio_mode: config.audio_mode,
                auto_answer: config.auto_answer,
                context,
                music_class: config.music_class.clone(),
                calls_intercepted: 0,
                calls_parked: 0,
            }),
        }
    }

    pub fn mode(&self) -> DialplanMode {
        self.state.lock().mode
    }

    pub fn set_mode(&self, mode: DialplanMode) {
        self.state.lock().mode = mode;
        info!("Dialplan mode set to {}", mode);
    }

    pub fn set_audio_mode(&self, audio_mode: AudioMode) {
        self.state.lock().audio_mode = audio_mode;
        info!("Dialplan audio mode set to {}", audio_mode);
    }

    pub fn set_auto_answer(&self, enabled: bool) {
        self.state.lock().auto_answer = enabled;
        info!("Dialplan auto-answer {}", if enabled { "enabled" } else { "disabled" });
    }

    /// Change the music class. Leaves the audio mode alone.
    pub fn set_music_class(&self, music_class: &str) -> Result<()> {
        if music_class.is_empty() {
            return Err(AgentError::InvalidArgument("music class cannot be empty".to_string()));
        }
        self.state.lock().music_class = music_class.to_string();
        info!("Dialplan music class set to {}", music_class);
        Ok(())
    }

    pub fn status(&self) -> DialplanStatus {
        let state = self.state.lock();
        DialplanStatus {
            mode: state.mode,
            audio_mode: state.audio_mode,
            auto_answer: state.auto_answer,
            context: state.context.clone(),
            music_class: state.music_class.clone(),
            calls_intercepted: state.calls_intercepted,
            calls_parked: state.calls_parked,
        }
    }

    /// Routing decision for one inbound call.
    ///
    /// `None` in disabled mode, so the normal dialplan applies.
    pub fn route_call(&self) -> Option<ParkPlan> {
        let plan = {
            let mut state = self.state.lock();
            if state.mode != DialplanMode::Park {
                return None;
            }
            state.calls_intercepted += 1;
            state.calls_parked += 1;
            state.park_plan()
        };

        debug!("Intercepted call into context {} ({} actions)", plan.context, plan.actions.len());
        Some(plan)
    }

    /// Engine XML lookup hook: only the `dialplan` section (any case) is answered
    pub fn fetch_xml(&self, section: &str) -> Result<Option<String>> {
        if !section.eq_ignore_ascii_case("dialplan") {
            return Ok(None);
        }
        self.route_call().map(|plan| plan.to_xml()).transpose()
    }
}

impl Default for DialplanManager {
    fn default() -> Self {
        Self::new(&DialplanConfig::default())
    }
}
