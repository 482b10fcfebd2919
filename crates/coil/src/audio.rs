//! Sound playback via [kira](https://docs.rs/kira).
//!
//! Sounds are loaded once under a tag and played any number of times. Every
//! play returns a [`SoundInstanceId`]; instances can be controlled one at a
//! time, by the tag they were played from, or all together.
//!
//! ```ignore
//! let mut audio = SoundManager::new()?;
//! audio.load_sound("blip", "assets/blip.ogg", false)?;
//! let id = audio.play("blip")?;
//! audio.set_volume_by_id(id, 0.5);
//! audio.control_by_tag("blip", SoundControl::Pause);
//! ```

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use kira::sound::PlaybackState;
use kira::sound::static_sound::{StaticSoundData, StaticSoundHandle};
use kira::{AudioManager, AudioManagerSettings, Decibels, DefaultBackend, Tween};

/// Linear amplitude (0.0 = silence, 1.0 = full) to decibels.
fn amplitude_to_db(amplitude: f64) -> Decibels {
    if amplitude <= 0.0 {
        Decibels::SILENCE
    } else {
        Decibels((20.0 * amplitude.log10()) as f32)
    }
}

// ── Errors ──────────────────────────────────────────────────────────────

#[derive(Debug)]
pub enum AudioError {
    /// Failed to initialize the audio backend.
    BackendInit(String),
    /// Failed to load a sound file.
    Load(String),
    /// Failed to play a sound.
    Play(String),
    /// No sound is loaded under this tag.
    UnknownSound(String),
}

impl fmt::Display for AudioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AudioError::BackendInit(e) => write!(f, "audio backend init failed: {e}"),
            AudioError::Load(e) => write!(f, "audio load failed: {e}"),
            AudioError::Play(e) => write!(f, "audio play failed: {e}"),
            AudioError::UnknownSound(tag) => write!(f, "no sound loaded as '{tag}'"),
        }
    }
}

impl std::error::Error for AudioError {}

// ── Types ───────────────────────────────────────────────────────────────

/// Identifies one playback of a sound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SoundInstanceId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoundControl {
    Pause,
    Resume,
    Stop,
}

struct Instance {
    tag: String,
    handle: StaticSoundHandle,
}

impl Instance {
    fn apply(&mut self, control: SoundControl) {
        match control {
            SoundControl::Pause => self.handle.pause(Tween::default()),
            SoundControl::Resume => self.handle.resume(Tween::default()),
            SoundControl::Stop => self.handle.stop(Tween::default()),
        }
    }

    fn is_stopped(&self) -> bool {
        matches!(self.handle.state(), PlaybackState::Stopped)
    }
}

// ── SoundManager ────────────────────────────────────────────────────────

pub struct SoundManager {
    manager: AudioManager<DefaultBackend>,
    sounds: HashMap<String, StaticSoundData>,
    instances: HashMap<SoundInstanceId, Instance>,
    next_id: u64,
}

impl SoundManager {
    pub fn new() -> Result<Self, AudioError> {
        let manager = AudioManager::<DefaultBackend>::new(AudioManagerSettings::default())
            .map_err(|e| AudioError::BackendInit(e.to_string()))?;
        Ok(Self {
            manager,
            sounds: HashMap::new(),
            instances: HashMap::new(),
            next_id: 0,
        })
    }

    /// Decode `path` and keep it under `tag`. Reloading a tag replaces the
    /// sound for future plays only.
    pub fn load_sound(&mut self, tag: &str, path: impl AsRef<Path>, looping: bool) -> Result<(), AudioError> {
        let path = path.as_ref();
        let mut data = StaticSoundData::from_file(path).map_err(|e| {
            log::error!("Failed to load sound '{}': {e}", path.display());
            AudioError::Load(format!("{}: {e}", path.display()))
        })?;
        if looping {
            data = data.loop_region(..);
        }
        if self.sounds.insert(tag.to_owned(), data).is_some() {
            log::warn!("Sound '{tag}' was already loaded, replacing");
        }
        Ok(())
    }

    pub fn is_loaded(&self, tag: &str) -> bool {
        self.sounds.contains_key(tag)
    }

    pub fn play(&mut self, tag: &str) -> Result<SoundInstanceId, AudioError> {
        let data = self.sounds.get(tag).ok_or_else(|| {
            log::warn!("Cannot play unknown sound '{tag}'");
            AudioError::UnknownSound(tag.to_owned())
        })?;
        let handle = self
            .manager
            .play(data.clone())
            .map_err(|e| AudioError::Play(e.to_string()))?;
        let id = SoundInstanceId(self.next_id);
        self.next_id += 1;
        self.instances.insert(
            id,
            Instance {
                tag: tag.to_owned(),
                handle,
            },
        );
        Ok(id)
    }

    // ── Volume ──────────────────────────────────────────────────────────

    /// Returns `false` if the instance is gone.
    pub fn set_volume_by_id(&mut self, id: SoundInstanceId, volume: f64) -> bool {
        match self.instances.get_mut(&id) {
            Some(instance) => {
                instance
                    .handle
                    .set_volume(amplitude_to_db(volume), Tween::default());
                true
            }
            None => false,
        }
    }

    pub fn set_volume_by_tag(&mut self, tag: &str, volume: f64) {
        for instance in self.instances.values_mut().filter(|i| i.tag == tag) {
            instance
                .handle
                .set_volume(amplitude_to_db(volume), Tween::default());
        }
    }

    /// Main track volume, applied on top of every instance.
    pub fn set_volume_all(&mut self, volume: f64) {
        self.manager
            .main_track()
            .set_volume(amplitude_to_db(volume), Tween::default());
    }

    // ── Playback control ────────────────────────────────────────────────

    pub fn control_by_id(&mut self, id: SoundInstanceId, control: SoundControl) -> bool {
        match self.instances.get_mut(&id) {
            Some(instance) => {
                instance.apply(control);
                true
            }
            None => false,
        }
    }

    pub fn control_by_tag(&mut self, tag: &str, control: SoundControl) {
        for instance in self.instances.values_mut().filter(|i| i.tag == tag) {
            instance.apply(control);
        }
    }

    pub fn control_all(&mut self, control: SoundControl) {
        for instance in self.instances.values_mut() {
            instance.apply(control);
        }
    }

    /// Forget instances that finished or were stopped.
    pub fn collect_finished(&mut self) -> usize {
        let before = self.instances.len();
        self.instances.retain(|_, instance| !instance.is_stopped());
        before - self.instances.len()
    }

    pub fn active_count(&self) -> usize {
        self.instances.len()
    }
}

impl fmt::Debug for SoundManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SoundManager")
            .field("sounds", &self.sounds.len())
            .field("instances", &self.instances.len())
            .finish_non_exhaustive()
    }
}
