//! Sound cues via aplay (ALSA).

use std::path::{Path, PathBuf};

use log::debug;

use crate::descriptor::SoundCue;
use crate::host::AudioSink;

/// Plays `{se_dir}/{name}.wav`. Volume, pitch and pan are not applied by aplay.
pub struct AplayAudio {
    se_dir: PathBuf,
}

impl AplayAudio {
    pub fn new(se_dir: impl Into<PathBuf>) -> Self {
        AplayAudio { se_dir: se_dir.into() }
    }

    pub fn path_for(&self, cue: &SoundCue) -> PathBuf {
        self.se_dir.join(&cue.name).with_extension("wav")
    }
}

impl AudioSink for AplayAudio {
    fn play(&mut self, cue: &SoundCue) {
        if cue.name.is_empty() || cue.volume == 0 {
            return;
        }
        play_sound(&self.path_for(cue));
    }
}

/// Play a WAV file asynchronously. Silently skips if file missing or aplay unavailable.
pub fn play_sound(path: &Path) {
    if !path.exists() {
        debug!("Sound file missing: {}", path.display());
        return;
    }
    let path = path.to_path_buf();
    std::thread::spawn(move || {
        debug!("Playing sound: {}", path.display());
        let _ = std::process::Command::new("aplay")
            .arg("-q")
            .arg(&path)
            .status();
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cue_resolves_to_wav_in_se_dir() {
        let audio = AplayAudio::new("/game/audio/se");
        let cue = SoundCue::named("Coin");
        assert_eq!(audio.path_for(&cue), PathBuf::from("/game/audio/se/Coin.wav"));
    }

    #[test]
    fn missing_file_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let mut audio = AplayAudio::new(dir.path());
        audio.play(&SoundCue::named("Nothing"));
    }
}
