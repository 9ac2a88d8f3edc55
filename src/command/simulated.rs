//! Simulated device for hosts without audio or vibration hardware

use super::device::{
    DeviceError, LanguageSupport, Playback, Ringtone, SpeechSession, SpeechSynth, Vibrator,
};
use crate::config::SimulationConfig;
use async_trait::async_trait;
use std::time::Duration;
use tracing::info;

/// Logs what a real device would do and takes as long as it would
pub struct SimulatedDevice {
    config: SimulationConfig,
}

impl SimulatedDevice {
    pub fn new(config: SimulationConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Ringtone for SimulatedDevice {
    fn name(&self) -> String {
        "simulated://ringtone/default".into()
    }

    async fn open(&self) -> Result<Box<dyn Playback>, DeviceError> {
        Ok(Box::new(SimulatedPlayback {
            duration: self.config.ring_duration,
        }))
    }
}

struct SimulatedPlayback {
    duration: Duration,
}

#[async_trait]
impl Playback for SimulatedPlayback {
    async fn prepare(&mut self) -> Result<(), DeviceError> {
        Ok(())
    }

    async fn play_to_end(&mut self) -> Result<(), DeviceError> {
        info!("[DEVICE] Ringing for {:?}", self.duration);
        tokio::time::sleep(self.duration).await;
        Ok(())
    }

    fn release(&mut self) {
        info!("[DEVICE] Ringtone player released");
    }
}

impl Vibrator for SimulatedDevice {
    fn vibrate(&self, pattern: &[u64], repeat_from: usize) {
        info!("[DEVICE] Vibrating {:?} (repeat from {})", pattern, repeat_from);
    }

    fn cancel(&self) {
        info!("[DEVICE] Vibrator stopped");
    }
}

#[async_trait]
impl SpeechSynth for SimulatedDevice {
    async fn open(&self) -> Result<Box<dyn SpeechSession>, DeviceError> {
        Ok(Box::new(SimulatedSpeech {
            locale: self.config.locale.clone(),
            per_char: self.config.speech_per_char,
        }))
    }
}

struct SimulatedSpeech {
    locale: String,
    per_char: Duration,
}

#[async_trait]
impl SpeechSession for SimulatedSpeech {
    fn language_support(&self, locale: &str) -> LanguageSupport {
        if locale.starts_with("en") {
            LanguageSupport::Available
        } else {
            LanguageSupport::NotSupported
        }
    }

    fn set_language(&mut self, locale: &str) {
        self.locale = locale.to_string();
    }

    async fn speak(&mut self, text: &str) -> Result<(), DeviceError> {
        info!("[DEVICE] Speaking ({}): {}", self.locale, text);
        let chars = text.chars().count() as u32;
        tokio::time::sleep(self.per_char * chars).await;
        Ok(())
    }

    fn shutdown(&mut self) {
        info!("[DEVICE] Speech engine shut down");
    }
}
