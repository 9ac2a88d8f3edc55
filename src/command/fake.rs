//! Recording device used by the command tests

use super::device::{
    DeviceError, LanguageSupport, Playback, Ringtone, SpeechSession, SpeechSynth, Vibrator,
};
use super::handlers::HandlerContext;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

struct Behaviour {
    fail_open: bool,
    fail_prepare: bool,
    language: LanguageSupport,
    ring_duration: Duration,
    /// Speech never completes, like an utterance that is still playing
    speech_hangs: bool,
}

#[derive(Clone)]
pub struct FakeDevice {
    events: Arc<Mutex<Vec<String>>>,
    behaviour: Arc<Mutex<Behaviour>>,
}

impl FakeDevice {
    pub fn new() -> Self {
        Self {
            events: Arc::new(Mutex::new(Vec::new())),
            behaviour: Arc::new(Mutex::new(Behaviour {
                fail_open: false,
                fail_prepare: false,
                language: LanguageSupport::Available,
                ring_duration: Duration::from_millis(10),
                speech_hangs: false,
            })),
        }
    }

    pub fn context(&self) -> HandlerContext {
        HandlerContext {
            ringtone: Arc::new(self.clone()),
            vibrator: Arc::new(self.clone()),
            speech: Arc::new(self.clone()),
            locale: "fr".into(),
            vibrate_duration: Duration::from_millis(10),
        }
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().clone()
    }

    pub fn fail_open(&self) {
        self.behaviour.lock().fail_open = true;
    }

    pub fn fail_prepare(&self) {
        self.behaviour.lock().fail_prepare = true;
    }

    pub fn set_language_support(&self, support: LanguageSupport) {
        self.behaviour.lock().language = support;
    }

    pub fn set_ring_duration(&self, duration: Duration) {
        self.behaviour.lock().ring_duration = duration;
    }

    pub fn hang_speech(&self) {
        self.behaviour.lock().speech_hangs = true;
    }

    fn record(&self, event: impl Into<String>) {
        self.events.lock().push(event.into());
    }
}

#[async_trait]
impl Ringtone for FakeDevice {
    fn name(&self) -> String {
        "fake://ringtone".into()
    }

    async fn open(&self) -> Result<Box<dyn Playback>, DeviceError> {
        self.record("open");
        if self.behaviour.lock().fail_open {
            return Err(DeviceError::Unavailable("ringtone".into()));
        }
        Ok(Box::new(self.clone()))
    }
}

#[async_trait]
impl Playback for FakeDevice {
    async fn prepare(&mut self) -> Result<(), DeviceError> {
        self.record("prepare");
        if self.behaviour.lock().fail_prepare {
            return Err(DeviceError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "no such ringtone",
            )));
        }
        Ok(())
    }

    async fn play_to_end(&mut self) -> Result<(), DeviceError> {
        self.record("play");
        let duration = self.behaviour.lock().ring_duration;
        tokio::time::sleep(duration).await;
        self.record("played");
        Ok(())
    }

    fn release(&mut self) {
        self.record("release");
    }
}

impl Vibrator for FakeDevice {
    fn vibrate(&self, pattern: &[u64], repeat_from: usize) {
        self.record(format!("vibrate {:?} from {}", pattern, repeat_from));
    }

    fn cancel(&self) {
        self.record("vibrate cancel");
    }
}

#[async_trait]
impl SpeechSynth for FakeDevice {
    async fn open(&self) -> Result<Box<dyn SpeechSession>, DeviceError> {
        self.record("tts open");
        Ok(Box::new(self.clone()))
    }
}

#[async_trait]
impl SpeechSession for FakeDevice {
    fn language_support(&self, _locale: &str) -> LanguageSupport {
        self.behaviour.lock().language
    }

    fn set_language(&mut self, locale: &str) {
        self.record(format!("tts language {}", locale));
    }

    async fn speak(&mut self, text: &str) -> Result<(), DeviceError> {
        self.record(format!("tts speak {}", text));
        let hangs = self.behaviour.lock().speech_hangs;
        if hangs {
            std::future::pending::<()>().await;
        }
        self.record("tts spoken");
        Ok(())
    }

    fn shutdown(&mut self) {
        self.record("tts shutdown");
    }
}
