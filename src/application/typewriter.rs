use std::ops::Range;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, trace};

use super::surface::PlaceholderSurface;
use super::timers::{BoundedTimerQueue, Scheduler, TimerHandle};

const SAMPLES: [&str; 12] = [
    "com.spotify.music",
    "org.mozilla.firefox",
    "com.instagram.android",
    "com.reddit.frontpage",
    "org.videolan.vlc",
    "com.pinterest",
    "com.whatsapp",
    "flipboard.app",
    "com.twitter.android",
    "bbc.mobile.news.ww",
    "com.ebay.mobile",
    "com.dropbox.android",
];

#[derive(Debug, Clone)]
pub struct TypewriterConfig {
    /// Pause with a fully typed string before deleting it
    pub pause: Duration,
    /// Per-character delay while typing, in milliseconds
    pub type_delay_ms: Range<u64>,
    /// Per-character delay while deleting, in milliseconds
    pub delete_delay_ms: Range<u64>,
    pub samples: Vec<String>,
}

impl Default for TypewriterConfig {
    fn default() -> Self {
        Self {
            pause: Duration::from_millis(1500),
            type_delay_ms: 75..150,
            delete_delay_ms: 25..75,
            samples: SAMPLES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Stopped,
    Typing,
    Deleting,
}

/// Placeholder typewriter for one input field.
///
/// Each fired timer performs exactly one step (one character, or the end of
/// the pause) and schedules exactly one successor, so the loop never
/// recurses and `stop` can always reach the single live timer.
pub struct TypewriterSession {
    config: TypewriterConfig,
    mode: Mode,
    string_index: usize,
    cursor_position: usize,
    timers: BoundedTimerQueue,
    rng: StdRng,
}

impl TypewriterSession {
    pub fn new(config: TypewriterConfig) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }

    pub fn with_rng(config: TypewriterConfig, rng: StdRng) -> Self {
        Self {
            config,
            mode: Mode::Stopped,
            string_index: 0,
            cursor_position: 0,
            timers: BoundedTimerQueue::default(),
            rng,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    #[cfg(test)]
    pub fn string_index(&self) -> usize {
        self.string_index
    }

    #[cfg(test)]
    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    /// Begin the loop from the first sample. Does nothing if already running.
    pub fn start(&mut self, scheduler: &mut impl Scheduler) {
        if self.mode != Mode::Stopped {
            trace!("typewriter already running");
            return;
        }
        if self.config.samples.is_empty() {
            debug!("typewriter has no samples, not starting");
            return;
        }
        debug!("typewriter started");
        self.string_index = 0;
        self.cursor_position = 0;
        self.mode = Mode::Deleting;
        self.schedule(self.config.pause, scheduler);
    }

    /// Cancel every held timer. The placeholder text is left as it is.
    pub fn stop(&mut self, scheduler: &mut impl Scheduler) {
        if self.mode == Mode::Stopped && self.timers.is_empty() {
            return;
        }
        let cancelled = self.timers.drain_and_cancel(scheduler);
        self.mode = Mode::Stopped;
        debug!("typewriter stopped, {} timer(s) cancelled", cancelled);
    }

    /// Route a fired timer back into the session. Handles this session does
    /// not hold (cancelled, evicted or foreign) are ignored.
    pub fn on_timer(
        &mut self,
        handle: TimerHandle,
        field: &mut impl PlaceholderSurface,
        scheduler: &mut impl Scheduler,
    ) {
        if !self.timers.release(handle) {
            trace!("ignoring stale timer {:?}", handle);
            return;
        }
        match self.mode {
            Mode::Deleting => self.delete_step(field, scheduler),
            Mode::Typing => self.type_step(field, scheduler),
            Mode::Stopped => {}
        }
    }

    fn delete_step(&mut self, field: &mut impl PlaceholderSurface, scheduler: &mut impl Scheduler) {
        let mut text = field.placeholder().to_string();
        if text.pop().is_some() {
            let remaining = text.len();
            field.set_placeholder(text);
            if remaining > 0 {
                let delay = self.random_delay(self.config.delete_delay_ms.clone());
                self.schedule(delay, scheduler);
                return;
            }
        }
        self.mode = Mode::Typing;
        self.cursor_position = 0;
        self.type_step(field, scheduler);
    }

    fn type_step(&mut self, field: &mut impl PlaceholderSurface, scheduler: &mut impl Scheduler) {
        let samples = &self.config.samples;
        let text = &samples[self.string_index % samples.len()];
        let length = text.chars().count();

        if let Some(c) = text.chars().nth(self.cursor_position) {
            let mut placeholder = field.placeholder().to_string();
            placeholder.push(c);
            field.set_placeholder(placeholder);
        }

        if self.cursor_position + 1 < length {
            self.cursor_position += 1;
            let delay = self.random_delay(self.config.type_delay_ms.clone());
            self.schedule(delay, scheduler);
        } else {
            self.string_index = (self.string_index + 1) % samples.len();
            self.cursor_position = 0;
            self.mode = Mode::Deleting;
            self.schedule(self.config.pause, scheduler);
        }
    }

    fn random_delay(&mut self, range: Range<u64>) -> Duration {
        if range.is_empty() {
            return Duration::from_millis(range.start);
        }
        Duration::from_millis(self.rng.gen_range(range))
    }

    fn schedule(&mut self, delay: Duration, scheduler: &mut impl Scheduler) {
        let handle = scheduler.schedule(delay);
        if let Some(evicted) = self.timers.enqueue(handle) {
            scheduler.cancel(evicted);
        }
    }
}
