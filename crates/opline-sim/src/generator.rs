use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use opline_types::{ErrorRecord, EventRecord};

const EVENT_PHRASES: &[&str] = &[
    "pump cycle complete",
    "valve actuated",
    "filter pass finished",
    "sensor sweep nominal",
    "heater duty adjusted",
    "flow rate stabilized",
    "carousel indexed",
    "calibration checkpoint",
];

const ERROR_PHRASES: &[&str] = &[
    "overcurrent on drive",
    "pressure out of range",
    "thermistor open",
    "encoder stall",
    "supply voltage sag",
    "watchdog near miss",
];

/// Deterministic record source. Ids are monotonically increasing across both
/// record kinds; the phrase sequence is fixed by the seed.
pub struct TrafficGenerator {
    rng: StdRng,
    next_id: u64,
}

impl TrafficGenerator {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            next_id: 1,
        }
    }

    pub fn next_event(&mut self) -> EventRecord {
        let phrase = EVENT_PHRASES[self.rng.gen_range(0..EVENT_PHRASES.len())];
        EventRecord::new(self.take_id(), timestamp(), phrase)
    }

    pub fn next_error(&mut self) -> ErrorRecord {
        let phrase = ERROR_PHRASES[self.rng.gen_range(0..ERROR_PHRASES.len())];
        ErrorRecord::new(self.take_id(), timestamp(), phrase, false)
    }

    /// One Bernoulli trial, for the random-clear cadence.
    pub fn roll(&mut self, probability: f64) -> bool {
        self.rng.gen_bool(probability.clamp(0.0, 1.0))
    }

    /// Uniform position in `0..len`. `len` must be nonzero.
    pub fn pick(&mut self, len: usize) -> usize {
        self.rng.gen_range(0..len)
    }

    fn take_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

fn timestamp() -> String {
    chrono::Local::now().format("%H:%M:%S").to_string()
}
