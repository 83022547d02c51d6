//! Direct metric generation when no EEG source is available

use eeg_core::{MetricMessage, StreamMode};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Probability of a stressed tick
const STRESS_CHANCE: f64 = 0.1;

/// Produces plausible `simulation`-mode messages without touching the pipeline
///
/// Focus is uniform on 40..=100. One tick in ten is stressed, with stress on
/// 80..=100 and the alert raised; otherwise stress is on 0..=30.
pub struct MetricSimulator {
    rng: StdRng,
}

impl MetricSimulator {
    /// Seeded simulator; `None` draws from entropy
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        MetricSimulator { rng }
    }

    /// Next simulated tick
    pub fn next_message(&mut self) -> MetricMessage {
        let focus = self.rng.gen_range(40..=100);
        let stressed = self.rng.gen::<f64>() > 1.0 - STRESS_CHANCE;
        let stress = if stressed {
            self.rng.gen_range(80..=100)
        } else {
            self.rng.gen_range(0..=30)
        };

        MetricMessage::new(focus as f64, stress as f64, stressed, StreamMode::Simulation)
    }
}

impl Iterator for MetricSimulator {
    type Item = MetricMessage;

    fn next(&mut self) -> Option<MetricMessage> {
        Some(self.next_message())
    }
}
