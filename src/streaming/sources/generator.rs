//! Synthetic ADC source producing raw readings of a generated signal.
//!
//! Stands in for the microphone amplifier on hosts without a converter: the
//! generated waveform is mapped onto the raw `[0, raw_max]` range centred on
//! the converter midpoint, exactly as a biased microphone output would be.

use crate::sample::RawScale;
use crate::streaming::error::{StreamError, StreamResult};
use crate::streaming::traits::SampleSource;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::Duration;

/// Types of signals that can be generated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SignalType {
    /// Pure sine wave
    Sine {
        /// Cycles per second
        frequency: f64,
    },
    /// Square wave
    Square {
        /// Cycles per second
        frequency: f64,
        /// Fraction of each cycle spent high, `0.0..=1.0`
        duty_cycle: f64,
    },
    /// Triangle wave
    Triangle {
        /// Cycles per second
        frequency: f64,
    },
    /// White noise
    WhiteNoise,
    /// Silence (the converter midpoint)
    Silence,
}

/// Configuration for the signal generator.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Waveform to produce
    pub signal_type: SignalType,
    /// Peak amplitude relative to full scale, `0.0..=1.0`
    pub amplitude: f64,
    /// Readings per second; match the sampler's tick rate
    pub sample_rate: f64,
    /// Raw range the waveform is mapped onto
    pub scale: RawScale,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            signal_type: SignalType::Sine { frequency: 2.0 },
            amplitude: 0.5,
            sample_rate: 50.0,
            scale: RawScale::TWELVE_BIT,
        }
    }
}

impl GeneratorConfig {
    /// Sample rate matching a sampler ticking every `period`.
    pub fn rate_for_period(period: Duration) -> f64 {
        if period.is_zero() {
            0.0
        } else {
            1.0 / period.as_secs_f64()
        }
    }
}

/// A [`SampleSource`] that generates raw readings in real time.
#[derive(Debug, Clone)]
pub struct GeneratorSource {
    config: GeneratorConfig,
    current_sample: u64,
    phase: f64,
}

impl GeneratorSource {
    /// Create a new signal generator with the given configuration.
    pub fn new(config: GeneratorConfig) -> StreamResult<Self> {
        if !(config.sample_rate.is_finite() && config.sample_rate > 0.0) {
            return Err(StreamError::InvalidConfig(format!(
                "Generator sample rate must be positive, got {}",
                config.sample_rate
            )));
        }
        if !(0.0..=1.0).contains(&config.amplitude) {
            return Err(StreamError::InvalidConfig(format!(
                "Generator amplitude must be within 0.0..=1.0, got {}",
                config.amplitude
            )));
        }
        Ok(Self {
            config,
            current_sample: 0,
            phase: 0.0,
        })
    }

    /// Create a sine wave generator.
    pub fn sine(frequency: f64, sample_rate: f64, scale: RawScale) -> StreamResult<Self> {
        Self::new(GeneratorConfig {
            signal_type: SignalType::Sine { frequency },
            sample_rate,
            scale,
            ..Default::default()
        })
    }

    /// Create a silence generator.
    pub fn silence(sample_rate: f64, scale: RawScale) -> StreamResult<Self> {
        Self::new(GeneratorConfig {
            signal_type: SignalType::Silence,
            sample_rate,
            scale,
            ..Default::default()
        })
    }

    /// Number of readings produced so far.
    pub const fn samples_generated(&self) -> u64 {
        self.current_sample
    }

    fn advance_phase(&mut self, frequency: f64) -> f64 {
        let phase = self.phase;
        self.phase += frequency / self.config.sample_rate;
        if self.phase >= 1.0 {
            self.phase -= self.phase.floor();
        }
        phase
    }

    /// Next waveform value in `[-1.0, 1.0]` before amplitude scaling.
    fn generate(&mut self) -> f64 {
        match self.config.signal_type {
            SignalType::Sine { frequency } => {
                let phase = self.advance_phase(frequency);
                (2.0 * std::f64::consts::PI * phase).sin()
            }
            SignalType::Square {
                frequency,
                duty_cycle,
            } => {
                let phase = self.advance_phase(frequency);
                if phase < duty_cycle { 1.0 } else { -1.0 }
            }
            SignalType::Triangle { frequency } => {
                let phase = self.advance_phase(frequency);
                if phase < 0.5 {
                    4.0 * phase - 1.0
                } else {
                    3.0 - 4.0 * phase
                }
            }
            SignalType::WhiteNoise => {
                let mut hasher = DefaultHasher::new();
                self.current_sample.hash(&mut hasher);
                (hasher.finish() as f64 / u64::MAX as f64) * 2.0 - 1.0
            }
            SignalType::Silence => 0.0,
        }
    }
}

impl SampleSource for GeneratorSource {
    fn read_raw_sample(&mut self) -> StreamResult<u16> {
        let value = self.generate() * self.config.amplitude;
        self.current_sample += 1;

        let mid = f64::from(self.config.scale.midpoint());
        let raw_max = f64::from(self.config.scale.raw_max());
        let raw = (mid + value * mid).round().clamp(0.0, raw_max);
        Ok(raw as u16)
    }
}
