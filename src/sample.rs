//! Normalized audio samples and raw ADC rescaling.

/// One normalized audio amplitude reading in `[-1.0, 1.0]`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
#[repr(transparent)]
pub struct Sample(f32);

impl Sample {
    /// Silence.
    pub const ZERO: Self = Self(0.0);

    /// Wrap a value, clamping it into `[-1.0, 1.0]`.
    ///
    /// NaN maps to silence.
    pub fn new(value: f32) -> Self {
        if value.is_nan() {
            Self::ZERO
        } else {
            Self(value.clamp(-1.0, 1.0))
        }
    }

    /// The normalized amplitude.
    pub const fn value(self) -> f32 {
        self.0
    }
}

impl From<Sample> for f32 {
    fn from(sample: Sample) -> Self {
        sample.0
    }
}

impl From<f32> for Sample {
    fn from(value: f32) -> Self {
        Self::new(value)
    }
}

/// Describes the raw value range produced by the sampling hardware.
///
/// A converter of `b` bits reports values in `[0, 2^b - 1]`; the midpoint used
/// for rescaling is half of the full range, so a 12-bit converter maps
/// `2048` to `0.0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawScale {
    raw_max: u16,
}

impl RawScale {
    /// Scale for a 12-bit converter (`raw_max = 4095`).
    pub const TWELVE_BIT: Self = Self { raw_max: 4095 };

    /// Create a scale for readings in `[0, raw_max]`.
    ///
    /// Returns `None` for `raw_max == 0`, which has no usable midpoint.
    pub const fn new(raw_max: u16) -> Option<Self> {
        if raw_max == 0 {
            None
        } else {
            Some(Self { raw_max })
        }
    }

    /// Largest raw value the hardware can report.
    pub const fn raw_max(self) -> u16 {
        self.raw_max
    }

    /// Half of the raw value range.
    pub fn midpoint(self) -> f32 {
        (f32::from(self.raw_max) + 1.0) / 2.0
    }

    /// Rescale a raw reading with `(raw - midpoint) / midpoint`.
    ///
    /// Readings above `raw_max` are clamped first.
    pub fn normalize(self, raw: u16) -> Sample {
        let mid = self.midpoint();
        let raw = f32::from(raw.min(self.raw_max));
        Sample::new((raw - mid) / mid)
    }
}

impl Default for RawScale {
    fn default() -> Self {
        Self::TWELVE_BIT
    }
}
