use std::ops::Range;

/// How activity sums are rounded after dividing for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rounding {
    Nearest,
    Unrounded,
}

/// Display conversion for the gender radar: `raw / divisor`, optionally
/// rounded, shown with a magnitude suffix ("k" for thousands).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActivityScale {
    pub divisor: f64,
    pub rounding: Rounding,
}

impl Default for ActivityScale {
    fn default() -> Self {
        ActivityScale {
            divisor: 1000.0,
            rounding: Rounding::Nearest,
        }
    }
}

impl ActivityScale {
    pub fn apply(&self, raw: f64) -> f64 {
        let divisor = if self.divisor > 0.0 { self.divisor } else { 1.0 };
        let value = raw / divisor;
        match self.rounding {
            Rounding::Nearest => value.round(),
            Rounding::Unrounded => value,
        }
    }

    pub fn suffix(&self) -> &'static str {
        if self.divisor >= 1_000_000.0 {
            "M"
        } else if self.divisor >= 1000.0 {
            "k"
        } else {
            ""
        }
    }

    /// Label text, e.g. `"12k"` or `"12.4k"` when unrounded.
    pub fn format(&self, raw: f64) -> String {
        self.format_scaled(self.apply(raw))
    }

    /// Label text for a value already converted with `apply`.
    pub fn format_scaled(&self, value: f64) -> String {
        match self.rounding {
            Rounding::Nearest => format!("{:.0}{}", value, self.suffix()),
            Rounding::Unrounded => format!("{:.1}{}", value, self.suffix()),
        }
    }
}

/// Clamped linear bubble radius: `min(count / divisor + min_radius, max_radius)`.
///
/// Radius, not area, grows linearly with the count.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BubbleScale {
    pub divisor: f64,
    pub min_radius: f64,
    pub max_radius: f64,
}

impl Default for BubbleScale {
    fn default() -> Self {
        BubbleScale::new(10.0, 4.0, 30.0)
    }
}

impl BubbleScale {
    pub fn new(divisor: f64, min_radius: f64, max_radius: f64) -> Self {
        BubbleScale {
            divisor,
            min_radius,
            max_radius,
        }
    }

    pub fn radius(&self, count: u64) -> f64 {
        let divisor = if self.divisor > 0.0 { self.divisor } else { 1.0 };
        (count as f64 / divisor + self.min_radius).min(self.max_radius)
    }
}

/// YlOrRd ramp stops, light to dark.
const YL_OR_RD: [(u8, u8, u8); 9] = [
    (0xff, 0xff, 0xcc),
    (0xff, 0xed, 0xa0),
    (0xfe, 0xd9, 0x76),
    (0xfe, 0xb2, 0x4c),
    (0xfd, 0x8d, 0x3c),
    (0xfc, 0x4e, 0x2a),
    (0xe3, 0x1a, 0x1c),
    (0xbd, 0x00, 0x26),
    (0x80, 0x00, 0x26),
];

/// Sequential color scale over `[0, max]` for the choropleth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequentialScale {
    pub max: u64,
}

impl SequentialScale {
    pub fn new(max: u64) -> Self {
        SequentialScale { max }
    }

    /// Interpolated ramp color for `count`, always defined.
    pub fn rgb(&self, count: u64) -> (u8, u8, u8) {
        let t = if self.max == 0 {
            0.0
        } else {
            (count as f64 / self.max as f64).clamp(0.0, 1.0)
        };
        let position = t * (YL_OR_RD.len() - 1) as f64;
        let lower = position.floor() as usize;
        let upper = (lower + 1).min(YL_OR_RD.len() - 1);
        let frac = position - lower as f64;
        let lerp = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * frac).round() as u8;
        let (a, b) = (YL_OR_RD[lower], YL_OR_RD[upper]);
        (lerp(a.0, b.0), lerp(a.1, b.1), lerp(a.2, b.2))
    }

    /// Fill for a region, `None` when it has no entries.
    pub fn fill(&self, count: u64) -> Option<String> {
        if count == 0 {
            return None;
        }
        let (r, g, b) = self.rgb(count);
        Some(format!("#{:02x}{:02x}{:02x}", r, g, b))
    }
}

/// Value axis for bar and radar charts: always includes zero.
pub fn value_axis(values: &[f64]) -> Range<f64> {
    let max = values.iter().copied().fold(0.0, f64::max);
    let min = values.iter().copied().fold(0.0, f64::min);
    let (lo, hi) = pad_range(min, max);
    // Padding never pushes a non-negative axis below zero
    let lo = if min >= 0.0 { 0.0 } else { lo };
    lo..hi
}

fn pad_range(min: f64, max: f64) -> (f64, f64) {
    if min == max {
        (min - 1.0, max + 1.0)
    } else {
        let padding = (max - min) * 0.05;
        (min - padding, max + padding)
    }
}
