/// Which of the two loop markers a gesture or command refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    A,
    B,
}

/// The A/B range in seconds.
///
/// No ordering is enforced between the two bounds; an inverted pair is the
/// documented "no loop" state, not an error.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AbRange {
    pub a: f64,
    pub b: f64,
}

impl AbRange {
    /// Looping is active exactly when `a < b`, however the pair was reached.
    pub fn loop_active(&self) -> bool {
        self.a < self.b
    }
}

/// Holds the A/B range and the duration of the loaded asset.
///
/// All writes clamp to `[0, duration]`. The duration is set once per asset
/// when the waveform decode reports ready and resets the range to full-track.
#[derive(Debug, Clone)]
pub struct MarkerModel {
    a: f64,
    b: f64,
    duration: f64,
}

impl MarkerModel {
    pub fn new() -> Self {
        Self {
            a: 0.0,
            b: 0.0,
            duration: 0.0,
        }
    }

    /// Install the duration of a newly decoded asset and reset to full range.
    pub fn set_duration(&mut self, duration: f64) {
        self.duration = duration.max(0.0);
        self.clear();
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn set_a(&mut self, t: f64) {
        self.a = t.clamp(0.0, self.duration);
    }

    pub fn set_b(&mut self, t: f64) {
        self.b = t.clamp(0.0, self.duration);
    }

    pub fn set(&mut self, marker: Marker, t: f64) {
        match marker {
            Marker::A => self.set_a(t),
            Marker::B => self.set_b(t),
        }
    }

    /// Reset to the full track: `{0, duration}`.
    pub fn clear(&mut self) {
        self.a = 0.0;
        self.b = self.duration;
    }

    pub fn range(&self) -> AbRange {
        AbRange {
            a: self.a,
            b: self.b,
        }
    }
}

impl Default for MarkerModel {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_markers_clamp_to_duration() {
        let mut model = MarkerModel::new();
        model.set_duration(60.0);

        model.set_a(-5.0);
        assert_eq!(model.range().a, 0.0);
        model.set_a(70.0);
        assert_eq!(model.range().a, 60.0);
        model.set_b(-1.0);
        assert_eq!(model.range().b, 0.0);
        model.set_b(61.5);
        assert_eq!(model.range().b, 60.0);

        model.set_a(10.0);
        model.set_b(20.0);
        assert_eq!(model.range(), AbRange { a: 10.0, b: 20.0 });
    }

    #[test]
    fn test_loop_active_iff_a_before_b() {
        let mut model = MarkerModel::new();
        model.set_duration(60.0);

        model.set_a(10.0);
        model.set_b(20.0);
        assert!(model.range().loop_active());

        // Inverted pair disables looping without erroring.
        model.set_a(30.0);
        assert!(!model.range().loop_active());

        // Equal bounds are not a loop.
        model.set_a(20.0);
        assert!(!model.range().loop_active());
    }

    #[test]
    fn test_clear_resets_to_full_range() {
        let mut model = MarkerModel::new();
        model.set_duration(60.0);
        model.set_a(10.0);
        model.set_b(20.0);

        model.clear();
        assert_eq!(model.range(), AbRange { a: 0.0, b: 60.0 });
        // The full range still counts as an active loop.
        assert!(model.range().loop_active());
    }

    #[test]
    fn test_no_asset_clamps_everything_to_zero() {
        let mut model = MarkerModel::new();
        model.set_a(12.0);
        model.set_b(7.0);
        assert_eq!(model.range(), AbRange { a: 0.0, b: 0.0 });
        assert!(!model.range().loop_active());
    }

    #[test]
    fn test_new_duration_resets_range() {
        let mut model = MarkerModel::new();
        model.set_duration(60.0);
        model.set_a(10.0);
        model.set_b(20.0);

        model.set_duration(30.0);
        assert_eq!(model.range(), AbRange { a: 0.0, b: 30.0 });
    }
}
