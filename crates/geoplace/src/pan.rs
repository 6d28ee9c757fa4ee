//! Keyboard panning driven by animation frames.

use std::collections::BTreeSet;

/// Frame time the step size is tuned for, in milliseconds.
const REFERENCE_FRAME_MS: f64 = 16.7;
/// Longest frame delta applied in one tick, in milliseconds.
const MAX_FRAME_MS: f64 = 32.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PanDirection {
    Up,
    Down,
    Left,
    Right,
}

impl PanDirection {
    /// Map a logical key name (arrow keys or WASD, any case).
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "ArrowUp" | "w" | "W" => Some(Self::Up),
            "ArrowDown" | "s" | "S" => Some(Self::Down),
            "ArrowLeft" | "a" | "A" => Some(Self::Left),
            "ArrowRight" | "d" | "D" => Some(Self::Right),
            _ => None,
        }
    }
}

/// Degrees moved per reference frame at a zoom level.
pub fn pan_step_degrees(zoom: f64) -> f64 {
    0.0025 * 0.6f64.powf((zoom - 12.0).max(0.0))
}

/// Camera offset produced by one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PanStep {
    pub delta_lat: f64,
    pub delta_lng: f64,
}

/// Held pan keys and the state of the frame loop.
///
/// At most one animation frame is outstanding: [`KeyboardPan::key_down`]
/// reports when a new one must be requested and [`KeyboardPan::tick`] keeps
/// the loop going while keys are held.
#[derive(Debug, Clone, Default)]
pub struct KeyboardPan {
    held: BTreeSet<PanDirection>,
    frame_requested: bool,
    last_timestamp: Option<f64>,
}

impl KeyboardPan {
    pub fn is_active(&self) -> bool {
        self.frame_requested
    }

    pub fn held(&self) -> impl Iterator<Item = PanDirection> + '_ {
        self.held.iter().copied()
    }

    /// Returns `true` when the caller must request an animation frame.
    pub fn key_down(&mut self, direction: PanDirection) -> bool {
        self.held.insert(direction);
        if self.frame_requested {
            return false;
        }
        self.frame_requested = true;
        true
    }

    pub fn key_up(&mut self, direction: PanDirection) {
        self.held.remove(&direction);
        if self.held.is_empty() {
            self.stop();
        }
    }

    /// Drop every held key, for example when the window loses focus.
    pub fn clear(&mut self) {
        self.held.clear();
        self.stop();
    }

    /// Advance the loop for an animation frame at `timestamp` milliseconds.
    ///
    /// Returns the offset to apply, in which case another frame must be
    /// requested, or `None` once the loop has stopped. The first frame of a
    /// gesture moves by zero.
    pub fn tick(&mut self, timestamp: f64, zoom: f64) -> Option<PanStep> {
        if !self.frame_requested {
            return None;
        }
        if self.held.is_empty() {
            self.stop();
            return None;
        }

        let last = self.last_timestamp.unwrap_or(timestamp);
        let dt = (timestamp - last).clamp(0.0, MAX_FRAME_MS);
        self.last_timestamp = Some(timestamp);

        let step = pan_step_degrees(zoom) * dt / REFERENCE_FRAME_MS;
        let mut delta = PanStep::default();
        for direction in &self.held {
            match direction {
                PanDirection::Up => delta.delta_lat += step,
                PanDirection::Down => delta.delta_lat -= step,
                PanDirection::Left => delta.delta_lng -= step,
                PanDirection::Right => delta.delta_lng += step,
            }
        }
        Some(delta)
    }

    fn stop(&mut self) {
        self.frame_requested = false;
        self.last_timestamp = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_mapping() {
        assert_eq!(PanDirection::from_key("ArrowUp"), Some(PanDirection::Up));
        assert_eq!(PanDirection::from_key("W"), Some(PanDirection::Up));
        assert_eq!(PanDirection::from_key("a"), Some(PanDirection::Left));
        assert_eq!(PanDirection::from_key("ArrowDown"), Some(PanDirection::Down));
        assert_eq!(PanDirection::from_key("d"), Some(PanDirection::Right));
        assert_eq!(PanDirection::from_key("q"), None);
        assert_eq!(PanDirection::from_key("Enter"), None);
    }

    #[test]
    fn test_step_size_by_zoom() {
        assert!((pan_step_degrees(10.0) - 0.0025).abs() < 1e-12);
        assert!((pan_step_degrees(12.0) - 0.0025).abs() < 1e-12);
        assert!((pan_step_degrees(13.0) - 0.0015).abs() < 1e-12);
        assert!((pan_step_degrees(14.0) - 0.0009).abs() < 1e-12);
    }

    #[test]
    fn test_single_frame_request() {
        let mut pan = KeyboardPan::default();
        assert!(pan.key_down(PanDirection::Up));
        assert!(!pan.key_down(PanDirection::Left));
        assert!(!pan.key_down(PanDirection::Up));
        assert!(pan.is_active());
    }

    #[test]
    fn test_first_frame_moves_by_zero() {
        let mut pan = KeyboardPan::default();
        pan.key_down(PanDirection::Up);
        assert_eq!(pan.tick(1000.0, 12.0), Some(PanStep::default()));

        let step = pan.tick(1016.7, 12.0).unwrap();
        assert!((step.delta_lat - 0.0025).abs() < 1e-9);
        assert!(step.delta_lng.abs() < f64::EPSILON);
    }

    #[test]
    fn test_frame_delta_is_capped() {
        let mut pan = KeyboardPan::default();
        pan.key_down(PanDirection::Right);
        pan.tick(0.0, 12.0);
        let step = pan.tick(500.0, 12.0).unwrap();
        assert!((step.delta_lng - 0.0025 * 32.0 / 16.7).abs() < 1e-9);
    }

    #[test]
    fn test_opposite_keys_cancel() {
        let mut pan = KeyboardPan::default();
        pan.key_down(PanDirection::Left);
        pan.key_down(PanDirection::Right);
        pan.key_down(PanDirection::Down);
        pan.tick(0.0, 12.0);
        let step = pan.tick(10.0, 12.0).unwrap();
        assert!(step.delta_lng.abs() < 1e-12);
        assert!(step.delta_lat < 0.0);
    }

    #[test]
    fn test_release_stops_loop() {
        let mut pan = KeyboardPan::default();
        pan.key_down(PanDirection::Up);
        pan.key_down(PanDirection::Left);
        pan.key_up(PanDirection::Up);
        assert!(pan.is_active());
        pan.key_up(PanDirection::Left);
        assert!(!pan.is_active());
        assert_eq!(pan.tick(100.0, 12.0), None);

        // A new press restarts with a zero first step.
        assert!(pan.key_down(PanDirection::Down));
        assert_eq!(pan.tick(200.0, 12.0), Some(PanStep::default()));
    }

    #[test]
    fn test_clear_on_blur() {
        let mut pan = KeyboardPan::default();
        pan.key_down(PanDirection::Up);
        pan.clear();
        assert!(!pan.is_active());
        assert_eq!(pan.held().count(), 0);
        assert_eq!(pan.tick(16.0, 12.0), None);
    }
}
