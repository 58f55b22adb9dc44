// Turns raw pointer/keyboard events into semantic gestures.
// The classifier keeps only the state a gesture needs (where the current touch
// started, the swipe reference point, the last tap). It never touches the
// control state; callers map each `Gesture` to a `Transition`.

use std::time::{Duration, Instant};

use crate::control::Transition;

/// Keys the host layer forwards. Everything else is dropped before it gets here.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyName {
    ArrowUp,
    ArrowDown,
    W,
    S,
    K,
    J,
    F,
}

/// Pointer coordinates are optional: hosts report what they have, and events
/// missing a coordinate are ignored.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum RawInput {
    TouchStart { x: Option<f32>, y: Option<f32>, at: Instant },
    TouchMove { x: Option<f32>, y: Option<f32>, at: Instant },
    TouchEnd { x: Option<f32>, y: Option<f32>, at: Instant },
    Key { key: KeyName, at: Instant },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Gesture {
    SwipeUp,
    SwipeDown,
    DoubleTap,
    KeyUp,
    KeyDown,
    KeyFlip,
}

impl Gesture {
    pub fn transition(self) -> Transition {
        match self {
            Gesture::SwipeUp | Gesture::KeyUp => Transition::IncreaseScale,
            Gesture::SwipeDown | Gesture::KeyDown => Transition::DecreaseScale,
            Gesture::DoubleTap | Gesture::KeyFlip => Transition::ToggleFacing,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GestureSettings {
    /// Vertical travel (px) needed for one scale step
    pub swipe_threshold: f32,
    /// Max start→end distance (px) for a touch to count as a tap
    pub tap_slop: f32,
    /// Max time between the two taps of a double-tap
    pub double_tap_window: Duration,
}

impl Default for GestureSettings {
    fn default() -> Self {
        Self {
            swipe_threshold: 50.0,
            tap_slop: 10.0,
            double_tap_window: Duration::from_millis(300),
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct Touch {
    start: (f32, f32),
    last: (f32, f32),
    reference_y: f32,
    swiped: bool,
}

#[derive(Debug, Default)]
pub struct GestureClassifier {
    settings: GestureSettings,
    touch: Option<Touch>,
    pending_tap: Option<Instant>,
}

impl GestureClassifier {
    pub fn new(settings: GestureSettings) -> Self {
        Self { settings, touch: None, pending_tap: None }
    }

    pub fn classify(&mut self, input: &RawInput) -> Option<Gesture> {
        match *input {
            RawInput::Key { key, .. } => classify_key(key),
            RawInput::TouchStart { x: Some(x), y: Some(y), .. } => {
                self.touch = Some(Touch {
                    start: (x, y),
                    last: (x, y),
                    reference_y: y,
                    swiped: false,
                });
                None
            }
            RawInput::TouchMove { x: Some(x), y: Some(y), .. } => {
                let touch = self.touch.as_mut()?;
                touch.last = (x, y);
                let dy = touch.reference_y - y;
                if dy.abs() < self.settings.swipe_threshold {
                    return None;
                }
                // Continuous swipe: the next step is measured from here.
                touch.reference_y = y;
                touch.swiped = true;
                Some(if dy > 0.0 { Gesture::SwipeUp } else { Gesture::SwipeDown })
            }
            RawInput::TouchEnd { x, y, at } => {
                let touch = self.touch.take()?;
                let end = (x.unwrap_or(touch.last.0), y.unwrap_or(touch.last.1));
                let travel = (end.0 - touch.start.0).hypot(end.1 - touch.start.1);
                if touch.swiped || travel > self.settings.tap_slop {
                    return None;
                }
                self.register_tap(at)
            }
            // start/move without coordinates
            _ => None,
        }
    }

    fn register_tap(&mut self, at: Instant) -> Option<Gesture> {
        match self.pending_tap {
            Some(prev) if at.saturating_duration_since(prev) <= self.settings.double_tap_window => {
                self.pending_tap = None;
                Some(Gesture::DoubleTap)
            }
            _ => {
                self.pending_tap = Some(at);
                None
            }
        }
    }
}

fn classify_key(key: KeyName) -> Option<Gesture> {
    Some(match key {
        KeyName::ArrowUp | KeyName::W | KeyName::K => Gesture::KeyUp,
        KeyName::ArrowDown | KeyName::S | KeyName::J => Gesture::KeyDown,
        KeyName::F => Gesture::KeyFlip,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::{Controls, ScaleLadder};
    use crate::types::FacingMode;

    fn start(x: f32, y: f32, at: Instant) -> RawInput {
        RawInput::TouchStart { x: Some(x), y: Some(y), at }
    }

    fn moved(x: f32, y: f32, at: Instant) -> RawInput {
        RawInput::TouchMove { x: Some(x), y: Some(y), at }
    }

    fn end(x: f32, y: f32, at: Instant) -> RawInput {
        RawInput::TouchEnd { x: Some(x), y: Some(y), at }
    }

    fn tap(c: &mut GestureClassifier, at: Instant) -> Option<Gesture> {
        assert_eq!(c.classify(&start(50.0, 50.0, at)), None);
        c.classify(&end(51.0, 50.0, at + Duration::from_millis(40)))
    }

    #[test]
    fn sixty_px_upward_swipe_raises_scale_once() {
        let settings = GestureSettings { swipe_threshold: 30.0, ..GestureSettings::default() };
        let mut classifier = GestureClassifier::new(settings);
        let mut controls =
            Controls::new(ScaleLadder::new([4, 8, 16]).unwrap(), 8, FacingMode::Environment);
        let t = Instant::now();

        for input in [start(100.0, 200.0, t), moved(100.0, 140.0, t), end(100.0, 140.0, t)] {
            if let Some(g) = classifier.classify(&input) {
                controls.apply(g.transition());
            }
        }
        assert_eq!(controls.state().scale, 16);
    }

    #[test]
    fn swipe_below_threshold_does_nothing() {
        let mut c = GestureClassifier::default();
        let t = Instant::now();
        c.classify(&start(0.0, 100.0, t));
        assert_eq!(c.classify(&moved(0.0, 60.0, t)), None);
    }

    #[test]
    fn continuous_swipe_steps_repeatedly() {
        let mut c = GestureClassifier::new(GestureSettings {
            swipe_threshold: 30.0,
            ..GestureSettings::default()
        });
        let t = Instant::now();
        c.classify(&start(0.0, 300.0, t));
        assert_eq!(c.classify(&moved(0.0, 265.0, t)), Some(Gesture::SwipeUp));
        assert_eq!(c.classify(&moved(0.0, 250.0, t)), None);
        assert_eq!(c.classify(&moved(0.0, 230.0, t)), Some(Gesture::SwipeUp));
        assert_eq!(c.classify(&moved(0.0, 290.0, t)), Some(Gesture::SwipeDown));
        // a swipe is never also a tap
        assert_eq!(c.classify(&end(0.0, 300.0, t)), None);
    }

    #[test]
    fn double_tap_inside_window_toggles_once() {
        let mut c = GestureClassifier::default();
        let t = Instant::now();
        assert_eq!(tap(&mut c, t), None);
        assert_eq!(tap(&mut c, t + Duration::from_millis(150)), Some(Gesture::DoubleTap));
        // third tap starts a fresh pair
        assert_eq!(tap(&mut c, t + Duration::from_millis(300)), None);
    }

    #[test]
    fn taps_outside_window_do_not_toggle() {
        let mut c = GestureClassifier::default();
        let t = Instant::now();
        assert_eq!(tap(&mut c, t), None);
        assert_eq!(tap(&mut c, t + Duration::from_millis(900)), None);
        // the late tap became the new pending tap
        assert_eq!(tap(&mut c, t + Duration::from_millis(1000)), Some(Gesture::DoubleTap));
    }

    #[test]
    fn long_drag_is_not_a_tap() {
        let mut c = GestureClassifier::default();
        let t = Instant::now();
        c.classify(&start(0.0, 0.0, t));
        assert_eq!(c.classify(&end(40.0, 0.0, t)), None);
        assert_eq!(tap(&mut c, t + Duration::from_millis(100)), None);
    }

    #[test]
    fn touch_end_without_coordinates_uses_last_position() {
        let mut c = GestureClassifier::default();
        let t = Instant::now();
        for at in [t, t + Duration::from_millis(100)] {
            c.classify(&start(10.0, 10.0, at));
            let out = c.classify(&RawInput::TouchEnd { x: None, y: None, at });
            if at > t {
                assert_eq!(out, Some(Gesture::DoubleTap));
            }
        }
    }

    #[test]
    fn malformed_input_is_ignored() {
        let mut c = GestureClassifier::default();
        let t = Instant::now();
        assert_eq!(c.classify(&RawInput::TouchStart { x: None, y: Some(1.0), at: t }), None);
        assert_eq!(c.classify(&moved(0.0, 500.0, t)), None);
        assert_eq!(c.classify(&RawInput::TouchMove { x: Some(1.0), y: None, at: t }), None);
        assert_eq!(c.classify(&end(0.0, 0.0, t)), None);
    }

    #[test]
    fn keys_map_to_transitions() {
        let mut c = GestureClassifier::default();
        let t = Instant::now();
        let key = |k| RawInput::Key { key: k, at: t };
        assert_eq!(c.classify(&key(KeyName::ArrowUp)), Some(Gesture::KeyUp));
        assert_eq!(c.classify(&key(KeyName::W)), Some(Gesture::KeyUp));
        assert_eq!(c.classify(&key(KeyName::J)), Some(Gesture::KeyDown));
        assert_eq!(c.classify(&key(KeyName::F)), Some(Gesture::KeyFlip));
        assert_eq!(Gesture::KeyFlip.transition(), Transition::ToggleFacing);
        assert_eq!(Gesture::SwipeDown.transition(), Transition::DecreaseScale);
    }
}
