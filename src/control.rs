// Pixel density + camera facing: the only state the user can change at runtime.

use crate::error::ConfigError;
use crate::types::FacingMode;

/// Ordered set of allowed block sizes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScaleLadder {
    values: Vec<u32>, // sorted, deduplicated, never empty, never 0
}

impl ScaleLadder {
    pub fn new(values: impl IntoIterator<Item = u32>) -> Result<Self, ConfigError> {
        let mut values: Vec<u32> = values.into_iter().collect();
        if values.is_empty() {
            return Err(ConfigError::Invalid("dither.scales must not be empty".into()));
        }
        if values.contains(&0) {
            return Err(ConfigError::Invalid("dither.scales must be positive".into()));
        }
        values.sort_unstable();
        values.dedup();
        Ok(Self { values })
    }

    pub fn values(&self) -> &[u32] {
        &self.values
    }

    pub fn min(&self) -> u32 {
        self.values[0]
    }

    pub fn max(&self) -> u32 {
        self.values[self.values.len() - 1]
    }

    /// Closest allowed value; ties resolve to the smaller one.
    pub fn nearest(&self, v: u32) -> u32 {
        self.values
            .iter()
            .copied()
            .min_by_key(|a| a.abs_diff(v))
            .unwrap_or(self.values[0])
    }

    /// Next value above `current`, or `current` at the ceiling.
    pub fn step_up(&self, current: u32) -> u32 {
        self.values.iter().copied().find(|v| *v > current).unwrap_or(current)
    }

    /// Next value below `current`, or `current` at the floor.
    pub fn step_down(&self, current: u32) -> u32 {
        self.values.iter().rev().copied().find(|v| *v < current).unwrap_or(current)
    }
}

impl Default for ScaleLadder {
    /// 4..=16 in steps of one.
    fn default() -> Self {
        Self { values: (4..=16).collect() }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transition {
    IncreaseScale,
    DecreaseScale,
    ToggleFacing,
}

/// Side effects the frame loop has to carry out after a transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Intent {
    ScaleChanged(u32),
    /// The video source must reopen with this facing mode.
    RestartVideo(FacingMode),
}

/// Snapshot read by the frame loop once per tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ControlState {
    pub scale: u32,
    pub facing: FacingMode,
}

/// Owns the control state and gates every change through the ladder.
#[derive(Clone, Debug)]
pub struct Controls {
    ladder: ScaleLadder,
    state: ControlState,
}

impl Controls {
    pub fn new(ladder: ScaleLadder, initial_scale: u32, facing: FacingMode) -> Self {
        let scale = ladder.nearest(initial_scale);
        Self { ladder, state: ControlState { scale, facing } }
    }

    pub fn state(&self) -> ControlState {
        self.state
    }

    pub fn ladder(&self) -> &ScaleLadder {
        &self.ladder
    }

    pub fn apply(&mut self, transition: Transition) -> Option<Intent> {
        match transition {
            Transition::IncreaseScale => self.set_scale(self.ladder.step_up(self.state.scale)),
            Transition::DecreaseScale => self.set_scale(self.ladder.step_down(self.state.scale)),
            Transition::ToggleFacing => {
                self.state.facing = self.state.facing.flipped();
                Some(Intent::RestartVideo(self.state.facing))
            }
        }
    }

    fn set_scale(&mut self, scale: u32) -> Option<Intent> {
        if scale == self.state.scale {
            return None;
        }
        self.state.scale = scale;
        Some(Intent::ScaleChanged(scale))
    }
}

impl Default for Controls {
    fn default() -> Self {
        Self::new(ScaleLadder::default(), 8, FacingMode::Environment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ladder(values: &[u32]) -> ScaleLadder {
        ScaleLadder::new(values.iter().copied()).unwrap()
    }

    #[test]
    fn ladder_rejects_empty_and_zero() {
        assert!(ScaleLadder::new(Vec::new()).is_err());
        assert!(ScaleLadder::new([0, 4]).is_err());
    }

    #[test]
    fn ladder_sorts_and_dedups() {
        assert_eq!(ladder(&[16, 4, 8, 4]).values(), &[4, 8, 16]);
    }

    #[test]
    fn nearest_clamps_into_ladder() {
        let l = ladder(&[2, 4, 8, 16, 32, 64]);
        assert_eq!(l.nearest(0), 2);
        assert_eq!(l.nearest(1000), 64);
        assert_eq!(l.nearest(7), 8);
        assert_eq!(l.nearest(6), 4); // tie goes low
        assert_eq!(l.nearest(16), 16);
    }

    #[test]
    fn increase_at_ceiling_is_a_no_op() {
        let mut c = Controls::new(ladder(&[4, 8, 16]), 16, FacingMode::Environment);
        for _ in 0..5 {
            assert_eq!(c.apply(Transition::IncreaseScale), None);
            assert_eq!(c.state().scale, 16);
        }
    }

    #[test]
    fn decrease_at_floor_is_a_no_op() {
        let mut c = Controls::new(ladder(&[4, 8, 16]), 4, FacingMode::Environment);
        for _ in 0..5 {
            assert_eq!(c.apply(Transition::DecreaseScale), None);
            assert_eq!(c.state().scale, 4);
        }
    }

    #[test]
    fn steps_walk_the_ladder() {
        let mut c = Controls::new(ladder(&[2, 4, 8, 16, 32, 64]), 8, FacingMode::User);
        assert_eq!(c.apply(Transition::IncreaseScale), Some(Intent::ScaleChanged(16)));
        assert_eq!(c.apply(Transition::DecreaseScale), Some(Intent::ScaleChanged(8)));
        assert_eq!(c.apply(Transition::DecreaseScale), Some(Intent::ScaleChanged(4)));
        assert_eq!(c.state().scale, 4);
    }

    #[test]
    fn initial_scale_snaps_to_ladder() {
        let c = Controls::new(ladder(&[4, 8, 16]), 11, FacingMode::Environment);
        assert_eq!(c.state().scale, 8);
    }

    #[test]
    fn toggle_facing_requests_restart() {
        let mut c = Controls::default();
        assert_eq!(
            c.apply(Transition::ToggleFacing),
            Some(Intent::RestartVideo(FacingMode::User))
        );
        assert_eq!(
            c.apply(Transition::ToggleFacing),
            Some(Intent::RestartVideo(FacingMode::Environment))
        );
        assert_eq!(c.state().scale, 8);
    }
}
