//! Per-frame rotation of the model group about the vertical axis.

use serde::Serialize;
use shared::{clamp_to, ANIMATION_SPEED_RANGE};

use crate::state::scene::Group;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackState {
    #[default]
    Playing,
    Paused,
}

/// Spins the group by `dt * speed` radians per frame while playing
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimationDriver {
    state: PlaybackState,
    speed: f32,
}

impl Default for AnimationDriver {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl AnimationDriver {
    pub fn new(speed: f32) -> Self {
        Self {
            state: PlaybackState::Playing,
            speed: clamp_to(speed, &ANIMATION_SPEED_RANGE),
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }

    /// Radians per second
    pub fn speed(&self) -> f32 {
        self.speed
    }

    pub fn set_speed(&mut self, speed: f32) {
        self.speed = clamp_to(speed, &ANIMATION_SPEED_RANGE);
    }

    pub fn play(&mut self) {
        self.state = PlaybackState::Playing;
    }

    pub fn pause(&mut self) {
        self.state = PlaybackState::Paused;
    }

    pub fn toggle(&mut self) -> PlaybackState {
        self.state = match self.state {
            PlaybackState::Playing => PlaybackState::Paused,
            PlaybackState::Paused => PlaybackState::Playing,
        };
        self.state
    }

    /// Advance by one frame; returns the applied rotation delta.
    /// Negative or non-finite `dt` is ignored.
    pub fn advance(&self, group: &mut Group, dt: f64) -> f64 {
        if self.state == PlaybackState::Paused || !dt.is_finite() || dt <= 0.0 {
            return 0.0;
        }
        let delta = dt * self.speed as f64;
        group.rotation_y += delta;
        delta
    }

    /// Zero the group's orientation; playback state is unchanged
    pub fn reset_rotation(&self, group: &mut Group) {
        group.rotation_y = 0.0;
    }
}
