//! Directional montages
//!
//! The action controller only needs a montage's duration to schedule completion; the
//! player records what is playing so presentation layers and tests can observe it.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tether_core::DetailedDirection;
use tracing::{debug, warn};

/// A one-shot animation clip
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Montage {
    pub name: String,
    /// Length in seconds
    pub duration: f32,
}

/// Octant-to-montage map for one action
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MontageSet {
    entries: HashMap<DetailedDirection, Montage>,
}

impl MontageSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// One montage per octant, named `<prefix>_<Direction>`
    pub fn uniform(prefix: &str, duration: f32) -> Self {
        let mut set = Self::new();
        for direction in DetailedDirection::ALL {
            set.insert(
                direction,
                Montage {
                    name: format!("{prefix}_{direction:?}"),
                    duration,
                },
            );
        }
        set
    }

    pub fn insert(&mut self, direction: DetailedDirection, montage: Montage) {
        self.entries.insert(direction, montage);
    }

    pub fn remove(&mut self, direction: DetailedDirection) -> Option<Montage> {
        self.entries.remove(&direction)
    }

    pub fn get(&self, direction: DetailedDirection) -> Option<&Montage> {
        self.entries.get(&direction)
    }

    pub fn duration(&self, direction: DetailedDirection) -> Option<f32> {
        self.get(direction).map(|montage| montage.duration)
    }
}

/// Animation playback as seen by the gameplay layer
pub trait AnimationPlayback {
    /// Start the montage mapped to `direction`, returning its duration
    fn play_montage(&mut self, set: &MontageSet, direction: DetailedDirection) -> Option<f32>;

    fn is_montage_playing(&self) -> bool;
}

/// Minimal montage player that tracks the active clip
#[derive(Debug, Default)]
pub struct MontagePlayer {
    current: Option<String>,
    remaining: f32,
}

impl MontagePlayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Name of the montage currently playing
    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn advance(&mut self, dt: f32) {
        if self.current.is_none() {
            return;
        }
        self.remaining -= dt;
        if self.remaining <= 0.0 {
            if let Some(name) = self.current.take() {
                debug!("Montage {} finished", name);
            }
        }
    }
}

impl AnimationPlayback for MontagePlayer {
    fn play_montage(&mut self, set: &MontageSet, direction: DetailedDirection) -> Option<f32> {
        let Some(montage) = set.get(direction) else {
            warn!("No montage mapped for {:?}", direction);
            return None;
        };
        self.current = Some(montage.name.clone());
        self.remaining = montage.duration;
        Some(montage.duration)
    }

    fn is_montage_playing(&self) -> bool {
        self.current.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_set_covers_every_octant() {
        let set = MontageSet::uniform("Dodge", 0.6);
        for direction in DetailedDirection::ALL {
            assert_eq!(set.duration(direction), Some(0.6));
        }
        assert_eq!(
            set.get(DetailedDirection::BackwardLeft).map(|m| m.name.as_str()),
            Some("Dodge_BackwardLeft")
        );
    }

    #[test]
    fn test_player_tracks_active_montage() {
        let set = MontageSet::uniform("Roll", 0.5);
        let mut player = MontagePlayer::new();
        assert_eq!(player.play_montage(&set, DetailedDirection::Left), Some(0.5));
        assert_eq!(player.current(), Some("Roll_Left"));

        player.advance(0.25);
        assert!(player.is_montage_playing());
        player.advance(0.3);
        assert!(!player.is_montage_playing());
    }

    #[test]
    fn test_missing_montage_is_reported() {
        let mut set = MontageSet::uniform("Roll", 0.5);
        set.remove(DetailedDirection::Right);
        let mut player = MontagePlayer::new();
        assert_eq!(player.play_montage(&set, DetailedDirection::Right), None);
        assert!(!player.is_montage_playing());
    }
}
