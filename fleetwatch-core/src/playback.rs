//! Vessel playback state machine.
//!
//! Each tick moves the playback index one point along the actual track.
//! Once the actual track is exhausted, each predicted track is revealed one
//! point per tick. Playback stops by itself when everything is shown.

use serde::Serialize;

use crate::geo::GeoPoint;
use crate::tracks::TrackSet;

/// Playback state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    #[default]
    Stopped,
    Playing,
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaybackState::Stopped => write!(f, "stopped"),
            PlaybackState::Playing => write!(f, "playing"),
        }
    }
}

/// Why a start command did nothing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartRejected {
    /// No vessel with that id
    UnknownVessel,
    /// No recorded positions to play
    NoTrack,
    AlreadyPlaying,
    /// Everything has been shown; reset first
    Finished,
}

impl std::fmt::Display for StartRejected {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StartRejected::UnknownVessel => write!(f, "unknown vessel"),
            StartRejected::NoTrack => write!(f, "vessel has no recorded track"),
            StartRejected::AlreadyPlaying => write!(f, "already playing"),
            StartRejected::Finished => write!(f, "playback finished, reset first"),
        }
    }
}

/// Playback position of one vessel
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Playback {
    state: PlaybackState,
    /// Index into the actual track
    index: usize,
    /// Revealed point count per predicted track
    revealed: Vec<usize>,
    /// At least one tick has run since the last reset
    stepped: bool,
}

impl Playback {
    pub fn new(tracks: &TrackSet) -> Self {
        Playback {
            state: PlaybackState::Stopped,
            index: 0,
            revealed: vec![0; tracks.predicted.len()],
            stepped: false,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// False until the first tick after creation or reset
    pub fn has_stepped(&self) -> bool {
        self.stepped
    }

    pub fn revealed(&self) -> &[usize] {
        &self.revealed
    }

    /// Current position on the actual track
    pub fn position(&self, tracks: &TrackSet) -> Option<GeoPoint> {
        tracks.actual.get(self.index).copied()
    }

    /// Actual track at its last point and every predicted track fully shown
    pub fn is_finished(&self, tracks: &TrackSet) -> bool {
        self.index + 1 >= tracks.actual.len()
            && self
                .revealed
                .iter()
                .zip(&tracks.predicted)
                .all(|(shown, track)| *shown >= track.len())
    }

    pub fn start(&mut self, tracks: &TrackSet) -> Result<(), StartRejected> {
        if tracks.actual.is_empty() {
            return Err(StartRejected::NoTrack);
        }
        if self.is_playing() {
            return Err(StartRejected::AlreadyPlaying);
        }
        if self.is_finished(tracks) {
            return Err(StartRejected::Finished);
        }
        self.state = PlaybackState::Playing;
        Ok(())
    }

    /// Returns true if playback was running
    pub fn pause(&mut self) -> bool {
        let was_playing = self.is_playing();
        self.state = PlaybackState::Stopped;
        was_playing
    }

    pub fn reset(&mut self) {
        self.state = PlaybackState::Stopped;
        self.index = 0;
        self.stepped = false;
        self.revealed.iter_mut().for_each(|shown| *shown = 0);
    }

    /// Advance one tick. Does nothing unless playing.
    pub fn step(&mut self, tracks: &TrackSet) {
        if !self.is_playing() {
            return;
        }
        self.stepped = true;

        if self.index + 1 < tracks.actual.len() {
            self.index += 1;
        } else {
            // Actual track exhausted
            for (shown, track) in self.revealed.iter_mut().zip(&tracks.predicted) {
                if *shown < track.len() {
                    *shown += 1;
                }
            }
        }

        if self.is_finished(tracks) {
            self.state = PlaybackState::Stopped;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn points(n: usize) -> Vec<GeoPoint> {
        (0..n).map(|i| GeoPoint::new(i as f64, 0.0)).collect()
    }

    #[test]
    fn test_start_rejections() {
        let empty = TrackSet::new(vec![], vec![points(3)]);
        let mut playback = Playback::new(&empty);
        assert_eq!(playback.start(&empty), Err(StartRejected::NoTrack));

        let tracks = TrackSet::new(points(3), vec![]);
        let mut playback = Playback::new(&tracks);
        assert_eq!(playback.start(&tracks), Ok(()));
        assert_eq!(playback.start(&tracks), Err(StartRejected::AlreadyPlaying));
    }

    #[test]
    fn test_runs_to_end_and_stops() {
        let tracks = TrackSet::new(points(3), vec![]);
        let mut playback = Playback::new(&tracks);
        playback.start(&tracks).unwrap();

        playback.step(&tracks);
        assert_eq!(playback.index(), 1);
        assert!(playback.is_playing());

        playback.step(&tracks);
        assert_eq!(playback.index(), 2);
        assert_eq!(playback.state(), PlaybackState::Stopped);
        assert_eq!(playback.position(&tracks), Some(GeoPoint::new(2.0, 0.0)));

        // Finished playback must be reset before it can start again
        assert_eq!(playback.start(&tracks), Err(StartRejected::Finished));
        playback.reset();
        assert_eq!(playback.index(), 0);
        assert_eq!(playback.start(&tracks), Ok(()));
    }

    #[test]
    fn test_predicted_tracks_reveal_after_actual() {
        let tracks = TrackSet::new(points(2), vec![points(1), points(3)]);
        let mut playback = Playback::new(&tracks);
        playback.start(&tracks).unwrap();

        playback.step(&tracks);
        assert_eq!(playback.index(), 1);
        assert_eq!(playback.revealed(), &[0, 0]);

        playback.step(&tracks);
        assert_eq!(playback.index(), 1);
        assert_eq!(playback.revealed(), &[1, 1]);
        assert!(playback.is_playing());

        playback.step(&tracks);
        assert_eq!(playback.revealed(), &[1, 2]);

        playback.step(&tracks);
        assert_eq!(playback.revealed(), &[1, 3]);
        assert!(!playback.is_playing());
        assert!(playback.is_finished(&tracks));

        playback.reset();
        assert_eq!(playback.revealed(), &[0, 0]);
    }

    #[test]
    fn test_pause_keeps_position() {
        let tracks = TrackSet::new(points(5), vec![]);
        let mut playback = Playback::new(&tracks);
        playback.start(&tracks).unwrap();
        playback.step(&tracks);

        assert!(playback.has_stepped());
        assert!(playback.pause());
        assert!(!playback.pause());

        // Paused playback ignores ticks
        playback.step(&tracks);
        assert_eq!(playback.index(), 1);

        playback.start(&tracks).unwrap();
        playback.step(&tracks);
        assert_eq!(playback.index(), 2);
    }

    #[test]
    fn test_stepped_flag() {
        let tracks = TrackSet::new(points(3), vec![]);
        let mut playback = Playback::new(&tracks);
        assert!(!playback.has_stepped());

        // Ticks while stopped do not count
        playback.step(&tracks);
        assert!(!playback.has_stepped());

        playback.start(&tracks).unwrap();
        assert!(!playback.has_stepped());
        playback.step(&tracks);
        assert!(playback.has_stepped());

        playback.reset();
        assert!(!playback.has_stepped());
    }

    #[test]
    fn test_single_point_track() {
        let tracks = TrackSet::new(points(1), vec![]);
        let mut playback = Playback::new(&tracks);
        // One point with nothing to reveal is already finished
        assert_eq!(playback.start(&tracks), Err(StartRejected::Finished));
    }

    #[test]
    fn test_state_display() {
        assert_eq!(PlaybackState::Playing.to_string(), "playing");
        assert_eq!(PlaybackState::Stopped.to_string(), "stopped");
    }
}
