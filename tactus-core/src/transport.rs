//! External transport following.
//!
//! The bridge decides, per fire, whether logical time comes from the engine's
//! own time base or from the transport. It only reports edges; the engine
//! applies them to its time base and scheduler.

use std::time::Duration;

use tactus_types::TransportSnapshot;

/// Read side of an external playback transport.
pub trait TransportSource: Send {
    /// Current transport state, or `None` once the transport is gone.
    fn snapshot(&mut self) -> Option<TransportSnapshot>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SyncState {
    #[default]
    SelfClocked,
    Following,
}

/// Edge reported by [`TransportBridge::observe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Transport started playing; jump to its position.
    Follow { at: Duration },
    /// Transport paused or went away. `at` is the position it stopped at,
    /// when known.
    Release { at: Option<Duration> },
}

#[derive(Debug, Clone, Default)]
pub struct TransportBridge {
    state: SyncState,
    followed: Option<Duration>,
}

impl TransportBridge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    pub fn is_following(&self) -> bool {
        self.state == SyncState::Following
    }

    /// Position taken from the last snapshot while following.
    pub fn followed_position(&self) -> Option<Duration> {
        match self.state {
            SyncState::Following => self.followed,
            SyncState::SelfClocked => None,
        }
    }

    /// Feed one snapshot read. Returns the edge crossed, if any.
    pub fn observe(&mut self, snapshot: Option<TransportSnapshot>) -> Option<Transition> {
        match (self.state, snapshot) {
            (SyncState::SelfClocked, Some(snap)) if snap.is_playing => {
                self.state = SyncState::Following;
                self.followed = Some(snap.current_position);
                log::debug!(target: "transport", "following transport at {:?}", snap.current_position);
                Some(Transition::Follow {
                    at: snap.current_position,
                })
            }
            (SyncState::Following, Some(snap)) if snap.is_playing => {
                self.followed = Some(snap.current_position);
                None
            }
            (SyncState::Following, Some(snap)) => {
                self.state = SyncState::SelfClocked;
                self.followed = None;
                log::debug!(target: "transport", "transport paused at {:?}", snap.current_position);
                Some(Transition::Release {
                    at: Some(snap.current_position),
                })
            }
            (SyncState::Following, None) => {
                self.state = SyncState::SelfClocked;
                self.followed = None;
                log::debug!(target: "transport", "transport detached while following");
                Some(Transition::Release { at: None })
            }
            (SyncState::SelfClocked, _) => None,
        }
    }

    /// Move the followed baseline after a seek.
    pub fn rebase(&mut self, to: Duration) {
        if self.is_following() {
            self.followed = Some(to);
        }
    }

    pub fn reset(&mut self) {
        self.state = SyncState::SelfClocked;
        self.followed = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn playing(pos: u64) -> Option<TransportSnapshot> {
        Some(TransportSnapshot::playing_at(ms(pos), ms(10_000)))
    }

    fn paused(pos: u64) -> Option<TransportSnapshot> {
        Some(TransportSnapshot::paused_at(ms(pos), ms(10_000)))
    }

    #[test]
    fn no_transport_stays_self_clocked() {
        let mut bridge = TransportBridge::new();
        assert_eq!(bridge.observe(None), None);
        assert_eq!(bridge.observe(paused(500)), None);
        assert_eq!(bridge.state(), SyncState::SelfClocked);
        assert_eq!(bridge.followed_position(), None);
    }

    #[test]
    fn play_edge_follows_once() {
        let mut bridge = TransportBridge::new();
        assert_eq!(bridge.observe(playing(1500)), Some(Transition::Follow { at: ms(1500) }));
        assert!(bridge.is_following());
        // Still playing: no new edge, position tracks the snapshot.
        assert_eq!(bridge.observe(playing(1550)), None);
        assert_eq!(bridge.followed_position(), Some(ms(1550)));
    }

    #[test]
    fn pause_edge_releases_with_position() {
        let mut bridge = TransportBridge::new();
        bridge.observe(playing(0));
        assert_eq!(
            bridge.observe(paused(2_250)),
            Some(Transition::Release { at: Some(ms(2_250)) })
        );
        assert_eq!(bridge.state(), SyncState::SelfClocked);
        assert_eq!(bridge.observe(paused(2_250)), None);
    }

    #[test]
    fn detach_while_following_releases() {
        let mut bridge = TransportBridge::new();
        bridge.observe(playing(100));
        assert_eq!(bridge.observe(None), Some(Transition::Release { at: None }));
        assert!(!bridge.is_following());
    }

    #[test]
    fn rebase_only_moves_followed_baseline() {
        let mut bridge = TransportBridge::new();
        bridge.rebase(ms(900));
        assert_eq!(bridge.followed_position(), None);

        bridge.observe(playing(100));
        bridge.rebase(ms(900));
        assert_eq!(bridge.followed_position(), Some(ms(900)));

        bridge.reset();
        assert_eq!(bridge.state(), SyncState::SelfClocked);
        assert_eq!(bridge.followed_position(), None);
    }
}
