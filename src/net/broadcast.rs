//! Broadcast plumbing: queue, coalesce, hand to the transport, replay locally.

use bevy::ecs::system::SystemParam;
use bevy::prelude::*;
use std::collections::HashSet;

use super::messages::{MessageKind, NetMessage};
use super::session::{NetworkSession, PeerId};

/// Ordering of broadcast traffic within `Update`.
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BroadcastSet {
    /// Owner systems queue messages
    Send,
    /// Queued and inbound messages are coalesced and replayed
    Flush,
    /// Receivers apply replayed messages
    Receive,
}

/// Messages queued this tick by local owner systems.
#[derive(Resource, Default, Debug)]
pub struct PendingBroadcasts(Vec<NetMessage>);

/// Messages ready for the transport to send to every remote peer.
#[derive(Resource, Default, Debug)]
pub struct Outbox(Vec<NetMessage>);

impl Outbox {
    /// Take everything queued since the last drain.
    pub fn drain(&mut self) -> Vec<NetMessage> {
        std::mem::take(&mut self.0)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Messages received from remote peers, waiting to be replayed.
#[derive(Resource, Default, Debug)]
pub struct Inbox(Vec<NetMessage>);

impl Inbox {
    pub fn push(&mut self, message: NetMessage) {
        self.0.push(message);
    }
}

/// A broadcast replayed on this peer, whether sent locally or received.
#[derive(Event, Debug, Clone)]
pub struct ReceivedBroadcast(pub NetMessage);

/// System param for queueing broadcasts.
#[derive(SystemParam)]
pub struct Broadcaster<'w> {
    pending: ResMut<'w, PendingBroadcasts>,
}

impl Broadcaster<'_> {
    pub fn send(&mut self, message: NetMessage) {
        self.pending.0.push(message);
    }
}

/// Keep only the last message per `(peer, kind)`, in the order those last writes happened.
pub fn coalesce(messages: Vec<NetMessage>) -> Vec<NetMessage> {
    let mut seen: HashSet<(PeerId, MessageKind)> = HashSet::new();
    let mut kept: Vec<NetMessage> = messages
        .into_iter()
        .rev()
        .filter(|m| seen.insert((m.peer(), m.kind())))
        .collect();
    kept.reverse();
    kept
}

/// Move queued local broadcasts to the outbox and replay them with any inbound ones.
pub fn flush_broadcasts(
    session: Res<NetworkSession>,
    mut pending: ResMut<PendingBroadcasts>,
    mut outbox: ResMut<Outbox>,
    mut inbox: ResMut<Inbox>,
    mut received: EventWriter<ReceivedBroadcast>,
) {
    let local = coalesce(std::mem::take(&mut pending.0));

    // Our own messages were already replayed when sent; a transport echo is dropped.
    let local_peer = session.local_peer();
    let remote: Vec<NetMessage> = std::mem::take(&mut inbox.0)
        .into_iter()
        .filter(|m| !(m.is_from_owner() && m.peer() == local_peer))
        .collect();
    let remote = coalesce(remote);

    if session.is_active() {
        outbox.0.extend(local.iter().cloned());
    }

    received.send_batch(local.into_iter().chain(remote).map(ReceivedBroadcast));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yaw(peer: u64, yaw: f32) -> NetMessage {
        NetMessage::BodyOrientation { peer: PeerId(peer), yaw, speed: 0.0 }
    }

    #[test]
    fn coalesce_keeps_last_write_per_peer_and_kind() {
        let messages = vec![
            yaw(1, 10.0),
            NetMessage::JumpCue { peer: PeerId(1) },
            yaw(2, 5.0),
            yaw(1, 20.0),
        ];
        let kept = coalesce(messages);
        assert_eq!(
            kept,
            vec![
                NetMessage::JumpCue { peer: PeerId(1) },
                yaw(2, 5.0),
                yaw(1, 20.0),
            ]
        );
    }

    fn flush_app() -> App {
        let mut app = App::new();
        app.init_resource::<NetworkSession>()
            .init_resource::<PendingBroadcasts>()
            .init_resource::<Outbox>()
            .init_resource::<Inbox>()
            .add_event::<ReceivedBroadcast>()
            .add_systems(Update, flush_broadcasts);
        app
    }

    fn replayed(app: &App) -> Vec<NetMessage> {
        let events = app.world().resource::<Events<ReceivedBroadcast>>();
        events.iter_current_update_events().map(|e| e.0.clone()).collect()
    }

    #[test]
    fn local_messages_reach_outbox_and_replay_once() {
        let mut app = flush_app();
        app.world_mut()
            .resource_mut::<NetworkSession>()
            .create_lobby("host", None);
        {
            let mut pending = app.world_mut().resource_mut::<PendingBroadcasts>();
            pending.0.push(yaw(1, 10.0));
            pending.0.push(yaw(1, 30.0));
        }
        app.update();

        assert_eq!(replayed(&app), vec![yaw(1, 30.0)]);
        let sent = app.world_mut().resource_mut::<Outbox>().drain();
        assert_eq!(sent, vec![yaw(1, 30.0)]);
        assert!(app.world().resource::<Outbox>().is_empty());
    }

    #[test]
    fn inactive_session_replays_without_sending() {
        let mut app = flush_app();
        app.world_mut().resource_mut::<PendingBroadcasts>().0.push(yaw(1, 10.0));
        app.update();

        assert_eq!(replayed(&app).len(), 1);
        assert!(app.world().resource::<Outbox>().is_empty());
    }

    #[test]
    fn inbox_replays_remote_messages_and_drops_echoes() {
        let mut app = flush_app();
        {
            let mut inbox = app.world_mut().resource_mut::<Inbox>();
            inbox.push(yaw(1, 45.0));
            inbox.push(yaw(5, 90.0));
        }
        app.update();

        assert_eq!(replayed(&app), vec![yaw(5, 90.0)]);
        assert!(app.world().resource::<Outbox>().is_empty());
    }

    #[test]
    fn host_spawn_of_our_own_player_is_not_dropped_as_an_echo() {
        let mut app = flush_app();
        let local = app.world().resource::<NetworkSession>().local_peer();
        let spawned = NetMessage::PlayerSpawned {
            peer: local,
            name: "Player - me".into(),
            translation: Vec3::ZERO,
            yaw: 0.0,
        };
        app.world_mut().resource_mut::<Inbox>().push(spawned.clone());
        app.update();

        assert_eq!(replayed(&app), vec![spawned]);
    }
}
