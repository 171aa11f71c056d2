#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Per-player notification queues.
//!
//! Every joined player owns one text widget. Messages queue per player and
//! play one at a time: the widget shows a message one frame after playback
//! starts, keeps it visible for the message's minimum duration when more
//! messages are waiting (its maximum duration otherwise), hides it, and frees
//! the widget for the next message one frame later.

use std::{
    collections::{BTreeMap, VecDeque},
    time::Duration,
};

use horde_defense_core::{
    ActorId, Cadence, Command, Event, Message, ObjectId, ObjectIdAllocator, ObjectiveName, FRAME,
};

/// A message together with how long it stays on screen.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NotificationContent {
    /// Message to show.
    pub message: Message,
    /// Display time when further messages are queued.
    pub min_duration: Duration,
    /// Display time when nothing else is queued.
    pub max_duration: Duration,
}

impl NotificationContent {
    /// Mission briefing shown when a defender deploys.
    #[must_use]
    pub const fn briefing() -> Self {
        Self {
            message: Message::Briefing,
            min_duration: Duration::from_secs(5),
            max_duration: Duration::from_secs(10),
        }
    }

    /// Announcement that `by` armed an objective.
    #[must_use]
    pub const fn bomb_armed(by: ActorId) -> Self {
        Self {
            message: Message::BombArmed { by },
            min_duration: Duration::from_secs(2),
            max_duration: Duration::from_secs(5),
        }
    }

    /// Announcement that the objective armed by `by` was destroyed.
    #[must_use]
    pub const fn target_destroyed(by: ActorId, target: ObjectiveName) -> Self {
        Self {
            message: Message::TargetDestroyed { by, target },
            min_duration: Duration::from_secs(2),
            max_duration: Duration::from_secs(5),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Playback {
    Idle,
    Preparing(NotificationContent),
    Showing {
        content: NotificationContent,
        elapsed: Duration,
    },
    Clearing,
}

/// Notification queue bound to one player's widget.
#[derive(Debug)]
pub struct NotificationChannel {
    widget: ObjectId,
    queue: VecDeque<NotificationContent>,
    playback: Playback,
}

impl NotificationChannel {
    fn new(widget: ObjectId) -> Self {
        Self {
            widget,
            queue: VecDeque::new(),
            playback: Playback::Idle,
        }
    }

    /// Widget the channel draws into.
    #[must_use]
    pub fn widget(&self) -> ObjectId {
        self.widget
    }

    /// Reports whether a message is currently being played.
    #[must_use]
    pub fn is_playing(&self) -> bool {
        self.playback != Playback::Idle
    }

    /// Messages waiting behind the one being played.
    #[must_use]
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    fn push(&mut self, content: NotificationContent) {
        self.queue.push_back(content);
        self.try_play_next();
    }

    fn try_play_next(&mut self) {
        if self.playback != Playback::Idle {
            return;
        }
        if let Some(content) = self.queue.pop_front() {
            self.playback = Playback::Preparing(content);
        }
    }

    fn step(&mut self, out: &mut Vec<Command>) {
        match self.playback {
            Playback::Idle => {}
            Playback::Preparing(content) => {
                out.push(Command::ShowNotification {
                    widget: self.widget,
                    message: content.message,
                });
                self.playback = Playback::Showing {
                    content,
                    elapsed: Duration::ZERO,
                };
            }
            Playback::Showing { content, elapsed } => {
                let elapsed = elapsed.saturating_add(FRAME);
                let duration = if self.queue.is_empty() {
                    content.max_duration
                } else {
                    content.min_duration
                };
                if elapsed > duration {
                    out.push(Command::HideNotification {
                        widget: self.widget,
                    });
                    self.playback = Playback::Clearing;
                } else {
                    self.playback = Playback::Showing { content, elapsed };
                }
            }
            Playback::Clearing => {
                self.playback = Playback::Idle;
                self.try_play_next();
            }
        }
    }
}

/// Owner of every player's notification channel.
#[derive(Debug)]
pub struct NotificationCenter {
    channels: BTreeMap<ActorId, NotificationChannel>,
    cadence: Cadence,
}

impl Default for NotificationCenter {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationCenter {
    /// Creates a center without channels.
    #[must_use]
    pub fn new() -> Self {
        Self {
            channels: BTreeMap::new(),
            cadence: Cadence::new(FRAME),
        }
    }

    /// Consumes player lifecycle, objective and frame events.
    pub fn handle(
        &mut self,
        events: &[Event],
        ids: &mut ObjectIdAllocator,
        out: &mut Vec<Command>,
    ) {
        for event in events {
            match event {
                Event::PlayerJoined { player } => self.join(*player, ids, out),
                Event::PlayerLeft { player } => self.leave(*player, out),
                Event::ActorDeployed { actor, .. } => {
                    let _ = self.push(*actor, NotificationContent::briefing());
                }
                Event::ObjectiveArmed { by, .. } => {
                    self.push_to_all(NotificationContent::bomb_armed(*by));
                }
                Event::ObjectiveDestroyed { by, name, .. } => {
                    self.push_to_all(NotificationContent::target_destroyed(*by, *name));
                }
                Event::Tick { dt } => {
                    for _ in 0..self.cadence.advance(*dt) {
                        for channel in self.channels.values_mut() {
                            channel.step(out);
                        }
                    }
                }
                _ => {}
            }
        }
    }

    /// Creates the widget and channel of a joining player.
    pub fn join(&mut self, player: ActorId, ids: &mut ObjectIdAllocator, out: &mut Vec<Command>) {
        if self.channels.contains_key(&player) {
            return;
        }
        let widget = ids.allocate();
        out.push(Command::CreateNotificationWidget { player, widget });
        log::debug!(
            "player {} joined with notification widget {}",
            player.get(),
            widget.get()
        );
        let _ = self
            .channels
            .insert(player, NotificationChannel::new(widget));
    }

    /// Disposes a leaving player's channel, abandoning any playback.
    pub fn leave(&mut self, player: ActorId, out: &mut Vec<Command>) {
        if let Some(channel) = self.channels.remove(&player) {
            if channel.is_playing() {
                log::debug!("player {} left during playback", player.get());
            }
            out.push(Command::DeleteWidget {
                widget: channel.widget,
            });
        }
    }

    /// Queues a message for one player; returns `false` when the player has no channel.
    pub fn push(&mut self, player: ActorId, content: NotificationContent) -> bool {
        match self.channels.get_mut(&player) {
            Some(channel) => {
                channel.push(content);
                true
            }
            None => false,
        }
    }

    /// Queues a message for every player.
    pub fn push_to_all(&mut self, content: NotificationContent) {
        for channel in self.channels.values_mut() {
            channel.push(content);
        }
    }

    /// Channel of a player, if they joined.
    #[must_use]
    pub fn channel(&self, player: ActorId) -> Option<&NotificationChannel> {
        self.channels.get(&player)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn playback_releases_after_hide_frame() {
        let mut channel = NotificationChannel::new(ObjectId::new(3));
        let mut out = Vec::new();
        channel.push(NotificationContent::bomb_armed(ActorId::new(1)));
        assert!(channel.is_playing());

        channel.step(&mut out);
        assert_eq!(out.len(), 1);

        let mut frames = 0;
        while !matches!(channel.playback, Playback::Clearing) {
            channel.step(&mut out);
            frames += 1;
        }
        assert_eq!(frames, 300, "hidden on the frame that exceeds five seconds");

        channel.step(&mut out);
        assert!(!channel.is_playing());
    }
}
