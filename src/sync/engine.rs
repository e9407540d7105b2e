use std::sync::Arc;

use tokio::{
    sync::{broadcast, mpsc, oneshot, watch},
    time::{Instant, MissedTickBehavior, interval, sleep_until},
};
use tracing::{debug, warn};

use super::{
    coalesce::Coalescer,
    error::{ErrorSource, IntentKind, Outcome, SyncError, SyncEvent},
    remote::{CredentialProvider, PlaybackRemote},
    session::Session,
};
use crate::{
    config::SyncConfig,
    types::{PlaybackState, RemoteSnapshot},
};

pub(crate) enum Command {
    Start {
        credentials: Arc<dyn CredentialProvider>,
        reply: oneshot::Sender<bool>,
    },
    Stop,
    PlayPause {
        reply: oneshot::Sender<Outcome>,
    },
    PlayTrack {
        uri: String,
        reply: oneshot::Sender<Outcome>,
    },
    Seek {
        position_ms: u64,
        reply: oneshot::Sender<Outcome>,
    },
    Volume {
        percent: u8,
        reply: oneshot::Sender<Outcome>,
    },
}

pub(crate) enum Completion {
    Poll {
        epoch: u64,
        seq: u64,
        result: Result<Option<RemoteSnapshot>, SyncError>,
    },
    Mutation {
        epoch: u64,
        kind: IntentKind,
        id: u64,
        result: Result<(), SyncError>,
    },
}

/// Commands and network completions share one queue so they are applied in
/// arrival order.
pub(crate) enum Message {
    Command(Command),
    Completion(Completion),
}

#[derive(Debug, Clone)]
enum Mutation {
    PlayPause(bool),
    PlayTrack(String),
    Seek(u64),
    Volume(u8),
}

struct Intent<T> {
    id: u64,
    rollback: T,
    reply: Option<oneshot::Sender<Outcome>>,
}

impl<T> Intent<T> {
    fn resolve(&mut self, outcome: Outcome) {
        if let Some(reply) = self.reply.take() {
            let _ = reply.send(outcome);
        }
    }
}

/// One optimistic field: the outstanding intent plus the poll sequence that
/// was issued when the last intent got confirmed. Polls issued before that
/// carry a pre-mutation value and are stale for the field.
struct Slot<T> {
    intent: Option<Intent<T>>,
    confirmed_through: u64,
}

impl<T> Slot<T> {
    fn new() -> Self {
        Self {
            intent: None,
            confirmed_through: 0,
        }
    }

    fn is_stale(&self, seq: u64) -> bool {
        seq <= self.confirmed_through
    }
}

struct QueuedVolume {
    id: u64,
    percent: u8,
    reply: Option<oneshot::Sender<Outcome>>,
}

struct VolumeSlot {
    queue: Coalescer<QueuedVolume>,
    in_flight: Option<QueuedVolume>,
    // last confirmed value while anything is queued or in flight
    rollback: Option<u8>,
    confirmed_through: u64,
}

pub(crate) struct Engine {
    remote: Arc<dyn PlaybackRemote>,
    config: SyncConfig,
    session: Option<Arc<Session>>,
    queue: mpsc::WeakUnboundedSender<Message>,
    state: PlaybackState,
    state_tx: watch::Sender<PlaybackState>,
    events: broadcast::Sender<SyncEvent>,
    epoch: u64,
    next_intent: u64,
    polls_issued: u64,
    last_applied_poll: u64,
    // newest poll still awaited, with the time it was issued
    awaited_poll: Option<(u64, Instant)>,
    progress_anchor: Instant,
    play: Slot<bool>,
    seek: Slot<u64>,
    volume: VolumeSlot,
}

impl Engine {
    pub(crate) fn new(
        remote: Arc<dyn PlaybackRemote>,
        config: SyncConfig,
        queue: mpsc::WeakUnboundedSender<Message>,
        state_tx: watch::Sender<PlaybackState>,
        events: broadcast::Sender<SyncEvent>,
    ) -> Self {
        let volume_debounce = config.volume_debounce;
        Self {
            remote,
            config,
            session: None,
            queue,
            state: PlaybackState::default(),
            state_tx,
            events,
            epoch: 0,
            next_intent: 0,
            polls_issued: 0,
            last_applied_poll: 0,
            awaited_poll: None,
            progress_anchor: Instant::now(),
            play: Slot::new(),
            seek: Slot::new(),
            volume: VolumeSlot {
                queue: Coalescer::new(volume_debounce),
                in_flight: None,
                rollback: None,
                confirmed_through: 0,
            },
        }
    }

    pub(crate) async fn run(mut self, mut inbox: mpsc::UnboundedReceiver<Message>) {
        let mut poll_timer = interval(self.config.poll_interval);
        poll_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut progress_timer = interval(self.config.progress_interval);
        progress_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let volume_due = self.volume.queue.deadline();
            let running = self.session.is_some();
            let interpolating = self.is_interpolating();

            tokio::select! {
                message = inbox.recv() => match message {
                    Some(Message::Command(command)) => {
                        if self.handle_command(command) {
                            poll_timer.reset();
                            progress_timer.reset();
                        }
                    }
                    Some(Message::Completion(done)) => self.handle_completion(done),
                    None => break,
                },
                _ = poll_timer.tick(), if running => self.poll(),
                _ = progress_timer.tick(), if interpolating => self.interpolate(),
                _ = sleep_until(volume_due.unwrap_or_else(Instant::now)), if volume_due.is_some() => {
                    self.flush_volume()
                }
            }
        }

        debug!("playback sync engine finished");
    }

    fn is_interpolating(&self) -> bool {
        self.session.is_some() && self.state.is_playing && self.state.track.is_some()
    }

    /// Returns `true` when the timers need to restart.
    fn handle_command(&mut self, command: Command) -> bool {
        match command {
            Command::Start { credentials, reply } => {
                let started = self.start(credentials);
                let _ = reply.send(true);
                started
            }
            Command::Stop => {
                self.stop();
                false
            }
            Command::PlayPause { reply } => {
                self.request_play_pause(reply);
                false
            }
            Command::PlayTrack { uri, reply } => {
                self.request_play_track(uri, reply);
                false
            }
            Command::Seek { position_ms, reply } => {
                self.request_seek(position_ms, reply);
                false
            }
            Command::Volume { percent, reply } => {
                self.request_volume(percent, reply);
                false
            }
        }
    }

    fn start(&mut self, credentials: Arc<dyn CredentialProvider>) -> bool {
        if self.session.is_some() {
            debug!("playback sync already running");
            return false;
        }

        self.epoch += 1;
        self.session = Some(Arc::new(Session::new(credentials)));
        self.progress_anchor = Instant::now();
        debug!(epoch = self.epoch, "playback sync started");
        self.poll();
        true
    }

    fn stop(&mut self) {
        if self.session.take().is_none() {
            return;
        }

        // everything issued so far is now discard-on-arrival
        self.epoch += 1;
        self.awaited_poll = None;

        if let Some(mut intent) = self.play.intent.take() {
            intent.resolve(Outcome::Inactive);
        }
        if let Some(mut intent) = self.seek.intent.take() {
            intent.resolve(Outcome::Inactive);
        }
        if let Some(queued) = self.volume.queue.clear() {
            reply(queued.reply, Outcome::Inactive);
        }
        if let Some(in_flight) = self.volume.in_flight.take() {
            reply(in_flight.reply, Outcome::Inactive);
        }
        self.volume.rollback = None;

        debug!(epoch = self.epoch, "playback sync stopped");
    }

    fn next_intent_id(&mut self) -> u64 {
        self.next_intent += 1;
        self.next_intent
    }

    fn request_play_pause(&mut self, reply: oneshot::Sender<Outcome>) {
        if self.session.is_none() {
            let _ = reply.send(Outcome::Inactive);
            return;
        }

        let target = !self.state.is_playing;
        let id = self.begin_play_intent(target, reply);
        self.spawn_mutation(IntentKind::PlayPause, id, Mutation::PlayPause(target));
    }

    /// Starts `uri` on the device. Only `is_playing` is optimistic; the new
    /// track arrives through the poll issued once the device confirms.
    fn request_play_track(&mut self, uri: String, reply: oneshot::Sender<Outcome>) {
        if self.session.is_none() {
            let _ = reply.send(Outcome::Inactive);
            return;
        }

        let id = self.begin_play_intent(true, reply);
        self.spawn_mutation(IntentKind::PlayTrack, id, Mutation::PlayTrack(uri));
    }

    /// Play/pause and play-track share one slot: the newer one supersedes.
    fn begin_play_intent(&mut self, target: bool, reply: oneshot::Sender<Outcome>) -> u64 {
        self.advance_progress();
        let rollback = match self.play.intent.take() {
            Some(mut previous) => {
                previous.resolve(Outcome::Superseded);
                previous.rollback
            }
            None => self.state.is_playing,
        };

        let id = self.next_intent_id();
        self.play.intent = Some(Intent {
            id,
            rollback,
            reply: Some(reply),
        });
        self.state.is_playing = target;
        self.progress_anchor = Instant::now();
        self.publish();
        id
    }

    fn request_seek(&mut self, position_ms: u64, reply: oneshot::Sender<Outcome>) {
        if self.session.is_none() {
            let _ = reply.send(Outcome::Inactive);
            return;
        }
        if self.state.track.is_none() {
            let _ = reply.send(Outcome::Ignored);
            return;
        }

        self.advance_progress();
        let target = self.state.clamp_progress(position_ms);
        let rollback = match self.seek.intent.take() {
            Some(mut previous) => {
                previous.resolve(Outcome::Superseded);
                previous.rollback
            }
            None => self.state.progress_ms,
        };

        let id = self.next_intent_id();
        self.seek.intent = Some(Intent {
            id,
            rollback,
            reply: Some(reply),
        });
        self.state.progress_ms = target;
        self.progress_anchor = Instant::now();
        self.publish();

        self.spawn_mutation(IntentKind::Seek, id, Mutation::Seek(target));
    }

    fn request_volume(&mut self, percent: u8, reply: oneshot::Sender<Outcome>) {
        if self.session.is_none() {
            let _ = reply.send(Outcome::Inactive);
            return;
        }

        let percent = percent.min(100);
        if self.volume.rollback.is_none() {
            self.volume.rollback = Some(self.state.volume_percent);
        }

        let id = self.next_intent_id();
        let displaced = self.volume.queue.push(
            QueuedVolume {
                id,
                percent,
                reply: Some(reply),
            },
            Instant::now(),
        );
        if let Some(displaced) = displaced {
            reply_superseded(displaced);
        }

        if self.state.volume_percent != percent {
            self.state.volume_percent = percent;
            self.publish();
        }
    }

    fn flush_volume(&mut self) {
        let Some(ready) = self.volume.queue.take_ready(Instant::now()) else {
            return;
        };

        let (id, percent) = (ready.id, ready.percent);
        self.volume.in_flight = Some(ready);
        self.spawn_mutation(IntentKind::Volume, id, Mutation::Volume(percent));
    }

    /// Scheduled poll. Skipped while the previous one is still awaited,
    /// unless it has been outstanding for a whole interval; a late answer
    /// to an abandoned poll is dropped by the sequence check.
    fn poll(&mut self) {
        if let Some((seq, issued)) = self.awaited_poll {
            if issued.elapsed() < self.config.poll_interval {
                debug!(seq, "poll still in flight, skipping tick");
                return;
            }
            warn!(seq, "poll unanswered for a full interval, polling again");
        }
        self.issue_poll();
    }

    fn issue_poll(&mut self) {
        let Some(session) = self.session.clone() else {
            return;
        };
        let Some(queue) = self.queue.upgrade() else {
            return;
        };

        self.polls_issued += 1;
        let seq = self.polls_issued;
        self.awaited_poll = Some((seq, Instant::now()));
        let epoch = self.epoch;
        let remote = Arc::clone(&self.remote);

        tokio::spawn(async move {
            let result = session
                .call(|token| {
                    let remote = Arc::clone(&remote);
                    async move { remote.current_playback(&token).await }
                })
                .await;
            let _ = queue.send(Message::Completion(Completion::Poll { epoch, seq, result }));
        });
    }

    fn spawn_mutation(&self, kind: IntentKind, id: u64, mutation: Mutation) {
        let Some(session) = self.session.clone() else {
            return;
        };
        let Some(queue) = self.queue.upgrade() else {
            return;
        };
        let epoch = self.epoch;
        let remote = Arc::clone(&self.remote);

        tokio::spawn(async move {
            let result = session
                .call(|token| {
                    let remote = Arc::clone(&remote);
                    let mutation = mutation.clone();
                    async move {
                        match mutation {
                            Mutation::PlayPause(play) => remote.set_play_pause(&token, play).await,
                            Mutation::PlayTrack(uri) => remote.play_track(&token, &uri).await,
                            Mutation::Seek(position_ms) => remote.seek(&token, position_ms).await,
                            Mutation::Volume(percent) => remote.set_volume(&token, percent).await,
                        }
                    }
                })
                .await;
            let _ = queue.send(Message::Completion(Completion::Mutation {
                epoch,
                kind,
                id,
                result,
            }));
        });
    }

    fn handle_completion(&mut self, done: Completion) {
        match done {
            Completion::Poll { epoch, seq, result } => {
                if epoch != self.epoch {
                    debug!(seq, "discarding poll from a previous generation");
                    return;
                }
                if self
                    .awaited_poll
                    .is_some_and(|(awaited, _)| awaited <= seq)
                {
                    self.awaited_poll = None;
                }
                if seq <= self.last_applied_poll {
                    debug!(seq, "discarding out-of-order poll");
                    return;
                }
                self.last_applied_poll = seq;

                match result {
                    Ok(snapshot) => self.merge_poll(seq, snapshot),
                    Err(error) => {
                        warn!(%error, "poll failed, keeping last known state");
                        self.report(ErrorSource::Poll, error);
                    }
                }
            }
            Completion::Mutation {
                epoch,
                kind,
                id,
                result,
            } => {
                if epoch != self.epoch {
                    debug!(?kind, id, "discarding response from a previous generation");
                    return;
                }
                match kind {
                    IntentKind::PlayPause | IntentKind::PlayTrack => {
                        self.resolve_play(kind, id, result)
                    }
                    IntentKind::Seek => self.resolve_seek(id, result),
                    IntentKind::Volume => self.resolve_volume(id, result),
                }
            }
        }
    }

    fn resolve_play(&mut self, kind: IntentKind, id: u64, result: Result<(), SyncError>) {
        let Some(mut intent) = take_matching(&mut self.play.intent, id) else {
            debug!(?kind, id, "discarding response to superseded play intent");
            return;
        };

        match result {
            Ok(()) => {
                self.play.confirmed_through = self.polls_issued;
                intent.resolve(Outcome::Confirmed);
                if kind == IntentKind::PlayTrack {
                    // pick up the new track right away
                    self.issue_poll();
                }
            }
            Err(error) => {
                warn!(?kind, %error, "play request failed, rolling back");
                self.advance_progress();
                self.state.is_playing = intent.rollback;
                self.progress_anchor = Instant::now();
                intent.resolve(Outcome::RolledBack(error.clone()));
                self.report(ErrorSource::Intent(kind), error);
                self.publish();
            }
        }
    }

    fn resolve_seek(&mut self, id: u64, result: Result<(), SyncError>) {
        let Some(mut intent) = take_matching(&mut self.seek.intent, id) else {
            debug!(id, "discarding response to superseded seek intent");
            return;
        };

        match result {
            Ok(()) => {
                self.seek.confirmed_through = self.polls_issued;
                intent.resolve(Outcome::Confirmed);
            }
            Err(error) => {
                warn!(%error, "seek failed, rolling back");
                self.state.progress_ms = self.state.clamp_progress(intent.rollback);
                self.progress_anchor = Instant::now();
                intent.resolve(Outcome::RolledBack(error.clone()));
                self.report(ErrorSource::Intent(IntentKind::Seek), error);
                self.publish();
            }
        }
    }

    fn resolve_volume(&mut self, id: u64, result: Result<(), SyncError>) {
        let Some(sent) = self.volume.in_flight.take_if(|v| v.id == id) else {
            debug!(id, "discarding response to unknown volume request");
            return;
        };
        self.volume.queue.complete();
        let newer_queued = self.volume.queue.has_queued();

        match result {
            Ok(()) => {
                reply(sent.reply, Outcome::Confirmed);
                if newer_queued {
                    self.volume.rollback = Some(sent.percent);
                } else {
                    self.volume.rollback = None;
                    self.volume.confirmed_through = self.polls_issued;
                }
            }
            Err(error) => {
                warn!(%error, percent = sent.percent, "volume change failed");
                reply(sent.reply, Outcome::RolledBack(error.clone()));
                self.report(ErrorSource::Intent(IntentKind::Volume), error);
                if !newer_queued {
                    if let Some(previous) = self.volume.rollback.take() {
                        self.state.volume_percent = previous;
                        self.publish();
                    }
                }
            }
        }
    }

    /// Applies a poll result field by field. Fields with an outstanding
    /// intent keep their optimistic value; the polled value becomes the
    /// intent's rollback target instead.
    fn merge_poll(&mut self, seq: u64, snapshot: Option<RemoteSnapshot>) {
        match snapshot {
            None => {
                self.state.track = None;
                self.state.device_name = None;
                self.state.progress_ms = 0;
                if let Some(intent) = self.seek.intent.as_mut() {
                    intent.rollback = 0;
                }
                self.merge_is_playing(seq, false);
            }
            Some(remote) => {
                self.state.track = Some(remote.track);
                self.state.device_name = remote.device_name;
                self.merge_is_playing(seq, remote.is_playing);

                let stale = self.seek.is_stale(seq);
                match self.seek.intent.as_mut() {
                    Some(intent) => intent.rollback = remote.progress_ms,
                    None if stale => {}
                    None => self.state.progress_ms = remote.progress_ms,
                }

                if let Some(percent) = remote.volume_percent {
                    let percent = percent.min(100);
                    if self.volume.rollback.is_some() {
                        self.volume.rollback = Some(percent);
                    } else if seq > self.volume.confirmed_through {
                        self.state.volume_percent = percent;
                    }
                }
            }
        }

        self.state.progress_ms = self.state.clamp_progress(self.state.progress_ms);
        self.progress_anchor = Instant::now();
        self.publish();
    }

    fn merge_is_playing(&mut self, seq: u64, is_playing: bool) {
        let stale = self.play.is_stale(seq);
        match self.play.intent.as_mut() {
            Some(intent) => intent.rollback = is_playing,
            None if stale => {}
            None => self.state.is_playing = is_playing,
        }
    }

    fn interpolate(&mut self) {
        let before = self.state.progress_ms;
        self.advance_progress();
        if self.state.progress_ms != before {
            self.publish();
        }
    }

    /// Moves progress forward by the wall-clock time since the last anchor
    /// while playing.
    fn advance_progress(&mut self) {
        let now = Instant::now();
        if self.is_interpolating() {
            let elapsed = now.duration_since(self.progress_anchor).as_millis() as u64;
            self.state.progress_ms = self
                .state
                .clamp_progress(self.state.progress_ms.saturating_add(elapsed));
        }
        self.progress_anchor = now;
    }

    fn publish(&self) {
        self.state_tx.send_replace(self.state.clone());
        let _ = self.events.send(SyncEvent::State(self.state.clone()));
    }

    fn report(&self, source: ErrorSource, error: SyncError) {
        let _ = self.events.send(SyncEvent::Error { source, error });
    }
}

fn take_matching<T>(slot: &mut Option<Intent<T>>, id: u64) -> Option<Intent<T>> {
    slot.take_if(|intent| intent.id == id)
}

fn reply(reply: Option<oneshot::Sender<Outcome>>, outcome: Outcome) {
    if let Some(reply) = reply {
        let _ = reply.send(outcome);
    }
}

fn reply_superseded(displaced: QueuedVolume) {
    reply(displaced.reply, Outcome::Superseded);
}
