use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use kameo::actor::Spawn;
use tokio::sync::broadcast;
use uuid::Uuid;

use bootrelay_api::events::RelayEvent;
use bootrelay_core::*;
use bootrelay_exec::error::ExecError;
use bootrelay_exec::result::CommandResult;
use bootrelay_exec::traits::{LivenessProbe, RemoteSession, SessionConnector};

// Mock implementations

#[derive(Default)]
struct RecordingLine {
    events: Mutex<Vec<(bool, tokio::time::Instant)>>,
}

impl RecordingLine {
    fn transitions(&self) -> Vec<bool> {
        self.events.lock().unwrap().iter().map(|(v, _)| *v).collect()
    }

    fn pulse_count(&self) -> usize {
        self.transitions().iter().filter(|v| **v).count()
    }

    fn last_hold(&self) -> Option<Duration> {
        let events = self.events.lock().unwrap();
        match events.as_slice() {
            [.., (true, asserted), (false, released)] => Some(*released - *asserted),
            _ => None,
        }
    }

    fn currently_asserted(&self) -> bool {
        self.events.lock().unwrap().last().is_some_and(|(v, _)| *v)
    }
}

impl RelayLine for RecordingLine {
    fn set_active(&self, active: bool) -> Result<(), RelayError> {
        self.events
            .lock()
            .unwrap()
            .push((active, tokio::time::Instant::now()));
        Ok(())
    }
}

struct SeqProbe {
    responses: Mutex<VecDeque<bool>>,
    default: bool,
    calls: AtomicU32,
    // When set, flips this flag after `cancel_after` calls (0 = never)
    cancel: Option<Arc<AtomicBool>>,
    cancel_after: u32,
}

impl SeqProbe {
    fn new(responses: impl IntoIterator<Item = bool>, default: bool) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().collect()),
            default,
            calls: AtomicU32::new(0),
            cancel: None,
            cancel_after: 0,
        }
    }

    fn cancelling_after(cancel: Arc<AtomicBool>, after: u32) -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            default: false,
            calls: AtomicU32::new(0),
            cancel: Some(cancel),
            cancel_after: after,
        }
    }

    fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LivenessProbe for SeqProbe {
    async fn is_online(&self) -> bool {
        let calls = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(cancel) = &self.cancel {
            if calls >= self.cancel_after {
                cancel.store(true, Ordering::SeqCst);
            }
        }
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(self.default)
    }
}

#[derive(Clone, Default)]
struct ScriptedConnector {
    statuses: Arc<Mutex<VecDeque<i32>>>,
    commands: Arc<Mutex<Vec<String>>>,
    connects: Arc<AtomicU32>,
}

impl ScriptedConnector {
    fn with_statuses(statuses: impl IntoIterator<Item = i32>) -> Self {
        Self {
            statuses: Arc::new(Mutex::new(statuses.into_iter().collect())),
            ..Self::default()
        }
    }

    fn connect_count(&self) -> u32 {
        self.connects.load(Ordering::SeqCst)
    }
}

struct ScriptedSession {
    connector: ScriptedConnector,
}

#[async_trait]
impl RemoteSession for ScriptedSession {
    async fn run_privileged(
        &mut self,
        _job_id: Uuid,
        cmd: &str,
    ) -> Result<CommandResult, ExecError> {
        self.connector.commands.lock().unwrap().push(cmd.to_string());
        let status = self
            .connector
            .statuses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(0);
        Ok(CommandResult {
            status,
            stdout: String::new(),
            stderr: if status == 0 {
                String::new()
            } else {
                "permission denied".into()
            },
            duration: Duration::from_millis(1),
        })
    }

    async fn close(self: Box<Self>) {}
}

#[async_trait]
impl SessionConnector for ScriptedConnector {
    async fn connect(&self, _timeout: Duration) -> Result<Box<dyn RemoteSession>, ExecError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(ScriptedSession {
            connector: self.clone(),
        }))
    }
}

struct Fixture {
    power: Arc<RecordingLine>,
    reset: Arc<RecordingLine>,
    connector: ScriptedConnector,
    cancel: Arc<AtomicBool>,
    event_rx: broadcast::Receiver<RelayEvent>,
}

fn spawn_actor(
    probe: Arc<dyn LivenessProbe>,
    connector: ScriptedConnector,
    max_poll_attempts: u32,
) -> (kameo::actor::ActorRef<HostActor>, Fixture) {
    let power = Arc::new(RecordingLine::default());
    let reset = Arc::new(RecordingLine::default());
    let cancel = Arc::new(AtomicBool::new(false));
    let (event_tx, event_rx) = broadcast::channel(64);

    let table = BootTable {
        default_os: "Ubuntu".to_string(),
        entries: BTreeMap::from([("Windows".to_string(), 2)]),
        grubenv_path: "/boot/grub/grubenv".to_string(),
    };

    let args = HostActorArgs {
        name: "gamer-pc".to_string(),
        power: RelayChannel::new(ChannelId::Power, power.clone()),
        reset: RelayChannel::new(ChannelId::Reset, reset.clone()),
        probe,
        connector: Arc::new(connector.clone()),
        selector: BootSelector::new(table, Duration::from_secs(5)),
        timing: PulseTiming {
            short_press: Duration::from_secs(1),
            long_hold: Duration::from_secs(5),
        },
        poll: PollPolicy {
            interval: Duration::from_secs(5),
            max_attempts: max_poll_attempts,
        },
        cancel: cancel.clone(),
        event_tx,
    };

    let actor_ref = HostActor::spawn(args);

    (
        actor_ref,
        Fixture {
            power,
            reset,
            connector,
            cancel,
            event_rx,
        },
    )
}

fn job() -> Uuid {
    Uuid::new_v4()
}

#[tokio::test(start_paused = true)]
async fn power_on_while_online_takes_no_relay_action() {
    let probe = Arc::new(SeqProbe::new([], true));
    let (actor, fx) = spawn_actor(probe.clone(), ScriptedConnector::default(), 20);

    let outcome = actor
        .ask(PowerOn {
            os: "Ubuntu".to_string(),
            job_id: job(),
        })
        .await
        .unwrap();

    assert_eq!(outcome.kind, OutcomeKind::Aborted);
    assert!(outcome.detail.contains("already online"));
    assert_eq!(fx.power.pulse_count(), 0);
    assert_eq!(fx.reset.pulse_count(), 0);
    assert_eq!(fx.connector.connect_count(), 0);

    actor.stop_gracefully().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn power_on_default_os_is_a_single_power_pulse() {
    // Offline at first check, online on the first poll
    let probe = Arc::new(SeqProbe::new([false, true], true));
    let (actor, fx) = spawn_actor(probe.clone(), ScriptedConnector::default(), 20);

    let outcome = actor
        .ask(PowerOn {
            os: "Ubuntu".to_string(),
            job_id: job(),
        })
        .await
        .unwrap();

    assert_eq!(outcome.kind, OutcomeKind::Success);
    assert_eq!(fx.power.transitions(), vec![true, false]);
    assert_eq!(fx.reset.pulse_count(), 0);
    // Default entry requires no boot-loader action
    assert_eq!(fx.connector.connect_count(), 0);

    actor.stop_gracefully().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn power_on_windows_runs_the_full_sequence() {
    // Initial check offline, then three failed polls before success
    let probe = Arc::new(SeqProbe::new([false, false, false, false, true], true));
    let connector = ScriptedConnector::default();
    let (actor, fx) = spawn_actor(probe.clone(), connector, 20);

    let outcome = actor
        .ask(PowerOn {
            os: "Windows".to_string(),
            job_id: job(),
        })
        .await
        .unwrap();

    assert_eq!(outcome.kind, OutcomeKind::Success);
    // One power pulse, one reset pulse
    assert_eq!(fx.power.transitions(), vec![true, false]);
    assert_eq!(fx.reset.transitions(), vec![true, false]);
    // Initial check plus three misses plus the hit
    assert_eq!(probe.call_count(), 5);
    // One session, two privileged commands
    assert_eq!(fx.connector.connect_count(), 1);
    let commands = fx.connector.commands.lock().unwrap().clone();
    assert_eq!(commands.len(), 2);
    assert!(commands[0].contains("grubenv"));
    assert_eq!(commands[1], "grub-reboot 2");

    actor.stop_gracefully().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn power_on_times_out_after_bounded_polling() {
    let probe = Arc::new(SeqProbe::new([], false));
    let (actor, fx) = spawn_actor(probe.clone(), ScriptedConnector::default(), 4);

    let start = tokio::time::Instant::now();
    let outcome = actor
        .ask(PowerOn {
            os: "Windows".to_string(),
            job_id: job(),
        })
        .await
        .unwrap();

    assert_eq!(outcome.kind, OutcomeKind::Timeout);
    // One pulse hold plus four poll intervals, nothing unbounded
    assert_eq!(start.elapsed(), Duration::from_secs(1 + 4 * 5));
    // Initial check plus the four bounded polls
    assert_eq!(probe.call_count(), 5);
    // Boot-target configuration is skipped entirely
    assert_eq!(fx.connector.connect_count(), 0);
    assert_eq!(fx.reset.pulse_count(), 0);

    actor.stop_gracefully().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn failed_boot_command_never_pulses_reset() {
    let probe = Arc::new(SeqProbe::new([false, true], true));
    let connector = ScriptedConnector::with_statuses([0, 1]);
    let (actor, fx) = spawn_actor(probe.clone(), connector, 20);

    let outcome = actor
        .ask(PowerOn {
            os: "Windows".to_string(),
            job_id: job(),
        })
        .await
        .unwrap();

    assert_eq!(outcome.kind, OutcomeKind::CommandFailure);
    assert!(outcome.output.as_deref().unwrap().contains("permission denied"));
    assert_eq!(fx.power.pulse_count(), 1);
    assert_eq!(fx.reset.pulse_count(), 0);

    actor.stop_gracefully().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn cancellation_stops_polling_and_reports_aborted() {
    let cancel = Arc::new(AtomicBool::new(false));
    // The flag flips after the second probe call, as an operator
    // cancel request would mid-wait
    let probe = Arc::new(SeqProbe::cancelling_after(cancel.clone(), 2));
    let power = Arc::new(RecordingLine::default());
    let reset = Arc::new(RecordingLine::default());
    let (event_tx, _event_rx) = broadcast::channel(64);

    let table = BootTable {
        default_os: "Ubuntu".to_string(),
        entries: BTreeMap::from([("Windows".to_string(), 2)]),
        grubenv_path: "/boot/grub/grubenv".to_string(),
    };
    let connector = ScriptedConnector::default();

    let actor = HostActor::spawn(HostActorArgs {
        name: "gamer-pc".to_string(),
        power: RelayChannel::new(ChannelId::Power, power.clone()),
        reset: RelayChannel::new(ChannelId::Reset, reset.clone()),
        probe: probe.clone(),
        connector: Arc::new(connector.clone()),
        selector: BootSelector::new(table, Duration::from_secs(5)),
        timing: PulseTiming::default(),
        poll: PollPolicy {
            interval: Duration::from_secs(5),
            max_attempts: 20,
        },
        cancel,
        event_tx,
    });

    let outcome = actor
        .ask(PowerOn {
            os: "Windows".to_string(),
            job_id: job(),
        })
        .await
        .unwrap();

    assert_eq!(outcome.kind, OutcomeKind::Aborted);
    // Polling stopped right after the flag flipped
    assert_eq!(probe.call_count(), 2);
    assert_eq!(connector.connect_count(), 0);
    assert_eq!(reset.pulse_count(), 0);
    assert!(!power.currently_asserted());

    actor.stop_gracefully().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn force_shutdown_holds_power_for_the_long_duration() {
    let probe = Arc::new(SeqProbe::new([], true));
    let (actor, fx) = spawn_actor(probe, ScriptedConnector::default(), 20);

    let outcome = actor.ask(ForceShutdown).await.unwrap();

    assert_eq!(outcome.kind, OutcomeKind::Success);
    assert_eq!(fx.power.pulse_count(), 1);
    assert_eq!(fx.power.last_hold(), Some(Duration::from_secs(5)));
    assert_eq!(fx.reset.pulse_count(), 0);

    actor.stop_gracefully().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn plain_switch_presses_pulse_once_and_finish() {
    let probe = Arc::new(SeqProbe::new([], false));
    let (actor, fx) = spawn_actor(probe, ScriptedConnector::default(), 20);

    let outcome = actor.ask(PressReset).await.unwrap();
    assert_eq!(outcome.kind, OutcomeKind::Success);
    assert_eq!(fx.reset.last_hold(), Some(Duration::from_secs(1)));

    let outcome = actor.ask(PressPower).await.unwrap();
    assert_eq!(outcome.kind, OutcomeKind::Success);
    assert_eq!(fx.power.pulse_count(), 1);

    actor.stop_gracefully().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn query_online_is_a_pure_read() {
    let probe = Arc::new(SeqProbe::new([true], false));
    let (actor, fx) = spawn_actor(probe, ScriptedConnector::default(), 20);

    assert!(actor.ask(QueryOnline).await.unwrap());
    assert!(!actor.ask(QueryOnline).await.unwrap());
    assert_eq!(fx.power.pulse_count(), 0);
    assert_eq!(fx.reset.pulse_count(), 0);

    actor.stop_gracefully().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn status_reports_idle_and_last_outcome() {
    let probe = Arc::new(SeqProbe::new([], true));
    let (actor, _fx) = spawn_actor(probe, ScriptedConnector::default(), 20);

    let status = actor.ask(GetStatus).await.unwrap();
    assert_eq!(status.state, OpState::Idle);
    assert!(status.last_outcome.is_none());

    actor.ask(PressPower).await.unwrap();

    let status = actor.ask(GetStatus).await.unwrap();
    assert_eq!(status.name, "gamer-pc");
    assert_eq!(status.state, OpState::Idle);
    assert!(status.last_outcome.unwrap().is_success());

    actor.stop_gracefully().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn operations_emit_broadcast_events() {
    let probe = Arc::new(SeqProbe::new([], true));
    let (actor, mut fx) = spawn_actor(probe, ScriptedConnector::default(), 20);

    actor.ask(PressPower).await.unwrap();

    let mut saw_pulse = false;
    let mut saw_completion = false;
    while let Ok(event) = fx.event_rx.try_recv() {
        match event {
            RelayEvent::RelayPulsed { channel, .. } => {
                assert_eq!(channel, "power");
                saw_pulse = true;
            }
            RelayEvent::OperationCompleted { operation, .. } => {
                assert_eq!(operation, "power_switch");
                saw_completion = true;
            }
            _ => {}
        }
    }
    assert!(saw_pulse);
    assert!(saw_completion);

    actor.stop_gracefully().await.unwrap();
}
