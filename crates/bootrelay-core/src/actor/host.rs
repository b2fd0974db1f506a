//! `HostActor`: Power/boot orchestration for the controlled host
//!
//! One actor per host. The kameo mailbox processes one message at a
//! time, which gives the required one-operation-in-flight discipline:
//! a second request during a bounded online wait queues behind it and
//! never interleaves relay activity.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use kameo::actor::{ActorRef, WeakActorRef};
use kameo::error::ActorStopReason;
use kameo::message::{Context, Message};
use kameo::prelude::*;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use bootrelay_api::events::RelayEvent;
use bootrelay_exec::traits::{LivenessProbe, SessionConnector};

use crate::boot::BootSelector;
use crate::config::{PollPolicy, PulseTiming};
use crate::error::CoreError;
use crate::message::{
    ForceShutdown, GetStatus, HostStatus, OperationOutcome, OutcomeKind, PowerOn, PressPower,
    PressReset, QueryOnline,
};
use crate::relay::{ChannelId, RelayChannel};
use crate::state::OpState;

/// Arguments for spawning a `HostActor`
pub struct HostActorArgs {
    /// Host display name (for logs and events)
    pub name: String,
    /// Power switch channel
    pub power: RelayChannel,
    /// Reset switch channel
    pub reset: RelayChannel,
    /// Liveness probe
    pub probe: Arc<dyn LivenessProbe>,
    /// Session connector for privileged commands
    pub connector: Arc<dyn SessionConnector>,
    /// Boot-target selector
    pub selector: BootSelector,
    /// Pulse durations
    pub timing: PulseTiming,
    /// Online-wait policy
    pub poll: PollPolicy,
    /// Cooperative cancellation flag, checked between poll iterations
    pub cancel: Arc<AtomicBool>,
    /// Event broadcast sender
    pub event_tx: broadcast::Sender<RelayEvent>,
}

/// Per-host actor owning the relay channels and the operation state machine
pub struct HostActor {
    name: String,
    state: OpState,
    last_outcome: Option<OperationOutcome>,
    power: RelayChannel,
    reset: RelayChannel,
    probe: Arc<dyn LivenessProbe>,
    connector: Arc<dyn SessionConnector>,
    selector: BootSelector,
    timing: PulseTiming,
    poll: PollPolicy,
    cancel: Arc<AtomicBool>,
    event_tx: broadcast::Sender<RelayEvent>,
}

enum Wait {
    Online { attempts: u32 },
    TimedOut,
    Cancelled,
}

impl HostActor {
    /// Get the host name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get current state
    #[must_use]
    pub fn state(&self) -> OpState {
        self.state
    }

    fn set_state(&mut self, new_state: OpState) {
        debug_assert!(
            self.state.can_transition_to(new_state),
            "illegal transition {} -> {}",
            self.state,
            new_state
        );

        let old_state = self.state;
        self.state = new_state;

        info!(
            host = %self.name,
            from = %old_state,
            to = %new_state,
            "state transition"
        );

        let event = RelayEvent::StateChanged {
            host: self.name.clone(),
            from: old_state.to_string(),
            to: new_state.to_string(),
        };
        // Ignore send errors (no subscribers is fine)
        let _ = self.event_tx.send(event);
    }

    /// Record the terminal outcome, emit its event and return to idle
    fn finish(&mut self, operation: &str, outcome: OperationOutcome) -> OperationOutcome {
        if self.state.is_busy() {
            self.set_state(OpState::Idle);
        }

        let event = if outcome.is_success() {
            info!(
                host = %self.name,
                operation,
                detail = %outcome.detail,
                "operation completed"
            );
            RelayEvent::OperationCompleted {
                host: self.name.clone(),
                operation: operation.to_string(),
                kind: outcome.kind.to_string(),
                detail: outcome.detail.clone(),
            }
        } else {
            warn!(
                host = %self.name,
                operation,
                kind = %outcome.kind,
                detail = %outcome.detail,
                "operation did not succeed"
            );
            RelayEvent::OperationFailed {
                host: self.name.clone(),
                operation: operation.to_string(),
                kind: outcome.kind.to_string(),
                detail: outcome.detail.clone(),
            }
        };
        let _ = self.event_tx.send(event);

        self.last_outcome = Some(outcome.clone());
        outcome
    }

    async fn pulse(
        &mut self,
        channel: ChannelId,
        hold: std::time::Duration,
    ) -> Result<(), CoreError> {
        let result = match channel {
            ChannelId::Power => self.power.pulse(hold).await,
            ChannelId::Reset => self.reset.pulse(hold).await,
        };

        match result {
            Ok(()) => {
                let _ = self.event_tx.send(RelayEvent::RelayPulsed {
                    host: self.name.clone(),
                    channel: channel.to_string(),
                    hold_ms: hold.as_millis() as u64,
                });
                Ok(())
            }
            Err(e) => {
                // Actuator faults are fatal for the operation; leave the
                // state machine consistent before surfacing them.
                self.set_state(OpState::Idle);
                Err(e.into())
            }
        }
    }

    /// Poll liveness on a fixed interval up to the configured bound.
    ///
    /// The only suspension point of an operation; also the cancellation
    /// point. A set cancel flag stops polling before the next probe.
    async fn wait_for_online(&self) -> Wait {
        for attempt in 1..=self.poll.max_attempts {
            if self.cancel.load(Ordering::Relaxed) {
                return Wait::Cancelled;
            }

            tokio::time::sleep(self.poll.interval).await;

            if self.cancel.load(Ordering::Relaxed) {
                return Wait::Cancelled;
            }
            if self.probe.is_online().await {
                return Wait::Online { attempts: attempt };
            }
        }
        Wait::TimedOut
    }

    fn outcome_from_error(error: CoreError) -> OperationOutcome {
        use bootrelay_exec::ExecError;

        match error {
            CoreError::Session(ExecError::AuthenticationFailed(detail))
            | CoreError::Session(ExecError::SshKeyError(detail)) => OperationOutcome {
                kind: OutcomeKind::AuthFailure,
                detail: format!("remote authentication failed: {detail}"),
                output: None,
            },
            CoreError::Session(ExecError::Timeout { timeout }) => OperationOutcome {
                kind: OutcomeKind::Timeout,
                detail: format!("host did not respond within {timeout:?}"),
                output: None,
            },
            CoreError::CommandFailed {
                status,
                stdout,
                stderr,
            } => {
                let output = if stdout.is_empty() && stderr.is_empty() {
                    None
                } else if stderr.is_empty() {
                    Some(stdout)
                } else {
                    Some(format!("{stdout}\n{stderr}"))
                };
                OperationOutcome {
                    kind: OutcomeKind::CommandFailure,
                    detail: format!("boot-target command exited with status {status}"),
                    output,
                }
            }
            other => OperationOutcome {
                kind: OutcomeKind::CommandFailure,
                detail: other.to_string(),
                output: None,
            },
        }
    }
}

impl Actor for HostActor {
    type Args = HostActorArgs;
    type Error = CoreError;

    async fn on_start(args: Self::Args, actor_ref: ActorRef<Self>) -> Result<Self, Self::Error> {
        info!(host = %args.name, id = %actor_ref.id(), "HostActor starting");

        Ok(Self {
            name: args.name,
            state: OpState::Idle,
            last_outcome: None,
            power: args.power,
            reset: args.reset,
            probe: args.probe,
            connector: args.connector,
            selector: args.selector,
            timing: args.timing,
            poll: args.poll,
            cancel: args.cancel,
            event_tx: args.event_tx,
        })
    }

    async fn on_stop(
        &mut self,
        _actor_ref: WeakActorRef<Self>,
        reason: ActorStopReason,
    ) -> Result<(), Self::Error> {
        info!(host = %self.name, reason = ?reason, "HostActor stopping");
        Ok(())
    }
}

// ============================================================================
// Message Handlers
// ============================================================================

impl Message<PowerOn> for HostActor {
    type Reply = Result<OperationOutcome, CoreError>;

    async fn handle(
        &mut self,
        msg: PowerOn,
        _ctx: &mut Context<Self, Self::Reply>,
    ) -> Self::Reply {
        self.cancel.store(false, Ordering::Relaxed);

        if !self.selector.table().is_known(&msg.os) {
            return Ok(self.finish(
                "power_on",
                OperationOutcome::aborted(format!("unknown OS \"{}\"", msg.os)),
            ));
        }

        // Pulsing a running machine would shut it down instead of booting it
        if self.probe.is_online().await {
            return Ok(self.finish(
                "power_on",
                OperationOutcome::aborted("host is already online, power off first"),
            ));
        }

        self.set_state(OpState::Pulsing);
        self.pulse(ChannelId::Power, self.timing.short_press).await?;

        self.set_state(OpState::WaitingOnline);
        let wait = self.wait_for_online().await;

        let online = match wait {
            Wait::Cancelled => {
                return Ok(self.finish("power_on", OperationOutcome::aborted("operation cancelled")));
            }
            Wait::TimedOut => {
                return Ok(self.finish(
                    "power_on",
                    OperationOutcome::timeout(format!(
                        "host did not come online within {:?}",
                        self.poll.budget()
                    )),
                ));
            }
            Wait::Online { attempts } => attempts,
        };

        info!(host = %self.name, attempts = online, "host came online");

        if self.selector.table().is_default(&msg.os) {
            // The initial pulse already boots the default entry
            return Ok(self.finish(
                "power_on",
                OperationOutcome::success(format!("host is booting {}", msg.os)),
            ));
        }

        self.set_state(OpState::ConfiguringBoot);
        match self
            .selector
            .select_next_boot(self.connector.as_ref(), msg.job_id, &msg.os)
            .await
        {
            Ok(()) => {
                self.set_state(OpState::Resetting);
                self.pulse(ChannelId::Reset, self.timing.short_press).await?;
                Ok(self.finish(
                    "power_on",
                    OperationOutcome::success(format!("host is rebooting into {}", msg.os)),
                ))
            }
            Err(e @ CoreError::Relay(_)) => Err(e),
            Err(e) => {
                // Rebooting without a confirmed boot-target change would
                // silently boot the wrong OS, so no reset pulse here.
                error!(host = %self.name, error = %e, "boot-target configuration failed");
                Ok(self.finish("power_on", Self::outcome_from_error(e)))
            }
        }
    }
}

impl Message<PressPower> for HostActor {
    type Reply = Result<OperationOutcome, CoreError>;

    async fn handle(
        &mut self,
        _msg: PressPower,
        _ctx: &mut Context<Self, Self::Reply>,
    ) -> Self::Reply {
        self.set_state(OpState::Pulsing);
        self.pulse(ChannelId::Power, self.timing.short_press).await?;
        Ok(self.finish("power_switch", OperationOutcome::success("power switch pressed")))
    }
}

impl Message<PressReset> for HostActor {
    type Reply = Result<OperationOutcome, CoreError>;

    async fn handle(
        &mut self,
        _msg: PressReset,
        _ctx: &mut Context<Self, Self::Reply>,
    ) -> Self::Reply {
        self.set_state(OpState::Pulsing);
        self.pulse(ChannelId::Reset, self.timing.short_press).await?;
        Ok(self.finish("reset_switch", OperationOutcome::success("reset switch pressed")))
    }
}

impl Message<ForceShutdown> for HostActor {
    type Reply = Result<OperationOutcome, CoreError>;

    async fn handle(
        &mut self,
        _msg: ForceShutdown,
        _ctx: &mut Context<Self, Self::Reply>,
    ) -> Self::Reply {
        self.set_state(OpState::HoldPulsing);
        self.pulse(ChannelId::Power, self.timing.long_hold).await?;
        Ok(self.finish("force_shutdown", OperationOutcome::success("host powered off")))
    }
}

impl Message<QueryOnline> for HostActor {
    type Reply = bool;

    async fn handle(
        &mut self,
        _msg: QueryOnline,
        _ctx: &mut Context<Self, Self::Reply>,
    ) -> Self::Reply {
        self.probe.is_online().await
    }
}

impl Message<GetStatus> for HostActor {
    type Reply = HostStatus;

    async fn handle(
        &mut self,
        _msg: GetStatus,
        _ctx: &mut Context<Self, Self::Reply>,
    ) -> Self::Reply {
        HostStatus {
            name: self.name.clone(),
            state: self.state,
            last_outcome: self.last_outcome.clone(),
        }
    }
}
