//! bootrelay-core: Power/boot orchestration logic
//!
//! Implements the `HostActor` using the kameo framework, the relay
//! actuator, the boot-target selector and the operation state machine.

pub mod actor;
pub mod boot;
pub mod config;
pub mod error;
pub mod message;
pub mod notify;
pub mod relay;
pub mod state;

pub use actor::host::{HostActor, HostActorArgs};
pub use boot::{BootSelector, BootTable, render_grubenv};
pub use config::{PollPolicy, PulseTiming};
pub use error::CoreError;
pub use message::{
    ForceShutdown, GetStatus, HostStatus, OperationOutcome, OutcomeKind, PowerOn, PressPower,
    PressReset, QueryOnline,
};
pub use notify::{Notifier, NotifyLevel, Reporter};
pub use relay::{ChannelId, RelayChannel, RelayError, RelayLine, SysfsLine};
pub use state::OpState;
