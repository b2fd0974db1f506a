//! Operation state machine types

/// States of an in-flight power/boot operation.
///
/// `Idle` doubles as "done": the actor records the terminal outcome and
/// returns here between operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpState {
    Idle,
    /// Short press on power or reset
    Pulsing,
    /// Bounded liveness polling after the power pulse
    WaitingOnline,
    /// Privileged boot-target command sequence over SSH
    ConfiguringBoot,
    /// Short reset press to reboot into the newly armed entry
    Resetting,
    /// Long hold on power for forced shutdown
    HoldPulsing,
}

impl OpState {
    /// Whether `next` is a legal successor of `self`
    #[must_use]
    pub fn can_transition_to(self, next: OpState) -> bool {
        use OpState::*;
        matches!(
            (self, next),
            (Idle, Pulsing)
                | (Idle, HoldPulsing)
                | (Pulsing, WaitingOnline)
                | (Pulsing, Idle)
                | (WaitingOnline, ConfiguringBoot)
                | (WaitingOnline, Idle)
                | (ConfiguringBoot, Resetting)
                | (ConfiguringBoot, Idle)
                | (Resetting, Idle)
                | (HoldPulsing, Idle)
        )
    }

    /// An operation is in flight
    #[must_use]
    pub fn is_busy(self) -> bool {
        self != OpState::Idle
    }
}

impl std::fmt::Display for OpState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            OpState::Idle => "idle",
            OpState::Pulsing => "pulsing",
            OpState::WaitingOnline => "waiting_online",
            OpState::ConfiguringBoot => "configuring_boot",
            OpState::Resetting => "resetting",
            OpState::HoldPulsing => "hold_pulsing",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_pulse_only_follows_boot_configuration() {
        assert!(OpState::ConfiguringBoot.can_transition_to(OpState::Resetting));
        assert!(!OpState::WaitingOnline.can_transition_to(OpState::Resetting));
        assert!(!OpState::Idle.can_transition_to(OpState::Resetting));
    }

    #[test]
    fn every_busy_state_can_return_to_idle() {
        for state in [
            OpState::Pulsing,
            OpState::WaitingOnline,
            OpState::ConfiguringBoot,
            OpState::Resetting,
            OpState::HoldPulsing,
        ] {
            assert!(state.is_busy());
            assert!(state.can_transition_to(OpState::Idle));
        }
    }
}
