//! Control-byte alphabet.
//!
//! The first byte of the shared record is a coarse command/status channel
//! between the controller and the solver. The alphabet is closed and
//! baked into the generated solver source at generation time; it is never
//! negotiated at runtime.
//!
//! Transitions: the owner writes `Initializing` when it creates the
//! region and `Running` once the solver is spawned. The controller may
//! write `Paused`/`Running` to pause and resume, and `StopRequested` to
//! ask the solver to wind down. Only the solver writes `Finished`.

use crate::error::RegionError;

/// One-byte control states shared by both processes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ControlState {
    /// Owner is still writing initial parameter values.
    Initializing = b'i',
    /// Solver should integrate (and is free to read parameters).
    Running = b'r',
    /// Solver should hold; the controller may rewrite parameters.
    Paused = b'p',
    /// Controller asks the solver to exit at the next step boundary.
    StopRequested = b's',
    /// Solver has completed the integration span.
    Finished = b'f',
}

impl ControlState {
    /// The wire byte for this state.
    pub fn byte(self) -> u8 {
        self as u8
    }

    /// Decode a control byte; bytes outside the alphabet are an error.
    pub fn from_byte(byte: u8) -> Result<Self, RegionError> {
        match byte {
            b'i' => Ok(ControlState::Initializing),
            b'r' => Ok(ControlState::Running),
            b'p' => Ok(ControlState::Paused),
            b's' => Ok(ControlState::StopRequested),
            b'f' => Ok(ControlState::Finished),
            _ => Err(RegionError::UnknownControlByte { byte }),
        }
    }
}

impl std::fmt::Display for ControlState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ControlState::Initializing => "initializing",
            ControlState::Running => "running",
            ControlState::Paused => "paused",
            ControlState::StopRequested => "stop-requested",
            ControlState::Finished => "finished",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_round_trip() {
        for state in [
            ControlState::Initializing,
            ControlState::Running,
            ControlState::Paused,
            ControlState::StopRequested,
            ControlState::Finished,
        ] {
            assert_eq!(ControlState::from_byte(state.byte()).unwrap(), state);
        }
    }

    #[test]
    fn unknown_byte_rejected() {
        let err = ControlState::from_byte(b'x').unwrap_err();
        assert!(matches!(err, RegionError::UnknownControlByte { byte: b'x' }));
    }
}
