//! Apply ordering for activation-gated resources
//!
//! Some properties cannot be changed while a service is administratively
//! active. When the service is (or may be) shut, or is about to be, every
//! other property is written first and the gate last. A service that is up
//! and stays up gets the gate handled first, then the rest.

use crate::value::TriState;
use std::fmt;

/// Administrative state of an activation-gated object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    Shut,
    NotShut,
    Unknown,
}

impl From<TriState> for Activation {
    /// The gate reads `true` when the object is shut
    fn from(value: TriState) -> Self {
        match value {
            TriState::True => Self::Shut,
            TriState::False => Self::NotShut,
            TriState::Unknown => Self::Unknown,
        }
    }
}

impl fmt::Display for Activation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Shut => "shut",
            Self::NotShut => "no shut",
            Self::Unknown => "unknown",
        })
    }
}

/// Whether the remaining properties must be written before the gate
///
/// Only an object that is up and is not being shut may take the gate first.
pub fn requires_prior_shutdown(current: Activation, desired: Option<Activation>) -> bool {
    !(current == Activation::NotShut && matches!(desired, None | Some(Activation::NotShut)))
}

/// A step of a flush
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// The activation gate, written only when staged
    Activation,
    /// Plain properties with a standalone setter
    Properties,
    /// Composite group submissions
    Groups,
}

const GATE_LAST: [Phase; 3] = [Phase::Properties, Phase::Groups, Phase::Activation];
const GATE_FIRST: [Phase; 3] = [Phase::Activation, Phase::Properties, Phase::Groups];
const UNGATED: [Phase; 2] = [Phase::Properties, Phase::Groups];

/// Order of the flush phases for one object
pub fn apply_phases(
    gated: bool,
    new_object: bool,
    current: Activation,
    desired: Option<Activation>,
) -> &'static [Phase] {
    if !gated {
        &UNGATED
    } else if new_object || requires_prior_shutdown(current, desired) {
        &GATE_LAST
    } else {
        &GATE_FIRST
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_up_and_staying_up_takes_gate_first() {
        assert!(!requires_prior_shutdown(Activation::NotShut, None));
        assert!(!requires_prior_shutdown(
            Activation::NotShut,
            Some(Activation::NotShut)
        ));
        assert_eq!(
            apply_phases(true, false, Activation::NotShut, None),
            &GATE_FIRST
        );
    }

    #[test]
    fn test_shut_object_is_configured_before_activation() {
        assert!(requires_prior_shutdown(
            Activation::Shut,
            Some(Activation::NotShut)
        ));
        assert_eq!(
            apply_phases(true, false, Activation::Shut, Some(Activation::NotShut)),
            &GATE_LAST
        );
    }

    #[test]
    fn test_shutting_down_writes_gate_last() {
        assert!(requires_prior_shutdown(
            Activation::NotShut,
            Some(Activation::Shut)
        ));
    }

    #[test]
    fn test_unknown_state_is_treated_as_shut() {
        assert!(requires_prior_shutdown(Activation::Unknown, None));
        assert!(requires_prior_shutdown(
            Activation::Unknown,
            Some(Activation::NotShut)
        ));
    }

    #[test]
    fn test_new_object_writes_gate_last() {
        assert_eq!(
            apply_phases(true, true, Activation::Unknown, Some(Activation::NotShut)),
            &GATE_LAST
        );
    }

    #[test]
    fn test_ungated_kinds_skip_activation() {
        let phases = apply_phases(false, true, Activation::Unknown, None);
        assert!(!phases.contains(&Phase::Activation));
        assert_eq!(phases, &UNGATED);
    }

    #[test]
    fn test_gate_token_maps_to_activation() {
        assert_eq!(Activation::from(TriState::True), Activation::Shut);
        assert_eq!(Activation::from(TriState::False), Activation::NotShut);
        assert_eq!(Activation::from(TriState::Unknown), Activation::Unknown);
    }
}
