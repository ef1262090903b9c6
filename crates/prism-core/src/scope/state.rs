//! The scope state machine.
//!
//! Scopes form a stack of depth at most three: an observer at the bottom,
//! then an instance or a projective light, then the other one. Each state
//! below names the whole stack, bottom first.

use crate::error::{PrismError, Result};

/// One of the three nestable scope roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopeRole {
    /// The camera for the frame.
    Observer,
    /// A drawable instance.
    Instance,
    /// A projective light.
    ProjectiveLight,
}

/// The active scope stack of a [`super::TransformScopeManager`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScopeState {
    /// Nothing active.
    #[default]
    Idle,
    /// Observer only.
    Observer,
    /// Observer → instance.
    ObserverInstance,
    /// Observer → projective light.
    ObserverLight,
    /// Observer → instance → projective light.
    ObserverInstanceLight,
    /// Observer → projective light → instance.
    ObserverLightInstance,
}

impl ScopeState {
    /// Returns whether `role` is anywhere on the stack.
    pub fn is_active(self, role: ScopeRole) -> bool {
        match role {
            ScopeRole::Observer => self != ScopeState::Idle,
            ScopeRole::Instance => matches!(
                self,
                ScopeState::ObserverInstance
                    | ScopeState::ObserverInstanceLight
                    | ScopeState::ObserverLightInstance
            ),
            ScopeRole::ProjectiveLight => matches!(
                self,
                ScopeState::ObserverLight
                    | ScopeState::ObserverInstanceLight
                    | ScopeState::ObserverLightInstance
            ),
        }
    }

    /// Returns the number of active scopes.
    pub fn depth(self) -> usize {
        match self {
            ScopeState::Idle => 0,
            ScopeState::Observer => 1,
            ScopeState::ObserverInstance | ScopeState::ObserverLight => 2,
            ScopeState::ObserverInstanceLight | ScopeState::ObserverLightInstance => 3,
        }
    }

    /// Returns the innermost active role.
    pub fn top(self) -> Option<ScopeRole> {
        match self {
            ScopeState::Idle => None,
            ScopeState::Observer => Some(ScopeRole::Observer),
            ScopeState::ObserverInstance | ScopeState::ObserverLightInstance => {
                Some(ScopeRole::Instance)
            }
            ScopeState::ObserverLight | ScopeState::ObserverInstanceLight => {
                Some(ScopeRole::ProjectiveLight)
            }
        }
    }

    /// Returns the state after opening `role` as a child of `parent`.
    ///
    /// `parent` is `None` only for the observer. Reopening an active role
    /// fails with that role's `*AlreadyActive` error; opening under a parent
    /// that is not the innermost scope fails with the error for whichever
    /// scope is in the way.
    pub fn enter(self, role: ScopeRole, parent: Option<ScopeRole>) -> Result<ScopeState> {
        if self.is_active(role) {
            return Err(already_active(role));
        }
        match (role, parent) {
            (ScopeRole::Observer, None) => Ok(ScopeState::Observer),
            (ScopeRole::Observer, Some(parent)) => Err(inactive(parent)),
            (_, None) => Err(PrismError::ObserverInactive),
            (_, Some(parent)) if !self.is_active(parent) => Err(inactive(parent)),
            (_, Some(parent)) if parent == role => Err(already_active(role)),
            (ScopeRole::Instance, Some(ScopeRole::Observer)) => match self {
                ScopeState::Observer => Ok(ScopeState::ObserverInstance),
                _ => Err(PrismError::ProjectiveLightAlreadyActive),
            },
            (ScopeRole::Instance, Some(ScopeRole::ProjectiveLight)) => match self {
                ScopeState::ObserverLight => Ok(ScopeState::ObserverLightInstance),
                _ => Err(PrismError::InstanceAlreadyActive),
            },
            (ScopeRole::ProjectiveLight, Some(ScopeRole::Observer)) => match self {
                ScopeState::Observer => Ok(ScopeState::ObserverLight),
                _ => Err(PrismError::InstanceAlreadyActive),
            },
            (ScopeRole::ProjectiveLight, Some(ScopeRole::Instance)) => match self {
                ScopeState::ObserverInstance => Ok(ScopeState::ObserverInstanceLight),
                _ => Err(PrismError::ProjectiveLightAlreadyActive),
            },
            (ScopeRole::Instance | ScopeRole::ProjectiveLight, Some(_)) => {
                Err(already_active(role))
            }
        }
    }

    /// Returns the state after closing `role`, and whether `role` was the
    /// innermost scope.
    ///
    /// Closing a role also closes everything nested inside it, so the result
    /// is always consistent even when a child scope guard was leaked.
    pub fn exit(self, role: ScopeRole) -> (ScopeState, bool) {
        let clean = self.top() == Some(role);
        let next = match (self, role) {
            (_, ScopeRole::Observer) => ScopeState::Idle,
            (ScopeState::ObserverInstance | ScopeState::ObserverInstanceLight, ScopeRole::Instance)
            | (ScopeState::ObserverLight | ScopeState::ObserverLightInstance, ScopeRole::ProjectiveLight) => {
                ScopeState::Observer
            }
            (ScopeState::ObserverLightInstance, ScopeRole::Instance) => ScopeState::ObserverLight,
            (ScopeState::ObserverInstanceLight, ScopeRole::ProjectiveLight) => {
                ScopeState::ObserverInstance
            }
            (state, _) => state,
        };
        (next, clean)
    }
}

fn already_active(role: ScopeRole) -> PrismError {
    match role {
        ScopeRole::Observer => PrismError::ObserverAlreadyActive,
        ScopeRole::Instance => PrismError::InstanceAlreadyActive,
        ScopeRole::ProjectiveLight => PrismError::ProjectiveLightAlreadyActive,
    }
}

fn inactive(role: ScopeRole) -> PrismError {
    match role {
        ScopeRole::Observer => PrismError::ObserverInactive,
        ScopeRole::Instance => PrismError::InstanceInactive,
        ScopeRole::ProjectiveLight => PrismError::ProjectiveLightInactive,
    }
}
