//! Transform scopes.
//!
//! The [`TransformScopeManager`] owns one set of matrix registers per scope
//! role and hands out scope guards that expose them read-only:
//!
//! ```text
//! TransformScopeManager
//!   └─ ObserverScope            view, projection, view rays
//!        ├─ InstanceScope       model, model-view, normal, uv
//!        │    └─ ProjectiveLightScope
//!        └─ ProjectiveLightScope  light view, light projection, eye→light-eye
//!             └─ InstanceScope  (model-view relative to the light)
//! ```
//!
//! A guard borrows its parent, so it cannot outlive it, and closing a guard
//! (dropping it, or returning from a `with_*` callback) deactivates its role.
//! Accessors return copies, never references into the registers. The manager
//! is single-threaded: its state lives in plain [`Cell`]s and it is not `Sync`.
//!
//! ```
//! use glam::{Mat3, Mat4, Vec3};
//! use prism_core::{Instance, Projection, Transform, TransformScopeManager};
//!
//! let manager = TransformScopeManager::new();
//! let observer = manager.enter_observer(Mat4::IDENTITY, Projection::default())?;
//! let instance = Instance::single(Transform::from_translation(Vec3::X));
//! let scope = observer.enter_instance(&instance, Mat3::IDENTITY)?;
//! assert_eq!(scope.model_view_matrix(), Mat4::from_translation(Vec3::X));
//! # Ok::<(), prism_core::PrismError>(())
//! ```

mod instance;
mod light;
mod observer;
mod state;

use std::cell::Cell;

use glam::{Mat3, Mat4};

use crate::error::{PrismError, Result};
use crate::projection::Projection;
use crate::view_rays::ViewRays;

pub use instance::InstanceScope;
pub use light::ProjectiveLightScope;
pub use observer::ObserverScope;
pub use state::{ScopeRole, ScopeState};

/// Observer registers.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ObserverValues {
    pub view: Mat4,
    pub view_inverse: Mat4,
    pub projection: Mat4,
    pub projection_inverse: Mat4,
    pub projection_desc: Projection,
    pub view_rays: ViewRays,
}

impl ObserverValues {
    fn new(view: Mat4, projection_desc: Projection) -> Self {
        let projection = projection_desc.to_matrix();
        let projection_inverse = projection.inverse();
        Self {
            view,
            view_inverse: view.inverse(),
            projection,
            projection_inverse,
            projection_desc,
            view_rays: ViewRays::from_inverse_projection(projection_inverse),
        }
    }
}

impl Default for ObserverValues {
    fn default() -> Self {
        Self::new(Mat4::IDENTITY, Projection::default())
    }
}

/// Instance registers.
#[derive(Debug, Clone, Copy)]
pub(crate) struct InstanceValues {
    pub model: Mat4,
    pub model_view: Mat4,
    pub normal: Mat3,
    pub uv: Mat3,
}

impl InstanceValues {
    /// Derives every instance matrix from scratch.
    pub(crate) fn new(parent_view: Mat4, model: Mat4, uv: Mat3) -> Self {
        let model_view = parent_view * model;
        Self {
            model,
            model_view,
            normal: crate::transform::normal_matrix(model_view),
            uv,
        }
    }
}

impl Default for InstanceValues {
    fn default() -> Self {
        Self::new(Mat4::IDENTITY, Mat4::IDENTITY, Mat3::IDENTITY)
    }
}

/// Projective light registers.
#[derive(Debug, Clone, Copy)]
pub(crate) struct LightValues {
    pub view: Mat4,
    pub projection: Mat4,
    pub projection_inverse: Mat4,
    pub eye_to_light_eye: Mat4,
    pub projection_desc: Projection,
}

impl Default for LightValues {
    fn default() -> Self {
        let projection_desc = Projection::default();
        let projection = projection_desc.to_matrix();
        Self {
            view: Mat4::IDENTITY,
            projection,
            projection_inverse: projection.inverse(),
            eye_to_light_eye: Mat4::IDENTITY,
            projection_desc,
        }
    }
}

/// Owner of the scope state and the matrix registers.
///
/// Create one per renderer and open an [`ObserverScope`] per frame.
#[derive(Debug, Default)]
pub struct TransformScopeManager {
    state: Cell<ScopeState>,
    observer: Cell<ObserverValues>,
    instance: Cell<InstanceValues>,
    light: Cell<LightValues>,
}

impl TransformScopeManager {
    /// Creates a manager with no active scope.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current scope stack.
    pub fn state(&self) -> ScopeState {
        self.state.get()
    }

    /// Returns whether an observer scope is open.
    pub fn is_observer_active(&self) -> bool {
        self.state.get().is_active(ScopeRole::Observer)
    }

    /// Returns whether an instance scope is open.
    pub fn is_instance_active(&self) -> bool {
        self.state.get().is_active(ScopeRole::Instance)
    }

    /// Returns whether a projective light scope is open.
    pub fn is_projective_light_active(&self) -> bool {
        self.state.get().is_active(ScopeRole::ProjectiveLight)
    }

    /// Opens the observer scope for a frame.
    ///
    /// Fails with [`PrismError::ObserverAlreadyActive`] if one is already open.
    pub fn enter_observer(&self, view: Mat4, projection: Projection) -> Result<ObserverScope<'_>> {
        self.transition_enter(ScopeRole::Observer, None)?;
        self.observer.set(ObserverValues::new(view, projection));
        Ok(ObserverScope::new(self))
    }

    /// Runs `f` inside an observer scope.
    ///
    /// The scope is closed when `f` returns, whether it succeeds, fails or
    /// unwinds.
    pub fn with_observer<T, E, F>(
        &self,
        view: Mat4,
        projection: Projection,
        f: F,
    ) -> std::result::Result<T, E>
    where
        E: From<PrismError>,
        F: FnOnce(&ObserverScope<'_>) -> std::result::Result<T, E>,
    {
        let observer = self.enter_observer(view, projection)?;
        f(&observer)
    }

    pub(crate) fn transition_enter(&self, role: ScopeRole, parent: Option<ScopeRole>) -> Result<()> {
        let current = self.state.get();
        match current.enter(role, parent) {
            Ok(next) => {
                log::trace!("scope enter {role:?}: {current:?} -> {next:?}");
                self.state.set(next);
                Ok(())
            }
            Err(err) => {
                log::error!("cannot open {role:?} scope in state {current:?}: {err}");
                Err(err)
            }
        }
    }

    pub(crate) fn transition_exit(&self, role: ScopeRole) {
        let current = self.state.get();
        let (next, clean) = current.exit(role);
        if clean {
            log::trace!("scope exit {role:?}: {current:?} -> {next:?}");
        } else {
            log::error!(
                "{role:?} scope closed out of order in state {current:?}; nested scopes were leaked"
            );
        }
        self.state.set(next);
    }

    pub(crate) fn observer_values(&self) -> ObserverValues {
        debug_assert!(self.is_observer_active(), "observer matrices read after scope closed");
        self.observer.get()
    }

    pub(crate) fn instance_values(&self) -> InstanceValues {
        debug_assert!(self.is_instance_active(), "instance matrices read after scope closed");
        self.instance.get()
    }

    pub(crate) fn light_values(&self) -> LightValues {
        debug_assert!(
            self.is_projective_light_active(),
            "projective light matrices read after scope closed"
        );
        self.light.get()
    }

    pub(crate) fn set_instance_values(&self, values: InstanceValues) {
        self.instance.set(values);
    }

    pub(crate) fn set_light_values(&self, values: LightValues) {
        self.light.set(values);
    }
}
