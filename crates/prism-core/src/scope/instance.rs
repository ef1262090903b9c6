//! The instance scope.

use glam::{Mat3, Mat4};

use super::{ProjectiveLightScope, ScopeRole, TransformScopeManager};
use crate::error::{PrismError, Result};
use crate::light::ProjectiveLight;

/// One drawable instance, relative to an observer or to a projective light.
///
/// Under an observer, [`model_view_matrix`](Self::model_view_matrix) maps
/// object space to eye space. Under a light it maps object space to the
/// light's eye space, and [`view_matrix`](Self::view_matrix) and
/// [`projection_matrix`](Self::projection_matrix) are the light's.
#[derive(Debug)]
pub struct InstanceScope<'p> {
    manager: &'p TransformScopeManager,
    parent: ScopeRole,
}

impl<'p> InstanceScope<'p> {
    pub(super) fn new(manager: &'p TransformScopeManager, parent: ScopeRole) -> Self {
        Self { manager, parent }
    }

    /// Returns the role this instance was opened under.
    pub fn parent(&self) -> ScopeRole {
        self.parent
    }

    /// Returns the object→world matrix.
    pub fn model_matrix(&self) -> Mat4 {
        self.manager.instance_values().model
    }

    /// Returns the object→eye matrix (object→light-eye under a light).
    pub fn model_view_matrix(&self) -> Mat4 {
        self.manager.instance_values().model_view
    }

    /// Returns the inverse-transpose of the upper 3×3 of the model-view matrix.
    pub fn normal_matrix(&self) -> Mat3 {
        self.manager.instance_values().normal
    }

    /// Returns the texture-space transform.
    pub fn uv_matrix(&self) -> Mat3 {
        self.manager.instance_values().uv
    }

    /// Returns the parent's world→eye matrix.
    pub fn view_matrix(&self) -> Mat4 {
        match self.parent {
            ScopeRole::ProjectiveLight => self.manager.light_values().view,
            _ => self.manager.observer_values().view,
        }
    }

    /// Returns the parent's eye→world matrix.
    pub fn view_matrix_inverse(&self) -> Mat4 {
        match self.parent {
            ScopeRole::ProjectiveLight => self.manager.light_values().view.inverse(),
            _ => self.manager.observer_values().view_inverse,
        }
    }

    /// Returns the parent's projection matrix.
    pub fn projection_matrix(&self) -> Mat4 {
        match self.parent {
            ScopeRole::ProjectiveLight => self.manager.light_values().projection,
            _ => self.manager.observer_values().projection,
        }
    }

    /// Returns the parent's inverse projection matrix.
    pub fn projection_matrix_inverse(&self) -> Mat4 {
        match self.parent {
            ScopeRole::ProjectiveLight => self.manager.light_values().projection_inverse,
            _ => self.manager.observer_values().projection_inverse,
        }
    }

    /// Returns the object→clip matrix.
    pub fn model_view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix() * self.model_view_matrix()
    }

    /// Opens a projective light scope nested under this instance.
    ///
    /// Only instances opened directly under the observer can do this.
    pub fn enter_projective_light(&self, light: &ProjectiveLight) -> Result<ProjectiveLightScope<'_>> {
        self.manager
            .transition_enter(ScopeRole::ProjectiveLight, Some(ScopeRole::Instance))?;
        self.manager.set_light_values(super::light::light_values(
            light,
            self.manager.observer_values().view_inverse,
        ));
        Ok(ProjectiveLightScope::new(self.manager, ScopeRole::Instance))
    }

    /// Runs `f` inside a projective light scope nested under this instance.
    pub fn with_projective_light<T, E, F>(
        &self,
        light: &ProjectiveLight,
        f: F,
    ) -> std::result::Result<T, E>
    where
        E: From<PrismError>,
        F: FnOnce(&ProjectiveLightScope<'_>) -> std::result::Result<T, E>,
    {
        let scope = self.enter_projective_light(light)?;
        f(&scope)
    }
}

impl Drop for InstanceScope<'_> {
    fn drop(&mut self) {
        self.manager.transition_exit(ScopeRole::Instance);
    }
}
