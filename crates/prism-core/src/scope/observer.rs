//! The observer scope.

use glam::{Mat3, Mat4};

use super::{InstanceScope, InstanceValues, ProjectiveLightScope, ScopeRole, TransformScopeManager};
use crate::error::{PrismError, Result};
use crate::instance::{compose_uv, Instance};
use crate::light::ProjectiveLight;
use crate::projection::Projection;
use crate::transform::ToMatrix;
use crate::view_rays::ViewRays;

/// The camera for one frame.
///
/// Closing this guard deactivates the observer. Every nested scope borrows
/// it, so they are always closed first.
#[derive(Debug)]
pub struct ObserverScope<'m> {
    manager: &'m TransformScopeManager,
}

impl<'m> ObserverScope<'m> {
    pub(super) fn new(manager: &'m TransformScopeManager) -> Self {
        Self { manager }
    }

    /// Returns the world→eye matrix.
    pub fn view_matrix(&self) -> Mat4 {
        self.manager.observer_values().view
    }

    /// Returns the eye→world matrix.
    pub fn view_matrix_inverse(&self) -> Mat4 {
        self.manager.observer_values().view_inverse
    }

    /// Returns the eye→clip matrix.
    pub fn projection_matrix(&self) -> Mat4 {
        self.manager.observer_values().projection
    }

    /// Returns the clip→eye matrix.
    pub fn projection_matrix_inverse(&self) -> Mat4 {
        self.manager.observer_values().projection_inverse
    }

    /// Returns the projection descriptor the matrix was built from.
    pub fn projection(&self) -> Projection {
        self.manager.observer_values().projection_desc
    }

    /// Returns the combined world→clip matrix.
    pub fn view_projection_matrix(&self) -> Mat4 {
        let values = self.manager.observer_values();
        values.projection * values.view
    }

    /// Returns the frustum corner rays for position reconstruction.
    pub fn view_rays(&self) -> ViewRays {
        self.manager.observer_values().view_rays
    }

    /// Opens an instance scope relative to this observer.
    ///
    /// The UV matrix is the instance's own UV transform composed with
    /// `material_uv`.
    pub fn enter_instance(&self, instance: &Instance, material_uv: Mat3) -> Result<InstanceScope<'_>> {
        let uv = compose_uv(instance.uv_matrix(), material_uv);
        self.enter_generic_transform(&instance.model_matrix(), uv)
    }

    /// Opens an instance scope from an explicit transform and UV matrix.
    pub fn enter_generic_transform(
        &self,
        transform: &impl ToMatrix,
        uv_matrix: Mat3,
    ) -> Result<InstanceScope<'_>> {
        self.manager
            .transition_enter(ScopeRole::Instance, Some(ScopeRole::Observer))?;
        let view = self.manager.observer_values().view;
        self.manager
            .set_instance_values(InstanceValues::new(view, transform.to_matrix(), uv_matrix));
        Ok(InstanceScope::new(self.manager, ScopeRole::Observer))
    }

    /// Opens a projective light scope relative to this observer.
    pub fn enter_projective_light(&self, light: &ProjectiveLight) -> Result<ProjectiveLightScope<'_>> {
        self.manager
            .transition_enter(ScopeRole::ProjectiveLight, Some(ScopeRole::Observer))?;
        self.manager.set_light_values(super::light::light_values(
            light,
            self.manager.observer_values().view_inverse,
        ));
        Ok(ProjectiveLightScope::new(self.manager, ScopeRole::Observer))
    }

    /// Runs `f` inside an instance scope.
    pub fn with_instance<T, E, F>(
        &self,
        instance: &Instance,
        material_uv: Mat3,
        f: F,
    ) -> std::result::Result<T, E>
    where
        E: From<PrismError>,
        F: FnOnce(&InstanceScope<'_>) -> std::result::Result<T, E>,
    {
        let scope = self.enter_instance(instance, material_uv)?;
        f(&scope)
    }

    /// Runs `f` inside an instance scope built from an explicit transform.
    pub fn with_generic_transform<T, E, F>(
        &self,
        transform: &impl ToMatrix,
        uv_matrix: Mat3,
        f: F,
    ) -> std::result::Result<T, E>
    where
        E: From<PrismError>,
        F: FnOnce(&InstanceScope<'_>) -> std::result::Result<T, E>,
    {
        let scope = self.enter_generic_transform(transform, uv_matrix)?;
        f(&scope)
    }

    /// Runs `f` inside a projective light scope.
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

impl Drop for ObserverScope<'_> {
    fn drop(&mut self) {
        self.manager.transition_exit(ScopeRole::Observer);
    }
}
