//! The projective light scope.

use glam::{Mat3, Mat4, Vec3};

use super::{InstanceScope, InstanceValues, LightValues, ScopeRole, TransformScopeManager};
use crate::error::{PrismError, Result};
use crate::instance::{compose_uv, Instance};
use crate::light::ProjectiveLight;
use crate::projection::Projection;
use crate::transform::ToMatrix;

/// Derives the light registers for `light` seen from an observer whose
/// eye→world matrix is `observer_view_inverse`.
pub(super) fn light_values(light: &ProjectiveLight, observer_view_inverse: Mat4) -> LightValues {
    let view = light.view_matrix();
    let projection = light.projection_matrix();
    LightValues {
        view,
        projection,
        projection_inverse: projection.inverse(),
        eye_to_light_eye: view * observer_view_inverse,
        projection_desc: light.projection,
    }
}

/// A projective light, relative to the observer or to an instance.
///
/// The plain `view_matrix`/`projection_matrix` accessors return the
/// observer's matrices; the light's own live under the `projective_` names.
#[derive(Debug)]
pub struct ProjectiveLightScope<'p> {
    manager: &'p TransformScopeManager,
    parent: ScopeRole,
}

impl<'p> ProjectiveLightScope<'p> {
    pub(super) fn new(manager: &'p TransformScopeManager, parent: ScopeRole) -> Self {
        Self { manager, parent }
    }

    /// Returns the role this light was opened under.
    pub fn parent(&self) -> ScopeRole {
        self.parent
    }

    /// Returns the observer's world→eye matrix.
    pub fn view_matrix(&self) -> Mat4 {
        self.manager.observer_values().view
    }

    /// Returns the observer's eye→world matrix.
    pub fn view_matrix_inverse(&self) -> Mat4 {
        self.manager.observer_values().view_inverse
    }

    /// Returns the observer's projection matrix.
    pub fn projection_matrix(&self) -> Mat4 {
        self.manager.observer_values().projection
    }

    /// Returns the observer's inverse projection matrix.
    pub fn projection_matrix_inverse(&self) -> Mat4 {
        self.manager.observer_values().projection_inverse
    }

    /// Returns the world→light-eye matrix.
    pub fn projective_view_matrix(&self) -> Mat4 {
        self.manager.light_values().view
    }

    /// Returns the light-eye→light-clip matrix.
    pub fn projective_projection_matrix(&self) -> Mat4 {
        self.manager.light_values().projection
    }

    /// Returns the light-clip→light-eye matrix.
    pub fn projective_projection_matrix_inverse(&self) -> Mat4 {
        self.manager.light_values().projection_inverse
    }

    /// Returns the light's projection descriptor.
    pub fn projective_projection(&self) -> Projection {
        self.manager.light_values().projection_desc
    }

    /// Returns the observer-eye→light-eye matrix.
    pub fn eye_to_light_eye_matrix(&self) -> Mat4 {
        self.manager.light_values().eye_to_light_eye
    }

    /// Returns the observer-eye→light-clip matrix used for shadow lookups.
    pub fn eye_to_light_clip_matrix(&self) -> Mat4 {
        let values = self.manager.light_values();
        values.projection * values.eye_to_light_eye
    }

    /// Returns the light position in the observer's eye space.
    pub fn position_eye(&self) -> Vec3 {
        self.manager
            .light_values()
            .eye_to_light_eye
            .inverse()
            .transform_point3(Vec3::ZERO)
    }

    /// Returns the instance's model→light-eye matrix.
    ///
    /// `None` unless this light was opened under an instance.
    pub fn model_to_light_eye_matrix(&self) -> Option<Mat4> {
        (self.parent == ScopeRole::Instance)
            .then(|| self.manager.light_values().view * self.manager.instance_values().model)
    }

    /// Returns the instance's model→light-clip matrix, for projecting the
    /// light onto the instance it was opened under.
    ///
    /// `None` unless this light was opened under an instance.
    pub fn model_to_light_clip_matrix(&self) -> Option<Mat4> {
        self.model_to_light_eye_matrix()
            .map(|model_to_light| self.manager.light_values().projection * model_to_light)
    }

    /// Opens an instance scope relative to this light, typically a shadow caster.
    ///
    /// Only lights opened directly under the observer can do this.
    pub fn enter_instance(&self, instance: &Instance, material_uv: Mat3) -> Result<InstanceScope<'_>> {
        let uv = compose_uv(instance.uv_matrix(), material_uv);
        self.enter_generic_transform(&instance.model_matrix(), uv)
    }

    /// Opens an instance scope relative to this light from an explicit transform.
    pub fn enter_generic_transform(
        &self,
        transform: &impl ToMatrix,
        uv_matrix: Mat3,
    ) -> Result<InstanceScope<'_>> {
        self.manager
            .transition_enter(ScopeRole::Instance, Some(ScopeRole::ProjectiveLight))?;
        let view = self.manager.light_values().view;
        self.manager
            .set_instance_values(InstanceValues::new(view, transform.to_matrix(), uv_matrix));
        Ok(InstanceScope::new(self.manager, ScopeRole::ProjectiveLight))
    }

    /// Runs `f` inside an instance scope nested under this light.
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

    /// Runs `f` inside an instance scope nested under this light, built from
    /// an explicit transform.
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
}

impl Drop for ProjectiveLightScope<'_> {
    fn drop(&mut self) {
        self.manager.transition_exit(ScopeRole::ProjectiveLight);
    }
}
