//! Frame entry point.
//!
//! Every core error is fatal to the frame that raised it but not to the
//! renderer: [`FrameRunner::run`] reports the error, counts the frame as
//! aborted, and hands the error back so the application can decide what to
//! do next (for example retry once with a smaller render target).

use std::fmt::Display;

use glam::Mat4;

use crate::error::PrismError;
use crate::projection::Projection;
use crate::scope::{ObserverScope, TransformScopeManager};

/// Frame counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Frames whose work finished successfully.
    pub completed: u64,
    /// Frames abandoned because of an error.
    pub aborted: u64,
}

/// Runs frames inside an observer scope and reports failures.
#[derive(Debug, Default)]
pub struct FrameRunner {
    index: u64,
    stats: FrameStats,
}

impl FrameRunner {
    /// Creates a runner with zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of the last frame started.
    pub fn frame_index(&self) -> u64 {
        self.index
    }

    /// Returns the frame counters.
    pub fn stats(&self) -> FrameStats {
        self.stats
    }

    /// Runs one frame's work inside an observer scope.
    ///
    /// On error the frame is aborted: every scope, receipt and texture unit
    /// context opened by `f` has already been released by the time this
    /// returns.
    pub fn run<T, E, F>(
        &mut self,
        manager: &TransformScopeManager,
        view: Mat4,
        projection: Projection,
        f: F,
    ) -> Result<T, E>
    where
        E: From<PrismError> + Display,
        F: FnOnce(&ObserverScope<'_>) -> Result<T, E>,
    {
        self.index += 1;
        log::trace!("frame {} begin", self.index);
        let before = manager.state();
        let result = manager.with_observer(view, projection, f);
        debug_assert_eq!(manager.state(), before);
        match &result {
            Ok(_) => {
                self.stats.completed += 1;
                log::trace!("frame {} end", self.index);
            }
            Err(err) => {
                self.stats.aborted += 1;
                log::error!("frame {} aborted: {err}", self.index);
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::Instance;
    use crate::scope::ScopeState;
    use glam::Mat3;

    #[test]
    fn test_completed_frame() {
        let manager = TransformScopeManager::new();
        let mut frames = FrameRunner::new();
        let value = frames
            .run(&manager, Mat4::IDENTITY, Projection::default(), |_| {
                Ok::<_, PrismError>(5)
            })
            .unwrap();
        assert_eq!(value, 5);
        assert_eq!(frames.stats().completed, 1);
        assert_eq!(frames.frame_index(), 1);
    }

    #[test]
    fn test_aborted_frame_leaves_manager_idle() {
        let manager = TransformScopeManager::new();
        let mut frames = FrameRunner::new();
        let instance = Instance::batched(1);
        let result: Result<(), PrismError> =
            frames.run(&manager, Mat4::IDENTITY, Projection::default(), |observer| {
                let _outer = observer.enter_instance(&instance, Mat3::IDENTITY)?;
                let _inner = observer.enter_instance(&instance, Mat3::IDENTITY)?;
                Ok(())
            });
        assert!(matches!(result, Err(PrismError::InstanceAlreadyActive)));
        assert_eq!(manager.state(), ScopeState::Idle);
        assert_eq!(frames.stats().aborted, 1);

        // The next frame runs normally.
        frames
            .run(&manager, Mat4::IDENTITY, Projection::default(), |_| {
                Ok::<_, PrismError>(())
            })
            .unwrap();
        assert_eq!(frames.stats().completed, 1);
    }

    #[test]
    fn test_nested_frame_rejected() {
        let manager = TransformScopeManager::new();
        let mut outer = FrameRunner::new();
        let mut inner = FrameRunner::new();
        let result: Result<(), PrismError> =
            outer.run(&manager, Mat4::IDENTITY, Projection::default(), |_| {
                inner.run(&manager, Mat4::IDENTITY, Projection::default(), |_| Ok(()))
            });
        assert!(matches!(result, Err(PrismError::ObserverAlreadyActive)));
        assert_eq!(inner.stats().aborted, 1);
        assert_eq!(outer.stats().aborted, 1);
        assert_eq!(manager.state(), ScopeState::Idle);
    }

    #[test]
    fn test_nested_frame_leaves_outer_observer_open() {
        let manager = TransformScopeManager::new();
        let mut outer = FrameRunner::new();
        let mut inner = FrameRunner::new();
        outer
            .run(&manager, Mat4::IDENTITY, Projection::default(), |_| {
                let nested: Result<(), PrismError> =
                    inner.run(&manager, Mat4::IDENTITY, Projection::default(), |_| Ok(()));
                assert!(matches!(nested, Err(PrismError::ObserverAlreadyActive)));
                assert_eq!(manager.state(), ScopeState::Observer);
                Ok::<_, PrismError>(())
            })
            .unwrap();
        assert_eq!(inner.stats().aborted, 1);
        assert_eq!(outer.stats().completed, 1);
    }
}
