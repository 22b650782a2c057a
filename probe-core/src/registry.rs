use crate::target::DestroyCallback;
use crate::{Error, Target};

/// Handle of a target in a [`Registry`].
///
/// Handles stay valid while other targets are added or removed, unlike the
/// ordinals reported by [`Registry::for_each`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TargetId(u64);

/// The list of targets found by a scan.
///
/// Targets are kept most recently created first, which is also the order
/// ordinals are assigned in. Dropping the registry destroys every target.
#[derive(Debug, Default)]
pub struct Registry {
    targets: Vec<(TargetId, Target)>,
    next_id: u64,
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a target found by a driver and returns its handle.
    pub fn create(&mut self, target: Target) -> TargetId {
        let id = TargetId(self.next_id);
        self.next_id += 1;

        tracing::debug!("Registering target {:?} ({})", id, target.driver_name());
        self.targets.insert(0, (id, target));
        id
    }

    /// Calls `visit` with every target and its 1-based ordinal.
    ///
    /// Returns `false` if there are no targets.
    pub fn for_each(&self, mut visit: impl FnMut(usize, &Target)) -> bool {
        for (ordinal, target) in self.iter() {
            visit(ordinal, target);
        }
        !self.targets.is_empty()
    }

    /// Iterates over the targets together with their 1-based ordinals.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &Target)> + '_ {
        self.targets
            .iter()
            .enumerate()
            .map(|(index, (_, target))| (index + 1, target))
    }

    /// Number of registered targets.
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    /// Returns `true` if no target is registered.
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    fn position(&self, id: TargetId) -> Option<usize> {
        self.targets.iter().position(|(candidate, _)| *candidate == id)
    }

    /// Returns the target `id`, if it is still registered.
    pub fn get(&self, id: TargetId) -> Option<&Target> {
        self.position(id).map(|index| &self.targets[index].1)
    }

    /// Returns the target `id` for modification, if it is still registered.
    pub fn get_mut(&mut self, id: TargetId) -> Option<&mut Target> {
        let index = self.position(id)?;
        Some(&mut self.targets[index].1)
    }

    /// Returns the handle of the target with the given 1-based ordinal.
    pub fn by_ordinal(&self, ordinal: usize) -> Option<TargetId> {
        let index = ordinal.checked_sub(1)?;
        self.targets.get(index).map(|(id, _)| *id)
    }

    /// Attaches to the target `id`, see [`Target::attach`].
    pub fn attach(
        &mut self,
        id: TargetId,
        destroy_callback: Option<DestroyCallback>,
    ) -> Result<&mut Target, Error> {
        let target = self.get_mut(id).ok_or(Error::UnknownTarget(id))?;
        target.attach(destroy_callback)?;
        Ok(target)
    }

    /// Attaches to the target with the given 1-based ordinal.
    pub fn attach_n(
        &mut self,
        ordinal: usize,
        destroy_callback: Option<DestroyCallback>,
    ) -> Result<&mut Target, Error> {
        let id = self
            .by_ordinal(ordinal)
            .ok_or(Error::TargetNotFound(ordinal))?;
        self.attach(id, destroy_callback)
    }

    /// Destroys a single target. Returns `false` if `id` was not registered.
    pub fn remove(&mut self, id: TargetId) -> bool {
        match self.position(id) {
            Some(index) => {
                drop(self.targets.remove(index));
                true
            }
            None => false,
        }
    }

    /// Destroys every target, head of the list first.
    ///
    /// Calling this on an empty registry does nothing.
    pub fn destroy_all(&mut self) {
        if !self.targets.is_empty() {
            tracing::debug!("Destroying {} targets", self.targets.len());
        }
        for (id, target) in self.targets.drain(..) {
            tracing::trace!("Destroying target {:?}", id);
            drop(target);
        }
    }
}

impl Drop for Registry {
    fn drop(&mut self) {
        self.destroy_all();
    }
}
