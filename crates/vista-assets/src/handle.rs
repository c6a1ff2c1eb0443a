use std::marker::PhantomData;

/// Slot of a loaded asset inside the [`AssetServer`](crate::AssetServer)
/// that created it.
pub type AssetId = usize;

/// A typed handle referencing a loaded asset in the AssetServer.
///
/// Handles are only meaningful for the server that issued them.
#[derive(Debug)]
pub struct AssetHandle<T> {
    id: AssetId,
    _marker: PhantomData<fn() -> T>,
}

impl<T> AssetHandle<T> {
    pub(crate) fn new(id: AssetId) -> Self {
        Self {
            id,
            _marker: PhantomData,
        }
    }

    /// The server-local ID of this asset.
    pub fn id(&self) -> AssetId {
        self.id
    }

    pub(crate) fn slot(&self) -> usize {
        self.id
    }
}

impl<T> Clone for AssetHandle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for AssetHandle<T> {}

impl<T> PartialEq for AssetHandle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<T> Eq for AssetHandle<T> {}

impl<T> std::hash::Hash for AssetHandle<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}
