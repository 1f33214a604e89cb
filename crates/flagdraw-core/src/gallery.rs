//! Caller-scoped flag persistence and the client-side gallery cache.

use crate::storage::{
    BoxFuture, FlagId, FlagPatch, FlagRecord, NewFlag, Storage, StorageError, StorageResult,
    UserId, ValidationError,
};
use crate::surface::{DrawingSurface, ExportError};
use std::sync::Arc;
use thiserror::Error;

/// Flag operations on behalf of one authenticated caller.
///
/// Records owned by anyone else are indistinguishable from missing ones.
pub trait FlagGateway: Send + Sync {
    /// The caller's flags, in no particular order.
    fn list(&self) -> BoxFuture<'_, StorageResult<Vec<FlagRecord>>>;

    fn get(&self, id: FlagId) -> BoxFuture<'_, StorageResult<Option<FlagRecord>>>;

    fn create(&self, flag: NewFlag) -> BoxFuture<'_, StorageResult<FlagRecord>>;

    /// `None` if the flag is missing or not the caller's.
    fn update(&self, id: FlagId, patch: FlagPatch)
    -> BoxFuture<'_, StorageResult<Option<FlagRecord>>>;

    /// Whether a flag was actually removed.
    fn delete(&self, id: FlagId) -> BoxFuture<'_, StorageResult<bool>>;
}

/// A [`Storage`] bound to a single owner.
pub struct OwnedStore<S: Storage + ?Sized> {
    storage: Arc<S>,
    owner: UserId,
}

impl<S: Storage + ?Sized> OwnedStore<S> {
    pub fn new(storage: Arc<S>, owner: UserId) -> Self {
        Self { storage, owner }
    }

    pub fn owner(&self) -> UserId {
        self.owner
    }
}

impl<S: Storage + ?Sized> Clone for OwnedStore<S> {
    fn clone(&self) -> Self {
        Self {
            storage: Arc::clone(&self.storage),
            owner: self.owner,
        }
    }
}

impl<S: Storage + ?Sized> FlagGateway for OwnedStore<S> {
    fn list(&self) -> BoxFuture<'_, StorageResult<Vec<FlagRecord>>> {
        self.storage.list_flags(self.owner)
    }

    fn get(&self, id: FlagId) -> BoxFuture<'_, StorageResult<Option<FlagRecord>>> {
        self.storage.get_flag(id, self.owner)
    }

    fn create(&self, flag: NewFlag) -> BoxFuture<'_, StorageResult<FlagRecord>> {
        self.storage.create_flag(self.owner, flag)
    }

    fn update(
        &self,
        id: FlagId,
        patch: FlagPatch,
    ) -> BoxFuture<'_, StorageResult<Option<FlagRecord>>> {
        self.storage.update_flag(id, self.owner, patch)
    }

    fn delete(&self, id: FlagId) -> BoxFuture<'_, StorageResult<bool>> {
        self.storage.delete_flag(id, self.owner)
    }
}

/// Gallery errors.
#[derive(Debug, Error)]
pub enum GalleryError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("Failed to export canvas: {0}")]
    Export(#[from] ExportError),
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    #[error("Flag not found: {0}")]
    NotFound(FlagId),
}

pub type GalleryResult<T> = Result<T, GalleryError>;

/// Local cache of the caller's saved flags.
///
/// The cache only changes after the gateway reports success, so a failed
/// request leaves it exactly as it was.
pub struct Gallery<G> {
    gateway: G,
    flags: Vec<FlagRecord>,
}

impl<G: FlagGateway> Gallery<G> {
    /// Create an empty gallery. Call [`Gallery::refresh`] to populate it.
    pub fn new(gateway: G) -> Self {
        Self {
            gateway,
            flags: Vec::new(),
        }
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    /// Cached flags, most recently updated first.
    pub fn flags(&self) -> &[FlagRecord] {
        &self.flags
    }

    pub fn flag(&self, id: FlagId) -> Option<&FlagRecord> {
        self.flags.iter().find(|f| f.id == id)
    }

    /// Reload the cache from the gateway.
    pub async fn refresh(&mut self) -> GalleryResult<&[FlagRecord]> {
        let mut flags = self.gateway.list().await?;
        flags.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then(b.id.cmp(&a.id)));
        self.flags = flags;
        Ok(&self.flags)
    }

    /// Export `surface` and save it as a new flag.
    pub async fn save_new(
        &mut self,
        name: &str,
        surface: &DrawingSurface,
    ) -> GalleryResult<FlagRecord> {
        let flag = NewFlag::new(name, surface.export_image()?).validate()?;
        let record = self.gateway.create(flag).await?;
        log::debug!("Saved flag {} ({:?})", record.id, record.name);
        self.flags.insert(0, record.clone());
        Ok(record)
    }

    /// Replace the image of an existing flag with the current canvas.
    pub async fn overwrite(
        &mut self,
        id: FlagId,
        surface: &DrawingSurface,
    ) -> GalleryResult<FlagRecord> {
        let patch = FlagPatch::image_data(surface.export_image()?).validate()?;
        self.update(id, patch).await
    }

    pub async fn rename(&mut self, id: FlagId, name: &str) -> GalleryResult<FlagRecord> {
        let patch = FlagPatch::name(name).validate()?;
        self.update(id, patch).await
    }

    /// Save a copy of a flag named `"<name> (Copy)"`.
    pub async fn duplicate(&mut self, id: FlagId) -> GalleryResult<FlagRecord> {
        let source = match self.flag(id) {
            Some(flag) => flag.clone(),
            None => self
                .gateway
                .get(id)
                .await?
                .ok_or(GalleryError::NotFound(id))?,
        };

        let mut name = format!("{} (Copy)", source.name);
        if name.chars().count() > crate::storage::MAX_NAME_LEN {
            name = name.chars().take(crate::storage::MAX_NAME_LEN).collect();
        }
        let flag = NewFlag::new(name, source.image_data).validate()?;
        let record = self.gateway.create(flag).await?;
        self.flags.insert(0, record.clone());
        Ok(record)
    }

    pub async fn delete(&mut self, id: FlagId) -> GalleryResult<()> {
        if !self.gateway.delete(id).await? {
            return Err(GalleryError::NotFound(id));
        }
        self.flags.retain(|f| f.id != id);
        Ok(())
    }

    async fn update(&mut self, id: FlagId, patch: FlagPatch) -> GalleryResult<FlagRecord> {
        let record = self
            .gateway
            .update(id, patch)
            .await?
            .ok_or(GalleryError::NotFound(id))?;
        self.flags.retain(|f| f.id != id);
        self.flags.insert(0, record.clone());
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::test_util::block_on;
    use crate::storage::{MemoryStorage, NewUser};
    use crate::tools::ToolConfig;
    use kurbo::Point;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn setup() -> (Arc<MemoryStorage>, UserId, UserId) {
        let storage = Arc::new(MemoryStorage::new());
        let mut ids = Vec::new();
        for name in ["alice", "bob"] {
            let user = block_on(storage.create_user(NewUser {
                username: name.into(),
                password_hash: String::new(),
                email: format!("{}@example.com", name),
                name: name.into(),
            }))
            .unwrap();
            ids.push(user.id);
        }
        (storage, ids[0], ids[1])
    }

    fn drawn_surface() -> DrawingSurface {
        let mut surface = DrawingSurface::new(40, 30);
        let config = ToolConfig::default();
        surface.pointer_down(Point::new(5.0, 5.0), &config);
        surface.pointer_move(Point::new(30.0, 20.0), &config);
        surface.pointer_up();
        surface
    }

    /// Gateway that can be switched to fail every request.
    struct Flaky {
        inner: OwnedStore<MemoryStorage>,
        failing: AtomicBool,
    }

    impl Flaky {
        fn check(&self) -> StorageResult<()> {
            if self.failing.load(Ordering::SeqCst) {
                Err(StorageError::Other("offline".into()))
            } else {
                Ok(())
            }
        }
    }

    impl FlagGateway for Flaky {
        fn list(&self) -> BoxFuture<'_, StorageResult<Vec<FlagRecord>>> {
            Box::pin(async move {
                self.check()?;
                self.inner.list().await
            })
        }

        fn get(&self, id: FlagId) -> BoxFuture<'_, StorageResult<Option<FlagRecord>>> {
            Box::pin(async move {
                self.check()?;
                self.inner.get(id).await
            })
        }

        fn create(&self, flag: NewFlag) -> BoxFuture<'_, StorageResult<FlagRecord>> {
            Box::pin(async move {
                self.check()?;
                self.inner.create(flag).await
            })
        }

        fn update(
            &self,
            id: FlagId,
            patch: FlagPatch,
        ) -> BoxFuture<'_, StorageResult<Option<FlagRecord>>> {
            Box::pin(async move {
                self.check()?;
                self.inner.update(id, patch).await
            })
        }

        fn delete(&self, id: FlagId) -> BoxFuture<'_, StorageResult<bool>> {
            Box::pin(async move {
                self.check()?;
                self.inner.delete(id).await
            })
        }
    }

    #[test]
    fn test_save_and_refresh() {
        let (storage, alice, _) = setup();
        let mut gallery = Gallery::new(OwnedStore::new(storage.clone(), alice));

        let record = block_on(gallery.save_new("  My Flag ", &drawn_surface())).unwrap();
        assert_eq!(record.name, "My Flag");
        assert!(record.image_data.starts_with("data:image/png;base64,"));

        let mut fresh = Gallery::new(OwnedStore::new(storage, alice));
        let flags = block_on(fresh.refresh()).unwrap();
        assert_eq!(flags, &[record][..]);
    }

    #[test]
    fn test_save_detached_surface_fails() {
        let (storage, alice, _) = setup();
        let mut gallery = Gallery::new(OwnedStore::new(storage, alice));
        let surface = DrawingSurface::detached(10, 10, crate::color::Rgba::WHITE);

        let result = block_on(gallery.save_new("Flag", &surface));
        assert!(matches!(
            result,
            Err(GalleryError::Export(ExportError::NoContext))
        ));
        assert!(gallery.flags().is_empty());
    }

    #[test]
    fn test_invalid_name_never_reaches_gateway() {
        let (storage, alice, _) = setup();
        let mut gallery = Gallery::new(OwnedStore::new(storage.clone(), alice));

        let result = block_on(gallery.save_new("   ", &drawn_surface()));
        assert!(matches!(
            result,
            Err(GalleryError::Invalid(ValidationError::EmptyName))
        ));
        assert!(block_on(storage.list_flags(alice)).unwrap().is_empty());
    }

    #[test]
    fn test_rename_and_overwrite() {
        let (storage, alice, _) = setup();
        let mut gallery = Gallery::new(OwnedStore::new(storage, alice));
        let blank = DrawingSurface::new(40, 30);
        let record = block_on(gallery.save_new("Flag", &blank)).unwrap();

        let renamed = block_on(gallery.rename(record.id, "Renamed")).unwrap();
        assert_eq!(renamed.name, "Renamed");
        assert_eq!(renamed.image_data, record.image_data);

        let overwritten = block_on(gallery.overwrite(record.id, &drawn_surface())).unwrap();
        assert_eq!(overwritten.name, "Renamed");
        assert_ne!(overwritten.image_data, record.image_data);
        assert_eq!(gallery.flags().len(), 1);
        assert_eq!(gallery.flag(record.id), Some(&overwritten));
    }

    #[test]
    fn test_duplicate() {
        let (storage, alice, _) = setup();
        let mut gallery = Gallery::new(OwnedStore::new(storage, alice));
        let record = block_on(gallery.save_new("Stripes", &drawn_surface())).unwrap();

        let copy = block_on(gallery.duplicate(record.id)).unwrap();
        assert_ne!(copy.id, record.id);
        assert_eq!(copy.name, "Stripes (Copy)");
        assert_eq!(copy.image_data, record.image_data);
        assert_eq!(gallery.flags().len(), 2);
    }

    #[test]
    fn test_duplicate_truncates_long_name() {
        let (storage, alice, _) = setup();
        let mut gallery = Gallery::new(OwnedStore::new(storage, alice));
        let long = "x".repeat(crate::storage::MAX_NAME_LEN);
        let record = block_on(gallery.save_new(&long, &drawn_surface())).unwrap();

        let copy = block_on(gallery.duplicate(record.id)).unwrap();
        assert_eq!(copy.name.chars().count(), crate::storage::MAX_NAME_LEN);
    }

    #[test]
    fn test_other_owners_flags_are_invisible() {
        let (storage, alice, bob) = setup();
        let mut alices = Gallery::new(OwnedStore::new(storage.clone(), alice));
        let record = block_on(alices.save_new("Mine", &drawn_surface())).unwrap();

        let mut bobs = Gallery::new(OwnedStore::new(storage, bob));
        assert!(block_on(bobs.refresh()).unwrap().is_empty());
        assert!(matches!(
            block_on(bobs.rename(record.id, "Stolen")),
            Err(GalleryError::NotFound(id)) if id == record.id
        ));
        assert!(matches!(
            block_on(bobs.duplicate(record.id)),
            Err(GalleryError::NotFound(_))
        ));
        assert!(matches!(
            block_on(bobs.delete(record.id)),
            Err(GalleryError::NotFound(_))
        ));

        block_on(alices.refresh()).unwrap();
        assert_eq!(alices.flags(), &[record][..]);
    }

    #[test]
    fn test_failed_requests_leave_cache_untouched() {
        let (storage, alice, _) = setup();
        let gateway = Flaky {
            inner: OwnedStore::new(storage, alice),
            failing: AtomicBool::new(false),
        };
        let mut gallery = Gallery::new(gateway);
        let record = block_on(gallery.save_new("Flag", &drawn_surface())).unwrap();
        let before = gallery.flags().to_vec();

        gallery.gateway().failing.store(true, Ordering::SeqCst);
        assert!(block_on(gallery.save_new("Other", &drawn_surface())).is_err());
        assert!(block_on(gallery.rename(record.id, "Renamed")).is_err());
        assert!(block_on(gallery.delete(record.id)).is_err());
        assert!(block_on(gallery.refresh()).is_err());
        assert_eq!(gallery.flags(), &before[..]);

        gallery.gateway().failing.store(false, Ordering::SeqCst);
        block_on(gallery.delete(record.id)).unwrap();
        assert!(gallery.flags().is_empty());
    }
}
