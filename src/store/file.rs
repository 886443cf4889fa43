//! File-backed [`SessionStore`], the desktop analog of the browser's origin-scoped storage.

// std
use std::{
	collections::BTreeMap,
	fs::{self, File},
	io::Write,
	path::{Path, PathBuf},
};
// self
use crate::{
	_prelude::*,
	auth::TokenPair,
	store::{ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, SessionStore, StoreError, StoreFuture},
};

/// Persists the token pair to a JSON file after each mutation.
///
/// The file holds both secrets under the fixed storage keys. Loading tolerates a missing,
/// empty, or unreadable file (logged-out), and a file carrying only one of the two keys also
/// reads back as absent: a session without a refresh path is logged out.
#[derive(Clone, Debug)]
pub struct FileStore {
	path: PathBuf,
	inner: Arc<RwLock<Option<TokenPair>>>,
}
impl FileStore {
	/// Opens (or creates) a store at the provided path, eagerly loading any existing pair.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
		let path = path.into();

		Self::ensure_parent_exists(&path)?;

		let snapshot = Self::load_snapshot(&path);

		Ok(Self { path, inner: Arc::new(RwLock::new(snapshot)) })
	}

	fn load_snapshot(path: &Path) -> Option<TokenPair> {
		let bytes = fs::read(path).ok()?;

		if bytes.is_empty() {
			return None;
		}

		let entries: BTreeMap<String, String> = serde_json::from_slice(&bytes).ok()?;
		let access = entries.get(ACCESS_TOKEN_KEY)?;
		let refresh = entries.get(REFRESH_TOKEN_KEY)?;

		Some(TokenPair::new(access, refresh))
	}

	fn ensure_parent_exists(path: &Path) -> Result<(), StoreError> {
		if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
			fs::create_dir_all(parent).map_err(|e| StoreError::Backend {
				message: format!("Failed to create store directory {}: {e}", parent.display()),
			})?;
		}
		Ok(())
	}

	fn persist(&self, contents: &Option<TokenPair>) -> Result<(), StoreError> {
		Self::ensure_parent_exists(&self.path)?;

		let entries: BTreeMap<&str, &str> = match contents {
			Some(pair) => BTreeMap::from_iter([
				(ACCESS_TOKEN_KEY, pair.access_token.expose()),
				(REFRESH_TOKEN_KEY, pair.refresh_token.expose()),
			]),
			None => BTreeMap::new(),
		};
		let serialized =
			serde_json::to_vec_pretty(&entries).map_err(|e| StoreError::Serialization {
				message: format!("Failed to serialize token snapshot: {e}"),
			})?;
		let mut tmp_path = self.path.clone();

		tmp_path.set_extension("tmp");

		{
			let mut file = File::create(&tmp_path).map_err(|e| StoreError::Backend {
				message: format!("Failed to create {}: {e}", tmp_path.display()),
			})?;

			file.write_all(&serialized).map_err(|e| StoreError::Backend {
				message: format!("Failed to write {}: {e}", tmp_path.display()),
			})?;
			file.sync_all().map_err(|e| StoreError::Backend {
				message: format!("Failed to sync {}: {e}", tmp_path.display()),
			})?;
		}

		fs::rename(&tmp_path, &self.path).map_err(|e| StoreError::Backend {
			message: format!("Failed to replace {}: {e}", self.path.display()),
		})
	}
}
impl SessionStore for FileStore {
	fn load(&self) -> StoreFuture<'_, Option<TokenPair>> {
		Box::pin(async move { Ok(self.inner.read().clone()) })
	}

	fn save(&self, pair: TokenPair) -> StoreFuture<'_, ()> {
		Box::pin(async move {
			let mut guard = self.inner.write();
			let next = Some(pair);

			self.persist(&next)?;
			*guard = next;

			Ok(())
		})
	}

	fn clear(&self) -> StoreFuture<'_, ()> {
		Box::pin(async move {
			let mut guard = self.inner.write();

			self.persist(&None)?;
			*guard = None;

			Ok(())
		})
	}
}
