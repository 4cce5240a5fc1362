//! Named byte resources that certificate stores are read from.

use std::collections::HashMap;
use std::io;
use std::path::{Component, Path, PathBuf};

/// Source of named byte resources, such as keystore files shipped next to a
/// service binary.
pub trait ResourceSource: Send + Sync {
    /// Reads the whole resource.
    ///
    /// # Errors
    /// Returns `NotFound` for unknown names, or any I/O error from the backing storage.
    fn read(&self, name: &str) -> io::Result<Vec<u8>>;
}

/// Resources resolved as files relative to a root directory.
///
/// Names must be relative and may not climb out of the root with `..`.
#[derive(Debug, Clone)]
pub struct DirResources {
    root: PathBuf,
}

impl DirResources {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, name: &str) -> io::Result<PathBuf> {
        let relative = Path::new(name);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if name.is_empty() || escapes {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("resource name '{name}' must be a relative path inside the resource root"),
            ));
        }
        Ok(self.root.join(relative))
    }
}

impl ResourceSource for DirResources {
    fn read(&self, name: &str) -> io::Result<Vec<u8>> {
        let path = self.resolve(name)?;
        tracing::trace!(path = %path.display(), "reading resource");
        std::fs::read(path)
    }
}

/// Fixed set of resources held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryResources {
    entries: HashMap<String, Vec<u8>>,
}

impl InMemoryResources {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a resource.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.insert(name, bytes);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.entries.insert(name.into(), bytes.into());
    }
}

impl ResourceSource for InMemoryResources {
    fn read(&self, name: &str) -> io::Result<Vec<u8>> {
        self.entries.get(name).cloned().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("no resource named '{name}'"))
        })
    }
}
