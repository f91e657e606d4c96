use crate::buffer::BufferDirectory;
use crate::error::{ErrorKind, Result};
use crate::name::ResourceName;
use crate::resolver::ResourceResolver;
use exn::ResultExt;
use resbuf_config::BufferConfig;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::instrument;

/// Copies resources out of a [`ResourceResolver`] into the buffer directory
/// and hands back real file paths.
///
/// Construct one per process and share it by reference or [`Arc`](std::sync::Arc).
/// The buffer directory is wiped and created on the first call to
/// [`resolve()`](Self::resolve), never during construction.
pub struct Materializer<R> {
    buffer: BufferDirectory,
    resolver: R,
}

impl<R: ResourceResolver> Materializer<R> {
    /// Use the buffer location from the environment (see [`BufferConfig::load`]).
    pub fn new(resolver: R) -> Result<Self> {
        let config = BufferConfig::load().map_err(ErrorKind::config)?;
        Ok(Self::with_config(&config, resolver))
    }

    pub fn with_config(config: &BufferConfig, resolver: R) -> Self {
        Self { buffer: BufferDirectory::new(config), resolver }
    }

    pub fn buffer(&self) -> &BufferDirectory {
        &self.buffer
    }

    pub fn resolver(&self) -> &R {
        &self.resolver
    }

    /// Return a path to a real file holding the named resource's content.
    ///
    /// The first call for a name copies the resource into the buffer
    /// directory; later calls return the existing file without reading the
    /// resource again, even if the resource has changed since.
    #[instrument(skip(self))]
    pub fn resolve(&self, name: &str) -> Result<PathBuf> {
        let name = ResourceName::parse(name)?;
        let target = self.buffer.prepare()?.join(name.as_str());
        if entry_exists(&target).or_raise(|| ErrorKind::Io)? {
            tracing::debug!(path = %target.display(), "Resource already materialized");
            return Ok(target);
        }
        let Some(mut reader) = self.resolver.open(name.as_str())? else {
            exn::bail!(ErrorKind::NotFound(name.to_string()));
        };
        // `create_new` fails instead of overwriting if something raced us here.
        let mut file = OpenOptions::new().write(true).create_new(true).open(&target).or_raise(|| ErrorKind::Io)?;
        let copied = io::copy(&mut reader, &mut file).and_then(|bytes| file.flush().map(|()| bytes));
        drop(file);
        let bytes = match copied {
            Ok(bytes) => bytes,
            Err(e) => {
                // A partial file would be returned as a cache hit next time.
                if let Err(cleanup) = fs::remove_file(&target) {
                    tracing::warn!(path = %target.display(), error = %cleanup, "Partially written resource left behind");
                }
                return Err(e).or_raise(|| ErrorKind::Io);
            },
        };
        tracing::debug!(path = %target.display(), bytes, "Resource materialized");
        Ok(target)
    }

    /// Returns `true` if the named resource already has a copy in the buffer
    /// directory. Does not prepare (or wipe) the buffer directory.
    #[instrument(skip(self))]
    pub fn is_materialized(&self, name: &str) -> Result<bool> {
        let name = ResourceName::parse(name)?;
        if !self.buffer.is_prepared() {
            return Ok(false);
        }
        entry_exists(&self.buffer.path().join(name.as_str())).or_raise(|| ErrorKind::Io)
    }

    /// Materialize every resource the resolver can enumerate.
    ///
    /// Names that are not a single path segment cannot live in the flat buffer
    /// directory and are skipped. Stops at the first failure.
    #[instrument(skip_all)]
    pub fn resolve_all(&self) -> Result<Vec<PathBuf>> {
        let names = self.resolver.names()?;
        let mut paths = Vec::with_capacity(names.len());
        for name in names {
            if ResourceName::parse(&name).is_err() {
                tracing::debug!(name = %name, "Skipping resource that is not a single path segment");
                continue;
            }
            paths.push(self.resolve(&name)?);
        }
        Ok(paths)
    }
}

/// Any entry counts, including a dangling symlink.
fn entry_exists(path: &Path) -> io::Result<bool> {
    match fs::symlink_metadata(path) {
        Ok(_) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::{BoxRead, Embedded, InMemory};
    use rstest::rstest;
    use rust_embed::Embed;
    use std::borrow::Cow;
    use std::sync::Barrier;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use tempfile::TempDir;

    #[derive(Embed)]
    #[folder = "../../assets/fixtures/"]
    struct Fixtures;

    /// Counts how often resources are opened.
    #[derive(Default)]
    struct Counting {
        inner: InMemory,
        opened: AtomicUsize,
    }
    impl ResourceResolver for Counting {
        fn open(&self, name: &str) -> Result<Option<BoxRead<'_>>> {
            self.opened.fetch_add(1, Ordering::SeqCst);
            self.inner.open(name)
        }

        fn names(&self) -> Result<Vec<Cow<'_, str>>> {
            self.inner.names()
        }
    }

    /// Yields a few bytes, then fails mid-stream.
    struct Interrupted;
    impl ResourceResolver for Interrupted {
        fn open(&self, _name: &str) -> Result<Option<BoxRead<'_>>> {
            struct Reader(bool);
            impl io::Read for Reader {
                fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
                    if std::mem::replace(&mut self.0, true) {
                        return Err(io::Error::other("connection reset"));
                    }
                    let n = buf.len().min(3);
                    buf[..n].fill(b'A');
                    Ok(n)
                }
            }
            Ok(Some(Box::new(Reader(false))))
        }
    }

    fn materializer<R: ResourceResolver>(resolver: R) -> (TempDir, Materializer<R>) {
        let temp_dir = tempfile::tempdir().unwrap();
        let config = BufferConfig::new(temp_dir.path(), "resource-buffer").unwrap();
        (temp_dir, Materializer::with_config(&config, resolver))
    }

    fn buffer_entries(materializer: &Materializer<impl ResourceResolver>) -> usize {
        fs::read_dir(materializer.buffer().path()).unwrap().count()
    }

    #[test]
    fn test_resolve_embedded_poem() {
        let (_temp_dir, materializer) = materializer(Embedded::<Fixtures>::new());
        let path = materializer.resolve("poem.txt").unwrap();
        assert_eq!(path, materializer.buffer().path().join("poem.txt"));
        let poem = fs::read_to_string(&path).unwrap();
        assert!(poem.contains("Universal File Loader"));
    }

    #[test]
    fn test_content_is_byte_identical() {
        let (_temp_dir, materializer) = materializer(Embedded::<Fixtures>::new());
        let path = materializer.resolve("blob.bin").unwrap();
        let expected = Fixtures::get("blob.bin").unwrap().data;
        assert_eq!(fs::read(path).unwrap(), &*expected);
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let resolver = Counting { inner: InMemory::with_resources([("x", "content")]), ..Default::default() };
        let (_temp_dir, materializer) = materializer(resolver);
        let first = materializer.resolve("x").unwrap();
        let second = materializer.resolve("x").unwrap();
        assert_eq!(first, second);
        assert_eq!(materializer.resolver().opened.load(Ordering::SeqCst), 1);
        assert_eq!(buffer_entries(&materializer), 1);
    }

    #[test]
    fn test_cache_hit_ignores_changed_resource() {
        let (_temp_dir, mut materializer) = materializer(InMemory::with_resources([("x", "original")]));
        let path = materializer.resolve("x").unwrap();
        materializer.resolver.insert("x", "changed");
        assert_eq!(materializer.resolve("x").unwrap(), path);
        assert_eq!(fs::read_to_string(path).unwrap(), "original");
    }

    #[rstest]
    #[case("a/b")]
    #[case("nested/skipped.txt")]
    #[case("..")]
    #[case("")]
    fn test_invalid_name_touches_nothing(#[case] name: &str) {
        let (_temp_dir, materializer) = materializer(Counting::default());
        let err = materializer.resolve(name).unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidName(_)));
        assert_eq!(materializer.resolver().opened.load(Ordering::SeqCst), 0);
        assert!(!materializer.buffer().path().exists());
    }

    #[test]
    fn test_not_found_creates_nothing() {
        let (_temp_dir, materializer) = materializer(Embedded::<Fixtures>::new());
        let err = materializer.resolve("doesNotExist").unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(name) if name == "doesNotExist"));
        assert_eq!(buffer_entries(&materializer), 0);
    }

    #[test]
    fn test_fresh_start_wipes_leftovers() {
        let (temp_dir, materializer) = materializer(Embedded::<Fixtures>::new());
        let stale = temp_dir.path().join("resource-buffer");
        fs::create_dir_all(&stale).unwrap();
        fs::write(stale.join("leftover.txt"), b"from a previous run").unwrap();

        materializer.resolve("poem.txt").unwrap();
        assert!(!stale.join("leftover.txt").exists());
        assert!(stale.join("poem.txt").is_file());
    }

    #[test]
    fn test_stale_copy_with_same_name_is_replaced_on_fresh_start() {
        let (temp_dir, materializer) = materializer(InMemory::with_resources([("x", "fresh")]));
        let stale = temp_dir.path().join("resource-buffer");
        fs::create_dir_all(&stale).unwrap();
        fs::write(stale.join("x"), b"stale").unwrap();

        let path = materializer.resolve("x").unwrap();
        assert_eq!(fs::read_to_string(path).unwrap(), "fresh");
    }

    #[test]
    fn test_second_materializer_shares_buffer_without_wiping() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config = BufferConfig::new(temp_dir.path(), "resource-buffer").unwrap();
        let first = Materializer::with_config(&config, InMemory::with_resources([("a", "1")]));
        let second = Materializer::with_config(&config, InMemory::with_resources([("b", "2")]));

        let a = first.resolve("a").unwrap();
        let b = second.resolve("b").unwrap();
        assert!(a.is_file());
        assert!(b.is_file());
        assert!(second.is_materialized("a").unwrap());
    }

    #[test]
    fn test_is_materialized() {
        let (_temp_dir, materializer) = materializer(InMemory::with_resources([("x", "content")]));
        assert!(!materializer.is_materialized("x").unwrap());
        materializer.resolve("x").unwrap();
        assert!(materializer.is_materialized("x").unwrap());
        assert!(!materializer.is_materialized("y").unwrap());
        assert!(materializer.is_materialized("a/b").is_err());
    }

    #[test]
    fn test_resolve_all_skips_nested_names() {
        let (_temp_dir, materializer) = materializer(Embedded::<Fixtures>::new());
        let mut paths = materializer.resolve_all().unwrap();
        paths.sort();
        let buffer = materializer.buffer().path();
        assert_eq!(paths, vec![buffer.join("blob.bin"), buffer.join("poem.txt")]);
        assert!(!buffer.join("nested").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_wipe_leaves_symlink_targets_alone() {
        use std::os::unix::fs::symlink;

        let (temp_dir, materializer) = materializer(Embedded::<Fixtures>::new());
        let outside = temp_dir.path().join("outside.txt");
        fs::write(&outside, b"precious").unwrap();
        let stale = temp_dir.path().join("resource-buffer");
        fs::create_dir_all(&stale).unwrap();
        symlink(&outside, stale.join("link")).unwrap();

        materializer.resolve("poem.txt").unwrap();
        assert!(fs::symlink_metadata(stale.join("link")).is_err());
        assert_eq!(fs::read(&outside).unwrap(), b"precious");
    }

    #[test]
    fn test_failed_copy_is_io_error_and_not_cached() {
        let (_temp_dir, materializer) = materializer(Interrupted);
        let err = materializer.resolve("x").unwrap_err();
        assert!(matches!(&*err, ErrorKind::Io));
        assert!(!materializer.buffer().path().join("x").exists());
        assert!(!materializer.is_materialized("x").unwrap());
        // A retry fails again instead of handing back the truncated copy.
        let err = materializer.resolve("x").unwrap_err();
        assert!(matches!(&*err, ErrorKind::Io));
    }

    #[test]
    fn test_concurrent_first_use_wipes_once() {
        const THREADS: usize = 8;
        let temp_dir = tempfile::tempdir().unwrap();
        let config = BufferConfig::new(temp_dir.path(), "resource-buffer").unwrap();
        let barrier = Barrier::new(THREADS);
        let paths: Vec<PathBuf> = thread::scope(|scope| {
            let handles: Vec<_> = (0..THREADS)
                .map(|i| {
                    let (config, barrier) = (&config, &barrier);
                    scope.spawn(move || {
                        let name = format!("resource-{i}.txt");
                        let materializer =
                            Materializer::with_config(config, InMemory::with_resources([(name.clone(), name.clone())]));
                        barrier.wait();
                        materializer.resolve(&name).unwrap()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        for (i, path) in paths.iter().enumerate() {
            assert_eq!(fs::read_to_string(path).unwrap(), format!("resource-{i}.txt"));
        }
        assert_eq!(fs::read_dir(config.path()).unwrap().count(), THREADS);
    }
}
