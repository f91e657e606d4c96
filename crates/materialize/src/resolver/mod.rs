//! Resource resolvers.
//!
//! A [`ResourceResolver`] maps a resource name to its bytes. Where those bytes
//! come from (compiled into the binary, held in memory, or shipped in a folder
//! beside the executable) is up to the implementation.

mod directory;
mod embedded;
mod memory;

pub use self::directory::Directory;
pub use self::embedded::Embedded;
pub use self::memory::InMemory;
use crate::error::Result;
use std::borrow::Cow;
use std::io::Read;
use std::sync::Arc;

/// A readable stream of resource content.
pub type BoxRead<'a> = Box<dyn Read + Send + 'a>;

/// Source of named, read-only resources.
///
/// # Examples
///
/// ```
/// use resbuf_materialize::resolver::{InMemory, ResourceResolver};
/// use std::io::Read;
///
/// # fn main() -> resbuf_materialize::error::Result<()> {
/// let resolver = InMemory::with_resources([("greeting.txt", "hello")]);
/// let mut content = String::new();
/// if let Some(mut reader) = resolver.open("greeting.txt")? {
///     reader.read_to_string(&mut content).unwrap();
/// }
/// assert_eq!(content, "hello");
/// assert!(resolver.open("missing.txt")?.is_none());
/// # Ok(())
/// # }
/// ```
pub trait ResourceResolver {
    /// Open a stream over the named resource, or `None` if it does not exist.
    fn open(&self, name: &str) -> Result<Option<BoxRead<'_>>>;

    /// Names of every resource this resolver can enumerate.
    ///
    /// Resolvers that cannot enumerate their contents return an empty list.
    fn names(&self) -> Result<Vec<Cow<'_, str>>> {
        Ok(Vec::new())
    }
}

impl<R: ResourceResolver + ?Sized> ResourceResolver for &R {
    fn open(&self, name: &str) -> Result<Option<BoxRead<'_>>> {
        (**self).open(name)
    }

    fn names(&self) -> Result<Vec<Cow<'_, str>>> {
        (**self).names()
    }
}

impl<R: ResourceResolver + ?Sized> ResourceResolver for Arc<R> {
    fn open(&self, name: &str) -> Result<Option<BoxRead<'_>>> {
        (**self).open(name)
    }

    fn names(&self) -> Result<Vec<Cow<'_, str>>> {
        (**self).names()
    }
}
