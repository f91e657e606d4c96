//! Resources embedded into the binary at compile time.
//!
//! Any type deriving [`rust_embed::Embed`] can back a resolver. In debug
//! builds `rust-embed` reads the folder from disk at runtime; release builds
//! carry the bytes inside the executable.

use super::{BoxRead, ResourceResolver};
use crate::error::Result;
use rust_embed::Embed;
use std::borrow::Cow;
use std::io::Cursor;
use std::marker::PhantomData;

/// Resolver over a [`rust_embed::Embed`] asset table.
///
/// # Example
///
/// ```no_run
/// use resbuf_materialize::{Materializer, resolver::Embedded};
/// use rust_embed::Embed;
///
/// #[derive(Embed)]
/// #[folder = "../../assets/fixtures/"]
/// struct Resources;
///
/// # fn main() -> resbuf_materialize::error::Result<()> {
/// let materializer = Materializer::new(Embedded::<Resources>::new())?;
/// let path = materializer.resolve("poem.txt")?;
/// # Ok(())
/// # }
/// ```
pub struct Embedded<E> {
    _assets: PhantomData<fn() -> E>,
}

impl<E: Embed> Embedded<E> {
    pub fn new() -> Self {
        Self { _assets: PhantomData }
    }

    pub fn exists(name: impl AsRef<str>) -> bool {
        E::get(name.as_ref()).is_some()
    }
}

impl<E: Embed> Default for Embedded<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Embed> ResourceResolver for Embedded<E> {
    fn open(&self, name: &str) -> Result<Option<BoxRead<'_>>> {
        Ok(E::get(name).map(|file| Box::new(Cursor::new(file.data)) as BoxRead<'_>))
    }

    fn names(&self) -> Result<Vec<Cow<'_, str>>> {
        Ok(E::iter().collect())
    }
}
