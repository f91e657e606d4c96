//! Materialize bundled resources as real files.
//!
//! Some code insists on a path to a real file and cannot work with bytes held
//! in memory. [`Materializer`] copies a named resource out of a
//! [`ResourceResolver`] into a buffer directory (by default
//! `<temp dir>/resource-buffer`) the first time it is asked for, and returns
//! the path of that copy from then on.
//!
//! The buffer directory belongs to the current process: it is wiped and
//! recreated the first time it is used, and is left in place on exit.
//!
//! ```no_run
//! use resbuf_materialize::{Materializer, resolver::Embedded};
//! use rust_embed::Embed;
//!
//! #[derive(Embed)]
//! #[folder = "../../assets/fixtures/"]
//! struct Resources;
//!
//! # fn main() -> resbuf_materialize::error::Result<()> {
//! let materializer = Materializer::new(Embedded::<Resources>::new())?;
//! let poem = materializer.resolve("poem.txt")?;
//! println!("{}", std::fs::read_to_string(poem).unwrap());
//! # Ok(())
//! # }
//! ```

mod buffer;
pub mod error;
mod materializer;
mod name;
pub mod resolver;

pub use crate::buffer::BufferDirectory;
pub use crate::materializer::Materializer;
pub use crate::name::ResourceName;
pub use crate::resolver::ResourceResolver;
pub use resbuf_config::BufferConfig;
