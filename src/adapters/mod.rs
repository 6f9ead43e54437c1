// Adapters layer: concrete implementations of the domain ports (data service, page rendering, output files).

pub mod ecmwf;
pub mod renderer;
pub mod sink;

pub use ecmwf::{EcmwfClient, ServerConfig};
pub use renderer::{HttpPageRenderer, LanguagePreference};
pub use sink::{ConcatenatedSink, FileSink, JsonArraySink, OutputFormat};
