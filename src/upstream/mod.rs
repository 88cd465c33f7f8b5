pub mod registry;

pub use registry::{load_upstreams, normalize_upstream, UpstreamList};
