//! Internal building blocks driven by the engine's dispatcher loop.

pub(crate) mod watcher;
