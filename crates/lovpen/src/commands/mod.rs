//! CLI command implementations.

pub(crate) mod plugins;
pub(crate) mod render;
pub(crate) mod resources;

pub(crate) use plugins::PluginsCommand;
pub(crate) use render::RenderArgs;
pub(crate) use resources::ResourcesArgs;
