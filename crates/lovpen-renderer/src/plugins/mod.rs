//! Built-in transform plugins.
//!
//! Structural plugins (run first):
//! - [`EmbedPlugin`] (`embed`)
//! - [`CalloutPlugin`] (`callout`)
//! - [`FootnotePlugin`] (`footnote`)
//! - [`MathPlugin`] (`math`, disabled by default)
//! - [`TextHighlightPlugin`] (`text-highlight`)
//!
//! Render plugins:
//! - [`CodeHighlightPlugin`] (`code-highlight`)
//! - [`LinkPlugin`] (`link`)
//! - [`IconPlugin`] (`icon`)
//! - [`LocalFilePlugin`] (`local-file`)

mod callout;
mod code_highlight;
mod embed;
mod footnote;
mod icon;
mod link;
mod local_file;
mod math;
mod text_highlight;

pub use callout::CalloutPlugin;
pub use code_highlight::CodeHighlightPlugin;
pub use embed::EmbedPlugin;
pub use footnote::FootnotePlugin;
pub use icon::IconPlugin;
pub use link::LinkPlugin;
pub use local_file::LocalFilePlugin;
pub use math::MathPlugin;
pub use text_highlight::TextHighlightPlugin;

use crate::error::PluginError;
use crate::manager::PluginManager;
use crate::plugin::TransformPlugin;

/// Every built-in plugin, in registration order.
#[must_use]
pub fn builtin_plugins() -> Vec<Box<dyn TransformPlugin>> {
    vec![
        Box::new(EmbedPlugin),
        Box::new(CalloutPlugin),
        Box::new(FootnotePlugin),
        Box::new(MathPlugin),
        Box::new(TextHighlightPlugin),
        Box::new(CodeHighlightPlugin),
        Box::new(LinkPlugin),
        Box::new(IconPlugin),
        Box::new(LocalFilePlugin),
    ]
}

/// Register every built-in plugin on `manager`.
///
/// # Errors
///
/// Returns [`PluginError::DuplicateName`] if a built-in name is already taken.
pub fn register_builtins(manager: &mut PluginManager) -> Result<(), PluginError> {
    for plugin in builtin_plugins() {
        manager.register(plugin)?;
    }
    Ok(())
}

/// Manager with every built-in plugin registered.
#[must_use]
pub fn builtin_manager() -> PluginManager {
    let mut manager = PluginManager::new();
    for plugin in builtin_plugins() {
        // Built-in names are distinct, so registration cannot collide.
        if let Err(e) = manager.register(plugin) {
            tracing::error!(error = %e, "failed to register built-in plugin");
        }
    }
    manager
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::Phase;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_builtin_names_are_unique() {
        let manager = builtin_manager();
        assert_eq!(manager.names().len(), builtin_plugins().len());
    }

    #[test]
    fn test_builtin_phases_and_defaults() {
        let manager = builtin_manager();
        let structural: Vec<String> = manager
            .descriptors(Some(Phase::Structural))
            .into_iter()
            .map(|d| d.name)
            .collect();
        assert_eq!(
            structural,
            vec!["embed", "callout", "footnote", "math", "text-highlight"]
        );
        assert_eq!(manager.is_enabled("math"), Some(false));
        assert_eq!(manager.is_enabled("footnote"), Some(true));
    }

    #[test]
    fn test_register_builtins_twice_fails() {
        let mut manager = builtin_manager();
        assert!(register_builtins(&mut manager).is_err());
    }
}
