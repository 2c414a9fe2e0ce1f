//! The tool registry: `dom.navigate`, `dom.click`, `dom.wait`,
//! `dom.screenshot`, `form.fill`, `extract.products`, `extract.links`.
//! [`registry::ToolRegistry`] holds them keyed by dotted name; each
//! implementation in [`tools`] is a thin adapter over a live [`Cdp`] session
//! or a sibling crate (`wayfinder-extract`, `wayfinder-formfill`).

use std::sync::Arc;

use wayfinder_browser::Cdp;

pub mod errors;
pub mod registry;
pub mod tools;

pub use errors::{ToolError, ToolErrorPayload};
pub use registry::{Tool, ToolContext, ToolRegistry};

/// A registry pre-populated with the seven built-in tools. Callers that need
/// a narrower or extended tool set can build their own `ToolRegistry`
/// instead.
pub fn default_registry<C: Cdp + Send + Sync + 'static>() -> ToolRegistry<C> {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(tools::NavigateTool::default()));
    registry.register(Arc::new(tools::ClickTool::default()));
    registry.register(Arc::new(tools::WaitTool::default()));
    registry.register(Arc::new(tools::ScreenshotTool::default()));
    registry.register(Arc::new(tools::FormFillTool::default()));
    registry.register(Arc::new(tools::ExtractProductsTool::default()));
    registry.register(Arc::new(tools::ExtractLinksTool::default()));
    registry
}
