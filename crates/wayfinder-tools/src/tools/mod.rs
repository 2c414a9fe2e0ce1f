pub mod click;
pub mod extract_links;
pub mod extract_products;
pub mod form_fill;
pub mod navigate;
pub mod screenshot;
pub mod wait;

pub use click::ClickTool;
pub use extract_links::ExtractLinksTool;
pub use extract_products::ExtractProductsTool;
pub use form_fill::FormFillTool;
pub use navigate::NavigateTool;
pub use screenshot::ScreenshotTool;
pub use wait::WaitTool;
