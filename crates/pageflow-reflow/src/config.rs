use serde::{Deserialize, Serialize};

/// A4 height at 96 dpi.
pub const DEFAULT_PAGE_HEIGHT: f32 = 1122.0;
/// Space kept free for header and footer chrome.
pub const DEFAULT_HEADER_FOOTER_RESERVE: f32 = 80.0;
/// Minimum slack left on a page when pulling content up from the next one.
pub const DEFAULT_UNDERFLOW_MARGIN: f32 = 20.0;
/// Iteration cap of one reflow pass.
pub const DEFAULT_MAX_ITERATIONS: usize = 20;

/// Reflow pass configuration.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReflowConfig {
    /// Page height used when the measurement provider does not report one.
    pub page_height: f32,
    /// Height subtracted from the page height for header/footer chrome.
    pub header_footer_reserve: f32,
    /// Slack a page must keep after absorbing a block from the next page.
    pub underflow_margin: f32,
    /// Maximum detect/resolve iterations per pass.
    pub max_iterations: usize,
}

impl Default for ReflowConfig {
    fn default() -> Self {
        Self {
            page_height: DEFAULT_PAGE_HEIGHT,
            header_footer_reserve: DEFAULT_HEADER_FOOTER_RESERVE,
            underflow_margin: DEFAULT_UNDERFLOW_MARGIN,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }
}

impl ReflowConfig {
    /// Defaults with a custom page height.
    pub fn for_page_height(page_height: f32) -> Self {
        Self {
            page_height,
            ..Self::default()
        }
    }

    /// Usable content height for a page of `page_height`.
    pub fn max_content_height(self, page_height: f32) -> f32 {
        (page_height - self.header_footer_reserve).max(0.0)
    }

    /// Iteration cap, never below one.
    pub fn iteration_cap(self) -> usize {
        self.max_iterations.max(1)
    }
}
