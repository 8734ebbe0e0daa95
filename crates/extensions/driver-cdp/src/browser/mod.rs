//! Chrome lifecycle and the [`BrowserDriver`](stepcheck_protocols::BrowserDriver)
//! implementation on top of the CDP client.
//!
//! Chrome is launched with a persistent profile when nothing is listening
//! on the debug port; an already running instance is reused.

mod driver;
mod options;

pub use driver::CdpBrowser;
pub use options::BrowserOptions;

#[cfg(test)]
#[path = "browser_tests.rs"]
mod tests;
