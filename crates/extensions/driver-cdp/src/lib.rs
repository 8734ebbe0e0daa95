//! Browser driver over the Chrome DevTools Protocol.
//!
//! [`CdpBrowser`] implements [`stepcheck_protocols::BrowserDriver`]: it
//! launches or reuses Chrome on the debug port, keeps one attached page,
//! and reports a closed socket or a detached/crashed page as
//! [`DriverError::SessionLost`](stepcheck_protocols::DriverError::SessionLost).

pub mod browser;
pub mod cdp;

pub use browser::{BrowserOptions, CdpBrowser};
pub use cdp::{CdpClient, CdpError, PageSession};
