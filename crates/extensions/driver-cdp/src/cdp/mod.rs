//! Chrome DevTools Protocol (CDP) client.
//!
//! Connects to Chrome/Chromium over WebSocket and speaks the CDP JSON-RPC
//! protocol. One [`CdpClient`] per browser, one [`PageSession`] per attached
//! page target; both share a single [`Connection`].
//!
//! ```rust,ignore
//! let client = CdpClient::connect("http://localhost:9222", Duration::from_secs(30)).await?;
//! let page = client.new_page().await?;
//! page.navigate("http://localhost:8000/module-viewer.html", Duration::from_secs(60)).await?;
//! ```

mod client;
mod connection;
mod error;
mod protocol;
mod session;

pub use client::CdpClient;
pub use connection::Connection;
pub use error::CdpError;
pub use protocol::*;
pub use session::PageSession;
