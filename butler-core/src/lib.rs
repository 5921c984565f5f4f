//! Butler Core Library
//!
//! Foundational pieces shared by the butler build-server client and CLI.
//!
//! # Key Components
//!
//! - **Types**: Queue and build identifiers, normalized class tags reported
//!   by the server
//! - **Transport**: The [`Transport`] seam every request goes through, with a
//!   reqwest-backed implementation
//! - **Auth**: Credentials injected into outgoing requests
//! - **Observability**: `tracing` subscriber setup
//! - **Testing**: A scriptable [`testing::MockTransport`] that records requests
//!
//! # Example
//!
//! ```no_run
//! use butler_core::transport::{HttpTransport, Method, Transport};
//! use std::collections::HashMap;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let transport = HttpTransport::new()?;
//! let response = transport
//!     .request(Method::Get, "http://localhost:8080/api/json", HashMap::new(), None)
//!     .await?;
//! println!("status {}", response.status);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod auth;
pub mod observability;
pub mod testing;
pub mod transport;
pub mod types;

pub use auth::Credentials;
pub use transport::{HttpResponse, HttpTransport, Method, Transport, TransportError};
pub use types::{BuildKind, BuildNumber, QueueId, QueueState};
