//! Test support.
//!
//! [`MockTransport`] stands in for the network in unit tests: it records
//! every request (so tests can assert how many calls an operation made) and
//! answers from a list of scripted rules.
//!
//! # Example
//!
//! ```
//! use butler_core::testing::{MockTransport, exact};
//! use serde_json::json;
//!
//! let mock = MockTransport::new()
//!     .on_get(&exact("http://h/queue/item/7/api/json"))
//!     .respond_json(200, json!({"_class": "hudson.model.Queue$WaitingItem"}));
//! assert_eq!(mock.request_count(), 0);
//! ```

mod mock_transport;

pub use mock_transport::{MockRule, MockRuleBuilder, MockTransport, RecordedRequest, exact};
