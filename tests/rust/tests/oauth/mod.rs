//! OAuth integration tests
//!
//! PKCE, the loopback listener over real HTTP, token and refresh grants
//! against wiremock, and full wizard runs through the flow driver.

mod handlers;
