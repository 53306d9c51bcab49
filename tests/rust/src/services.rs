//! Service and flow driver assembly over the mock repositories

use std::sync::Arc;

use sercha_core::{ApplicationServices, ApplicationServicesBuilder, EventBus};
use sercha_oauth::{
    BrowserOpener, FlowDriver, FlowSettings, GitHubHandler, GoogleHandler, HandlerRegistry,
    TokenExchanger, Wizard,
};

use crate::mocks::MockRepositories;

/// Services wired to `mocks`, with a fresh event bus.
pub fn mock_services(mocks: &MockRepositories) -> ApplicationServices {
    ApplicationServicesBuilder::new()
        .with_event_bus(Arc::new(EventBus::new()))
        .with_source_repo(mocks.sources.clone())
        .with_auth_provider_repo(mocks.auth_providers.clone())
        .with_credentials_repo(mocks.credentials.clone())
        .build()
        .expect("all repositories provided")
}

/// Built-in handlers with user info served from `server_uri`
/// (`/user` for GitHub, `/userinfo` for Google).
pub fn handlers_for(server_uri: &str, exchanger: TokenExchanger) -> HandlerRegistry {
    let mut registry = HandlerRegistry::empty();
    registry.register(Arc::new(
        GitHubHandler::new(exchanger.clone()).with_user_info_url(format!("{}/user", server_uri)),
    ));
    registry.register(Arc::new(
        GoogleHandler::new(exchanger).with_user_info_url(format!("{}/userinfo", server_uri)),
    ));
    registry
}

/// Flow settings on a free loopback port with no fallback range.
pub fn test_flow_settings(callback_timeout: std::time::Duration) -> FlowSettings {
    let port = sercha_oauth::port::allocate_dynamic_port().expect("free port");
    FlowSettings {
        callback_port: port,
        callback_port_range_end: port,
        callback_timeout,
        ..FlowSettings::default()
    }
}

/// Everything an end-to-end wizard run needs
pub struct DriverHarness {
    pub services: ApplicationServices,
    pub driver: FlowDriver,
}

impl DriverHarness {
    pub fn new(
        mocks: &MockRepositories,
        handlers: HandlerRegistry,
        browser: Arc<dyn BrowserOpener>,
        settings: FlowSettings,
    ) -> Self {
        crate::init_tracing();
        let services = mock_services(mocks);
        let driver = FlowDriver::new(
            Wizard::new(&services.connectors),
            services.auth_providers.clone(),
            services.provisioner.clone(),
            Arc::new(handlers),
        )
        .with_browser(browser)
        .with_settings(settings)
        .with_events(services.event_bus.sender());
        Self { services, driver }
    }

    /// Index of a connector in the wizard's list
    pub fn connector_index(&self, connector_id: &str) -> usize {
        self.driver
            .wizard()
            .connectors()
            .iter()
            .position(|c| c.id == connector_id)
            .expect("connector is registered")
    }
}
