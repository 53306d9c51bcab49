//! Wiring: storage, services and OAuth handlers for one CLI invocation.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{debug, info};

use sercha_core::{
    AppSettingsService, ApplicationServices, ApplicationServicesBuilder, Credentials, Source,
};
use sercha_oauth::{FlowDriver, FlowSettings, HandlerRegistry, OAuthHandler, Wizard};
use sercha_storage::{
    default_database_path, Database, FieldEncryptor, KeychainKeyProvider,
    SqliteAppSettingsRepository, SqliteAuthProviderRepository, SqliteCredentialsRepository,
    SqliteSourceRepository,
};

pub struct App {
    pub services: ApplicationServices,
    pub settings: AppSettingsService,
    pub flow_settings: FlowSettings,
    handlers: Arc<HandlerRegistry>,
}

impl App {
    /// Open the database (default location unless `database_path` is set)
    /// and build the services on top of it.
    pub async fn open(database_path: Option<PathBuf>) -> Result<Self> {
        let path = match database_path {
            Some(path) => path,
            None => default_database_path().context("Could not determine the database location")?,
        };

        let key_provider = KeychainKeyProvider::new()?;
        let encryptor = Arc::new(
            FieldEncryptor::from_key_provider(&key_provider)
                .context("Failed to load the master encryption key")?,
        );
        let db = Arc::new(Mutex::new(Database::open(&path)?));
        info!(path = ?path, "[App] Database ready");

        let settings = AppSettingsService::new(Arc::new(SqliteAppSettingsRepository::new(db.clone())));
        let flow_settings = FlowSettings::load(&settings).await;

        let services = ApplicationServicesBuilder::new()
            .with_source_repo(Arc::new(SqliteSourceRepository::new(db.clone())))
            .with_auth_provider_repo(Arc::new(SqliteAuthProviderRepository::new(
                db.clone(),
                encryptor.clone(),
            )))
            .with_credentials_repo(Arc::new(SqliteCredentialsRepository::new(db, encryptor)))
            .build()?;

        let handlers = Arc::new(HandlerRegistry::builtin(flow_settings.token_exchanger()));

        Ok(Self {
            services,
            settings,
            flow_settings,
            handlers,
        })
    }

    pub fn flow_driver(&self) -> FlowDriver {
        FlowDriver::new(
            Wizard::new(&self.services.connectors),
            self.services.auth_providers.clone(),
            self.services.provisioner.clone(),
            self.handlers.clone(),
        )
        .with_settings(self.flow_settings)
        .with_events(self.services.event_bus.sender())
    }

    /// Sources with their credentials, if any.
    pub async fn sources(&self) -> Result<Vec<(Source, Option<Credentials>)>> {
        let mut listed = Vec::new();
        for source in self.services.sources.list().await? {
            let credentials = self.services.credentials.get_for_source(&source.id).await?;
            listed.push((source, credentials));
        }
        Ok(listed)
    }

    pub async fn remove_source(&self, source_id: &str) -> Result<()> {
        self.services.sources.get(source_id).await?;
        self.services.sources.remove(source_id).await?;
        Ok(())
    }

    /// Renew the source's OAuth tokens. Without `force`, only expired tokens
    /// are renewed. Returns whether new tokens were saved.
    pub async fn refresh_source(&self, source_id: &str, force: bool) -> Result<bool> {
        let source = self.services.sources.get(source_id).await?;
        let mut credentials = self
            .services
            .credentials
            .get_for_source(&source.id)
            .await?
            .with_context(|| format!("Source {} has no credentials", source.id))?;
        if source.auth_provider_id.is_empty() {
            anyhow::bail!("Source {} does not use an OAuth app", source.id);
        }
        let provider = self.services.auth_providers.get(&source.auth_provider_id).await?;

        let refreshed = if force {
            let refresh_token = credentials
                .oauth_tokens()
                .and_then(|o| o.refresh_token.clone())
                .context("No refresh token stored; add the source again")?;
            let handler = self.handlers.get(provider.provider_type)?;
            let tokens = handler.refresh_token(&provider, &refresh_token).await?;
            credentials.update_tokens(tokens);
            true
        } else {
            self.handlers
                .refresh_if_needed(&provider, &mut credentials, Utc::now())
                .await?
        };

        if refreshed {
            self.services.credentials.save(&credentials).await?;
        } else {
            debug!(source_id = %source.id, "[App] Tokens still valid");
        }
        Ok(refreshed)
    }

    /// Store the given `oauth.*` overrides and return the settings the next
    /// flow will use.
    pub async fn update_flow_settings(&self, update: &SettingsUpdate) -> Result<FlowSettings> {
        if let Some(port) = update.callback_port {
            self.settings.set_oauth_callback_port(port).await?;
        }
        if let Some(end) = update.callback_port_range_end {
            self.settings.set_oauth_callback_port_range_end(end).await?;
        }
        if let Some(secs) = update.callback_timeout_secs {
            self.settings.set_oauth_callback_timeout_secs(secs).await?;
        }
        if let Some(secs) = update.token_timeout_secs {
            self.settings.set_oauth_token_timeout_secs(secs).await?;
        }
        Ok(FlowSettings::load(&self.settings).await)
    }

    /// Settings explicitly stored, as opposed to defaults.
    pub async fn stored_flow_settings(&self) -> Result<Vec<(String, String)>> {
        Ok(self.settings.list_by_prefix("oauth.").await?)
    }
}

#[derive(Debug, Default)]
pub struct SettingsUpdate {
    pub callback_port: Option<u16>,
    pub callback_port_range_end: Option<u16>,
    pub callback_timeout_secs: Option<u64>,
    pub token_timeout_secs: Option<u64>,
}
