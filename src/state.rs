use std::sync::Arc;

use anyhow::Context;
use sqlx::PgPool;

use crate::{
    auth::{
        repo::PgUserStore,
        reset::PasswordResetService,
        store::{TimeoutStore, UserStore},
        verification::VerificationService,
    },
    clock::{Clock, SystemClock},
    config::AppConfig,
    mailer::{Notifier, SmtpNotifier},
    pages::Pages,
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub verification: Arc<VerificationService>,
    pub reset: Arc<PasswordResetService>,
    pub pages: Arc<Pages>,
}

impl AppState {
    /// Production wiring: Postgres store bounded by the configured timeout,
    /// SMTP notifier, wall clock.
    pub fn init(config: AppConfig, db: PgPool) -> anyhow::Result<Self> {
        let store = Arc::new(TimeoutStore::new(
            PgUserStore::new(db),
            config.store_timeout(),
        )) as Arc<dyn UserStore>;
        let notifier = Arc::new(
            SmtpNotifier::new(&config.smtp).context("configure smtp transport")?,
        ) as Arc<dyn Notifier>;

        Ok(Self::from_parts(
            Arc::new(config),
            store,
            notifier,
            Arc::new(SystemClock),
        ))
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        store: Arc<dyn UserStore>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let verification = VerificationService::new(
            store.clone(),
            notifier.clone(),
            clock.clone(),
            config.public_base_url.clone(),
            config.tokens.verification_ttl(),
        );
        let reset = PasswordResetService::new(
            store,
            notifier,
            clock,
            config.public_base_url.clone(),
            config.tokens.reset_ttl(),
        );

        Self {
            config,
            verification: Arc::new(verification),
            reset: Arc::new(reset),
            pages: Arc::new(Pages::new()),
        }
    }
}
