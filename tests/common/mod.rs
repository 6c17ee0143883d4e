use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};

use account_recovery::{
    auth::{memory::MemoryUserStore, store::UserStore},
    clock::{Clock, ManualClock},
    config::AppConfig,
    mailer::{Notifier, NotifyError},
    state::AppState,
};
use async_trait::async_trait;
use time::macros::datetime;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Notifier that records deliveries and can be switched to fail.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<SentMail>>,
    failing: AtomicBool,
}

#[allow(dead_code)]
impl RecordingNotifier {
    pub fn fail_sends(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<SentMail> {
        self.sent.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    pub fn last(&self) -> Option<SentMail> {
        self.sent.lock().unwrap().last().cloned()
    }

    /// Token embedded in the most recent link-bearing mail.
    pub fn last_token(&self) -> Option<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find_map(|m| token_in(&m.body))
    }
}

pub fn token_in(body: &str) -> Option<String> {
    let (_, rest) = body.split_once("token=")?;
    let token: String = rest.chars().take_while(|c| c.is_ascii_hexdigit()).collect();
    (!token.is_empty()).then_some(token)
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), NotifyError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(NotifyError::InvalidAddress(to.to_string()));
        }
        self.sent.lock().unwrap().push(SentMail {
            to: to.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }
}

pub struct Harness {
    pub store: Arc<MemoryUserStore>,
    pub notifier: Arc<RecordingNotifier>,
    pub clock: Arc<ManualClock>,
    pub state: AppState,
}

/// App state over an in-memory store, a recording notifier and a clock
/// fixed at 2024-01-01 12:00 UTC.
pub fn harness() -> Harness {
    let store = Arc::new(MemoryUserStore::new());
    let notifier = Arc::new(RecordingNotifier::default());
    let clock = Arc::new(ManualClock::new(datetime!(2024-01-01 12:00 UTC)));

    let state = AppState::from_parts(
        Arc::new(AppConfig::test_default()),
        store.clone() as Arc<dyn UserStore>,
        notifier.clone() as Arc<dyn Notifier>,
        clock.clone() as Arc<dyn Clock>,
    );

    Harness {
        store,
        notifier,
        clock,
        state,
    }
}
