use std::sync::Arc;

use shared::{ApiClient, Config, FileTokenStore, SessionStore, TokenStore};

use crate::render::Pager;

pub type HandlerResult = Result<String, anyhow::Error>;

pub struct AppState {
    pub config: Config,
    pub session: Arc<SessionStore>,
    pub color: bool,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self, anyhow::Error> {
        let tokens = FileTokenStore::open(&config.session_file)?;
        tracing::info!("Session file: {:?}", tokens.path());
        Self::with_tokens(config, Arc::new(tokens))
    }

    pub fn with_tokens(config: Config, tokens: Arc<dyn TokenStore>) -> Result<Self, anyhow::Error> {
        let client = ApiClient::new(&config, tokens)?;
        let session = Arc::new(SessionStore::new(Arc::new(client)));
        Ok(AppState {
            config,
            session,
            color: true,
        })
    }

    pub fn client(&self) -> &ApiClient {
        self.session.client()
    }
}

#[derive(Clone, Default, Debug, PartialEq, Eq)]
pub enum ConsoleState {
    #[default]
    Normal,
    /// Password accepted, waiting for `/otp <code>`.
    AwaitingOtp { user_id: i64 },
}

/// Per-terminal conversation state: the current mode and the table on screen.
#[derive(Default)]
pub struct Dialogue {
    pub state: ConsoleState,
    pub pager: Option<Box<dyn Pager>>,
}

impl Dialogue {
    /// Show `pager` and remember it for paging.
    pub fn show(&mut self, pager: Box<dyn Pager>, color: bool) -> String {
        let text = pager.render(color);
        self.pager = Some(pager);
        text
    }

    pub fn reset(&mut self) {
        self.state = ConsoleState::Normal;
        self.pager = None;
    }
}
