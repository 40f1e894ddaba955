use crate::config::{BlackjackConfig, ConfigError, GameSettings, ServerSettings, WalletSettings};
use crate::handlers;
use crate::middleware::with_request_logging;
use crate::session::SessionManager;
use crate::wallet::{PaymentGateway, StubGateway};
use std::convert::Infallible;
use std::net::{SocketAddr, ToSocketAddrs};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::info;
use warp::filters::BoxedFilter;
use warp::reply::{Reply, Response};
use warp::Filter;

const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct ServerConfig {
    host: String,
    port: u16,
    game: GameSettings,
    wallet: WalletSettings,
}

impl ServerConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            game: GameSettings::default(),
            wallet: WalletSettings::default(),
        }
    }

    pub fn from_config(config: &BlackjackConfig) -> Self {
        Self {
            host: config.server.host.clone(),
            port: config.server.port,
            game: config.game.clone(),
            wallet: config.wallet.clone(),
        }
    }

    /// Ephemeral port, fixed shuffle seed and near-instant payouts.
    pub fn for_tests() -> Self {
        Self::new("127.0.0.1", 0)
            .with_game(GameSettings {
                seed: Some(42),
                ..GameSettings::default()
            })
            .with_wallet(WalletSettings {
                enabled: true,
                confirmation_delay_ms: 10,
            })
    }

    pub fn with_game(mut self, game: GameSettings) -> Self {
        self.game = game;
        self
    }

    pub fn with_wallet(mut self, wallet: WalletSettings) -> Self {
        self.wallet = wallet;
        self
    }

    fn as_file_config(&self) -> BlackjackConfig {
        BlackjackConfig {
            server: ServerSettings {
                host: self.host.clone(),
                port: self.port,
            },
            game: self.game.clone(),
            wallet: self.wallet.clone(),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn game(&self) -> &GameSettings {
        &self.game
    }

    pub fn wallet(&self) -> &WalletSettings {
        &self.wallet
    }
}

#[derive(Debug, Clone)]
pub struct AppContext {
    config: ServerConfig,
    sessions: Arc<SessionManager>,
}

impl AppContext {
    pub fn new(config: ServerConfig) -> Result<Self, ServerError> {
        config.as_file_config().validate()?;
        let gateway: Arc<dyn PaymentGateway> =
            Arc::new(StubGateway::from_settings(config.wallet()));
        Ok(Self::with_gateway(config, gateway))
    }

    pub fn with_gateway(config: ServerConfig, gateway: Arc<dyn PaymentGateway>) -> Self {
        let sessions = Arc::new(SessionManager::with_wallet(
            config.game().clone(),
            config.wallet(),
            gateway,
        ));
        Self { config, sessions }
    }

    pub fn new_for_tests() -> Self {
        Self::with_gateway(
            ServerConfig::for_tests(),
            Arc::new(StubGateway::new(Duration::from_millis(10))),
        )
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn sessions(&self) -> Arc<SessionManager> {
        Arc::clone(&self.sessions)
    }
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Failed to bind to address: {0}")]
    BindError(#[from] std::io::Error),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Invalid settings: {0}")]
    InvalidSettings(#[from] ConfigError),
}

#[derive(Debug, Clone)]
pub struct WebServer {
    context: AppContext,
}

impl WebServer {
    pub fn new(config: ServerConfig) -> Result<Self, ServerError> {
        let context = AppContext::new(config)?;
        Ok(Self { context })
    }

    pub fn from_context(context: AppContext) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &AppContext {
        &self.context
    }

    pub async fn start(self) -> Result<ServerHandle, ServerError> {
        let WebServer { context } = self;
        let config = context.config().clone();
        let bind_addr = Self::bind_addr(&config)?;

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let routes = Self::routes(&context);
        let shutdown_signal = async move {
            let _ = shutdown_rx.await;
        };

        let (addr, server_future) = warp::serve(routes)
            .try_bind_with_graceful_shutdown(bind_addr, shutdown_signal)
            .map_err(Self::map_warp_error)?;

        info!(
            %addr,
            initial_bank = config.game().initial_bank,
            wallet_enabled = config.wallet().enabled,
            "blackjack server listening"
        );

        let task = tokio::spawn(async move {
            server_future.await;
            Ok(())
        });
        let sweeper = tokio::spawn(sweep_expired_sessions(context.sessions(), SWEEP_INTERVAL));

        Ok(ServerHandle::new(addr, shutdown_tx, task, sweeper, context))
    }

    fn bind_addr(config: &ServerConfig) -> Result<SocketAddr, ServerError> {
        let host = config.host();

        if let Ok(addr) = host.parse::<SocketAddr>() {
            return Ok(addr);
        }

        if let Ok(ip) = host.parse::<std::net::IpAddr>() {
            return Ok(SocketAddr::new(ip, config.port()));
        }

        let candidate = format!("{}:{}", host, config.port());
        let mut addrs = candidate.to_socket_addrs().map_err(|err| {
            ServerError::ConfigError(format!("failed to resolve address `{candidate}`: {err}"))
        })?;

        addrs.next().ok_or_else(|| {
            ServerError::ConfigError(format!("failed to resolve address `{candidate}`"))
        })
    }

    fn map_warp_error(err: warp::Error) -> ServerError {
        use std::error::Error as StdError;

        if let Some(source) = err.source() {
            if let Some(io_err) = source.downcast_ref::<std::io::Error>() {
                let recreated = std::io::Error::new(io_err.kind(), io_err.to_string());
                return ServerError::BindError(recreated);
            }
        }

        ServerError::ConfigError(err.to_string())
    }

    /// Every route the server answers, with request logging applied.
    pub fn routes(context: &AppContext) -> BoxedFilter<(Response,)> {
        let health = Self::health_route(context);
        let session_routes = Self::session_routes(context);
        let round_routes = Self::round_routes(context);

        with_request_logging(
            health
                .or(session_routes)
                .unify()
                .or(round_routes)
                .unify()
                .boxed(),
        )
    }

    fn health_route(context: &AppContext) -> BoxedFilter<(Response,)> {
        warp::path("health")
            .and(warp::get())
            .and(warp::path::end())
            .and(Self::with_session_manager(context.sessions()))
            .map(|sessions: Arc<SessionManager>| {
                handlers::health(sessions.active_sessions().len()).into_response()
            })
            .boxed()
    }

    fn session_routes(context: &AppContext) -> BoxedFilter<(Response,)> {
        let sessions = context.sessions();

        let create = warp::path!("api" / "sessions")
            .and(warp::post())
            .and(Self::with_session_manager(sessions.clone()))
            .and_then(|sessions: Arc<SessionManager>| async move {
                let response = handlers::create_session(sessions).await;
                Ok::<_, Infallible>(response)
            });

        let info = warp::path!("api" / "sessions" / String)
            .and(warp::get())
            .and(Self::with_session_manager(sessions.clone()))
            .and_then(
                |session_id: String, sessions: Arc<SessionManager>| async move {
                    let response = handlers::get_session(sessions, session_id).await;
                    Ok::<_, Infallible>(response)
                },
            );

        let cashout = warp::path!("api" / "sessions" / String / "cashout")
            .and(warp::post())
            .and(Self::with_session_manager(sessions))
            .and(warp::body::json())
            .and_then(
                |session_id: String,
                 sessions: Arc<SessionManager>,
                 request: handlers::CashoutRequest| async move {
                    let response = handlers::cash_out(sessions, session_id, request).await;
                    Ok::<_, Infallible>(response)
                },
            );

        create
            .or(info)
            .unify()
            .or(cashout)
            .unify()
            .boxed()
    }

    fn round_routes(context: &AppContext) -> BoxedFilter<(Response,)> {
        let sessions = context.sessions();

        let bet = warp::path!("api" / "sessions" / String / "bet")
            .and(warp::post())
            .and(Self::with_session_manager(sessions.clone()))
            .and(warp::body::json())
            .and_then(
                |session_id: String,
                 sessions: Arc<SessionManager>,
                 request: handlers::BetRequest| async move {
                    let response = handlers::place_bet(sessions, session_id, request).await;
                    Ok::<_, Infallible>(response)
                },
            );

        let clear = warp::path!("api" / "sessions" / String / "bet" / "clear")
            .and(warp::post())
            .and(Self::with_session_manager(sessions.clone()))
            .and_then(
                |session_id: String, sessions: Arc<SessionManager>| async move {
                    let response = handlers::clear_bet(sessions, session_id).await;
                    Ok::<_, Infallible>(response)
                },
            );

        let deal = Self::action_route("deal", sessions.clone(), handlers::deal);
        let hit = Self::action_route("hit", sessions.clone(), handlers::hit);
        let stand = Self::action_route("stand", sessions.clone(), handlers::stand);
        let double = Self::action_route("double", sessions.clone(), handlers::double_down);
        let surrender = Self::action_route("surrender", sessions.clone(), handlers::surrender);
        let split = Self::action_route("split", sessions, handlers::split);

        bet.or(clear)
            .unify()
            .or(deal)
            .unify()
            .or(hit)
            .unify()
            .or(stand)
            .unify()
            .or(double)
            .unify()
            .or(surrender)
            .unify()
            .or(split)
            .unify()
            .boxed()
    }

    /// `POST /api/sessions/{id}/{action}` with no body.
    fn action_route<H, Fut>(
        action: &'static str,
        sessions: Arc<SessionManager>,
        handler: H,
    ) -> BoxedFilter<(Response,)>
    where
        H: Fn(Arc<SessionManager>, String) -> Fut + Clone + Send + Sync + 'static,
        Fut: std::future::Future<Output = Response> + Send + 'static,
    {
        warp::path("api")
            .and(warp::path("sessions"))
            .and(warp::path::param::<String>())
            .and(warp::path(action))
            .and(warp::path::end())
            .and(warp::post())
            .and(Self::with_session_manager(sessions))
            .and_then(move |session_id: String, sessions: Arc<SessionManager>| {
                let handler = handler.clone();
                async move { Ok::<_, Infallible>(handler(sessions, session_id).await) }
            })
            .boxed()
    }

    fn with_session_manager(
        sessions: Arc<SessionManager>,
    ) -> impl Filter<Extract = (Arc<SessionManager>,), Error = Infallible> + Clone {
        warp::any().map(move || Arc::clone(&sessions))
    }
}

async fn sweep_expired_sessions(sessions: Arc<SessionManager>, every: Duration) {
    let mut ticker = tokio::time::interval(every);
    loop {
        ticker.tick().await;
        let removed = sessions.cleanup_expired_sessions();
        if removed > 0 {
            info!(removed, remaining = sessions.active_sessions().len(), "expired sessions swept");
        }
    }
}

#[derive(Debug)]
pub struct ServerHandle {
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<Result<(), ServerError>>>,
    sweeper: Option<JoinHandle<()>>,
    context: AppContext,
}

impl ServerHandle {
    fn new(
        addr: SocketAddr,
        shutdown: oneshot::Sender<()>,
        task: JoinHandle<Result<(), ServerError>>,
        sweeper: JoinHandle<()>,
        context: AppContext,
    ) -> Self {
        Self {
            addr,
            shutdown: Some(shutdown),
            task: Some(task),
            sweeper: Some(sweeper),
            context,
        }
    }

    pub fn address(&self) -> SocketAddr {
        self.addr
    }

    pub fn context(&self) -> &AppContext {
        &self.context
    }

    pub async fn shutdown(mut self) -> Result<(), ServerError> {
        if let Some(sweeper) = self.sweeper.take() {
            sweeper.abort();
        }

        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }

        if let Some(task) = self.task.take() {
            match task.await {
                Ok(result) => result?,
                Err(err) => {
                    return Err(ServerError::ConfigError(format!(
                        "server task join error: {err}"
                    )))
                }
            }
        }

        info!(addr = %self.addr, "blackjack server stopped");
        Ok(())
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        if let Some(sweeper) = self.sweeper.take() {
            sweeper.abort();
        }

        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }

        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_addr_combines_host_and_port() {
        let config = ServerConfig::new("127.0.0.1", 8181);
        let addr = WebServer::bind_addr(&config).expect("addr");
        assert_eq!(addr, "127.0.0.1:8181".parse::<SocketAddr>().unwrap());
    }

    #[test]
    fn config_sections_flow_into_server_config() {
        let mut file = BlackjackConfig::default();
        file.server.port = 9999;
        file.game.initial_bank = 42;
        file.wallet.enabled = false;

        let config = ServerConfig::from_config(&file);
        assert_eq!(config.port(), 9999);
        assert_eq!(config.game().initial_bank, 42);
        assert!(!config.wallet().enabled);
    }

    #[test]
    fn invalid_game_settings_are_refused() {
        let config = ServerConfig::for_tests().with_game(GameSettings {
            initial_bank: 0,
            ..GameSettings::default()
        });
        assert!(matches!(
            AppContext::new(config),
            Err(ServerError::InvalidSettings(ConfigError::Invalid(_)))
        ));
    }

    #[tokio::test]
    async fn unknown_route_is_rejected() {
        let context = AppContext::new_for_tests();
        let response = warp::test::request()
            .method("GET")
            .path("/api/nope")
            .reply(&WebServer::routes(&context))
            .await;
        assert_eq!(response.status(), warp::http::StatusCode::NOT_FOUND);
    }
}
