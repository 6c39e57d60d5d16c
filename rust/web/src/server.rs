use crate::errors::{ErrorResponse, IntoErrorResponse, RequestError};
use crate::handlers::{self, parse_optional_body};
use crate::middleware::with_request_logging;
use crate::session::{SessionError, SessionManager};
use crate::settings::{AppSettings, SettingsError, SettingsStore};
use serde::de::DeserializeOwned;
use std::convert::Infallible;
use std::net::{SocketAddr, ToSocketAddrs};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use warp::filters::BoxedFilter;
use warp::http::StatusCode;
use warp::hyper::body::Bytes;
use warp::reply::{Reply, Response};
use warp::{Filter, Rejection};

/// Header naming the table a request operates on.
pub const SESSION_HEADER: &str = "x-session-id";

#[derive(Debug, Clone)]
pub struct ServerConfig {
    host: String,
    port: u16,
}

impl ServerConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    pub fn for_tests() -> Self {
        Self::new("127.0.0.1", 0)
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

#[derive(Debug, Clone)]
pub struct AppContext {
    config: ServerConfig,
    settings: Arc<SettingsStore>,
    sessions: Arc<SessionManager>,
}

impl AppContext {
    pub fn new(config: ServerConfig, defaults: AppSettings) -> Result<Self, ServerError> {
        let settings = Arc::new(SettingsStore::with_settings(defaults)?);
        let sessions = Arc::new(SessionManager::new(Arc::clone(&settings))?);
        Ok(Self {
            config,
            settings,
            sessions,
        })
    }

    /// Context on an ephemeral port with seeded shoes.
    pub fn new_for_tests() -> Self {
        let defaults = AppSettings {
            seed: Some(7),
            ..AppSettings::default()
        };
        Self::new(ServerConfig::for_tests(), defaults).expect("test context")
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn settings(&self) -> Arc<SettingsStore> {
        Arc::clone(&self.settings)
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
    #[error("Session error: {0}")]
    SessionError(#[from] SessionError),
}

impl From<SettingsError> for ServerError {
    fn from(err: SettingsError) -> Self {
        ServerError::ConfigError(err.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct WebServer {
    context: AppContext,
}

impl WebServer {
    pub fn new(config: ServerConfig, defaults: AppSettings) -> Result<Self, ServerError> {
        let context = AppContext::new(config, defaults)?;
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

        tracing::info!(%addr, "web server listening");

        let task = tokio::spawn(async move {
            server_future.await;
            Ok(())
        });

        Ok(ServerHandle::new(addr, shutdown_tx, task, context))
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

    /// Every route of the API wrapped in request logging. Unmatched
    /// requests and undecodable bodies answer with an [`ErrorResponse`].
    pub fn routes(context: &AppContext) -> BoxedFilter<(Response,)> {
        let routes = Self::health_route()
            .or(Self::shoe_routes(context))
            .unify()
            .or(Self::training_routes(context))
            .unify()
            .or(Self::predict_routes(context))
            .unify()
            .or(Self::history_routes(context))
            .unify()
            .or(Self::session_routes(context))
            .unify()
            .or(Self::settings_routes(context))
            .unify()
            .recover(Self::handle_rejection)
            .unify()
            .boxed();

        with_request_logging(routes)
    }

    fn health_route() -> BoxedFilter<(Response,)> {
        warp::path("health")
            .and(warp::get())
            .and(warp::path::end())
            .map(|| handlers::health().into_response())
            .boxed()
    }

    fn shoe_routes(context: &AppContext) -> BoxedFilter<(Response,)> {
        let sessions = context.sessions();

        let status = warp::path!("api" / "shoe")
            .and(warp::get())
            .and(Self::with_table(sessions.clone()))
            .and_then(|sessions: Arc<SessionManager>, session_id: Option<String>| async move {
                Ok::<_, Infallible>(handlers::shoe_status(sessions, session_id).await)
            });

        let new_shoe = warp::path!("api" / "shoe" / "new")
            .and(warp::post())
            .and(Self::with_table(sessions.clone()))
            .and_then(|sessions: Arc<SessionManager>, session_id: Option<String>| async move {
                Ok::<_, Infallible>(handlers::new_shoe(sessions, session_id).await)
            });

        let reset = warp::path!("api" / "shoe" / "reset")
            .and(warp::post())
            .and(Self::with_table(sessions.clone()))
            .and_then(|sessions: Arc<SessionManager>, session_id: Option<String>| async move {
                Ok::<_, Infallible>(handlers::reset_shoe(sessions, session_id).await)
            });

        let settings = warp::path!("api" / "shoe" / "settings")
            .and(warp::post())
            .and(Self::with_table(sessions))
            .and(Self::optional_json_body())
            .and_then(
                |sessions: Arc<SessionManager>,
                 session_id: Option<String>,
                 request: handlers::ShoeSettingsRequest| async move {
                    let response =
                        handlers::update_shoe_settings(sessions, session_id, request).await;
                    Ok::<_, Infallible>(response)
                },
            );

        status
            .or(new_shoe)
            .unify()
            .or(reset)
            .unify()
            .or(settings)
            .unify()
            .boxed()
    }

    fn training_routes(context: &AppContext) -> BoxedFilter<(Response,)> {
        let sessions = context.sessions();

        let train = warp::path!("api" / "train")
            .and(warp::post())
            .and(Self::with_table(sessions.clone()))
            .and(warp::body::bytes())
            .and_then(
                |sessions: Arc<SessionManager>, session_id: Option<String>, body: Bytes| async move {
                    Ok::<_, Infallible>(handlers::train(sessions, session_id, body).await)
                },
            );

        let cancel = warp::path!("api" / "train" / "cancel")
            .and(warp::post())
            .and(Self::with_table(sessions.clone()))
            .and_then(|sessions: Arc<SessionManager>, session_id: Option<String>| async move {
                Ok::<_, Infallible>(handlers::cancel_training(sessions, session_id).await)
            });

        let status = warp::path!("api" / "train" / "status")
            .and(warp::get())
            .and(Self::with_table(sessions))
            .and_then(|sessions: Arc<SessionManager>, session_id: Option<String>| async move {
                Ok::<_, Infallible>(handlers::training_status(sessions, session_id).await)
            });

        train.or(cancel).unify().or(status).unify().boxed()
    }

    fn predict_routes(context: &AppContext) -> BoxedFilter<(Response,)> {
        let sessions = context.sessions();

        let both = warp::path!("api" / "predict")
            .and(warp::post())
            .and(Self::with_table(sessions.clone()))
            .and(Self::optional_json_body())
            .and_then(
                |sessions: Arc<SessionManager>,
                 session_id: Option<String>,
                 request: handlers::PredictRequest| async move {
                    Ok::<_, Infallible>(handlers::predict_both(sessions, session_id, request).await)
                },
            );

        let ai = warp::path!("api" / "predict" / "ai")
            .and(warp::post())
            .and(Self::with_table(sessions.clone()))
            .and(Self::optional_json_body())
            .and_then(
                |sessions: Arc<SessionManager>,
                 session_id: Option<String>,
                 request: handlers::PredictRequest| async move {
                    Ok::<_, Infallible>(handlers::predict_ai(sessions, session_id, request).await)
                },
            );

        let formula = warp::path!("api" / "predict" / "formula")
            .and(warp::post())
            .and(Self::with_table(sessions))
            .and(Self::optional_json_body())
            .and_then(
                |sessions: Arc<SessionManager>,
                 session_id: Option<String>,
                 request: handlers::CardsRequest| async move {
                    let response = handlers::predict_formula(sessions, session_id, request).await;
                    Ok::<_, Infallible>(response)
                },
            );

        let analyze = warp::path!("api" / "formula" / "analyze")
            .and(warp::post())
            .and(Self::json_body())
            .and_then(|request: handlers::CardsRequest| async move {
                Ok::<_, Infallible>(handlers::analyze_formula(request).await)
            });

        both.or(ai)
            .unify()
            .or(formula)
            .unify()
            .or(analyze)
            .unify()
            .boxed()
    }

    fn history_routes(context: &AppContext) -> BoxedFilter<(Response,)> {
        let sessions = context.sessions();

        let add = warp::path!("api" / "history" / "add")
            .and(warp::post())
            .and(Self::with_table(sessions.clone()))
            .and(Self::json_body())
            .and_then(
                |sessions: Arc<SessionManager>,
                 session_id: Option<String>,
                 request: handlers::AddResultRequest| async move {
                    Ok::<_, Infallible>(handlers::add_result(sessions, session_id, request).await)
                },
            );

        let add_with_cards = warp::path!("api" / "history" / "add_with_cards")
            .and(warp::post())
            .and(Self::with_table(sessions.clone()))
            .and(Self::json_body())
            .and_then(
                |sessions: Arc<SessionManager>,
                 session_id: Option<String>,
                 request: handlers::AddResultRequest| async move {
                    let response =
                        handlers::add_result_with_cards(sessions, session_id, request).await;
                    Ok::<_, Infallible>(response)
                },
            );

        let undo = warp::path!("api" / "history" / "undo")
            .and(warp::post())
            .and(Self::with_table(sessions.clone()))
            .and_then(|sessions: Arc<SessionManager>, session_id: Option<String>| async move {
                Ok::<_, Infallible>(handlers::undo_last_result(sessions, session_id).await)
            });

        let clear = warp::path!("api" / "history" / "clear")
            .and(warp::post())
            .and(Self::with_table(sessions.clone()))
            .and_then(|sessions: Arc<SessionManager>, session_id: Option<String>| async move {
                Ok::<_, Infallible>(handlers::clear_history(sessions, session_id).await)
            });

        let import = warp::path!("api" / "history" / "import")
            .and(warp::post())
            .and(Self::with_table(sessions.clone()))
            .and(Self::json_body())
            .and_then(
                |sessions: Arc<SessionManager>,
                 session_id: Option<String>,
                 request: handlers::ImportRequest| async move {
                    let response = handlers::import_history(sessions, session_id, request).await;
                    Ok::<_, Infallible>(response)
                },
            );

        let history = warp::path!("api" / "history")
            .and(warp::get())
            .and(Self::with_table(sessions.clone()))
            .and_then(|sessions: Arc<SessionManager>, session_id: Option<String>| async move {
                Ok::<_, Infallible>(handlers::get_history(sessions, session_id).await)
            });

        let statistics = warp::path!("api" / "statistics")
            .and(warp::get())
            .and(Self::with_table(sessions.clone()))
            .and_then(|sessions: Arc<SessionManager>, session_id: Option<String>| async move {
                Ok::<_, Infallible>(handlers::get_statistics(sessions, session_id).await)
            });

        let csv = warp::path!("api" / "export" / "csv")
            .and(warp::get())
            .and(Self::with_table(sessions.clone()))
            .and_then(|sessions: Arc<SessionManager>, session_id: Option<String>| async move {
                Ok::<_, Infallible>(handlers::export_csv(sessions, session_id).await)
            });

        let json = warp::path!("api" / "export" / "json")
            .and(warp::get())
            .and(Self::with_table(sessions))
            .and_then(|sessions: Arc<SessionManager>, session_id: Option<String>| async move {
                Ok::<_, Infallible>(handlers::export_json(sessions, session_id).await)
            });

        add.or(add_with_cards)
            .unify()
            .or(undo)
            .unify()
            .or(clear)
            .unify()
            .or(import)
            .unify()
            .or(history)
            .unify()
            .or(statistics)
            .unify()
            .or(csv)
            .unify()
            .or(json)
            .unify()
            .boxed()
    }

    fn session_routes(context: &AppContext) -> BoxedFilter<(Response,)> {
        let sessions = context.sessions();

        let create = warp::path!("api" / "sessions")
            .and(warp::post())
            .and(Self::with_session_manager(sessions.clone()))
            .and_then(|sessions: Arc<SessionManager>| async move {
                Ok::<_, Infallible>(handlers::create_session(sessions).await)
            });

        let list = warp::path!("api" / "sessions")
            .and(warp::get())
            .and(Self::with_session_manager(sessions.clone()))
            .and_then(|sessions: Arc<SessionManager>| async move {
                Ok::<_, Infallible>(handlers::list_sessions(sessions).await)
            });

        let delete = warp::path!("api" / "sessions" / String)
            .and(warp::delete())
            .and(Self::with_session_manager(sessions))
            .and_then(
                |session_id: String, sessions: Arc<SessionManager>| async move {
                    Ok::<_, Infallible>(handlers::delete_session(sessions, session_id).await)
                },
            );

        create.or(list).unify().or(delete).unify().boxed()
    }

    fn settings_routes(context: &AppContext) -> BoxedFilter<(Response,)> {
        let store = context.settings();

        let get = warp::path!("api" / "settings")
            .and(warp::get())
            .and(Self::with_settings(store.clone()))
            .and_then(|store: Arc<SettingsStore>| async move {
                Ok::<_, Infallible>(handlers::get_settings(store).await)
            });

        let update = warp::path!("api" / "settings")
            .and(warp::put())
            .and(Self::with_settings(store.clone()))
            .and(Self::optional_json_body())
            .and_then(
                |store: Arc<SettingsStore>, request: handlers::UpdateSettingsRequest| async move {
                    Ok::<_, Infallible>(handlers::update_settings(store, request).await)
                },
            );

        let field = warp::path!("api" / "settings")
            .and(warp::patch())
            .and(Self::with_settings(store.clone()))
            .and(Self::json_body())
            .and_then(
                |store: Arc<SettingsStore>, request: handlers::UpdateFieldRequest| async move {
                    Ok::<_, Infallible>(handlers::update_field(store, request).await)
                },
            );

        let reset = warp::path!("api" / "settings" / "reset")
            .and(warp::post())
            .and(Self::with_settings(store))
            .and_then(|store: Arc<SettingsStore>| async move {
                Ok::<_, Infallible>(handlers::reset_settings(store).await)
            });

        get.or(update)
            .unify()
            .or(field)
            .unify()
            .or(reset)
            .unify()
            .boxed()
    }

    /// Session manager plus the optional `x-session-id` header.
    fn with_table(
        sessions: Arc<SessionManager>,
    ) -> impl Filter<Extract = (Arc<SessionManager>, Option<String>), Error = Infallible> + Clone
    {
        Self::with_session_manager(sessions).and(Self::with_session_id())
    }

    fn with_session_id(
    ) -> impl Filter<Extract = (Option<String>,), Error = Infallible> + Clone {
        warp::header::optional::<String>(SESSION_HEADER)
            .or(warp::any().map(|| None))
            .unify()
    }

    /// Required JSON body.
    fn json_body<T>() -> impl Filter<Extract = (T,), Error = Rejection> + Clone
    where
        T: DeserializeOwned + Send,
    {
        warp::body::bytes().and_then(|body: Bytes| async move {
            serde_json::from_slice::<T>(&body).map_err(|err| {
                warp::reject::custom(RequestError::MalformedBody(err.to_string()))
            })
        })
    }

    /// JSON body whose fields are all optional; an empty body is the default.
    fn optional_json_body<T>() -> impl Filter<Extract = (T,), Error = Rejection> + Clone
    where
        T: DeserializeOwned + Default + Send,
    {
        warp::body::bytes().and_then(|body: Bytes| async move {
            parse_optional_body::<T>(&body).map_err(warp::reject::custom)
        })
    }

    async fn handle_rejection(err: Rejection) -> Result<Response, Infallible> {
        if let Some(request_error) = err.find::<RequestError>() {
            return Ok(request_error.clone().into_http_response());
        }

        let (status, code, message) = if err.is_not_found() {
            (StatusCode::NOT_FOUND, "not_found", "No such route".to_string())
        } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
            (
                StatusCode::METHOD_NOT_ALLOWED,
                "method_not_allowed",
                "Method not allowed for this route".to_string(),
            )
        } else {
            (StatusCode::BAD_REQUEST, "bad_request", format!("{err:?}"))
        };
        Ok(ErrorResponse::new(code, message).into_response(status))
    }

    fn with_session_manager(
        sessions: Arc<SessionManager>,
    ) -> impl Filter<Extract = (Arc<SessionManager>,), Error = Infallible> + Clone {
        warp::any().map(move || Arc::clone(&sessions))
    }

    fn with_settings(
        store: Arc<SettingsStore>,
    ) -> impl Filter<Extract = (Arc<SettingsStore>,), Error = Infallible> + Clone {
        warp::any().map(move || Arc::clone(&store))
    }
}

#[derive(Debug)]
pub struct ServerHandle {
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<Result<(), ServerError>>>,
    context: AppContext,
}

impl ServerHandle {
    fn new(
        addr: SocketAddr,
        shutdown: oneshot::Sender<()>,
        task: JoinHandle<Result<(), ServerError>>,
        context: AppContext,
    ) -> Self {
        Self {
            addr,
            shutdown: Some(shutdown),
            task: Some(task),
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

        tracing::info!(addr = %self.addr, "web server stopped");
        Ok(())
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }

        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
