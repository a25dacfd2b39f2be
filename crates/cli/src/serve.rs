use std::error;
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;

use futures_lite::future;
use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::{BodyExt, Full};
use hyper::body::{Bytes, Incoming};
use hyper::header::{CACHE_CONTROL, CONTENT_TYPE};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response};
use hyper_util::rt::{TokioIo, TokioTimer};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::net::TcpListener;
use tokio::runtime::Builder;
use tokio::sync::{mpsc, watch};
use tower_async::Service;
use tower_async_http::compression::Compression;
use tower_async_http::services::ServeDir;

use crate::build::{self, Plan, RELOAD_PATH};
use crate::log;
use crate::report::{Error, ErrorExt, Report};
use crate::Serve;

type BoxError = Box<dyn error::Error + Send + Sync>;
type Body = UnsyncBoxBody<Bytes, BoxError>;
type Files = Compression<ServeDir>;

/// Quiet period after a file change before rebuilding.
const DEBOUNCE: Duration = Duration::from_millis(150);

pub fn serve(s: &Serve) -> Report<()> {
    let watching = !s.no_watch;
    let plan = Plan::new(&s.build, s.port)?;

    if let Err(err) = build::run(&plan) {
        if !watching {
            return Err(err);
        }
        log::error!("{err}");
        log::warning!("serving the previous build until sources change");
    }

    Builder::new_current_thread()
        .enable_all()
        .build()
        .message("failed to create tokio runtime")?
        .block_on(start(plan, watching))
}

async fn start(plan: Plan, watching: bool) -> Report<()> {
    let ip = Ipv4Addr::LOCALHOST;
    let port = plan.settings.port;

    let listener = TcpListener::bind((ip, port))
        .await
        .with_message(|| format!("failed to bind tcp listener to {ip}:{port}"))?;

    log::serving!("{} at http://{ip}:{port}", plan.settings.dist.display());

    let (generation_tx, generation_rx) = watch::channel(0_u64);
    let files = Arc::new(Compression::new(ServeDir::new(&plan.settings.dist)));
    let server = accept(listener, files, generation_rx);

    if !watching {
        return server.await;
    }

    // The watcher stops delivering events once dropped.
    let (_watcher, events) = watch_sources(&plan)?;

    future::or(server, rebuild(Arc::new(plan), events, generation_tx)).await
}

async fn accept(
    listener: TcpListener,
    files: Arc<Files>,
    generation: watch::Receiver<u64>,
) -> Report<()> {
    loop {
        let tcp = match listener.accept().await {
            Ok((tcp, _)) => tcp,
            Err(err) => {
                log::error!("failed to accept tcp connection: {err}");
                continue;
            }
        };

        let files = files.clone();
        let generation = generation.clone();

        tokio::spawn(async move {
            let io = TokioIo::new(tcp);
            let service = service_fn(move |req| respond(req, files.clone(), generation.clone()));

            if let Err(err) = http1::Builder::new()
                .timer(TokioTimer::new())
                .serve_connection(io, service)
                .await
            {
                log::error!("serving connection: {err}");
            }
        });
    }
}

async fn respond(
    req: Request<Incoming>,
    files: Arc<Files>,
    generation: watch::Receiver<u64>,
) -> Result<Response<Body>, BoxError> {
    if is_reload_request(req.method(), req.uri().path()) {
        let current = generation.borrow().to_string();
        let body: Body = Full::new(Bytes::from(current))
            .map_err(Into::into)
            .boxed_unsync();

        let res = Response::builder()
            .header(CONTENT_TYPE, "text/plain")
            .header(CACHE_CONTROL, "no-store")
            .body(body)?;

        return Ok(res);
    }

    let method = req.method().clone();
    let path = req.uri().path().to_owned();

    let res = files.call(req).await?;

    log::info!("{method} {path} {}", res.status());

    Ok(res.map(|body| body.map_err(Into::into).boxed_unsync()))
}

fn is_reload_request(method: &Method, path: &str) -> bool {
    method == Method::GET && path == RELOAD_PATH
}

fn watch_sources(plan: &Plan) -> Report<(RecommendedWatcher, mpsc::UnboundedReceiver<()>)> {
    let (tx, rx) = mpsc::unbounded_channel();

    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
        Ok(event) if triggers_rebuild(&event.kind) => {
            let _ = tx.send(());
        }
        Ok(_) => {}
        Err(err) => log::warning!("file watcher: {err}"),
    })
    .map_err_into_io()
    .message("failed to create file watcher")?;

    let settings = &plan.settings;
    let sources = [
        plan.manifest.root.join("src"),
        settings.public.clone(),
        settings.index.clone(),
    ];

    for path in sources.iter().filter(|path| path.exists()) {
        let mode = if path.is_dir() {
            RecursiveMode::Recursive
        } else {
            RecursiveMode::NonRecursive
        };

        watcher
            .watch(path, mode)
            .map_err_into_io()
            .with_message(|| format!("failed to watch {}", path.display()))?;

        log::watching!("{}", path.display());
    }

    Ok((watcher, rx))
}

/// Reads (access events) happen during every build and must not loop.
fn triggers_rebuild(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    )
}

async fn rebuild(
    plan: Arc<Plan>,
    mut events: mpsc::UnboundedReceiver<()>,
    generation: watch::Sender<u64>,
) -> Report<()> {
    while events.recv().await.is_some() {
        // Editors tend to emit several events per save.
        while let Ok(Some(())) = tokio::time::timeout(DEBOUNCE, events.recv()).await {}

        let plan = plan.clone();
        let res = tokio::task::spawn_blocking(move || build::run(&plan))
            .await
            .map_err_into_io()
            .message("rebuild task failed")?;

        match res {
            Ok(()) => {
                generation.send_modify(|n| *n += 1);
                log::info!("build generation {}", *generation.borrow());
            }
            Err(err) => log::error!("{err}"),
        }
    }

    Err(Error::message("file watcher stopped"))
}

#[cfg(test)]
mod tests {
    use notify::event::{AccessKind, CreateKind, ModifyKind, RemoveKind};

    use super::*;

    #[test]
    fn reload_route() {
        assert!(is_reload_request(&Method::GET, RELOAD_PATH));
        assert!(!is_reload_request(&Method::POST, RELOAD_PATH));
        assert!(!is_reload_request(&Method::GET, "/index.html"));
        assert!(!is_reload_request(&Method::GET, "/__reload/x"));
    }

    #[test]
    fn only_changes_trigger_rebuilds() {
        assert!(triggers_rebuild(&EventKind::Create(CreateKind::File)));
        assert!(triggers_rebuild(&EventKind::Modify(ModifyKind::Any)));
        assert!(triggers_rebuild(&EventKind::Remove(RemoveKind::File)));
        assert!(!triggers_rebuild(&EventKind::Access(AccessKind::Any)));
        assert!(!triggers_rebuild(&EventKind::Any));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn reload_endpoint_reports_generation() {
        let dist = tempfile::tempdir().unwrap();
        let files = Arc::new(Compression::new(ServeDir::new(dist.path())));
        let (tx, rx) = watch::channel(0_u64);

        tx.send_modify(|n| *n += 2);

        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(accept(listener, files, rx));

        let stream = tokio::net::TcpStream::connect(addr).await.unwrap();
        let (mut sender, conn) = hyper::client::conn::http1::handshake(TokioIo::new(stream))
            .await
            .unwrap();
        tokio::spawn(conn);

        let req = Request::get(RELOAD_PATH)
            .header(hyper::header::HOST, "localhost")
            .body(http_body_util::Empty::<Bytes>::new())
            .unwrap();
        let res = sender.send_request(req).await.unwrap();

        assert_eq!(res.headers()[CACHE_CONTROL], "no-store");

        let body = res.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"2");

        server.abort();
    }
}
