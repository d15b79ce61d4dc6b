//! Serve lifecycle: start the pipeline and the HTTP API, stop on a signal.

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::app::{AppContext, Result, TributaryError};
use crate::config::format_interval;
use crate::server::{self, ApiState};
use crate::state::Coordinator;

/// Run until SIGINT/SIGTERM (ctrl-c elsewhere).
pub async fn run(ctx: AppContext) -> Result<()> {
    let cancel = CancellationToken::new();
    spawn_signal_handler(cancel.clone());

    let addr = ctx.config.server.bind_addr();
    let listener = TcpListener::bind(&addr).await?;
    run_with(ctx, listener, cancel).await
}

/// Run on an already bound listener until `cancel` fires.
pub async fn run_with(ctx: AppContext, listener: TcpListener, cancel: CancellationToken) -> Result<()> {
    let mut manager = ctx.build_manager()?;
    for registration in manager.registrations() {
        tracing::info!(
            source = registration.source.name(),
            interval = %format_interval(registration.interval),
            "registered source"
        );
    }

    let updates = manager
        .take_updates()
        .ok_or_else(|| TributaryError::Other("update stream already taken".into()))?;

    let coordinator = Coordinator::new(ctx.state.clone());
    let coordinator_task = {
        let cancel = cancel.clone();
        tokio::spawn(async move { coordinator.run(updates, cancel).await })
    };

    let manager_task = {
        let cancel = cancel.clone();
        tokio::spawn(async move { manager.start(cancel).await })
    };

    let router = server::router(ApiState::from_context(&ctx)?);
    let served = server::serve(listener, router, cancel.clone()).await;

    // The server can also stop on its own error; take the pipeline down with it.
    cancel.cancel();
    if let Err(e) = manager_task.await {
        tracing::warn!(error = %e, "fetch manager task failed");
    }
    if let Err(e) = coordinator_task.await {
        tracing::warn!(error = %e, "coordinator task failed");
    }

    tracing::info!("shut down");
    served
}

fn spawn_signal_handler(cancel: CancellationToken) {
    #[cfg(unix)]
    {
        tokio::spawn(async move {
            use tokio::signal::unix::{signal, SignalKind};

            let (mut sigterm, mut sigint) =
                match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
                    (Ok(term), Ok(int)) => (term, int),
                    (Err(e), _) | (_, Err(e)) => {
                        tracing::warn!(error = %e, "failed to install signal handlers, falling back to ctrl-c");
                        let _ = tokio::signal::ctrl_c().await;
                        cancel.cancel();
                        return;
                    }
                };

            tokio::select! {
                _ = sigterm.recv() => tracing::info!("received SIGTERM"),
                _ = sigint.recv() => tracing::info!("received SIGINT"),
            }
            cancel.cancel();
        });
    }

    #[cfg(windows)]
    {
        tokio::spawn(async move {
            let _ = tokio::signal::ctrl_c().await;
            cancel.cancel();
        });
    }
}
