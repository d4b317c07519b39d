// Dashboard startup: page patches, transport, link chain, cache and mount

use crate::app::{mount, App, MountError, MountedApp};
use crate::cache::AppCache;
use crate::client::GraphQLClient;
use crate::clipboard::patch_copy_to_remove_zero_width_underscores;
use crate::config::{DagitConfig, TransportMode};
use crate::dom::{styles::inject_global_style, Document};
use crate::link::{
    dashboard_chain, HttpLink, Link, LogTimeLink, SplitLink, TracingErrorReporter, WebSocketLink,
};
use crate::status::WebsocketStatusProvider;
use crate::transport::{Connector, SubscriptionClient};
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

/// Everything created at startup
pub struct Dashboard {
    pub client: GraphQLClient,
    pub websocket: SubscriptionClient,
    pub status: WebsocketStatusProvider,
    pub app: MountedApp,
}

/// Build the dashboard into `document`.
///
/// Fails if the page has no mount root or the configured URIs are invalid;
/// the page is only patched once both checks pass.
/// With a lazy socket nothing touches the network until the first operation.
pub fn bootstrap(
    config: &DagitConfig,
    document: &mut Document,
    connector: Arc<dyn Connector>,
) -> Result<Dashboard> {
    let websocket_uri = config
        .websocket_uri()
        .context("Failed to resolve WebSocket URI")?;
    let http_uri = match config.transport.mode {
        TransportMode::WebSocket => None,
        TransportMode::Split => Some(
            config
                .graphql_http_uri()
                .context("Failed to resolve GraphQL HTTP URI")?,
        ),
    };
    // Checked before touching the page so a failed startup leaves it unpatched
    if document.element(&config.app.mount_root).is_none() {
        return Err(MountError::MissingRoot(config.app.mount_root.clone()))
            .context("Failed to mount dashboard");
    }

    patch_copy_to_remove_zero_width_underscores(document)
        .context("Failed to patch copy events")?;
    inject_global_style(document, &config.app.mount_root);

    let websocket = SubscriptionClient::new(
        websocket_uri.clone(),
        config.websocket.client_options(),
        connector,
    );

    let socket_link: Arc<dyn Link> = Arc::new(WebSocketLink::new(websocket.clone()));
    let transport: Arc<dyn Link> = match http_uri {
        None => socket_link,
        Some(http_uri) => Arc::new(SplitLink::new(socket_link, Arc::new(HttpLink::new(http_uri)))),
    };

    let chain = dashboard_chain(
        Arc::new(TracingErrorReporter),
        LogTimeLink::new(),
        transport,
    );
    let client = GraphQLClient::new(AppCache::new(), chain);

    let status = WebsocketStatusProvider::new(&websocket);
    let app = App::new(client.clone(), status.handle());
    let app = mount(document, &config.app.mount_root, app).context("Failed to mount dashboard")?;

    info!(
        uri = %websocket_uri,
        mode = ?config.transport.mode,
        root = %config.app.mount_root,
        "Dashboard mounted"
    );

    Ok(Dashboard {
        client,
        websocket,
        status,
        app,
    })
}
