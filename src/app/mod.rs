// Root component and mounting into the host page

use crate::client::GraphQLClient;
use crate::dom::Document;
use crate::status::{ConnectionStatus, StatusHandle};
use std::fmt;
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub enum MountError {
    /// The page has no element with the configured root id
    MissingRoot(String),
}

impl fmt::Display for MountError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MountError::MissingRoot(id) => {
                write!(f, "mount root element '#{}' not found in document", id)
            }
        }
    }
}

impl std::error::Error for MountError {}

/// Root of the dashboard component tree.
///
/// Receives the GraphQL client and the socket status explicitly; nothing is
/// looked up globally.
pub struct App {
    client: GraphQLClient,
    status: StatusHandle,
}

impl App {
    pub fn new(client: GraphQLClient, status: StatusHandle) -> Self {
        Self { client, status }
    }

    pub fn client(&self) -> &GraphQLClient {
        &self.client
    }

    pub fn status(&self) -> &StatusHandle {
        &self.status
    }

    /// Header line showing transport health
    pub fn render(&self) -> String {
        let snapshot = self.status.current();
        let indicator = match snapshot.status {
            ConnectionStatus::Connected => "●",
            ConnectionStatus::Connecting | ConnectionStatus::Reconnecting => "◐",
            ConnectionStatus::Disconnected => "○",
        };
        format!(
            "Dagit  {} {} (since {})",
            indicator,
            snapshot.status.label(),
            snapshot.since.format("%H:%M:%S")
        )
    }
}

/// An [`App`] rendered into a root element
pub struct MountedApp {
    root_id: String,
    app: App,
}

impl MountedApp {
    pub fn root_id(&self) -> &str {
        &self.root_id
    }

    pub fn app(&self) -> &App {
        &self.app
    }

    /// Re-render into the root element
    pub fn refresh(&self, document: &mut Document) -> Result<(), MountError> {
        let root = document
            .element_mut(&self.root_id)
            .ok_or_else(|| MountError::MissingRoot(self.root_id.clone()))?;
        root.set_content(self.app.render());
        Ok(())
    }
}

/// Render `app` into the element `root_id`. A missing root is fatal to startup.
pub fn mount(document: &mut Document, root_id: &str, app: App) -> Result<MountedApp, MountError> {
    if document.element(root_id).is_none() {
        return Err(MountError::MissingRoot(root_id.to_string()));
    }

    let mounted = MountedApp {
        root_id: root_id.to_string(),
        app,
    };
    mounted.refresh(document)?;
    debug!(root = %root_id, "App mounted");
    Ok(mounted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::AppCache;
    use crate::link::LinkChain;
    use crate::status::StatusSnapshot;
    use tokio::sync::watch;

    fn app_with(status: ConnectionStatus) -> (App, watch::Sender<StatusSnapshot>) {
        let (tx, rx) = watch::channel(StatusSnapshot::new(status));
        let client = GraphQLClient::new(AppCache::new(), LinkChain::from_links(Vec::new()));
        (App::new(client, StatusHandle::new(rx)), tx)
    }

    #[test]
    fn test_mount_renders_into_root() {
        let mut document = Document::with_root("root");
        let (app, _tx) = app_with(ConnectionStatus::Disconnected);

        let mounted = mount(&mut document, "root", app).unwrap();
        assert_eq!(mounted.root_id(), "root");

        let content = document.element("root").unwrap().content();
        assert!(content.starts_with("Dagit  ○ Disconnected"));
    }

    #[test]
    fn test_mount_without_root_fails() {
        let mut document = Document::with_root("app");
        let (app, _tx) = app_with(ConnectionStatus::Disconnected);

        let err = mount(&mut document, "root", app).err().unwrap();
        assert_eq!(err, MountError::MissingRoot("root".to_string()));
        assert_eq!(
            err.to_string(),
            "mount root element '#root' not found in document"
        );
    }

    #[test]
    fn test_refresh_follows_status() {
        let mut document = Document::with_root("root");
        let (app, tx) = app_with(ConnectionStatus::Connecting);
        let mounted = mount(&mut document, "root", app).unwrap();
        assert!(document.element("root").unwrap().content().contains("◐ Connecting"));

        tx.send(StatusSnapshot::new(ConnectionStatus::Connected)).unwrap();
        mounted.refresh(&mut document).unwrap();
        assert!(document.element("root").unwrap().content().contains("● Connected"));
    }
}
