// Root component and mounting
pub mod app;

// Startup wiring
pub mod bootstrap;

// Operation result cache
pub mod cache;

// Cache-aware GraphQL client
pub mod client;

// Copy sanitization
pub mod clipboard;

// Configuration
pub mod config;

// Headless page model and global styles
pub mod dom;

// GraphQL link chain
pub mod link;

// Connection status provider
pub mod status;

// GraphQL-over-WebSocket transport
pub mod transport;

// Shared helpers
pub mod util;

pub use app::{mount, App, MountError, MountedApp};
pub use bootstrap::{bootstrap, Dashboard};
pub use cache::AppCache;
pub use client::{FetchPolicy, GraphQLClient};
pub use config::{load_config, DagitConfig};
pub use dom::Document;
pub use link::{FetchResult, GraphQLError, LinkChain, LinkError, Operation};
pub use status::{ConnectionStatus, StatusHandle, WebsocketStatusProvider};
pub use transport::{ClientOptions, SubscriptionClient, TransportError};
