use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tracing_subscriber::EnvFilter;

/// A book, as returned by the example servers.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Book {
    pub id: u64,
    pub title: String,
    pub author: String,
}

/// Body of `POST /books`, as JSON, XML or a URL-encoded form.
#[derive(Debug, Deserialize)]
pub struct NewBook {
    pub title: String,
    pub author: String,
}

pub fn sample_books() -> Vec<Book> {
    vec![
        Book {
            id: 1,
            title: "Dune".into(),
            author: "Frank Herbert".into(),
        },
        Book {
            id: 2,
            title: "The Left Hand of Darkness".into(),
            author: "Ursula K. Le Guin".into(),
        },
    ]
}

/// Returns the server address from PORT env var, defaulting to 3000.
///
/// # Example
///
/// ```ignore
/// let addr = render_axum_examples::server_addr()?;
/// let listener = tokio::net::TcpListener::bind(addr).await?;
/// ```
pub fn server_addr() -> anyhow::Result<SocketAddr> {
    let port = std::env::var("PORT").unwrap_or_else(|_| "3000".into());
    Ok(format!("0.0.0.0:{port}").parse()?)
}

/// Log to stderr, `render_axum=debug` unless `RUST_LOG` says otherwise.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,render_axum=debug")),
        )
        .init();
}
