mod http_server;

pub use http_server::HttpServer;

// Re-export for external use (e.g., integration tests)
#[allow(unused_imports)]
pub use http_server::AppState;
