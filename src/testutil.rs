use std::collections::HashMap;
use std::sync::Arc;
use std::thread;

use tiny_http::{Response, Server};

/// Local HTTP server answering fixed routes; anything else is a 404.
pub struct TestServer {
    base: String,
    server: Arc<Server>,
    handle: Option<thread::JoinHandle<()>>,
}

impl TestServer {
    pub fn start(routes: Vec<(&str, u16, String)>) -> Self {
        let routes: HashMap<String, (u16, String)> = routes
            .into_iter()
            .map(|(path, status, body)| (path.to_string(), (status, body)))
            .collect();
        let server = Arc::new(Server::http("127.0.0.1:0").expect("bind test server"));
        let base = format!("http://{}", server.server_addr());
        let worker = server.clone();
        let handle = thread::spawn(move || {
            for request in worker.incoming_requests() {
                let (status, body) = routes
                    .get(request.url())
                    .cloned()
                    .unwrap_or_else(|| (404, "not found".to_string()));
                let _ = request.respond(Response::from_string(body).with_status_code(status));
            }
        });
        Self {
            base,
            server,
            handle: Some(handle),
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.server.unblock();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
