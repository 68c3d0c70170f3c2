use std::{
    collections::HashMap,
    io::{Cursor, Write},
    net::SocketAddr,
    sync::{Arc, Mutex, RwLock},
};

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use sha2::{Digest, Sha512};

use crate::ProgressHandler;
use zip::write::SimpleFileOptions;

type Bodies = Arc<RwLock<HashMap<String, Vec<u8>>>>;

/// Local HTTP server answering GETs from an in-memory path table.
pub struct TestServer {
    addr: SocketAddr,
    bodies: Bodies,
}

impl TestServer {
    pub async fn start() -> Self {
        let bodies: Bodies = Arc::default();
        let app = Router::new()
            .route("/*path", get(serve))
            .with_state(bodies.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        TestServer { addr, bodies }
    }

    pub fn insert<B: Into<Vec<u8>>>(&self, path: &str, body: B) -> String {
        self.bodies
            .write()
            .unwrap()
            .insert(path.trim_start_matches('/').to_string(), body.into());
        self.url(path)
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}/{}", self.addr, path.trim_start_matches('/'))
    }
}

async fn serve(State(bodies): State<Bodies>, Path(path): Path<String>) -> Response {
    match bodies.read().unwrap().get(&path) {
        Some(body) => body.clone().into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

pub fn sha512_hex(data: &[u8]) -> String {
    hex::encode(Sha512::digest(data))
}

pub fn build_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, data) in entries {
        if name.ends_with('/') {
            writer
                .add_directory(*name, SimpleFileOptions::default())
                .unwrap();
        } else {
            writer.start_file(*name, SimpleFileOptions::default()).unwrap();
            writer.write_all(data).unwrap();
        }
    }
    writer.finish().unwrap().into_inner()
}

/// Progress handler that keeps every notification as a line of text.
#[derive(Default)]
pub struct RecordedProgress {
    events: Mutex<Vec<String>>,
}

impl RecordedProgress {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    fn push(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }
}

impl ProgressHandler for RecordedProgress {
    fn new_task_set(&self, count: usize) {
        self.push(format!("set {}", count));
    }

    fn prepare_new_task_set(&self, label: &str) {
        self.push(format!("prepare {}", label));
    }

    fn new_task(&self, label: &str) {
        self.push(format!("task {}", label));
    }

    fn done(&self) {
        self.push("done".to_string());
    }
}
