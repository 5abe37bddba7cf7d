// Per-test server bootstrap: every session ends with its last player, so tests never share one.
#![allow(dead_code)]

use platformer_server::GameConfig;
use std::{net::SocketAddr, sync::mpsc, thread, time::Duration};

// The checked-in sample; the server has no built-in gameplay defaults.
pub fn sample_config() -> GameConfig {
    GameConfig::from_toml(include_str!("../../session.toml")).expect("sample config is valid")
}

pub struct TestServer {
    pub addr: SocketAddr,
    thread: thread::JoinHandle<()>,
}

impl TestServer {
    // Boot a server on an ephemeral port and block until it accepts connections.
    pub fn start(config: GameConfig) -> Self {
        let (addr_tx, addr_rx) = mpsc::channel();
        // An OS thread keeps the server alive independently of the `#[tokio::test]` runtime.
        let thread = thread::spawn(move || {
            let runtime = tokio::runtime::Runtime::new().expect("test runtime");
            runtime.block_on(async move {
                let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
                    .await
                    .expect("bind ephemeral test port");
                let addr = listener.local_addr().expect("get local addr");
                let _ = addr_tx.send(addr);
                platformer_server::run(listener, config)
                    .await
                    .expect("server failed");
            });
        });

        let addr = addr_rx
            .recv_timeout(Duration::from_secs(5))
            .expect("server did not publish its address");
        wait_until_accepting(addr);
        Self { addr, thread }
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }

    pub fn http_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    // True once the server thread has returned from `run`.
    pub fn wait_for_exit(&self, within: Duration) -> bool {
        let deadline = std::time::Instant::now() + within;
        while std::time::Instant::now() < deadline {
            if self.thread.is_finished() {
                return true;
            }
            thread::sleep(Duration::from_millis(20));
        }
        self.thread.is_finished()
    }
}

fn wait_until_accepting(addr: SocketAddr) {
    for _ in 0..100 {
        if std::net::TcpStream::connect(addr).is_ok() {
            return;
        }
        thread::sleep(Duration::from_millis(20));
    }
    panic!("server did not become ready in time");
}
