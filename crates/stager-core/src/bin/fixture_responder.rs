//! Minimal HTTP responder spawned by integration tests as a stand-in worker
//! process. Reads `STAGER_PORT`/`STAGER_NAME` the same way a real tenant
//! worker would, binds a plain `std::net::TcpListener`, and answers every
//! request `200 OK` until it is interrupted (the default SIGINT disposition
//! terminates it, matching the idle-reap contract the Supervisor Loop relies
//! on).
//!
//! Not part of the public crate surface, only used via
//! `env!("CARGO_BIN_EXE_fixture_responder")` in `tests/manager_lifecycle.rs`.
use std::io::{Read, Write};
use std::net::TcpListener;

fn main() {
    let port: u16 = std::env::var("STAGER_PORT")
        .expect("STAGER_PORT must be set")
        .parse()
        .expect("STAGER_PORT must be a valid port number");

    let listener =
        TcpListener::bind(("127.0.0.1", port)).expect("fixture_responder failed to bind");

    for stream in listener.incoming() {
        let Ok(mut stream) = stream else { continue };
        let mut buf = [0u8; 1024];
        let _ = stream.read(&mut buf);
        let _ = stream.write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\nok");
    }
}
