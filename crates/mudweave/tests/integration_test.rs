//! Integration tests for the mudweave client.

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use mudweave::{execute, Command};
use mudweave_core::{GameConfig, SessionEvent};
use mudweave_session::Session;

fn read_line(stream: &mut TcpStream) -> String {
    let mut line = Vec::new();
    let mut byte = [0u8; 1];
    while !line.ends_with(b"\r\n") {
        stream.read_exact(&mut byte).unwrap();
        line.push(byte[0]);
    }
    String::from_utf8(line).unwrap().trim_end().to_string()
}

fn wait_map(events: &mpsc::Receiver<SessionEvent>) {
    loop {
        let event = events.recv_timeout(Duration::from_secs(5)).unwrap();
        if event == SessionEvent::Map {
            return;
        }
    }
}

#[test]
fn test_typed_movement_builds_map_and_walks_back() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let (line_tx, line_rx) = mpsc::channel();

    let server = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        stream
            .set_read_timeout(Some(Duration::from_secs(5)))
            .unwrap();
        stream.write_all(b"Town square\r\n").unwrap();
        for _ in 0..5 {
            line_tx.send(read_line(&mut stream)).unwrap();
        }
    });

    let config = GameConfig {
        host: "127.0.0.1".into(),
        port,
        ..GameConfig::default()
    };
    let (event_tx, event_rx) = mpsc::channel();
    let session = Session::builder(Arc::new(config))
        .on_event(move |_, event| {
            let _ = event_tx.send(event);
        })
        .build()
        .unwrap();
    session.connect().unwrap();
    assert_eq!(
        event_rx.recv_timeout(Duration::from_secs(5)).unwrap(),
        SessionEvent::Connected
    );

    execute(&session, Command::parse("/map mode auto"));
    wait_map(&event_rx);
    execute(&session, Command::parse("north"));
    wait_map(&event_rx);
    execute(&session, Command::parse("east"));
    wait_map(&event_rx);
    execute(&session, Command::parse("/map tag Bakery"));
    execute(&session, Command::parse("/map goto 0"));

    let received: Vec<String> = (0..2)
        .map(|_| line_rx.recv_timeout(Duration::from_secs(5)).unwrap())
        .collect();
    assert_eq!(received, vec!["north", "east"]);

    let (text, quit) = execute(&session, Command::parse("/walk Bakery"));
    assert_eq!(text, None);
    assert!(!quit);

    let walked: Vec<String> = (0..2)
        .map(|_| line_rx.recv_timeout(Duration::from_secs(5)).unwrap())
        .collect();
    assert_eq!(walked, vec!["n", "e"]);

    execute(&session, Command::parse("//who"));
    assert_eq!(
        line_rx.recv_timeout(Duration::from_secs(5)).unwrap(),
        "/who"
    );

    server.join().unwrap();
    let (_, quit) = execute(&session, Command::Quit);
    assert!(quit);
}
