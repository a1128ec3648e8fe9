//! End-to-end test against a real bash in a PTY.
//!
//! Ignored by default: it needs /bin/bash and a working PTY, which CI
//! sandboxes do not always provide. Run with `cargo test -- --ignored`.

use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

use shellbuf::{PumpStatus, Session, StringSurface};

/// Honor RUST_LOG while debugging these tests.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn pump_until<F>(session: &mut Session, surface: &mut StringSurface, window: Duration, done: F)
where
    F: Fn(&Session, &StringSurface) -> bool,
{
    let deadline = Instant::now() + window;
    while Instant::now() < deadline {
        match session.pump(surface) {
            PumpStatus::Dirty => continue,
            PumpStatus::Disconnected => return,
            PumpStatus::Idle => {
                if done(session, surface) && !session.in_prompt() {
                    return;
                }
                thread::sleep(Duration::from_millis(20));
            }
        }
    }
}

#[test]
#[ignore = "requires a working PTY and /bin/bash"]
fn echo_command_round_trip() {
    init_tracing();
    let mut surface = StringSurface::new();
    let mut session = Session::spawn(Path::new("/tmp"), 0).unwrap();

    // Wait for the first prompt.
    pump_until(&mut session, &mut surface, Duration::from_secs(5), |s, _| {
        s.cwd().ends_with("tmp")
    });

    assert!(session.send("echo round-trip\n"));
    pump_until(&mut session, &mut surface, Duration::from_secs(5), |s, _| {
        s.history().len() == 1
    });

    let contents = surface.contents();
    assert!(contents.contains("echo round-trip"), "{:?}", contents);
    assert!(contents.contains("\nround-trip\n"), "{:?}", contents);
    assert_eq!(session.last_status(), Some("0"));
    assert_eq!(session.history().len(), 1);
    assert_eq!(
        session
            .history()
            .last()
            .unwrap()
            .text(&contents),
        "echo round-trip"
    );
}

#[test]
#[ignore = "requires a working PTY and /bin/bash"]
fn failing_command_reports_status() {
    init_tracing();
    let mut surface = StringSurface::new();
    let mut session = Session::spawn(Path::new("/tmp"), 0).unwrap();
    pump_until(&mut session, &mut surface, Duration::from_secs(5), |s, _| {
        s.cwd().ends_with("tmp")
    });

    assert!(session.send("false\n"));
    pump_until(&mut session, &mut surface, Duration::from_secs(5), |s, _| {
        s.last_status() == Some("1")
    });
    assert_eq!(session.last_status(), Some("1"));
    assert!(session.last_elapsed().is_some());
}

#[test]
#[ignore = "requires a working PTY and /bin/bash"]
fn cd_updates_working_directory() {
    init_tracing();
    let mut surface = StringSurface::new();
    let mut session = Session::spawn(Path::new("/tmp"), 0).unwrap();
    pump_until(&mut session, &mut surface, Duration::from_secs(5), |s, _| {
        s.cwd().ends_with("tmp")
    });

    assert!(session.send("cd /\n"));
    pump_until(&mut session, &mut surface, Duration::from_secs(5), |s, _| {
        s.cwd() == "/"
    });
    assert_eq!(session.cwd(), "/");
}
