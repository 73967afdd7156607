//! This example shows how a trail follows an operation across threads.
//!
//! A root trail is started on the main thread, forked for a nested step and
//! then handed off to worker threads with `Trail::go`.
//! Every finalized trail is forwarded to a background `ReporterThread`
//! that writes it to standard error.
extern crate optrail;

use std::io;
use std::num::ParseIntError;
use std::thread;
use std::time::Duration;

use optrail::utils::FailTrail;
use optrail::utils::ReporterThread;
use optrail::utils::channel_reporter;
use optrail::utils::write_snapshot;


fn main() {
    // Create a channel reporter and the thread writing snapshots out.
    let (reporter, receiver) = channel_reporter();
    optrail::register_reporter(move |snapshot| reporter(snapshot));
    let mut writer = ReporterThread::new(receiver, |snapshot| {
        let mut stderr = io::stderr();
        write_snapshot(&snapshot, &mut stderr).expect("Failed to write snapshot");
        eprintln!();
    });
    writer.stop_delay(Duration::from_millis(500));

    // Globals are included in every snapshot.
    optrail::put_global("service", "demo");

    let root = optrail::begin("batch");
    root.here("inputs", 9);

    // A nested step on the same thread.
    let step = root.fork();
    step.here("step", "validate");
    step.succeed();

    // Hand the operation off to some workers.
    let mut workers = Vec::new();
    for i in 1..10 {
        let name = format!("Worker#{}", i);
        let raw = if i % 4 == 0 { String::from("not-a-number") } else { i.to_string() };
        let worker = root.go_named(&name, move |trail| {
            trail.here("worker", i);
            thread::sleep(Duration::from_millis(10 * i as u64));
            match parse(&trail, &raw) {
                Ok(value) => {
                    trail.here("parsed", value);
                    trail.succeed();
                },
                Err(_) => println!("Worker {} failed", i),
            }
        }).expect("Failed to spawn worker");
        workers.push(worker);
    }
    for worker in workers {
        worker.join().unwrap();
    }

    root.succeed();
    writer.stop();
}

fn parse(trail: &optrail::Trail, raw: &str) -> Result<i64, ParseIntError> {
    trail.here("raw", raw);
    raw.parse::<i64>().fail_trail(trail)
}
