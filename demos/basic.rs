//! Minimal single-producer/single-consumer and multi-producer/single-consumer
//! walkthroughs of the public `Ring` API.

use ringcore::RingBuilder;
use std::sync::Arc;
use std::thread;

fn spsc() {
    let ring = RingBuilder::new(16)
        .single_producer()
        .single_consumer()
        .build::<u64>()
        .expect("ring construction");

    for i in 0..10u64 {
        assert!(ring.enqueue(i));
    }
    let mut drained = Vec::new();
    while let Some(v) = ring.dequeue() {
        drained.push(v);
    }
    println!("spsc drained: {drained:?}");
}

fn mpsc() {
    let ring = Arc::new(
        RingBuilder::new(1024)
            .single_consumer()
            .build::<u64>()
            .expect("ring construction"),
    );

    let producers: Vec<_> = (0..4)
        .map(|pid| {
            let ring = Arc::clone(&ring);
            thread::spawn(move || {
                for seq in 0..1000u64 {
                    while !ring.enqueue((pid << 32) | seq) {
                        thread::yield_now();
                    }
                }
            })
        })
        .collect();

    let mut received = 0u64;
    while received < 4000 {
        if ring.dequeue().is_some() {
            received += 1;
        } else {
            thread::yield_now();
        }
    }

    for p in producers {
        p.join().unwrap();
    }
    println!("mpsc received {received} items");
}

fn main() {
    env_logger::init();
    spsc();
    mpsc();
}
