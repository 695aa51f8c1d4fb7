use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        mpsc, Arc,
    },
    thread,
    time::{Duration, Instant},
};

use freshet::{EventLoopScheduler, NewThreadScheduler, Scheduler, Subscription};

#[test]
fn new_thread_runs_the_action_on_another_thread() {
    let (tx, rx) = mpsc::channel();

    let _ = NewThreadScheduler::new().schedule(move || {
        tx.send(thread::current().id()).unwrap();
        Subscription::empty()
    });

    let worker = rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_ne!(worker, thread::current().id());
}

#[test]
fn new_thread_honors_the_due_time() {
    let (tx, rx) = mpsc::channel();
    let started = Instant::now();

    let _ = NewThreadScheduler::new().schedule_after(Duration::from_millis(50), move || {
        tx.send(()).unwrap();
        Subscription::empty()
    });

    rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert!(started.elapsed() >= Duration::from_millis(50));
}

#[test]
fn new_thread_cancellation_prevents_dispatch() {
    let fired = Arc::new(AtomicUsize::new(0));

    let subscription = NewThreadScheduler::new().schedule_after(Duration::from_millis(100), {
        let fired = Arc::clone(&fired);
        move || {
            fired.fetch_add(1, Ordering::SeqCst);
            Subscription::empty()
        }
    });
    subscription.cancel();

    thread::sleep(Duration::from_millis(250));
    assert_eq!(fired.load(Ordering::SeqCst), 0);
}

#[test]
fn event_loop_runs_actions_in_time_order_on_one_worker() {
    let scheduler = EventLoopScheduler::new();
    let (tx, rx) = mpsc::channel();

    for (label, delay) in [("late", 60), ("early", 20), ("now", 0)] {
        let tx = tx.clone();
        let _ = scheduler.schedule_after(Duration::from_millis(delay), move || {
            tx.send((label, thread::current().id())).unwrap();
            Subscription::empty()
        });
    }

    let mut seen = Vec::new();
    for _ in 0..3 {
        seen.push(rx.recv_timeout(Duration::from_secs(5)).unwrap());
    }

    let labels: Vec<_> = seen.iter().map(|(label, _)| *label).collect();
    assert_eq!(labels, ["now", "early", "late"]);
    assert!(seen.iter().all(|(_, worker)| *worker == seen[0].1));
    assert_ne!(seen[0].1, thread::current().id());
}

#[test]
fn event_loop_scheduling_does_not_block_the_caller() {
    let scheduler = EventLoopScheduler::new();
    let (tx, rx) = mpsc::channel();
    let started = Instant::now();

    let _ = scheduler.schedule_after(Duration::from_millis(200), move || {
        tx.send(()).unwrap();
        Subscription::empty()
    });
    assert!(started.elapsed() < Duration::from_millis(100));

    rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert!(started.elapsed() >= Duration::from_millis(200));
}

#[test]
fn event_loop_cancellation_prevents_dispatch() {
    let scheduler = EventLoopScheduler::new();
    let fired = Arc::new(AtomicUsize::new(0));

    let subscription = scheduler.schedule_after(Duration::from_millis(100), {
        let fired = Arc::clone(&fired);
        move || {
            fired.fetch_add(1, Ordering::SeqCst);
            Subscription::empty()
        }
    });
    subscription.cancel();

    thread::sleep(Duration::from_millis(250));
    assert_eq!(fired.load(Ordering::SeqCst), 0);
}

#[test]
fn event_loop_survives_a_panicking_action() {
    let scheduler = EventLoopScheduler::new();
    let (tx, rx) = mpsc::channel();

    let _ = scheduler.schedule(|| panic!("scheduled failure"));
    let _ = scheduler.schedule_after(Duration::from_millis(20), move || {
        tx.send(()).unwrap();
        Subscription::empty()
    });

    // The worker caught the panic and still serves later entries.
    rx.recv_timeout(Duration::from_secs(5)).unwrap();
}

#[test]
fn periodic_work_stops_after_cancellation() {
    let scheduler = EventLoopScheduler::new();
    let ticks = Arc::new(AtomicUsize::new(0));

    let subscription = scheduler.schedule_periodic(Duration::ZERO, Duration::from_millis(25), {
        let ticks = Arc::clone(&ticks);
        move || {
            ticks.fetch_add(1, Ordering::SeqCst);
        }
    });

    thread::sleep(Duration::from_millis(90));
    subscription.cancel();
    thread::sleep(Duration::from_millis(50));

    let settled = ticks.load(Ordering::SeqCst);
    assert!(settled >= 1);
    thread::sleep(Duration::from_millis(100));
    assert_eq!(ticks.load(Ordering::SeqCst), settled);
}
