use std::{
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use freshet::{Scheduler, Subscription, TestScheduler};

use _validator::Validator;

const fn secs(s: u64) -> Duration {
    Duration::from_secs(s)
}

#[test]
fn recursion_reschedules_one_instance_at_a_time() {
    let scheduler = TestScheduler::new();
    let count = Arc::new(AtomicUsize::new(0));

    let subscription = scheduler.schedule_recursive({
        let count = Arc::clone(&count);
        move |again| {
            count.fetch_add(1, Ordering::SeqCst);
            again.again_after(secs(1));
            Subscription::empty()
        }
    });
    scheduler.advance_to(secs(3));
    assert_eq!(count.load(Ordering::SeqCst), 4);

    subscription.cancel();
    scheduler.advance_to(secs(100));

    // The pending continuation was cancelled and the rescheduler is inert.
    assert_eq!(count.load(Ordering::SeqCst), 4);
}

#[test]
fn cancelling_mid_continuation_stops_within_one_step() {
    let scheduler = TestScheduler::new();
    let count = Arc::new(AtomicUsize::new(0));
    let handle: Arc<ReplaceableHandle> = Arc::default();

    let subscription = scheduler.schedule_recursive({
        let count = Arc::clone(&count);
        let handle = Arc::clone(&handle);
        move |again| {
            if count.fetch_add(1, Ordering::SeqCst) == 2 {
                // A continuation cancelling its own recursion must not be
                // rescheduled, even though it asks to be.
                handle.cancel();
            }
            again.again_after(secs(1));
            Subscription::empty()
        }
    });
    handle.set(subscription);

    scheduler.advance_to(secs(100));
    assert_eq!(count.load(Ordering::SeqCst), 3);
}

/// Hands a subscription to the continuation that wants to cancel it.
#[derive(Default)]
struct ReplaceableHandle(std::sync::Mutex<Option<Subscription>>);

impl ReplaceableHandle {
    fn set(&self, subscription: Subscription) {
        *self.0.lock().unwrap() = Some(subscription);
    }

    fn cancel(&self) {
        if let Some(subscription) = self.0.lock().unwrap().as_ref() {
            subscription.cancel();
        }
    }
}

#[test]
fn periodic_iterations_and_their_inner_schedules_line_up() {
    let scheduler = TestScheduler::new();
    let v = Arc::new(Validator::new());

    let subscription = scheduler.schedule_periodic(Duration::ZERO, secs(10), {
        let scheduler = scheduler.clone();
        let v = Arc::clone(&v);
        move || {
            v.push(("tick", scheduler.now()));
            let v = Arc::clone(&v);
            let clock = scheduler.clone();
            let _ = scheduler.schedule_at(scheduler.now() + secs(3), move || {
                v.push(("inner", clock.now()));
                Subscription::empty()
            });
        }
    });
    scheduler.advance_to(secs(35));
    subscription.cancel();

    v.expect([
        ("tick", secs(0)),
        ("inner", secs(3)),
        ("tick", secs(10)),
        ("inner", secs(13)),
        ("tick", secs(20)),
        ("inner", secs(23)),
        ("tick", secs(30)),
        ("inner", secs(33)),
    ]);
}

#[test]
fn overrunning_iterations_run_immediately_but_only_once() {
    let scheduler = TestScheduler::new();
    let times = Arc::new(Validator::new());
    let overrun_once = Arc::new(AtomicBool::new(true));

    let subscription = scheduler.schedule_periodic(Duration::ZERO, secs(10), {
        let scheduler = scheduler.clone();
        let times = Arc::clone(&times);
        let overrun_once = Arc::clone(&overrun_once);
        move || {
            times.push(scheduler.now());
            if overrun_once.swap(false, Ordering::SeqCst) {
                // Simulate an iteration overrunning its period by 5.
                scheduler.sleep(secs(15));
            }
        }
    });
    scheduler.advance_to(secs(40));
    subscription.cancel();

    // One immediate make-up iteration at 15, then back on period measured
    // from each iteration's start. Nothing double-fires.
    times.expect([secs(0), secs(15), secs(25), secs(35)]);
}

#[test]
fn cancelling_periodic_work_stops_future_iterations() {
    let scheduler = TestScheduler::new();
    let count = Arc::new(AtomicUsize::new(0));

    let subscription = scheduler.schedule_periodic(Duration::ZERO, secs(10), {
        let count = Arc::clone(&count);
        move || {
            count.fetch_add(1, Ordering::SeqCst);
        }
    });
    scheduler.advance_to(secs(25));
    assert_eq!(count.load(Ordering::SeqCst), 3);

    subscription.cancel();
    scheduler.advance_to(secs(200));
    assert_eq!(count.load(Ordering::SeqCst), 3);
}

#[test]
fn initial_delay_offsets_the_first_iteration() {
    let scheduler = TestScheduler::new();
    let times = Arc::new(Validator::new());

    let subscription = scheduler.schedule_periodic(secs(4), secs(10), {
        let scheduler = scheduler.clone();
        let times = Arc::clone(&times);
        move || times.push(scheduler.now())
    });
    scheduler.advance_to(secs(30));
    subscription.cancel();

    times.expect([secs(4), secs(14), secs(24)]);
}
