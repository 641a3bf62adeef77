// SPDX-License-Identifier: MIT
//
// Author: Johannes Leupolz <dev@leupolz.eu>

use std::sync::{mpsc, Arc};
use std::thread;
use std::time::{Duration, Instant};

use dispatchpool::Dispatcher;
use dispatchpool_tests::probe_job::ProbeJob;
use dispatchpool_tests::recording_job::Recorder;
use dispatchpool_tests::test_log::TestLog;

// simulated processing time of a job
const JOB_TIME: Duration = Duration::from_millis(500);
// short wait for a job to enter the pipeline
const SETTLE: Duration = Duration::from_millis(50);

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn test_single_worker_scenario() {
    init_logging();
    let dispatcher = Dispatcher::new(1, 3).unwrap();
    dispatcher.start().unwrap();
    let started = Instant::now();
    let mut log = TestLog::default();

    let (j1, p1) = ProbeJob::new("j1", JOB_TIME);
    dispatcher.submit(j1).unwrap();
    thread::sleep(SETTLE);
    log.observe("j1", started.elapsed().as_millis(), dispatcher.queued_count(), dispatcher.outstanding());

    assert_eq!(dispatcher.queued_count(), 0, "No jobs should be in queue");
    assert!(p1.was_called());

    let (j2, p2) = ProbeJob::new("j2", JOB_TIME);
    dispatcher.submit(j2).unwrap();
    thread::sleep(SETTLE);
    log.observe("j2", started.elapsed().as_millis(), dispatcher.queued_count(), dispatcher.outstanding());

    // j2 was taken from the backlog by the routing loop but no worker is
    // free yet: it is neither queued nor running
    assert_eq!(dispatcher.queued_count(), 0, "No jobs should be in queue");
    assert!(!p2.was_called());

    let (j3, p3) = ProbeJob::new("j3", JOB_TIME);
    dispatcher.submit(j3).unwrap();
    thread::sleep(SETTLE);
    log.observe("j3", started.elapsed().as_millis(), dispatcher.queued_count(), dispatcher.outstanding());

    assert_eq!(dispatcher.queued_count(), 1, "j3 should be in queue");
    assert_eq!(dispatcher.outstanding(), 3);
    assert!(!p3.was_called());

    dispatcher.wait();
    log.stats = Some(dispatcher.stats());
    log.dump();

    assert!(started.elapsed() >= JOB_TIME * 3);
    for probe in [&p1, &p2, &p3] {
        assert!(probe.is_finished());
        assert_eq!(probe.started(), 1);
    }
    assert_eq!(dispatcher.queued_count(), 0, "No jobs should be in queue");
    dispatcher.shutdown().unwrap();
}

#[test]
fn test_full_backlog_blocks_submitter() {
    init_logging();
    let dispatcher = Arc::new(Dispatcher::new(1, 1).unwrap());
    dispatcher.start().unwrap();

    // one running, one held by the routing loop, one queued
    let mut probes = Vec::new();
    for i in 0..3 {
        let (job, probe) = ProbeJob::new(format!("fill {i}"), JOB_TIME);
        dispatcher.submit(job).unwrap();
        probes.push(probe);
        thread::sleep(SETTLE);
    }
    assert_eq!(dispatcher.queued_count(), 1);

    let (returned_tx, returned_rx) = mpsc::channel();
    let d = dispatcher.clone();
    let submitter = thread::spawn(move || {
        let (job, probe) = ProbeJob::new("blocked", Duration::ZERO);
        d.submit(job).unwrap();
        returned_tx.send(Instant::now()).unwrap();
        probe
    });

    assert!(
        returned_rx.recv_timeout(JOB_TIME / 4).is_err(),
        "submit must block while the backlog is full"
    );
    // unblocks once the first job finishes and the backlog moves on
    returned_rx.recv_timeout(JOB_TIME * 2).unwrap();
    assert!(probes[0].is_finished());

    let blocked = submitter.join().unwrap();
    dispatcher.wait();
    assert!(blocked.is_finished());
    dispatcher.shutdown().unwrap();
}

#[test]
fn test_queued_count_progression() {
    init_logging();
    const WORKERS: usize = 2;
    let dispatcher = Dispatcher::new(WORKERS, 5).unwrap();
    dispatcher.start().unwrap();

    for i in 1..=6usize {
        let (job, _probe) = ProbeJob::new(format!("job {i}"), JOB_TIME);
        dispatcher.submit(job).unwrap();
        thread::sleep(Duration::from_millis(30));
        // W running plus one waiting in the routing loop are not queued
        assert_eq!(
            dispatcher.queued_count(),
            i.saturating_sub(WORKERS + 1),
            "after submitting job {i}"
        );
    }

    dispatcher.wait();
    assert_eq!(dispatcher.queued_count(), 0);
    dispatcher.shutdown().unwrap();
}

#[test]
fn test_outstanding_tracks_unfinished_jobs() {
    init_logging();
    let dispatcher = Dispatcher::new(2, 4).unwrap();
    dispatcher.start().unwrap();
    let job_time = Duration::from_millis(300);
    let started = Instant::now();

    for i in 0..4 {
        let (job, _probe) = ProbeJob::new(format!("job {i}"), job_time);
        dispatcher.submit(job).unwrap();
    }
    assert_eq!(dispatcher.outstanding(), 4);

    // first pair done at ~300ms, second pair at ~600ms
    thread::sleep(Duration::from_millis(450).saturating_sub(started.elapsed()));
    assert_eq!(dispatcher.outstanding(), 2);

    dispatcher.wait();
    assert_eq!(dispatcher.outstanding(), 0);
    dispatcher.shutdown().unwrap();
}

#[test]
fn test_fifo_dequeue_order() {
    init_logging();
    let dispatcher = Dispatcher::new(1, 10).unwrap();
    dispatcher.start().unwrap();
    let recorder = Recorder::new();

    for seq in 0..1000 {
        dispatcher.submit(recorder.job(seq)).unwrap();
    }
    dispatcher.wait();

    assert_eq!(recorder.recorded(), (0..1000).collect::<Vec<_>>());
    dispatcher.shutdown().unwrap();
}

#[test]
fn test_every_job_runs_exactly_once() {
    init_logging();
    let dispatcher = Dispatcher::new(4, 3).unwrap();
    dispatcher.start().unwrap();

    let probes: Vec<_> = (0..40)
        .map(|i| {
            let (job, probe) = ProbeJob::new(format!("job {i}"), Duration::from_millis(5));
            dispatcher.submit(job).unwrap();
            probe
        })
        .collect();
    dispatcher.wait();

    assert!(probes.iter().all(|p| p.started() == 1 && p.is_finished()));
    let stats = dispatcher.stats();
    assert_eq!(stats.submitted, 40);
    assert_eq!(stats.completed, 40);
    assert_eq!(stats.panicked, 0);
    dispatcher.shutdown().unwrap();
}

#[test]
fn test_workers_run_in_parallel() {
    init_logging();
    let dispatcher = Dispatcher::new(4, 4).unwrap();
    dispatcher.start().unwrap();
    let started = Instant::now();

    for i in 0..4 {
        let (job, _probe) = ProbeJob::new(format!("job {i}"), JOB_TIME);
        dispatcher.submit(job).unwrap();
    }
    dispatcher.wait();

    // four workers: roughly one job time, certainly less than two
    assert!(started.elapsed() < JOB_TIME * 2);
    dispatcher.shutdown().unwrap();
}
