use std::{thread, time::Duration};

use ikecrack::{
    compute_hash, CrackError, Exchange, Handshake, HashAlgorithm, Keyspace, Outcome, Search,
    SearchConfig,
};

fn exchange() -> Exchange {
    Exchange {
        ni: vec![0x11; 16],
        nr: vec![0x22; 16],
        g_x: vec![0x33; 8],
        g_y: vec![0x44; 8],
        ci: vec![0x55; 8],
        cr: vec![0x66; 8],
        sai: vec![0x77; 12],
        idr: vec![0x88; 6],
    }
}

fn search(mask: &str, password: &str, algorithm: HashAlgorithm, workers: usize) -> ikecrack::SearchReport {
    let handshake = exchange().sign(password, algorithm);
    let keyspace = Keyspace::compile(mask).unwrap();

    Search::new(SearchConfig::new().workers(workers))
        .run(&keyspace, &handshake)
        .unwrap()
}

#[test]
fn test_finds_two_digit_password() {
    let report = search("dd", "42", HashAlgorithm::Md5, 4);

    assert_eq!(report.outcome, Outcome::Found("42".to_owned()));
    assert_eq!(report.password(), Some("42"));
    assert!(report.attempts >= 1 && report.attempts <= 100);
}

#[test]
fn test_finds_sha1_password() {
    let report = search("lud", "xQ7", HashAlgorithm::Sha1, 3);

    assert_eq!(report.outcome, Outcome::Found("xQ7".to_owned()));
}

#[test]
fn test_exhausts_keyspace() {
    let report = search("ll", "42", HashAlgorithm::Md5, 4);

    assert_eq!(report.outcome, Outcome::NotFound);
    assert_eq!(report.password(), None);
    assert_eq!(report.attempts, 676);
    assert_eq!(report.workers, 4);
}

#[test]
fn test_first_and_last_candidates() {
    for password in ["000", "999"] {
        let report = search("ddd", password, HashAlgorithm::Md5, 8);
        assert_eq!(report.outcome, Outcome::Found(password.to_owned()));
    }
}

#[test]
fn test_empty_mask() {
    let report = search("", "", HashAlgorithm::Md5, 4);

    assert_eq!(report.outcome, Outcome::Found(String::new()));
    assert_eq!(report.attempts, 1);
    assert_eq!(report.workers, 1);
}

#[test]
fn test_worker_count_does_not_change_outcome() {
    for password in ["a0", "m5", "z9", "Q1"] {
        let single = search("ld", password, HashAlgorithm::Sha1, 1);
        let many = search("ld", password, HashAlgorithm::Sha1, 7);

        assert_eq!(single.outcome, many.outcome, "password {password}");
    }
}

#[test]
fn test_more_workers_than_candidates() {
    let report = search("d", "7", HashAlgorithm::Md5, 32);

    assert_eq!(report.outcome, Outcome::Found("7".to_owned()));
    assert_eq!(report.workers, 10);
}

#[test]
fn test_unknown_digest_size() {
    let line = format!(
        "{}*{}",
        exchange().sign("42", HashAlgorithm::Md5).to_line().rsplit_once('*').unwrap().0,
        "00".repeat(10)
    );

    match Handshake::parse(&line) {
        Err(CrackError::UnknownDigestSize(10)) => {}
        other => panic!("unexpected result: {other:?}"),
    }
    assert!(matches!(
        Handshake::new(exchange(), vec![0; 10]),
        Err(CrackError::UnknownDigestSize(10))
    ));
}

#[test]
fn test_invalid_mask_symbol() {
    match Keyspace::compile("ax") {
        Err(CrackError::InvalidMaskSymbol { symbol, position }) => {
            assert_eq!(symbol, 'x');
            assert_eq!(position, 1);
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn test_handshake_line_round_trip_cracks() {
    let line = exchange().sign("b7", HashAlgorithm::Md5).to_line();
    let handshake: Handshake = line.parse().unwrap();

    assert_eq!(handshake.algorithm(), HashAlgorithm::Md5);
    assert_eq!(
        handshake.target(),
        compute_hash(HashAlgorithm::Md5, &exchange(), b"b7").as_slice()
    );

    let report = Search::new(SearchConfig::new().workers(2))
        .run(&Keyspace::compile("ld").unwrap(), &handshake)
        .unwrap();
    assert_eq!(report.password(), Some("b7"));
}

#[test]
fn test_search_can_run_again_after_a_match() {
    let keyspace = Keyspace::compile("dd").unwrap();
    let search = Search::new(SearchConfig::new().workers(2));

    let first = search
        .run(&keyspace, &exchange().sign("42", HashAlgorithm::Md5))
        .unwrap();
    let second = search
        .run(&keyspace, &exchange().sign("17", HashAlgorithm::Md5))
        .unwrap();

    assert_eq!(first.outcome, Outcome::Found("42".to_owned()));
    assert_eq!(second.outcome, Outcome::Found("17".to_owned()));
    assert!(second.attempts > 0);
}

#[test]
fn test_stopped_search_stays_stopped() {
    let keyspace = Keyspace::compile("dd").unwrap();
    let handshake = exchange().sign("42", HashAlgorithm::Md5);
    let search = Search::new(SearchConfig::new().workers(2));

    assert_eq!(search.run(&keyspace, &handshake).unwrap().password(), Some("42"));

    search.stop_handle().cancel();
    for _ in 0..2 {
        let report = search.run(&keyspace, &handshake).unwrap();
        assert_eq!(report.outcome, Outcome::Interrupted);
        assert_eq!(report.attempts, 0);
    }
}

#[test]
fn test_cancelled_before_run() {
    let handshake = exchange().sign("42", HashAlgorithm::Md5);
    let search = Search::new(SearchConfig::new().workers(4));
    search.stop_handle().cancel();

    let report = search
        .run(&Keyspace::compile("dd").unwrap(), &handshake)
        .unwrap();

    assert_eq!(report.outcome, Outcome::Interrupted);
    assert_eq!(report.attempts, 0);
}

#[test]
fn test_cancel_stops_a_large_search() {
    // 62^6 candidates, far more than can be tested before the cancellation
    let handshake = exchange().sign("zzzzzzz", HashAlgorithm::Sha1);
    let keyspace = Keyspace::compile("aaaaaa").unwrap();
    let search = Search::new(SearchConfig::new().workers(8).batch_size(Some(64)));
    let stop = search.stop_handle();

    let canceller = thread::spawn(move || {
        thread::sleep(Duration::from_millis(100));
        stop.cancel();
    });
    let report = search.run(&keyspace, &handshake).unwrap();
    canceller.join().unwrap();

    assert_eq!(report.outcome, Outcome::Interrupted);
    assert!(u128::from(report.attempts) < keyspace.total());
}
