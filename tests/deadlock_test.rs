// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Concurrent invocations against one `MemoryLedger`, run under
//! parking_lot's deadlock detector.
//!
//! Every onboarding reads and writes the same merchant and the transaction
//! index, so racing invocations conflict. The ledger must stay consistent
//! whichever of them wins.

use loyalty_ledger_rs::{LoyaltyEngine, LoyaltyError, MemoryLedger, StoreError};
use parking_lot::deadlock;
use rayon::prelude::*;
use rust_decimal::Decimal;
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

const CUSTOMERS: usize = 16;

fn start_deadlock_detector() -> Arc<AtomicBool> {
    let running = Arc::new(AtomicBool::new(true));
    let running_clone = running.clone();

    thread::spawn(move || {
        while running_clone.load(Ordering::SeqCst) {
            thread::sleep(Duration::from_millis(100));
            let deadlocks = deadlock::check_deadlock();
            if !deadlocks.is_empty() {
                eprintln!("\n=== DEADLOCK DETECTED ===");
                for (i, threads) in deadlocks.iter().enumerate() {
                    eprintln!("\nDeadlock #{}", i + 1);
                    for t in threads {
                        eprintln!("Thread ID: {:?}", t.thread_id());
                        eprintln!("Backtrace:\n{:#?}", t.backtrace());
                    }
                }
                panic!("Deadlock detected! See output above for details.");
            }
        }
    });

    running
}

fn stop_deadlock_detector(running: Arc<AtomicBool>) {
    running.store(false, Ordering::SeqCst);
    thread::sleep(Duration::from_millis(150));
}

/// Ledger with merchant M1 and customers C0..C15, none of them onboarded.
fn populated() -> (LoyaltyEngine, MemoryLedger) {
    let engine = LoyaltyEngine::default();
    let ledger = MemoryLedger::new();
    engine
        .invoke(
            &ledger,
            "createMerchant",
            &["M1", "shop", "Shop", "Retail", "#fff", "1", "2.00", "0.00", "USD", "2017-01-01"],
        )
        .unwrap();
    for i in 0..CUSTOMERS {
        let id = format!("C{i}");
        let user = format!("user{i}");
        engine
            .invoke(
                &ledger,
                "createCustomer",
                &[id.as_str(), user.as_str(), "Name", "0.00", "", "", "", "", "", "", "", "", ""],
            )
            .unwrap();
    }
    ledger.take_events();
    (engine, ledger)
}

fn associate(engine: &LoyaltyEngine, ledger: &MemoryLedger, i: usize) -> Result<(), LoyaltyError> {
    let customer = format!("C{i}");
    let tx = format!("T{i}");
    engine
        .invoke(
            ledger,
            "associateCustomer",
            &[customer.as_str(), "M1", tx.as_str(), "2017-01-02", "CustomerOnBoarding"],
        )
        .map(|_| ())
}

fn json(ledger: &MemoryLedger, key: &str) -> Value {
    serde_json::from_slice(&ledger.get_committed(key).unwrap()).unwrap()
}

fn initial_balance(ledger: &MemoryLedger) -> Decimal {
    json(ledger, "M1")["merchantInitialBalance"]
        .as_str()
        .unwrap()
        .parse()
        .unwrap()
}

fn members(ledger: &MemoryLedger) -> usize {
    (0..CUSTOMERS)
        .filter(|i| json(ledger, &format!("C{i}"))["merchantIDs"] == "M1")
        .count()
}

#[test]
fn racing_onboardings_commit_or_conflict() {
    let detector = start_deadlock_detector();
    let (engine, ledger) = populated();

    let results: Vec<Result<(), LoyaltyError>> = (0..CUSTOMERS)
        .into_par_iter()
        .map(|i| associate(&engine, &ledger, i))
        .collect();

    let successes = results.iter().filter(|result| result.is_ok()).count();
    for err in results.iter().filter_map(|result| result.as_ref().err()) {
        assert!(
            matches!(err, LoyaltyError::Store(StoreError::Conflict { .. })),
            "unexpected error: {err}"
        );
        assert!(!err.is_rejection());
    }

    assert!(successes >= 1);
    assert_eq!(
        initial_balance(&ledger),
        Decimal::from(100_000) - Decimal::from(100 * successes)
    );
    assert_eq!(json(&ledger, "_Transactionindex").as_array().unwrap().len(), successes);
    assert_eq!(members(&ledger), successes);

    // Conflicts publish nothing; only the winners announce themselves
    let events = ledger.take_events();
    assert_eq!(events.len(), successes);
    assert!(events.iter().all(|event| event.name == "evtsender"));

    stop_deadlock_detector(detector);
}

#[test]
fn retried_onboardings_all_land() {
    let detector = start_deadlock_detector();
    let (engine, ledger) = populated();

    (0..CUSTOMERS).into_par_iter().for_each(|i| {
        loop {
            match associate(&engine, &ledger, i) {
                Ok(()) => break,
                Err(LoyaltyError::Store(StoreError::Conflict { .. })) => continue,
                Err(err) => panic!("unexpected error: {err}"),
            }
        }
    });

    assert_eq!(
        initial_balance(&ledger),
        Decimal::from(100_000) - Decimal::from(100 * CUSTOMERS)
    );
    assert_eq!(json(&ledger, "_Transactionindex").as_array().unwrap().len(), CUSTOMERS);
    assert_eq!(members(&ledger), CUSTOMERS);

    stop_deadlock_detector(detector);
}

#[test]
fn queries_observe_committed_states() {
    let detector = start_deadlock_detector();
    let (engine, ledger) = populated();
    let engine = Arc::new(engine);
    let ledger = Arc::new(ledger);
    let writing = Arc::new(AtomicBool::new(true));

    let reader = {
        let engine = engine.clone();
        let ledger = ledger.clone();
        let writing = writing.clone();
        thread::spawn(move || {
            while writing.load(Ordering::SeqCst) {
                match engine.query(ledger.as_ref(), "getMerchantsAccountBalance", &["M1"]) {
                    Ok(response) => {
                        let value = response.to_json().unwrap().unwrap();
                        let balance: Decimal = value["merchantAccountBalance"]
                            .as_str()
                            .unwrap()
                            .parse()
                            .unwrap();
                        // Each onboarding moves the balance by exactly one grant
                        let spent = Decimal::from(100_000) - balance;
                        assert_eq!(spent % Decimal::from(100), Decimal::ZERO);
                        assert!(spent <= Decimal::from(100 * CUSTOMERS));
                    }
                    Err(LoyaltyError::Store(StoreError::Conflict { .. })) => {}
                    Err(err) => panic!("unexpected error: {err}"),
                }
            }
        })
    };

    (0..CUSTOMERS).into_par_iter().for_each(|i| {
        while associate(&engine, &ledger, i).is_err() {}
    });
    writing.store(false, Ordering::SeqCst);

    reader.join().unwrap();
    assert_eq!(members(&ledger), CUSTOMERS);

    stop_deadlock_detector(detector);
}
