// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use crate::Persistence;

#[test]
fn test_in_memory_instances_are_isolated() {
    let mut first = Persistence::new_in_memory().expect("Failed to create first database");
    let mut second = Persistence::new_in_memory().expect("Failed to create second database");

    first
        .insert_booking(&super::create_test_booking(1, None))
        .expect("Insert should succeed");

    assert_eq!(
        first
            .list_all_bookings(None)
            .expect("Query failed")
            .len(),
        1
    );
    assert!(
        second
            .list_all_bookings(None)
            .expect("Query failed")
            .is_empty()
    );
}

#[test]
fn test_file_database_persists_across_connections() {
    let path = std::env::temp_dir().join(format!("repairhub_init_test_{}.db", std::process::id()));
    let _ = std::fs::remove_file(&path);

    {
        let mut persistence = Persistence::new_with_file(&path).expect("Failed to open file db");
        persistence
            .insert_booking(&super::create_test_booking(7, Some("morning")))
            .expect("Insert should succeed");
    }

    let mut reopened = Persistence::new_with_file(&path).expect("Failed to reopen file db");
    let bookings = reopened
        .list_bookings_for_user(7)
        .expect("Query should succeed");
    assert_eq!(bookings.len(), 1);

    let _ = std::fs::remove_file(&path);
}
