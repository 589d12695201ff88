use std::sync::Arc;
use std::thread;

use memdex::{Collection, Record, SchemaError, Tx, Value};

/// A user record indexed three ways: by id, by handle, and by team.
#[derive(Record, Debug, Clone, PartialEq, Eq)]
struct User {
    id: u64,
    handle: String,
    team: String,
}

fn main() -> Result<(), SchemaError> {
    let users = Collection::builder()
        .unique(&["id"])
        .unique(&["handle"])
        .non_unique(&["team"])
        .build()?;

    let tx = Tx::new();
    let alice = User {
        id: 1,
        handle: "alice".to_string(),
        team: "storage".to_string(),
    };
    let bob = User {
        id: 2,
        handle: "bob".to_string(),
        team: "storage".to_string(),
    };

    // Fresh records commit at version 1.
    assert_eq!(users.put(&tx, alice.clone(), 0), Some(1));
    assert_eq!(users.put(&tx, bob, 0), Some(1));

    // A second record cannot claim a taken handle.
    let impostor = User {
        id: 3,
        handle: "alice".to_string(),
        team: "network".to_string(),
    };
    assert_eq!(users.put(&tx, impostor, 0), None);

    // Records are reachable through any index.
    let by_handle = users.get(&tx, 1, &[vec![Value::from("alice")]]);
    assert_eq!(by_handle, vec![alice.clone()]);
    let by_team = users.get(&tx, 2, &[vec![Value::from("storage")]]);
    assert_eq!(by_team.len(), 2);

    // Guarded updates: the expected version must beat the current one.
    let moved = User {
        id: 1,
        handle: "alice".to_string(),
        team: "network".to_string(),
    };
    assert_eq!(users.put(&tx, moved.clone(), 1), None); // stale
    assert_eq!(users.put(&tx, moved, 2), Some(2));

    // Every operation is safe to run from any number of threads.
    let users = Arc::new(users);
    let handles: Vec<_> = (10..14u64)
        .map(|id| {
            let users = Arc::clone(&users);
            thread::spawn(move || {
                let user = User {
                    id,
                    handle: format!("user-{id}"),
                    team: "bulk".to_string(),
                };
                users.put(&Tx::new(), user, 0)
            })
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap(), Some(1));
    }

    // Deleting removes the record from every index at once.
    let sentinel = User {
        id: 2,
        handle: String::new(),
        team: String::new(),
    };
    assert_eq!(users.delete(&Tx::new(), &sentinel, 0), Some(2));
    assert!(users.get(&Tx::new(), 1, &[vec![Value::from("bob")]]).is_empty());

    Ok(())
}
