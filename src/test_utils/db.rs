use rusqlite::Connection;

use crate::{
    auth::{PasswordHash, Role, UserID, Username, create_user},
    db::initialize,
};

#[track_caller]
pub(crate) fn get_test_connection() -> Connection {
    let connection = Connection::open_in_memory().expect("Could not open database in memory.");
    initialize(&connection).expect("Could not initialize database.");
    connection
}

#[track_caller]
pub(crate) fn must_create_user(username: &str, connection: &Connection) -> UserID {
    create_user(
        Username::new(username).expect("invalid test username"),
        PasswordHash::new_unchecked("hunter2"),
        None,
        Role::Regular,
        connection,
    )
    .expect("Could not create test user")
    .id
}
