use std::{error::Error, io, process::exit};

use clap::Parser;
use rusqlite::Connection;

use ctrlmoney::{
    PasswordHash, Role, Username, ValidatedPassword, create_user, get_user_by_username,
    initialize_db, set_password,
};

/// A utility for creating superusers, or resetting a user's password.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to the application SQLite database.
    #[arg(long)]
    db_path: String,

    /// The username of the new superuser.
    #[arg(long)]
    username: String,

    /// Change the password of an existing user instead of creating a superuser.
    #[arg(long)]
    reset_password: bool,
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let username = match Username::new(&args.username) {
        Ok(username) => username,
        Err(error) => {
            print_error(error);
            exit(1);
        }
    };

    let connection = Connection::open(&args.db_path)?;
    initialize_db(&connection)?;

    let password_hash = match get_new_password_hash() {
        Some(password_hash) => password_hash,
        None => return Ok(()),
    };

    if args.reset_password {
        let user = match get_user_by_username(username.as_ref(), &connection) {
            Ok(user) => user,
            Err(error) => {
                print_error(format!("Could not find the user {username}: {error}"));
                exit(1);
            }
        };
        set_password(user.id, &password_hash, &connection)?;
        println!("Password updated for {username}.");

        return Ok(());
    }

    match create_user(username, password_hash, None, Role::Superuser, &connection) {
        Ok(user) => println!("Created the superuser {} with ID {}.", user.username, user.id),
        Err(error) => {
            print_error(error);
            exit(1);
        }
    }

    Ok(())
}

fn prompt(message: &str) -> Option<String> {
    match rpassword::prompt_password(message) {
        Ok(string) => Some(string),
        Err(error) if error.kind() == io::ErrorKind::UnexpectedEof => None,
        Err(error) => {
            print_error(format!("Could not read password from stdin: {error}"));
            None
        }
    }
}

fn get_new_password_hash() -> Option<PasswordHash> {
    loop {
        println!();

        let first_password = prompt("Enter a password: ")?;

        let password = match ValidatedPassword::new(&first_password) {
            Ok(password) => password,
            Err(error) => {
                print_error(error);
                continue;
            }
        };

        let second_password = prompt("Enter the same password again: ")?;

        if first_password != second_password {
            print_error("Passwords must match, try again.");
            continue;
        }

        match PasswordHash::new(password, PasswordHash::DEFAULT_COST) {
            Ok(password_hash) => return Some(password_hash),
            Err(error) => print_error(format!("Could not hash password: {error}. Try again.")),
        }
    }
}

fn print_error(error: impl ToString) {
    eprintln!(
        "\x1b[31;1m{}\x1b[0m",
        ctrlmoney::capitalise_first_char(&error.to_string())
    )
}
