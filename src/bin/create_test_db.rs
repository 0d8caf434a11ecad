use std::error::Error;
use std::path::Path;
use std::process::exit;

use clap::Parser;
use rusqlite::Connection;
use time::{Duration, OffsetDateTime};

use spendbook::{
    CategoryIcon, CategoryName, NewExpense, PasswordHash, Username, ValidatedPassword,
    create_category, create_expense, create_user, initialize_db,
};

/// A utility for creating a test database for the spendbook server.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to save the SQLite database to.
    #[arg(long, short)]
    output_path: String,
}

/// Create and populate a database for manual testing.
fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let output_path = Path::new(&args.output_path);

    match output_path.extension() {
        None => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        Some(extension) if extension.is_empty() => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        _ => {}
    }

    if output_path.is_file() {
        eprintln!("File already exists at {output_path:#?}!");
        exit(1);
    }

    println!("Creating database at {output_path:#?}");
    let conn = Connection::open(output_path)?;

    initialize_db(&conn)?;

    println!("Creating test user 'demo' with the password 'test'...");

    let password_hash = PasswordHash::new(
        ValidatedPassword::new_unchecked("test"),
        PasswordHash::DEFAULT_COST,
    )?;
    let user = create_user(Username::new("demo")?, password_hash, &conn)?;

    println!("Creating categories and expenses...");

    let food = create_category(
        user.id,
        CategoryName::new("Groceries")?,
        CategoryIcon::Food,
        &conn,
    )?;
    let transport = create_category(
        user.id,
        CategoryName::new("Transport")?,
        CategoryIcon::Transport,
        &conn,
    )?;

    let today = OffsetDateTime::now_utc().date();
    let expenses = [
        (42.5, 0, "Weekly shop", Some(food.id)),
        (3.2, 1, "Bus fare", Some(transport.id)),
        (18.0, 3, "Farmers market", Some(food.id)),
        (60.0, 12, "Train tickets", Some(transport.id)),
        (9.99, 35, "Streaming subscription", None),
    ];

    for (amount, days_ago, description, category_id) in expenses {
        let expense = NewExpense::new(amount, today - Duration::days(days_ago), description, today)?
            .category_id(category_id);
        create_expense(expense, user.id, &conn)?;
    }

    println!("Success!");

    Ok(())
}
