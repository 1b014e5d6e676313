//! Build script so `sqlx::migrate!` picks up new migration files.

fn main() {
    println!("cargo:rerun-if-changed=migrations/");
}
