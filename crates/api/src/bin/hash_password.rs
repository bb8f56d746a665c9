//! Interactive password hasher for seeding `users.yaml` by hand.
//!
//! Prompts for one password at a time without echoing it and prints its
//! hash. A blank entry quits.

use anyhow::Context;

use keyportal_auth::hash_password;
use keyportal_observability::{LogFormat, tracing::init};

const PROMPT: &str = "Enter password to hash (blank to quit): ";

fn main() -> anyhow::Result<()> {
    init(LogFormat::Pretty);

    println!("Password Hasher");
    loop {
        let password = rpassword::prompt_password(PROMPT).context("failed to read password")?;
        if password.is_empty() {
            break;
        }

        let hash = hash_password(&password).context("failed to hash password")?;
        println!("Hashed: {}", hash.as_str());
    }

    Ok(())
}
