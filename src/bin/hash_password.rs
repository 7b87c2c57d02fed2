use anyhow::{Context, Result, bail};
use std::io::{self, Write};

/// Drop the line ending `read_line` keeps. Other whitespace is part of the password.
fn strip_line_ending(line: &str) -> &str {
    line.trim_end_matches(['\n', '\r'])
}

fn main() -> Result<()> {
    eprint!("Enter password: ");
    io::stderr().flush()?;

    let mut line = String::new();
    io::stdin()
        .read_line(&mut line)
        .context("failed to read password")?;
    let password = strip_line_ending(&line);

    if password.is_empty() {
        bail!("Password cannot be empty");
    }

    let hash = custodia::auth::hash_password(password)?;

    println!("{hash}");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_only_the_line_ending() {
        assert_eq!(strip_line_ending("  secret \n"), "  secret ");
        assert_eq!(strip_line_ending("secret\r\n"), "secret");
        assert_eq!(strip_line_ending("secret"), "secret");
    }
}
