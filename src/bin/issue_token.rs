use std::env;

use anyhow::{anyhow, Context, Result};

const USAGE: &str = "usage: issue_token <user-id> <learner|instructor|admin> [ttl-minutes]";

fn main() -> Result<()> {
    let (user_id, role, ttl_minutes) = parse_args()?;
    let token = quiz_attempts::issue_token(&user_id, &role, ttl_minutes)?;
    println!("{token}");
    Ok(())
}

fn parse_args() -> Result<(String, String, Option<i64>)> {
    let mut args = env::args().skip(1);
    let user_id = args.next().ok_or_else(|| anyhow!(USAGE))?;
    let role = args.next().ok_or_else(|| anyhow!(USAGE))?;
    let ttl_minutes = args
        .next()
        .map(|raw| raw.parse::<i64>().with_context(|| format!("invalid ttl-minutes '{raw}'")))
        .transpose()?;

    if user_id.trim().is_empty() {
        return Err(anyhow!(USAGE));
    }

    Ok((user_id, role, ttl_minutes))
}
