#![deny(clippy::all, clippy::pedantic)]

//! Local validators; nothing here reaches the network.

use feelslap::domain::validation;
use serde_json::{Value, json};

use crate::args::ValidateCmd;
use crate::context::CliError;
use crate::io::parse_date;
use crate::print::print_json;

pub fn handle(cmd: ValidateCmd) -> Result<(), CliError> {
    print_json(&evaluate(cmd)?)
}

pub fn evaluate(cmd: ValidateCmd) -> Result<Value, CliError> {
    let report = match cmd {
        ValidateCmd::Username { value } => match validation::validate_username(&value) {
            Ok(()) => json!({ "valid": true }),
            Err(err) => json!({ "valid": false, "error": err.to_string() }),
        },
        ValidateCmd::Email { value } => json!({ "valid": validation::validate_email(&value) }),
        ValidateCmd::Phone { value } => json!({ "valid": validation::validate_phone(&value) }),
        ValidateCmd::Password { value } => {
            let check = validation::validate_password(&value);
            let unmet: Vec<&str> = check.errors.iter().map(|rule| rule.message()).collect();
            json!({ "valid": check.is_valid(), "unmet": unmet })
        }
        ValidateCmd::Age { date_of_birth } => {
            let date_of_birth = parse_date(&date_of_birth)?;
            json!({
                "valid": validation::is_over_18(date_of_birth),
                "age": validation::age_on(date_of_birth, validation::today_utc()),
            })
        }
    };
    Ok(report)
}
