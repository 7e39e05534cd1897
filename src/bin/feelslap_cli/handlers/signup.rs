#![deny(clippy::all, clippy::pedantic)]

use feelslap::application::session::{Session, SignupForm};
use serde_json::json;

use crate::args::SignupArgs;
use crate::context::CliError;
use crate::io::{parse_date, read_secret};
use crate::print::print_json;

pub async fn handle(session: &Session, args: SignupArgs) -> Result<(), CliError> {
    let form = SignupForm {
        username: args.username,
        email: args.email,
        password: read_secret(args.password_file, args.password_env)?,
        date_of_birth: Some(parse_date(&args.date_of_birth)?),
    };

    let user = session.sign_up(form).await?;
    print_json(&json!({ "ok": true, "user": user }))
}
