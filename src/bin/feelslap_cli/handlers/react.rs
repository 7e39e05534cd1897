#![deny(clippy::all, clippy::pedantic)]

use feelslap::application::boundary::BackendError;
use feelslap::application::error::ClientError;
use feelslap::application::session::Session;
use feelslap::domain::types::PostId;

use crate::args::ReactCmd;
use crate::context::CliError;
use crate::print::done;

pub async fn handle(session: &Session, cmd: ReactCmd) -> Result<(), CliError> {
    let user = session
        .caller()
        .await
        .ok_or(ClientError::from(BackendError::Unauthenticated))?;

    match cmd {
        ReactCmd::Add { post, kind } => {
            session
                .queries()
                .add_reaction(&user, &PostId::new(post), kind.into())
                .await?;
            done("reaction.add")
        }
        ReactCmd::Remove { post, kind } => {
            session
                .queries()
                .remove_reaction(&user, &PostId::new(post), kind.into())
                .await?;
            done("reaction.remove")
        }
    }
}
