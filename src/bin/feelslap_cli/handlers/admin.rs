#![deny(clippy::all, clippy::pedantic)]

use feelslap::application::session::Session;
use feelslap::domain::types::{PostId, UserId};
use serde_json::json;

use crate::args::AdminCmd;
use crate::context::CliError;
use crate::print::{done, print_json};

pub async fn handle(session: &Session, cmd: AdminCmd) -> Result<(), CliError> {
    let queries = session.queries();
    match cmd {
        AdminCmd::Status => {
            let moderator = session.admin_affordances().await?;
            let role = queries.caller_role().await?;
            print_json(&json!({ "moderator": moderator, "role": role }))
        }
        AdminCmd::Flagged => print_json(&queries.flagged_posts().await?),
        AdminCmd::Flag { post } => {
            queries.flag_post(&PostId::new(post)).await?;
            done("admin.flag")
        }
        AdminCmd::Unflag { post } => {
            queries.unflag_post(&PostId::new(post)).await?;
            done("admin.unflag")
        }
        AdminCmd::Ban { user } => {
            queries.ban_user(&UserId::new(user)).await?;
            done("admin.ban")
        }
        AdminCmd::Unban { user } => {
            queries.unban_user(&UserId::new(user)).await?;
            done("admin.unban")
        }
        AdminCmd::Delete { post } => {
            queries.admin_delete_post(&PostId::new(post)).await?;
            done("admin.delete")
        }
        AdminCmd::Role { user, role } => {
            queries.assign_role(&UserId::new(user), role.into()).await?;
            done("admin.role")
        }
    }
}
