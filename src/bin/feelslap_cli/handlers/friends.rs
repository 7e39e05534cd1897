#![deny(clippy::all, clippy::pedantic)]

use feelslap::application::boundary::BackendError;
use feelslap::application::error::ClientError;
use feelslap::application::session::Session;
use feelslap::domain::types::UserId;
use serde_json::json;

use crate::args::FriendsCmd;
use crate::context::CliError;
use crate::print::{done, print_json};

pub async fn handle(session: &Session, cmd: FriendsCmd) -> Result<(), CliError> {
    let queries = session.queries();
    match cmd {
        FriendsCmd::List { user } => {
            let user = match user {
                Some(user) => UserId::new(user),
                None => session
                    .caller()
                    .await
                    .ok_or(ClientError::from(BackendError::Unauthenticated))?,
            };
            print_json(&queries.friends(&user).await?)
        }
        FriendsCmd::Requests => print_json(&queries.pending_friend_requests().await?),
        FriendsCmd::Send { user } => {
            queries.send_friend_request(&UserId::new(user)).await?;
            done("friends.send")
        }
        FriendsCmd::Accept { user } => {
            queries.accept_friend_request(&UserId::new(user)).await?;
            done("friends.accept")
        }
        FriendsCmd::Reject { user } => {
            queries.reject_friend_request(&UserId::new(user)).await?;
            done("friends.reject")
        }
        FriendsCmd::Unfriend { user } => {
            queries.unfriend(&UserId::new(user)).await?;
            done("friends.unfriend")
        }
        FriendsCmd::Status { a, b } => {
            let friends = queries
                .are_friends(&UserId::new(a), &UserId::new(b))
                .await?;
            print_json(&json!({ "friends": friends }))
        }
    }
}
