#![deny(clippy::all, clippy::pedantic)]

use feelslap::application::boundary::BackendError;
use feelslap::application::error::ClientError;
use feelslap::application::session::Session;
use feelslap::domain::types::UserId;
use serde_json::json;

use crate::args::ProfileCmd;
use crate::context::CliError;
use crate::io::read_bytes;
use crate::print::{done, print_json};

pub async fn handle(session: &Session, cmd: ProfileCmd) -> Result<(), CliError> {
    let queries = session.queries();
    match cmd {
        ProfileCmd::Show { user: Some(user) } => {
            print_json(&queries.user_profile(&UserId::new(user)).await?)
        }
        ProfileCmd::Show { user: None } => print_json(&queries.caller_profile().await?),
        ProfileCmd::Edit {
            username,
            bio,
            email,
            emotion,
            body_sensation,
            public,
            avatar,
            banner,
        } => {
            let mut profile = queries
                .caller_profile()
                .await?
                .ok_or(ClientError::from(BackendError::NotFound(
                    "caller profile".into(),
                )))?;
            if let Some(username) = username {
                profile.username = username;
            }
            if let Some(bio) = bio {
                profile.bio = bio;
            }
            if let Some(email) = email {
                profile.email = email;
            }
            if let Some(emotion) = emotion {
                profile.last_emotion = emotion;
            }
            if let Some(body_sensation) = body_sensation {
                profile.last_body_sensation = body_sensation;
            }
            if let Some(public) = public {
                profile.is_profile_public = public;
            }
            if let Some(path) = avatar {
                let blob = queries.client().upload_blob(read_bytes(&path)?, None).await?;
                profile.avatar = Some(blob);
            }
            if let Some(path) = banner {
                let blob = queries.client().upload_blob(read_bytes(&path)?, None).await?;
                profile.banner = Some(blob);
            }
            queries.update_user_profile(profile).await?;
            done("profile.edit")
        }
        ProfileCmd::Banner => {
            let show = session.take_signup_banner().await?;
            print_json(&json!({ "showBanner": show }))
        }
        ProfileCmd::Contact { email, phone } => {
            session
                .save_contact_info(email.as_deref(), phone.as_deref())
                .await?;
            done("profile.contact")
        }
        ProfileCmd::Dismiss => {
            session.dismiss_banner().await?;
            done("profile.dismiss")
        }
    }
}
