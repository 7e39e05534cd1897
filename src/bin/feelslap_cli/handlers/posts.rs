#![deny(clippy::all, clippy::pedantic)]

use feelslap::application::session::Session;
use feelslap::domain::posts::PostDraft;
use feelslap::domain::types::PostId;
use serde_json::json;

use crate::args::PostCmd;
use crate::context::CliError;
use crate::io::{read_bytes, read_value};
use crate::print::{done, print_json};

pub async fn handle(session: &Session, cmd: PostCmd) -> Result<(), CliError> {
    match cmd {
        PostCmd::Create {
            content,
            emotion,
            body_sensation,
            anonymous,
            eighteen_plus,
            visibility,
            image,
        } => {
            let mut draft = PostDraft::new(content, emotion, body_sensation);
            draft.is_anonymous = anonymous;
            draft.is_18_plus = eighteen_plus;
            draft.visibility = visibility.into();
            draft.image = image.as_deref().map(read_bytes).transpose()?;

            let post = session.create_post(draft).await?;
            print_json(&post)
        }
        PostCmd::Show { id } => {
            let post = session.post(&PostId::new(id)).await?;
            let image_url = post
                .as_ref()
                .and_then(|post| post.image_url.as_ref())
                .map(|blob| session.queries().client().blob_url(blob));
            print_json(&json!({ "post": post, "imageUrl": image_url }))
        }
        PostCmd::Update {
            id,
            content,
            content_file,
        } => {
            let content = read_value(content, content_file)?;
            let id = PostId::new(id);
            let mut post = session
                .post(&id)
                .await?
                .ok_or_else(|| CliError::InvalidInput(format!("post {id} not found")))?;
            post.content = content;
            session.queries().update_post(post).await?;
            done("post.update")
        }
        PostCmd::Delete { id } => {
            session.queries().delete_post(&PostId::new(id)).await?;
            done("post.delete")
        }
    }
}
