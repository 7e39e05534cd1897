#![deny(clippy::all, clippy::pedantic)]

use feelslap::application::session::Session;
use feelslap::domain::comments::CommentDraft;
use feelslap::domain::types::{CommentId, PostId};

use crate::args::CommentsCmd;
use crate::context::CliError;
use crate::print::{done, print_json};

pub async fn handle(session: &Session, cmd: CommentsCmd) -> Result<(), CliError> {
    match cmd {
        CommentsCmd::List { post } => {
            let threads = session.comment_thread(&PostId::new(post)).await?;
            print_json(&threads)
        }
        CommentsCmd::Add {
            post,
            content,
            reply_to,
        } => {
            let mut draft = CommentDraft::new(PostId::new(post), content);
            if let Some(parent) = reply_to {
                draft = draft.reply_to(CommentId::new(parent));
            }
            let comment = session.queries().create_comment(draft).await?;
            print_json(&comment)
        }
        CommentsCmd::Delete { post, id } => {
            session
                .queries()
                .delete_comment(&PostId::new(post), &CommentId::new(id))
                .await?;
            done("comment.delete")
        }
    }
}
