#![deny(clippy::all, clippy::pedantic)]

use feelslap::application::pagination::{MAX_PAGE_LIMIT, PageRequest};
use feelslap::application::session::Session;
use feelslap::domain::types::UserId;

use crate::args::FeedArgs;
use crate::context::CliError;
use crate::print::print_json;

pub async fn handle(session: &Session, args: FeedArgs) -> Result<(), CliError> {
    let limit = args.limit.unwrap_or_else(|| session.first_page().limit);
    if !(1..=MAX_PAGE_LIMIT).contains(&limit) {
        return Err(CliError::InvalidInput(format!(
            "--limit must be between 1 and {MAX_PAGE_LIMIT}"
        )));
    }
    let page = PageRequest::new(limit, args.offset);

    let page = match (args.adult, args.user) {
        (true, _) => session.adult_feed(page).await?,
        (false, Some(user)) => session.user_feed(&UserId::new(user), page).await?,
        (false, None) => session.feed(page).await?,
    };
    print_json(&page)
}
