//! Command-line surface for `feelslap`.

#![deny(clippy::all, clippy::pedantic)]

use std::fmt;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use feelslap::config::GlobalArgs;
use feelslap::domain::types::{PostVisibility, ReactionKind, UserRole};

#[derive(Parser, Debug)]
#[command(name = "feelslap", version, about = "Feel the Slap command-line client", long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Read the feed, gated for 18+ content
    Feed(FeedArgs),
    /// Create, show, edit or delete posts
    Post(PostArgs),
    /// Comment threads
    Comments(CommentsArgs),
    /// Emotional reactions on posts
    React(ReactArgs),
    /// Friends and friend requests
    Friends(FriendsArgs),
    /// Profiles and the post-signup contact banner
    Profile(ProfileArgs),
    /// Create an account for the signed-in principal
    Signup(SignupArgs),
    /// Moderation (admins and the site owner)
    Admin(AdminArgs),
    /// Run the client-side validators without contacting the API
    Validate(ValidateArgs),
}

#[derive(Args, Debug)]
pub struct FeedArgs {
    /// Page size (defaults to the configured page limit)
    #[arg(long)]
    pub limit: Option<u32>,
    #[arg(long, default_value_t = 0)]
    pub offset: u32,
    /// Only 18+ posts; refused for under-age viewers
    #[arg(long, conflicts_with = "user")]
    pub adult: bool,
    /// Only posts by this user
    #[arg(long)]
    pub user: Option<String>,
}

#[derive(Args, Debug)]
pub struct PostArgs {
    #[command(subcommand)]
    pub action: PostCmd,
}

#[derive(Subcommand, Debug)]
pub enum PostCmd {
    /// Create a post
    Create {
        #[arg(long)]
        content: String,
        #[arg(long)]
        emotion: String,
        #[arg(long)]
        body_sensation: String,
        /// Hide the author from readers
        #[arg(long, default_value_t = false)]
        anonymous: bool,
        /// Mark the post 18+ (requires an adult author)
        #[arg(long = "eighteen-plus", default_value_t = false)]
        eighteen_plus: bool,
        #[arg(long, default_value_t = VisibilityArg::Public)]
        visibility: VisibilityArg,
        /// Image to attach (at most 5 MiB)
        #[arg(long)]
        image: Option<PathBuf>,
    },
    /// Show one post
    Show { id: String },
    /// Replace the text of one of your posts
    Update {
        id: String,
        #[arg(long)]
        content: Option<String>,
        #[arg(long)]
        content_file: Option<PathBuf>,
    },
    /// Delete one of your posts
    Delete { id: String },
}

#[derive(Args, Debug)]
pub struct CommentsArgs {
    #[command(subcommand)]
    pub action: CommentsCmd,
}

#[derive(Subcommand, Debug)]
pub enum CommentsCmd {
    /// Show the reply tree of a post
    List { post: String },
    /// Comment on a post, optionally as a reply
    Add {
        post: String,
        #[arg(long)]
        content: String,
        #[arg(long)]
        reply_to: Option<String>,
    },
    /// Delete a comment
    Delete { post: String, id: String },
}

#[derive(Args, Debug)]
pub struct ReactArgs {
    #[command(subcommand)]
    pub action: ReactCmd,
}

#[derive(Subcommand, Debug)]
pub enum ReactCmd {
    Add { post: String, kind: ReactionArg },
    Remove { post: String, kind: ReactionArg },
}

#[derive(Args, Debug)]
pub struct FriendsArgs {
    #[command(subcommand)]
    pub action: FriendsCmd,
}

#[derive(Subcommand, Debug)]
pub enum FriendsCmd {
    /// Friends of a user (yourself by default)
    List { user: Option<String> },
    /// Friend requests waiting for you
    Requests,
    Send { user: String },
    Accept { user: String },
    Reject { user: String },
    Unfriend { user: String },
    /// Whether two users are friends
    Status { a: String, b: String },
}

#[derive(Args, Debug)]
pub struct ProfileArgs {
    #[command(subcommand)]
    pub action: ProfileCmd,
}

#[derive(Subcommand, Debug)]
pub enum ProfileCmd {
    /// Show a profile (yours by default)
    Show { user: Option<String> },
    /// Edit your profile; omitted fields keep their value
    Edit {
        #[arg(long)]
        username: Option<String>,
        #[arg(long)]
        bio: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        emotion: Option<String>,
        #[arg(long)]
        body_sensation: Option<String>,
        #[arg(long)]
        public: Option<bool>,
        /// Image file to upload as the avatar
        #[arg(long)]
        avatar: Option<PathBuf>,
        /// Image file to upload as the profile banner
        #[arg(long)]
        banner: Option<PathBuf>,
    },
    /// Whether the post-signup banner should be shown (showing it consumes the flag)
    Banner,
    /// Save contact details from the banner and dismiss it
    Contact {
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        phone: Option<String>,
    },
    /// Dismiss the post-signup banner
    Dismiss,
}

#[derive(Args, Debug)]
pub struct SignupArgs {
    #[arg(long)]
    pub username: String,
    #[arg(long)]
    pub email: String,
    /// Date of birth as YYYY-MM-DD
    #[arg(long)]
    pub date_of_birth: String,
    /// Path to a file holding the password (takes precedence over env)
    #[arg(long, env = "FEELSLAP_PASSWORD_FILE")]
    pub password_file: Option<PathBuf>,
    /// Password from env (CLI flag intentionally disabled to avoid shell history leaks)
    #[arg(hide = true, env = "FEELSLAP_PASSWORD")]
    pub password_env: Option<String>,
}

#[derive(Args, Debug)]
pub struct AdminArgs {
    #[command(subcommand)]
    pub action: AdminCmd,
}

#[derive(Subcommand, Debug)]
pub enum AdminCmd {
    /// Whether moderation is available to you
    Status,
    /// Posts flagged for review
    Flagged,
    Flag { post: String },
    Unflag { post: String },
    Ban { user: String },
    Unban { user: String },
    /// Remove a post
    Delete { post: String },
    /// Assign a role to a user
    Role { user: String, role: RoleArg },
}

#[derive(Args, Debug)]
pub struct ValidateArgs {
    #[command(subcommand)]
    pub action: ValidateCmd,
}

#[derive(Subcommand, Debug)]
pub enum ValidateCmd {
    Username { value: String },
    Email { value: String },
    Phone { value: String },
    /// Check a password against every rule
    Password { value: String },
    /// Check an 18+ date of birth (YYYY-MM-DD)
    Age { date_of_birth: String },
}

#[derive(Clone, Copy, Debug, ValueEnum, PartialEq, Eq)]
pub enum ReactionArg {
    Cry,
    Heart,
    Fire,
    Slap,
    Vibe,
}

impl From<ReactionArg> for ReactionKind {
    fn from(value: ReactionArg) -> Self {
        match value {
            ReactionArg::Cry => ReactionKind::Cry,
            ReactionArg::Heart => ReactionKind::Heart,
            ReactionArg::Fire => ReactionKind::Fire,
            ReactionArg::Slap => ReactionKind::Slap,
            ReactionArg::Vibe => ReactionKind::Vibe,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum, PartialEq, Eq)]
pub enum VisibilityArg {
    Public,
    Friends,
    Private,
}

impl From<VisibilityArg> for PostVisibility {
    fn from(value: VisibilityArg) -> Self {
        match value {
            VisibilityArg::Public => PostVisibility::Public,
            VisibilityArg::Friends => PostVisibility::FriendsOnly,
            VisibilityArg::Private => PostVisibility::Private,
        }
    }
}

impl fmt::Display for VisibilityArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            VisibilityArg::Public => "public",
            VisibilityArg::Friends => "friends",
            VisibilityArg::Private => "private",
        };
        f.write_str(s)
    }
}

#[derive(Clone, Copy, Debug, ValueEnum, PartialEq, Eq)]
pub enum RoleArg {
    Admin,
    User,
    Guest,
}

impl From<RoleArg> for UserRole {
    fn from(value: RoleArg) -> Self {
        match value {
            RoleArg::Admin => UserRole::Admin,
            RoleArg::User => UserRole::User,
            RoleArg::Guest => UserRole::Guest,
        }
    }
}
