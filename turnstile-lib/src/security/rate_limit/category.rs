use serde::{Deserialize, Serialize};
use std::fmt;

/// Traffic class with its own independent quota policy.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    /// General API traffic
    General,
    /// Login, signup, password reset
    Auth,
    /// Checkout and payment intents
    Payment,
    /// Back-office endpoints
    Admin,
    /// File and video uploads
    Upload,
    /// Lesson and video playback
    ContentAccess,
    /// Posting comments
    CommentCreation,
}

impl Category {
    /// Every category, in table order.
    pub const ALL: [Category; 7] = [
        Category::General,
        Category::Auth,
        Category::Payment,
        Category::Admin,
        Category::Upload,
        Category::ContentAccess,
        Category::CommentCreation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::General => "general",
            Category::Auth => "auth",
            Category::Payment => "payment",
            Category::Admin => "admin",
            Category::Upload => "upload",
            Category::ContentAccess => "content-access",
            Category::CommentCreation => "comment-creation",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
