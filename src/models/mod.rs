mod link;

pub use link::{
    CreateLinkRequest, DeleteResponse, Link, LinkStats, SearchQuery, UpdateLinkRequest,
    SOFT_DELETE_GRACE_SECS,
};
