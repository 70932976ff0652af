use crate::{client::SnapshareClient, errors::AppError, models::UserProfile};

/// Username prefix search.
#[derive(Clone)]
pub struct SearchService {
    client: SnapshareClient,
}

impl SearchService {
    pub fn new(client: SnapshareClient) -> Self {
        Self { client }
    }

    /// Profiles whose username starts with the lowercased `term`. Comparison is
    /// case-sensitive against stored usernames, so mixed-case names only match
    /// from their lowercase part. A blank term returns nothing.
    pub async fn search_users(&self, term: &str) -> Result<Vec<UserProfile>, AppError> {
        let term = term.trim().to_lowercase();
        if term.is_empty() {
            return Ok(Vec::new());
        }
        let users = self.client.users();
        Ok(users.find_many(&users.query().where_prefix("username", &term)).await?)
    }
}
